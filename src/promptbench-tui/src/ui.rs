//! Rendering.
//!
//! Pure view code: everything here reads [`App`] state and draws; no state is
//! mutated except the response-pane scroll clamp, which depends on the layout
//! computed during drawing.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::{App, Overlay, SettingsField, Status};

pub fn draw(frame: &mut Frame<'_>, app: &mut App) {
    let theme = app.theme;
    let [header, model_bar, prompt_area, response_area, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(8),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    // Header: title left, status right.
    let status_style = match &app.status {
        Status::Error(_) => Style::default().fg(theme.error),
        Status::Generating | Status::LoadingModels => Style::default().fg(theme.accent),
        Status::Complete => Style::default().fg(theme.success),
        _ => Style::default().fg(theme.dim),
    };
    let title = Line::from(vec![
        Span::styled(
            " promptbench ",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(app.settings.server_url.clone(), Style::default().fg(theme.dim)),
    ]);
    frame.render_widget(Paragraph::new(title), header);
    let status = Paragraph::new(Line::from(Span::styled(app.status.label(), status_style)))
        .right_aligned();
    frame.render_widget(status, header);

    // Model bar.
    let model_label = match app.models.get(app.selected_model) {
        Some(model) => model.label(),
        None => "no model".to_string(),
    };
    let model_line = Line::from(vec![
        Span::styled(" model ", Style::default().fg(theme.dim)),
        Span::styled(model_label, Style::default().fg(theme.fg)),
        Span::styled(
            format!(
                "   temp {:.2}   max {}",
                app.settings.temperature, app.settings.max_output_units
            ),
            Style::default().fg(theme.dim),
        ),
    ]);
    frame.render_widget(Paragraph::new(model_line), model_bar);

    draw_prompt(frame, app, prompt_area);
    draw_response(frame, app, response_area);

    // Footer: transient notice, or the key help.
    let footer_text = app.notice.clone().unwrap_or_else(|| {
        " ^Enter send · Esc stop · Tab model · ^R models · ^T templates · ^H history · ^S settings · ^Y copy · ^L clear · ^C quit".to_string()
    });
    frame.render_widget(
        Paragraph::new(Span::styled(footer_text, Style::default().fg(theme.dim))),
        footer,
    );

    match &app.overlay {
        Overlay::None => {}
        Overlay::Settings(form) => draw_settings(frame, app, form.selected, &form.draft),
        Overlay::Templates { items, selected } => {
            let rows: Vec<ListItem> = items
                .iter()
                .map(|t| ListItem::new(t.name.clone()))
                .collect();
            draw_picker(
                frame,
                app,
                "templates (Enter apply · n save prompt · d delete · Esc close)",
                rows,
                *selected,
            );
        }
        Overlay::History { items, selected } => {
            let rows: Vec<ListItem> = items
                .iter()
                .map(|r| {
                    let when = chrono::DateTime::from_timestamp(r.created_at, 0)
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "-".to_string());
                    let preview: String = r.prompt.chars().take(40).collect();
                    ListItem::new(format!("{when}  {}  {preview}", r.model))
                })
                .collect();
            draw_picker(
                frame,
                app,
                "history (Enter load · x clear all · Esc close)",
                rows,
                *selected,
            );
        }
    }
}

fn draw_prompt(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let theme = app.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.dim))
        .title(Span::styled(" prompt ", Style::default().fg(theme.fg)))
        .title_bottom(
            Line::from(Span::styled(
                format!(" {} chars ", app.prompt.char_count()),
                Style::default().fg(theme.dim),
            ))
            .right_aligned(),
        );
    let inner = block.inner(area);
    let editor = Paragraph::new(app.prompt.text.as_str())
        .style(Style::default().fg(theme.fg))
        .block(block);
    frame.render_widget(editor, area);

    // Place the terminal cursor only while the main view has input focus.
    if matches!(app.overlay, Overlay::None) {
        let (row, col) = app.prompt.cursor_position();
        let x = inner.x + col.min(inner.width.saturating_sub(1));
        let y = inner.y + row.min(inner.height.saturating_sub(1));
        frame.set_cursor_position((x, y));
    }
}

fn draw_response(frame: &mut Frame<'_>, app: &mut App, area: Rect) {
    let theme = app.theme;
    let metrics = &app.metrics;
    let rate = metrics
        .rate_per_second
        .map(|r| format!("{r} tok/s"))
        .unwrap_or_else(|| "- tok/s".to_string());
    let stats = format!(
        " {} tok · {rate} · {}ms ",
        metrics.unit_count, metrics.elapsed_ms
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.dim))
        .title(Span::styled(" response ", Style::default().fg(theme.fg)))
        .title_bottom(
            Line::from(Span::styled(stats, Style::default().fg(theme.dim))).right_aligned(),
        );
    let inner = block.inner(area);

    let text = if app.response.is_empty() && !app.is_generating() {
        Span::styled(
            "enter a prompt and press Ctrl+Enter",
            Style::default().fg(theme.dim),
        )
        .into()
    } else {
        ratatui::text::Text::raw(app.response.as_str())
    };

    let paragraph = Paragraph::new(text)
        .style(Style::default().fg(theme.fg))
        .wrap(Wrap { trim: false });

    // Pin to the bottom while following the stream; otherwise clamp the
    // manual scroll to the rendered height.
    let total_lines = paragraph.line_count(inner.width) as u16;
    let max_scroll = total_lines.saturating_sub(inner.height);
    if app.follow {
        app.scroll = max_scroll;
    } else {
        app.scroll = app.scroll.min(max_scroll);
    }

    frame.render_widget(paragraph.block(block).scroll((app.scroll, 0)), area);
}

fn draw_settings(frame: &mut Frame<'_>, app: &App, selected: usize, draft: &promptbench_storage::Settings) {
    let theme = app.theme;
    let area = centered_rect(frame.area(), 60, 11);
    frame.render_widget(Clear, area);

    let rows: Vec<Line> = SettingsField::ALL
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let label = match field {
                SettingsField::ServerUrl => format!("server url    {}", draft.server_url),
                SettingsField::Temperature => format!("temperature   {:.2}", draft.temperature),
                SettingsField::MaxTokens => format!("max tokens    {}", draft.max_output_units),
                SettingsField::AutoSave => format!(
                    "auto-save     {}",
                    if draft.auto_save_history { "on" } else { "off" }
                ),
                SettingsField::Theme => format!("theme         {:?}", draft.theme).to_lowercase(),
            };
            if i == selected {
                Line::from(Span::styled(
                    format!("> {label}"),
                    Style::default().fg(theme.accent).bg(theme.highlight_bg),
                ))
            } else {
                Line::from(Span::styled(
                    format!("  {label}"),
                    Style::default().fg(theme.fg),
                ))
            }
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.accent))
        .title(" settings (Enter save · ^R defaults · Esc cancel) ");
    frame.render_widget(Paragraph::new(rows).block(block), area);
}

fn draw_picker(frame: &mut Frame<'_>, app: &App, title: &str, rows: Vec<ListItem>, selected: usize) {
    let theme = app.theme;
    let area = centered_rect(frame.area(), 70, 16);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.accent))
        .title(format!(" {title} "));

    if rows.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled("nothing here yet", Style::default().fg(theme.dim)))
                .block(block),
            area,
        );
        return;
    }

    let list = List::new(rows)
        .block(block)
        .style(Style::default().fg(theme.fg))
        .highlight_style(
            Style::default()
                .fg(theme.accent)
                .bg(theme.highlight_bg)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(selected));
    frame.render_stateful_widget(list, area, &mut state);
}

/// Center a fixed-size rect inside `area`.
fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
