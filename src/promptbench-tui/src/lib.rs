//! Promptbench terminal user interface.
//!
//! The event loop owns the [`app::App`] state and multiplexes three sources:
//! terminal input, background events from generation/model tasks, and a
//! repaint tick. Generation itself runs in spawned tasks and reports back
//! over a channel; nothing in the engine ever calls into rendering code.

pub mod app;
pub mod events;
pub mod theme;
pub mod ui;

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyEventKind,
};
use crossterm::execute;
use futures::StreamExt;
use tokio::sync::mpsc;

use promptbench_ollama::OllamaClient;
use promptbench_storage::{
    HistoryStore, PromptTemplate, Settings, SettingsStore, TemplateStore,
};

use app::App;

/// Starter templates written on first run, when the template store is empty.
const STARTER_TEMPLATES: [(&str, &str); 3] = [
    ("Quick question", "Hello! What's the weather usually like this time of year?"),
    (
        "Coding help",
        "Show me how to sort a list in Python. Include example code with comments.",
    ),
    (
        "Agent prompt",
        "You are an experienced full-stack software development assistant.\n\n\
         Guidelines:\n\
         1. Give clear, practical solutions\n\
         2. Include commented example code\n\
         3. Mention security and performance considerations\n\
         4. When several approaches exist, compare their trade-offs\n\n\
         Question: What is the best approach to state management in React, by project size?",
    ),
];

/// Run the TUI until the user quits.
pub async fn run(
    client: OllamaClient,
    settings: Settings,
    settings_store: SettingsStore,
    templates: TemplateStore,
    history: HistoryStore,
    preferred_model: Option<String>,
) -> Result<()> {
    seed_templates(&templates).await;

    let mut app = App::new(client, settings, settings_store, templates, history);
    app.preferred_model = preferred_model;

    let mut terminal = ratatui::init();
    let _ = execute!(std::io::stdout(), EnableBracketedPaste);
    let result = event_loop(&mut terminal, app).await;
    let _ = execute!(std::io::stdout(), DisableBracketedPaste);
    ratatui::restore();
    result
}

async fn event_loop(terminal: &mut ratatui::DefaultTerminal, mut app: App) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    app.refresh_models(&tx);

    let mut input = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(250));

    loop {
        terminal.draw(|frame| ui::draw(frame, &mut app))?;

        tokio::select! {
            event = input.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key, &tx).await;
                }
                Some(Ok(Event::Paste(text))) => app.paste(&text),
                Some(Err(e)) => return Err(e.into()),
                // Resize and the rest just trigger the redraw above.
                Some(Ok(_)) => {}
                None => break,
            },
            Some(event) = rx.recv() => app.handle_ui_event(event).await,
            _ = tick.tick() => {}
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Populate the template store with a few examples on first run.
async fn seed_templates(templates: &TemplateStore) {
    match templates.list().await {
        Ok(existing) if existing.is_empty() => {
            for (name, prompt) in STARTER_TEMPLATES {
                if let Err(e) = templates.save(&PromptTemplate::new(name, prompt)).await {
                    tracing::warn!(error = %e, "failed to seed starter template");
                    break;
                }
            }
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "could not inspect template store"),
    }
}
