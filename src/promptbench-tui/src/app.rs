//! Application state and input handling.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use unicode_width::UnicodeWidthStr;

use promptbench_engine::{GenerationRequest, SessionMetrics, SessionOutcome, SessionState};
use promptbench_ollama::{ModelSummary, OllamaClient};
use promptbench_storage::{
    HistoryStore, PromptTemplate, SessionRecord, Settings, SettingsStore, TemplateStore,
};

use crate::events::{SessionEvent, UiEvent, spawn_generation, spawn_model_refresh};
use crate::theme::Theme;

/// Output-cap presets cycled in the settings form.
pub const MAX_TOKEN_PRESETS: [u32; 4] = [1024, 4096, 16_384, 32_768];

/// Temperature step used by the settings form.
const TEMPERATURE_STEP: f32 = 0.05;

/// What the status line says.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Ready,
    LoadingModels,
    Generating,
    Complete,
    Stopped,
    Error(String),
}

impl Status {
    pub fn label(&self) -> String {
        match self {
            Self::Ready => "ready".to_string(),
            Self::LoadingModels => "loading models...".to_string(),
            Self::Generating => "generating...".to_string(),
            Self::Complete => "complete".to_string(),
            Self::Stopped => "stopped".to_string(),
            Self::Error(message) => format!("error: {message}"),
        }
    }
}

/// Fields of the settings form, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    ServerUrl,
    Temperature,
    MaxTokens,
    AutoSave,
    Theme,
}

impl SettingsField {
    pub const ALL: [SettingsField; 5] = [
        Self::ServerUrl,
        Self::Temperature,
        Self::MaxTokens,
        Self::AutoSave,
        Self::Theme,
    ];
}

/// In-progress edit of the settings; applied on Enter, discarded on Esc.
#[derive(Debug, Clone)]
pub struct SettingsForm {
    pub draft: Settings,
    pub selected: usize,
}

/// Modal overlay on top of the main view.
pub enum Overlay {
    None,
    Settings(SettingsForm),
    Templates {
        items: Vec<PromptTemplate>,
        selected: usize,
    },
    History {
        items: Vec<SessionRecord>,
        selected: usize,
    },
}

/// Minimal multi-line prompt editor: text plus a byte cursor kept on a char
/// boundary.
#[derive(Debug, Default)]
pub struct PromptEditor {
    pub text: String,
    pub cursor: usize,
}

impl PromptEditor {
    pub fn insert(&mut self, c: char) {
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn insert_str(&mut self, s: &str) {
        self.text.insert_str(self.cursor, s);
        self.cursor += s.len();
    }

    pub fn backspace(&mut self) {
        if let Some((idx, _)) = self.text[..self.cursor].char_indices().next_back() {
            self.text.remove(idx);
            self.cursor = idx;
        }
    }

    pub fn left(&mut self) {
        if let Some((idx, _)) = self.text[..self.cursor].char_indices().next_back() {
            self.cursor = idx;
        }
    }

    pub fn right(&mut self) {
        if let Some(c) = self.text[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = self.text.len();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Cursor position as (row, column width) for terminal placement.
    pub fn cursor_position(&self) -> (u16, u16) {
        let before = &self.text[..self.cursor];
        let row = before.matches('\n').count() as u16;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let col = before[line_start..].width() as u16;
        (row, col)
    }
}

/// Top-level application state, owned by the event loop.
pub struct App {
    pub client: OllamaClient,
    pub settings: Settings,
    pub settings_store: SettingsStore,
    pub templates: TemplateStore,
    pub history: HistoryStore,

    pub models: Vec<ModelSummary>,
    pub selected_model: usize,
    pub prompt: PromptEditor,
    pub response: String,
    pub metrics: SessionMetrics,
    pub status: Status,
    pub overlay: Overlay,
    pub theme: Theme,

    /// Response pane scroll offset; `follow` keeps it pinned to the bottom
    /// while new text streams in.
    pub scroll: u16,
    pub follow: bool,

    /// Transient one-line message shown in the footer.
    pub notice: Option<String>,

    /// Model name to select once the model list arrives (from `--model`).
    pub preferred_model: Option<String>,

    cancel: Option<CancellationToken>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        client: OllamaClient,
        settings: Settings,
        settings_store: SettingsStore,
        templates: TemplateStore,
        history: HistoryStore,
    ) -> Self {
        let theme = Theme::from_preference(settings.theme);
        Self {
            client,
            settings,
            settings_store,
            templates,
            history,
            models: Vec::new(),
            selected_model: 0,
            prompt: PromptEditor::default(),
            response: String::new(),
            metrics: SessionMetrics::default(),
            status: Status::Ready,
            overlay: Overlay::None,
            theme,
            scroll: 0,
            follow: true,
            notice: None,
            preferred_model: None,
            cancel: None,
            should_quit: false,
        }
    }

    pub fn is_generating(&self) -> bool {
        self.cancel.is_some()
    }

    pub fn selected_model_name(&self) -> Option<&str> {
        self.models.get(self.selected_model).map(|m| m.name.as_str())
    }

    pub fn refresh_models(&mut self, tx: &UnboundedSender<UiEvent>) {
        self.status = Status::LoadingModels;
        spawn_model_refresh(self.client.clone(), tx.clone());
    }

    // ------------------------------------------------------------------
    // Background events
    // ------------------------------------------------------------------

    pub async fn handle_ui_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::ModelsLoaded(Ok(models)) => {
                self.selected_model = self.selected_model.min(models.len().saturating_sub(1));
                if let Some(preferred) = self.preferred_model.take()
                    && let Some(idx) = models.iter().position(|m| m.name == preferred)
                {
                    self.selected_model = idx;
                }
                if models.is_empty() {
                    self.notice = Some("no models installed on the server".to_string());
                }
                self.models = models;
                if !self.is_generating() {
                    self.status = Status::Ready;
                }
            }
            UiEvent::ModelsLoaded(Err(e)) => {
                self.models.clear();
                self.status = Status::Error(e.to_string());
            }
            UiEvent::Session(event) => self.handle_session_event(event).await,
        }
    }

    async fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Update { delta, metrics } => {
                self.response.push_str(&delta);
                self.metrics = metrics;
                self.follow = true;
            }
            SessionEvent::Finished(outcome) => self.finish_generation(*outcome).await,
        }
    }

    async fn finish_generation(&mut self, outcome: SessionOutcome) {
        self.cancel = None;
        self.metrics = outcome.metrics;
        // The accumulated text is authoritative; per-update deltas add up to
        // the same string, this just makes it exact.
        self.response = outcome.text;

        match outcome.state {
            SessionState::Completed => {
                self.status = Status::Complete;
                if self.settings.auto_save_history && !self.response.is_empty() {
                    self.save_history_record().await;
                }
            }
            SessionState::Aborted => self.status = Status::Stopped,
            _ => {
                let message = outcome
                    .error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "generation failed".to_string());
                self.status = Status::Error(message);
            }
        }
    }

    async fn save_history_record(&mut self) {
        let record = SessionRecord::new(
            self.selected_model_name().unwrap_or_default(),
            self.prompt.text.clone(),
            self.settings.temperature,
            self.response.clone(),
            self.metrics.elapsed_ms,
            self.metrics.unit_count,
            self.metrics.rate_per_second,
        );
        if let Err(e) = self.history.append(&record).await {
            tracing::warn!(error = %e, "failed to save history record");
            self.notice = Some("could not save run to history".to_string());
        }
    }

    // ------------------------------------------------------------------
    // Key handling
    // ------------------------------------------------------------------

    pub async fn handle_key(&mut self, key: KeyEvent, tx: &UnboundedSender<UiEvent>) {
        self.notice = None;
        match &mut self.overlay {
            Overlay::None => self.handle_main_key(key, tx).await,
            Overlay::Settings(_) => self.handle_settings_key(key, tx),
            Overlay::Templates { .. } => self.handle_templates_key(key).await,
            Overlay::History { .. } => self.handle_history_key(key).await,
        }
    }

    async fn handle_main_key(&mut self, key: KeyEvent, tx: &UnboundedSender<UiEvent>) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match (key.code, ctrl) {
            (KeyCode::Char('c'), true) | (KeyCode::Char('q'), true) => {
                self.cancel_generation();
                self.should_quit = true;
            }
            (KeyCode::Enter, true) => self.send_prompt(tx),
            (KeyCode::Esc, false) => {
                if self.is_generating() {
                    self.cancel_generation();
                }
            }
            (KeyCode::Char('r'), true) => self.refresh_models(tx),
            (KeyCode::Char('y'), true) => self.copy_response(),
            (KeyCode::Char('l'), true) => self.clear_response(),
            (KeyCode::Char('u'), true) => self.prompt.clear(),
            (KeyCode::Char('t'), true) => self.open_templates().await,
            (KeyCode::Char('h'), true) => self.open_history().await,
            (KeyCode::Char('s'), true) => self.open_settings(),
            (KeyCode::Tab, _) => self.cycle_model(1),
            (KeyCode::BackTab, _) => self.cycle_model(-1),
            (KeyCode::PageUp, _) => {
                self.follow = false;
                self.scroll = self.scroll.saturating_sub(5);
            }
            (KeyCode::PageDown, _) => self.scroll = self.scroll.saturating_add(5),
            (KeyCode::End, false) => self.follow = true,
            // Prompt editing
            (KeyCode::Enter, false) => self.prompt.insert('\n'),
            (KeyCode::Backspace, _) => self.prompt.backspace(),
            (KeyCode::Left, _) => self.prompt.left(),
            (KeyCode::Right, _) => self.prompt.right(),
            (KeyCode::Char(c), false) => self.prompt.insert(c),
            _ => {}
        }
    }

    pub fn paste(&mut self, text: &str) {
        if matches!(self.overlay, Overlay::None) {
            self.prompt.insert_str(text);
        }
    }

    fn send_prompt(&mut self, tx: &UnboundedSender<UiEvent>) {
        if self.is_generating() {
            self.notice = Some("a generation is already running".to_string());
            return;
        }

        let request = GenerationRequest::new(
            self.selected_model_name().unwrap_or_default(),
            self.prompt.text.clone(),
        )
        .with_temperature(self.settings.temperature)
        .with_max_output_units(self.settings.max_output_units);

        match spawn_generation(self.client.clone(), request, tx.clone()) {
            Ok(token) => {
                self.cancel = Some(token);
                self.response.clear();
                self.metrics = SessionMetrics::default();
                self.scroll = 0;
                self.follow = true;
                self.status = Status::Generating;
            }
            Err(e) => self.status = Status::Error(e.to_string()),
        }
    }

    fn cancel_generation(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
            // The terminal event with the preserved partial output follows
            // from the session task.
        }
    }

    fn cycle_model(&mut self, step: isize) {
        if self.models.is_empty() {
            return;
        }
        let len = self.models.len() as isize;
        let next = (self.selected_model as isize + step).rem_euclid(len);
        self.selected_model = next as usize;
    }

    fn clear_response(&mut self) {
        self.response.clear();
        self.metrics = SessionMetrics::default();
        self.scroll = 0;
        if !self.is_generating() {
            self.status = Status::Ready;
        }
    }

    fn copy_response(&mut self) {
        if self.response.is_empty() {
            self.notice = Some("nothing to copy".to_string());
            return;
        }
        match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(self.response.clone())) {
            Ok(()) => self.notice = Some("response copied to clipboard".to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "clipboard copy failed");
                self.notice = Some("could not access the clipboard".to_string());
            }
        }
    }

    // ------------------------------------------------------------------
    // Settings overlay
    // ------------------------------------------------------------------

    fn open_settings(&mut self) {
        self.overlay = Overlay::Settings(SettingsForm {
            draft: self.settings.clone(),
            selected: 0,
        });
    }

    fn handle_settings_key(&mut self, key: KeyEvent, tx: &UnboundedSender<UiEvent>) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let Overlay::Settings(form) = &mut self.overlay else {
            return;
        };
        let field = SettingsField::ALL[form.selected];

        match (key.code, ctrl) {
            (KeyCode::Esc, _) => self.overlay = Overlay::None,
            (KeyCode::Enter, _) => self.apply_settings(tx),
            (KeyCode::Char('r'), true) => {
                form.draft = Settings::default();
            }
            (KeyCode::Up, _) => {
                form.selected = form.selected.checked_sub(1).unwrap_or(SettingsField::ALL.len() - 1)
            }
            (KeyCode::Down, _) => form.selected = (form.selected + 1) % SettingsField::ALL.len(),
            (KeyCode::Left, _) | (KeyCode::Right, _) | (KeyCode::Char(' '), false) => {
                let forward = !matches!(key.code, KeyCode::Left);
                Self::adjust_settings_field(&mut form.draft, field, forward);
            }
            (KeyCode::Backspace, _) => {
                if field == SettingsField::ServerUrl {
                    form.draft.server_url.pop();
                }
            }
            (KeyCode::Char(c), false) => {
                if field == SettingsField::ServerUrl {
                    form.draft.server_url.push(c);
                }
            }
            _ => {}
        }
    }

    fn adjust_settings_field(draft: &mut Settings, field: SettingsField, forward: bool) {
        match field {
            SettingsField::ServerUrl => {}
            SettingsField::Temperature => {
                let step = if forward {
                    TEMPERATURE_STEP
                } else {
                    -TEMPERATURE_STEP
                };
                draft.temperature = (draft.temperature + step).clamp(0.0, 2.0);
                // Keep the value on a clean step boundary.
                draft.temperature = (draft.temperature / TEMPERATURE_STEP).round() * TEMPERATURE_STEP;
            }
            SettingsField::MaxTokens => {
                let idx = MAX_TOKEN_PRESETS
                    .iter()
                    .position(|&p| p == draft.max_output_units)
                    .unwrap_or(MAX_TOKEN_PRESETS.len() - 1);
                let len = MAX_TOKEN_PRESETS.len() as isize;
                let step = if forward { 1 } else { -1 };
                let next = (idx as isize + step).rem_euclid(len) as usize;
                draft.max_output_units = MAX_TOKEN_PRESETS[next];
            }
            SettingsField::AutoSave => draft.auto_save_history = !draft.auto_save_history,
            SettingsField::Theme => draft.theme = draft.theme.toggled(),
        }
    }

    fn apply_settings(&mut self, tx: &UnboundedSender<UiEvent>) {
        let Overlay::Settings(form) = std::mem::replace(&mut self.overlay, Overlay::None) else {
            return;
        };

        let server_changed = form.draft.server_url != self.settings.server_url;
        self.settings = form.draft;
        self.theme = Theme::from_preference(self.settings.theme);

        if let Err(e) = self.settings_store.save(&self.settings) {
            tracing::warn!(error = %e, "failed to save settings");
            self.notice = Some("could not save settings".to_string());
        }

        if server_changed {
            self.client = OllamaClient::new(self.settings.server_url.clone());
            self.refresh_models(tx);
        }
    }

    // ------------------------------------------------------------------
    // Templates overlay
    // ------------------------------------------------------------------

    async fn open_templates(&mut self) {
        match self.templates.list().await {
            Ok(items) => {
                self.overlay = Overlay::Templates { items, selected: 0 };
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to list templates");
                self.notice = Some("could not load templates".to_string());
            }
        }
    }

    async fn handle_templates_key(&mut self, key: KeyEvent) {
        let Overlay::Templates { items, selected } = &mut self.overlay else {
            return;
        };

        match key.code {
            KeyCode::Esc => self.overlay = Overlay::None,
            KeyCode::Up => *selected = selected.saturating_sub(1),
            KeyCode::Down => {
                if !items.is_empty() {
                    *selected = (*selected + 1).min(items.len() - 1);
                }
            }
            KeyCode::Enter => {
                if let Some(template) = items.get(*selected) {
                    self.prompt.set_text(template.prompt.clone());
                    self.overlay = Overlay::None;
                }
            }
            KeyCode::Char('d') => {
                if !items.is_empty() {
                    let removed = items.remove(*selected);
                    *selected = (*selected).min(items.len().saturating_sub(1));
                    if let Err(e) = self.templates.delete(&removed.id).await {
                        tracing::warn!(error = %e, "failed to delete template");
                        self.notice = Some("could not delete template".to_string());
                    }
                }
            }
            KeyCode::Char('n') => self.save_prompt_as_template().await,
            _ => {}
        }
    }

    async fn save_prompt_as_template(&mut self) {
        let prompt = self.prompt.text.trim();
        if prompt.is_empty() {
            self.notice = Some("prompt is empty, nothing to save".to_string());
            return;
        }

        let name: String = prompt.chars().take(24).collect::<String>().replace('\n', " ");
        let template = PromptTemplate::new(name, prompt);
        match self.templates.save(&template).await {
            Ok(()) => {
                if let Overlay::Templates { items, .. } = &mut self.overlay {
                    items.insert(0, template);
                }
                self.notice = Some("template saved".to_string());
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to save template");
                self.notice = Some("could not save template".to_string());
            }
        }
    }

    // ------------------------------------------------------------------
    // History overlay
    // ------------------------------------------------------------------

    async fn open_history(&mut self) {
        match self.history.list().await {
            Ok(items) => {
                self.overlay = Overlay::History { items, selected: 0 };
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to list history");
                self.notice = Some("could not load history".to_string());
            }
        }
    }

    async fn handle_history_key(&mut self, key: KeyEvent) {
        let Overlay::History { items, selected } = &mut self.overlay else {
            return;
        };

        match key.code {
            KeyCode::Esc => self.overlay = Overlay::None,
            KeyCode::Up => *selected = selected.saturating_sub(1),
            KeyCode::Down => {
                if !items.is_empty() {
                    *selected = (*selected + 1).min(items.len() - 1);
                }
            }
            KeyCode::Enter => {
                if let Some(record) = items.get(*selected) {
                    self.prompt.set_text(record.prompt.clone());
                    self.response = record.response.clone();
                    self.metrics = SessionMetrics {
                        elapsed_ms: record.elapsed_ms,
                        unit_count: record.unit_count,
                        rate_per_second: record.rate_per_second,
                        first_unit_ms: None,
                    };
                    self.status = Status::Complete;
                    self.scroll = 0;
                    self.follow = false;
                    self.overlay = Overlay::None;
                }
            }
            KeyCode::Char('x') => {
                if let Err(e) = self.history.clear().await {
                    tracing::warn!(error = %e, "failed to clear history");
                    self.notice = Some("could not clear history".to_string());
                } else {
                    items.clear();
                    *selected = 0;
                    self.notice = Some("history cleared".to_string());
                }
            }
            _ => {}
        }
    }
}
