//! Promptbench - main entry point.
//!
//! Wires settings, storage, the Ollama client and the TUI together. Logging
//! goes to a file under the data directory so the terminal stays free for
//! the interface.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use promptbench_ollama::OllamaClient;
use promptbench_storage::{HistoryStore, PromptbenchPaths, SettingsStore, TemplateStore};

#[derive(Parser)]
#[command(
    name = "promptbench",
    version,
    about = "Interactive prompt testing against a local Ollama server"
)]
struct Cli {
    /// Server URL, overriding the saved setting (e.g. http://localhost:11434).
    #[arg(long, env = "PROMPTBENCH_SERVER_URL")]
    server_url: Option<String>,

    /// Model to select once the model list has loaded.
    #[arg(long, short)]
    model: Option<String>,

    /// Store settings, templates and history under this directory.
    #[arg(long, env = "PROMPTBENCH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log filter, e.g. "info" or "promptbench_engine=debug".
    #[arg(long, default_value = "info", env = "PROMPTBENCH_LOG")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = match cli.data_dir {
        Some(root) => PromptbenchPaths::from_root(root),
        None => PromptbenchPaths::new().context("could not determine storage directories")?,
    };
    paths.ensure_dirs().context("could not create storage directories")?;

    let _log_guard = init_logging(&paths, &cli.log_level);

    let settings_store = SettingsStore::new(&paths);
    let mut settings = settings_store.load();
    if let Some(url) = cli.server_url {
        settings.server_url = url;
    }

    tracing::info!(server_url = %settings.server_url, "starting promptbench");

    let client = OllamaClient::new(settings.server_url.clone());
    let templates = TemplateStore::new(paths.clone());
    let history = HistoryStore::new(paths.clone());

    promptbench_tui::run(
        client,
        settings,
        settings_store,
        templates,
        history,
        cli.model,
    )
    .await
}

/// Set up file logging; the returned guard flushes on drop.
fn init_logging(
    paths: &PromptbenchPaths,
    filter: &str,
) -> tracing_appender::non_blocking::WorkerGuard {
    let appender = tracing_appender::rolling::daily(&paths.logs_dir, "promptbench.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = tracing_subscriber::EnvFilter::try_new(filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}
