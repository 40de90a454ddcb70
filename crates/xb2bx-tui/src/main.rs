// XB2BX terminal client entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open the session store and restore any saved login
// 4. Build the API client and the AI layer
// 5. Create channels
// 6. Spawn the preview feed (if enabled)
// 7. Spawn the app loop
// 8. Run the TUI until the user quits
// 9. Cleanup on exit

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

use xb2bx_api::ApiClient;
use xb2bx_app::app::{self, AppState};
use xb2bx_app::preview::{self, PreviewFrame};
use xb2bx_core::config;
use xb2bx_core::session::SessionStore;
use xb2bx_core::store::SqliteStore;
use xb2bx_llm::{LlmClient, MarketIntel};
use xb2bx_tui::tui;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("XB2BX client starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!("Config loaded: api={}", config.api.base_url);

    let db_path = config
        .session_db_path()
        .context("failed to resolve session database path")?;
    let store = SqliteStore::open_or_recover(&db_path);
    info!("Session store ready at {}", db_path);

    let session = SessionStore::bootstrap(store);
    match session.current_user() {
        Some(user) => info!("Restored session for user {}", user.id),
        None => info!("No saved session"),
    }

    let api = Arc::new(ApiClient::new(&config.api.base_url));

    let llm_client = LlmClient::from_config(&config);
    if llm_client.is_active() {
        info!("AI client initialized (API key configured)");
    } else {
        info!("AI client disabled (no API key)");
    }
    let intel = Arc::new(MarketIntel::new(Arc::new(llm_client), &config.llm));

    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (event_tx, event_rx) = mpsc::channel(256);
    let (ui_tx, ui_rx) = mpsc::channel(256);
    let (preview_tx, preview_rx) = watch::channel(PreviewFrame::default());

    let preview_handle = if config.preview.enabled {
        let host = config.preview.host.clone();
        let port = config.preview.port;
        Some(tokio::spawn(async move {
            if let Err(e) = preview::run(&host, port, preview_rx).await {
                error!("Preview feed error on {}:{}: {}", host, port, e);
            }
        }))
    } else {
        drop(preview_rx);
        None
    };

    let app_state = AppState::new(config, session, api, intel, event_tx, preview_tx);

    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, event_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    info!("Application ready");

    // Blocks until the user quits.
    if let Err(e) = tui::run(ui_rx, cmd_tx).await {
        error!("TUI error: {}", e);
    }

    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    // The preview listener loops forever.
    if let Some(handle) = preview_handle {
        handle.abort();
    }

    info!("XB2BX client shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (not the terminal, which is used by the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("xb2bx.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("xb2bx=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
