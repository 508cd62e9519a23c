mod action;
mod app;
mod component;
mod components;
mod core;
mod engine;
mod mpv;
mod native;
mod page;
mod theme;
mod widgets;

use calico_proto::api::ApiClient;
use calico_proto::config::Config;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = calico_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("calico.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code but suppress noisy
    // connection-level DEBUG from HTTP client internals (hyper_util, reqwest).
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("calico log: {}", log_path.display());

    tracing::info!("calico starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("config: {}, using defaults", e);
            Config::default()
        }
    };
    calico_proto::platform::set_use_system_deps(config.player.use_system_deps);

    let api = ApiClient::new(config.ratings.api_base.clone())?;

    // ── PlayerEvent channel (TUI → PlayerCore) ───────────────────────────────
    let (event_tx, event_rx) = mpsc::channel::<core::PlayerEvent>(1024);

    let (player_core, state_rx) = core::PlayerCore::new(
        config,
        api,
        Box::new(mpv::MpvEngine::new()),
        Box::new(native::NativeSink::new()),
        event_tx.clone(),
    );

    let core_task = tokio::spawn(async move {
        if let Err(e) = player_core.run(event_rx).await {
            tracing::error!("PlayerCore exited with error: {}", e);
        }
    });

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let shutdown_tx = event_tx.clone();
    let result = app::App::new(event_tx, state_rx).run().await;

    // Already sent on a normal quit; needed when the UI failed.
    let _ = shutdown_tx.send(core::PlayerEvent::Shutdown).await;
    if let Err(e) = core_task.await {
        tracing::error!("PlayerCore task failed: {}", e);
    }
    tracing::info!("calico stopped");
    result
}
