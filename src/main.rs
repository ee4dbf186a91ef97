use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use visit_sim::config::{EngineConfig, ServerConfig};
use visit_sim::engine::{TaskProcessor, TaskScheduler};
use visit_sim::random::{RandomSource, ThreadRandom};
use visit_sim::tasks::TaskStore;
use visit_sim::tasks::routes::{TaskApiState, app_router};
use visit_sim::visit::{HttpFetcher, VisitSimulator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let server_config = ServerConfig::from_env()?;

    // ── Tracing ──────────────────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (file_layer, _log_guard) = match &server_config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "visit-sim.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    let engine_config = EngineConfig::from_env()?;

    eprintln!("🚦 Visit Sim v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api/tasks", server_config.port);
    eprintln!(
        "   Poll interval: {}s, error threshold: {}",
        engine_config.poll_interval.as_secs(),
        engine_config.max_errors
    );
    if let Some(dir) = &server_config.log_dir {
        eprintln!("   Log dir: {}", dir.display());
    }

    // ── Engine ───────────────────────────────────────────────────────────
    let store = TaskStore::new();
    let rng: Arc<dyn RandomSource> = Arc::new(ThreadRandom);
    let fetcher = Arc::new(HttpFetcher::new(&engine_config, Arc::clone(&rng))?);
    let simulator = Arc::new(VisitSimulator::new(fetcher, Arc::clone(&rng), &engine_config));
    let processor = Arc::new(TaskProcessor::new(
        Arc::clone(&store),
        simulator,
        rng,
        &engine_config,
    ));
    let scheduler = TaskScheduler::new(Arc::clone(&store), processor, engine_config.poll_interval);
    let scheduler_handle = Arc::clone(&scheduler).spawn();

    // ── HTTP ─────────────────────────────────────────────────────────────
    let app = app_router(TaskApiState {
        store,
        scheduler: Some(scheduler),
    });
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", server_config.port))
        .await
        .with_context(|| format!("failed to bind port {}", server_config.port))?;
    tracing::info!(port = server_config.port, "HTTP server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown requested");
        })
        .await?;

    // In-memory tasks do not survive the process.
    scheduler_handle.abort();
    Ok(())
}
