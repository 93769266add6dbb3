//! Review Sentiment Service: binary entrypoint.
//! Boots the Axum HTTP server the browser extension talks to.

use std::net::SocketAddr;

use review_sentiment_analyzer::{api, metrics::Metrics, AppState};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const ENV_BIND_ADDR: &str = "REVIEW_BIND_ADDR";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";

/// `RUST_LOG` wins; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("review_sentiment_analyzer=info,review=info,warn"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; missing file is fine.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = Metrics::install()?;
    let state = AppState::from_env()?;
    let cfg = state.analyzer().config().clone();
    info!(
        comparative = ?cfg.aggregate.comparative,
        locale = ?cfg.summary.locale,
        chunk_size = cfg.batch.chunk_size,
        "scoring config loaded"
    );

    let app = api::router(state).merge(metrics.router());

    let addr: SocketAddr = std::env::var(ENV_BIND_ADDR)
        .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
        .parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
