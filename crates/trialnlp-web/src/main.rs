//! Clinical Trials NLP Explorer web server
//!
//! Run with: cargo run -p trialnlp-web

use std::net::SocketAddr;

use tracing::info;
use tracing_subscriber::EnvFilter;

use trialnlp_common::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("trialnlp=debug,info")),
        )
        .init();

    info!("Starting Clinical Trials NLP Explorer...");

    let config = Config::load_or_default();
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let state = trialnlp_web::state::AppState::new(config)?;
    info!("NER passes: {}", state.pipeline.pass_names().join(", "));
    let app = trialnlp_web::router::build_router(state);

    info!("Server listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
