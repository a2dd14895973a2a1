use std::path::PathBuf;

use anyhow::Context;
use beeish_wallet_lib::app_state::AppContext;
use beeish_wallet_lib::security::SecurityConfig;
use beeish_wallet_lib::server::{create_router, ServerState};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_DATA_DIR: &str = ".beeish";

fn init_logging(use_json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if use_json {
        let _ = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .json()
            .with_writer(std::io::stderr)
            .try_init();
    } else {
        let _ = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let security = SecurityConfig::from_env().context("invalid server environment")?;
    init_logging(security.log_json());

    let data_dir = security
        .data_dir()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let context = AppContext::initialize(data_dir, security.environment())
        .context("failed to initialize application data")?;

    let state = ServerState::from_context(&context, &security)?;
    let app = create_router(state);

    let addr = security.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("beeish-server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
