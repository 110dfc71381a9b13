use anyhow::Context;
use clap::Parser;
use fleet_gateway::{build_state, config::GatewayConfig, router};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,fleet_gateway=debug")),
        )
        .init();

    let cfg = GatewayConfig::parse();
    let addr: SocketAddr = cfg.bind.parse().context("parse bind addr")?;

    let state = build_state(&cfg).context("build state")?;
    tracing::info!(apps = ?state.pool.app_ids(), "workers registered");
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind tcp listener")?;
    let local = listener.local_addr().context("read local addr")?;
    tracing::info!(addr = %local, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .context("serve gateway")?;
    Ok(())
}
