//! Fleet gateway.
//!
//! Exposes every registered worker's consensus-engine RPC under `/{app_id}/...` and folds the RPC
//! outcome taxonomy into plain-text HTTP responses.

use crate::config::GatewayConfig;
use crate::dispatch::DispatchGateway;
use crate::log::TracingDispatchLog;
use anyhow::Context;
use axum::Router;
use fleet_core::rpc::HttpRpcClient;
use fleet_core::{Worker, WorkerPool};
use std::{sync::Arc, time::Duration};

pub mod config;
pub mod dispatch;
pub mod log;
pub mod routes;

#[derive(Clone, Debug)]
pub struct AppState {
    pub pool: Arc<WorkerPool>,
    pub gateway: Arc<DispatchGateway>,
}

impl AppState {
    /// Gateway over `pool`, logging through `tracing`.
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        let gateway = DispatchGateway::new(pool.clone(), Arc::new(TracingDispatchLog));
        Self {
            pool,
            gateway: Arc::new(gateway),
        }
    }
}

pub fn build_state(cfg: &GatewayConfig) -> anyhow::Result<AppState> {
    let timeout = Duration::from_millis(cfg.rpc_timeout_ms);
    let pool = Arc::new(WorkerPool::new());

    for spec in &cfg.workers {
        let rpc = HttpRpcClient::new(&spec.rpc_url, timeout)
            .with_context(|| format!("init rpc client for worker {spec}"))?;
        let worker = Worker::new(spec.app_id, spec.p2p_port, Arc::new(rpc))?;
        if pool.register(worker).is_some() {
            anyhow::bail!("duplicate worker registration for app {}", spec.app_id);
        }
    }

    Ok(AppState::new(pool))
}

pub fn router(state: AppState) -> Router {
    routes::routes().with_state(state.gateway)
}
