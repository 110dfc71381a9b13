//! HTTP route table: parameter extraction in front of [`DispatchGateway`].

use crate::dispatch::{DispatchGateway, DispatchResult, RpcOperation};
use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    routing::{get, post},
    Router,
};
use fleet_core::{AppId, DEFAULT_RPC_ID};
use serde::Deserialize;
use std::sync::Arc;

/// `{app_id}` path segment.
///
/// Anything but a plain decimal `u64` is rejected with the router's bare 404, so malformed,
/// negative or overflowing ids never reach the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppIdPath(pub AppId);

#[async_trait]
impl<S> FromRequestParts<S> for AppIdPath
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| StatusCode::NOT_FOUND)?;
        parse_app_id(&raw).map(Self).ok_or(StatusCode::NOT_FOUND)
    }
}

fn parse_app_id(raw: &str) -> Option<AppId> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn default_rpc_id() -> String {
    DEFAULT_RPC_ID.to_string()
}

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    pub path: String,
    #[serde(default)]
    pub data: String,
    #[serde(default = "default_rpc_id")]
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct TxParams {
    #[serde(default = "default_rpc_id")]
    pub id: String,
}

pub fn routes() -> Router<Arc<DispatchGateway>> {
    Router::new()
        .route("/:app_id/query", get(query))
        .route("/:app_id/status", get(status))
        .route("/:app_id/p2pPort", get(p2p_port))
        .route("/:app_id/tx", post(broadcast_tx))
}

async fn query(
    State(gateway): State<Arc<DispatchGateway>>,
    AppIdPath(app_id): AppIdPath,
    Query(params): Query<QueryParams>,
) -> DispatchResult {
    gateway
        .dispatch_rpc(app_id, RpcOperation::Query, |rpc| async move {
            rpc.query(&params.path, &params.data, &params.id).await
        })
        .await
}

async fn status(
    State(gateway): State<Arc<DispatchGateway>>,
    AppIdPath(app_id): AppIdPath,
) -> DispatchResult {
    gateway
        .dispatch_rpc(app_id, RpcOperation::Status, |rpc| async move {
            rpc.status().await
        })
        .await
}

async fn p2p_port(
    State(gateway): State<Arc<DispatchGateway>>,
    AppIdPath(app_id): AppIdPath,
) -> DispatchResult {
    gateway.dispatch_port_lookup(app_id)
}

async fn broadcast_tx(
    State(gateway): State<Arc<DispatchGateway>>,
    AppIdPath(app_id): AppIdPath,
    Query(params): Query<TxParams>,
    tx: String,
) -> DispatchResult {
    gateway
        .dispatch_rpc(app_id, RpcOperation::BroadcastTx, |rpc| async move {
            rpc.broadcast_tx(&tx, &params.id).await
        })
        .await
}
