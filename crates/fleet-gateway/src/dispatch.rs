//! Worker lookup, RPC invocation and outcome folding.

use crate::log::{DispatchEvent, DispatchLog};
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use fleet_core::{AppId, RpcClient, RpcError, RpcOutcome, WorkerDirectory};
use std::{fmt, future::Future, sync::Arc};

pub const APP_NOT_FOUND: &str = "App not found on the node";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcOperation {
    Query,
    Status,
    BroadcastTx,
    P2pPort,
}

impl RpcOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Status => "status",
            Self::BroadcastTx => "broadcast_tx",
            Self::P2pPort => "p2p_port",
        }
    }
}

/// HTTP-shaped result of one dispatched request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    NotFound,
    Ok(String),
    ServerError(String),
    BadRequest(String),
}

impl IntoResponse for DispatchResult {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Ok(body) => (StatusCode::OK, body),
            Self::NotFound => (StatusCode::NOT_FOUND, APP_NOT_FOUND.to_string()),
            Self::ServerError(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
        };
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}

/// Single choke point between the route table and the worker fleet.
///
/// Holds no per-request state; every call performs a fresh lookup.
#[derive(Clone)]
pub struct DispatchGateway {
    directory: Arc<dyn WorkerDirectory>,
    log: Arc<dyn DispatchLog>,
}

impl fmt::Debug for DispatchGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchGateway")
            .field("directory", &"<WorkerDirectory>")
            .field("log", &"<DispatchLog>")
            .finish()
    }
}

impl DispatchGateway {
    pub fn new(directory: Arc<dyn WorkerDirectory>, log: Arc<dyn DispatchLog>) -> Self {
        Self { directory, log }
    }

    /// Resolve the worker for `app_id` and fold the outcome of `invoke` against its RPC client.
    ///
    /// `invoke` does not run when no worker is registered.
    pub async fn dispatch_rpc<F, Fut>(
        &self,
        app_id: AppId,
        operation: RpcOperation,
        invoke: F,
    ) -> DispatchResult
    where
        F: FnOnce(Arc<dyn RpcClient>) -> Fut,
        Fut: Future<Output = RpcOutcome>,
    {
        let outcome = self
            .directory
            .with_worker(app_id, |worker| async move {
                invoke(worker.rpc_client()).await
            })
            .await;

        match outcome {
            Some(outcome) => self.fold(app_id, operation, outcome),
            None => self.not_found(app_id, operation),
        }
    }

    /// Local read of the worker's p2p port; no RPC call is made.
    pub fn dispatch_port_lookup(&self, app_id: AppId) -> DispatchResult {
        match self.directory.get(app_id) {
            Some(worker) => DispatchResult::Ok(worker.p2p_port().to_string()),
            None => self.not_found(app_id, RpcOperation::P2pPort),
        }
    }

    fn not_found(&self, app_id: AppId, operation: RpcOperation) -> DispatchResult {
        self.log.debug(DispatchEvent {
            event: "gateway.dispatch.worker_absent",
            app_id,
            operation,
            detail: "no worker for appId",
        });
        DispatchResult::NotFound
    }

    // No wildcard arm: a new RpcError variant must be mapped here explicitly.
    fn fold(&self, app_id: AppId, operation: RpcOperation, outcome: RpcOutcome) -> DispatchResult {
        match outcome {
            Ok(payload) => {
                self.log.trace(DispatchEvent {
                    event: "gateway.dispatch.ok",
                    app_id,
                    operation,
                    detail: &payload,
                });
                DispatchResult::Ok(payload)
            }
            Err(err @ RpcError::RequestFailed { .. }) => {
                let message = err.to_string();
                self.log.warn(DispatchEvent {
                    event: "gateway.dispatch.rpc_request_failed",
                    app_id,
                    operation,
                    detail: &format!("{err:?}"),
                });
                DispatchResult::ServerError(message)
            }
            Err(err @ RpcError::Transport(_)) => {
                let message = err.to_string();
                self.log.warn(DispatchEvent {
                    event: "gateway.dispatch.rpc_transport_failed",
                    app_id,
                    operation,
                    detail: &format!("{err:?}"),
                });
                DispatchResult::ServerError(message)
            }
            Err(err @ RpcError::BodyMalformed(_)) => {
                let message = err.to_string();
                self.log.debug(DispatchEvent {
                    event: "gateway.dispatch.rpc_body_malformed",
                    app_id,
                    operation,
                    detail: &format!("{err:?}"),
                });
                DispatchResult::BadRequest(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fleet_core::{Worker, WorkerPool};
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    };
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingLog {
        events: Mutex<Vec<(&'static str, &'static str, String)>>,
    }

    impl RecordingLog {
        fn push(&self, level: &'static str, e: DispatchEvent<'_>) {
            self.events
                .lock()
                .expect("lock events")
                .push((level, e.event, e.detail.to_string()));
        }

        fn take(&self) -> Vec<(&'static str, &'static str, String)> {
            std::mem::take(&mut *self.events.lock().expect("lock events"))
        }
    }

    impl DispatchLog for RecordingLog {
        fn trace(&self, e: DispatchEvent<'_>) {
            self.push("trace", e);
        }

        fn debug(&self, e: DispatchEvent<'_>) {
            self.push("debug", e);
        }

        fn warn(&self, e: DispatchEvent<'_>) {
            self.push("warn", e);
        }
    }

    struct NoopRpc;

    #[async_trait]
    impl RpcClient for NoopRpc {
        async fn query(&self, _path: &str, _data: &str, _id: &str) -> RpcOutcome {
            Ok(String::new())
        }

        async fn status(&self) -> RpcOutcome {
            Ok(String::new())
        }

        async fn broadcast_tx(&self, _tx: &str, _id: &str) -> RpcOutcome {
            Ok(String::new())
        }
    }

    fn gateway() -> (DispatchGateway, Arc<RecordingLog>) {
        let pool = WorkerPool::new();
        pool.register(Worker::new(7, 26656, Arc::new(NoopRpc)).expect("valid worker"));
        let log = Arc::new(RecordingLog::default());
        (DispatchGateway::new(Arc::new(pool), log.clone()), log)
    }

    #[tokio::test]
    async fn absent_worker_never_invokes() {
        let (gateway, log) = gateway();
        let mut invoked = false;
        let result = gateway
            .dispatch_rpc(42, RpcOperation::Status, |_rpc| {
                invoked = true;
                async { Ok("unreachable".to_string()) }
            })
            .await;

        assert_eq!(result, DispatchResult::NotFound);
        assert!(!invoked);
        assert_eq!(
            log.take(),
            vec![(
                "debug",
                "gateway.dispatch.worker_absent",
                "no worker for appId".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn folds_each_outcome_with_its_log_level() {
        let (gateway, log) = gateway();

        let cases: Vec<(RpcOutcome, DispatchResult, &str, &str)> = vec![
            (
                Ok("{\"sync\":true}".to_string()),
                DispatchResult::Ok("{\"sync\":true}".to_string()),
                "trace",
                "gateway.dispatch.ok",
            ),
            (
                Err(RpcError::request_failed(Some(500), "Internal error")),
                DispatchResult::ServerError("Internal error".to_string()),
                "warn",
                "gateway.dispatch.rpc_request_failed",
            ),
            (
                Err(RpcError::transport(anyhow::anyhow!("operation timed out"))),
                DispatchResult::ServerError("operation timed out".to_string()),
                "warn",
                "gateway.dispatch.rpc_transport_failed",
            ),
            (
                Err(RpcError::body_malformed(anyhow::anyhow!("expected value"))),
                DispatchResult::BadRequest("expected value".to_string()),
                "debug",
                "gateway.dispatch.rpc_body_malformed",
            ),
        ];

        for (outcome, expected, level, event) in cases {
            let result = gateway
                .dispatch_rpc(7, RpcOperation::Query, |_rpc| async move { outcome })
                .await;
            assert_eq!(result, expected);

            let events = log.take();
            assert_eq!(events.len(), 1);
            assert_eq!((events[0].0, events[0].1), (level, event));
        }
    }

    #[tokio::test]
    async fn failure_detail_keeps_underlying_message() {
        let (gateway, log) = gateway();
        gateway
            .dispatch_rpc(7, RpcOperation::BroadcastTx, |_rpc| async {
                Err(RpcError::transport(
                    anyhow::anyhow!("connection refused").context("POST rpc broadcast_tx_sync"),
                ))
            })
            .await;

        let events = log.take();
        assert!(events[0].2.contains("connection refused"));
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn abandoned_dispatch_drops_in_flight_call() {
        let (gateway, log) = gateway();
        let dropped = Arc::new(AtomicBool::new(false));
        let started = Arc::new(AtomicBool::new(false));

        let flag = DropFlag(dropped.clone());
        let running = started.clone();
        let pending = gateway.dispatch_rpc(7, RpcOperation::BroadcastTx, move |_rpc| async move {
            let _flag = flag;
            running.store(true, Ordering::SeqCst);
            std::future::pending::<RpcOutcome>().await
        });

        let timed_out = tokio::time::timeout(Duration::from_millis(50), pending).await;
        assert!(timed_out.is_err());
        assert!(started.load(Ordering::SeqCst));
        assert!(dropped.load(Ordering::SeqCst));
        assert!(log.take().is_empty());
    }

    #[test]
    fn port_lookup_reads_directory() {
        let (gateway, log) = gateway();
        assert_eq!(
            gateway.dispatch_port_lookup(7),
            DispatchResult::Ok("26656".to_string())
        );
        assert!(log.take().is_empty());
        assert_eq!(gateway.dispatch_port_lookup(8), DispatchResult::NotFound);
        assert_eq!(log.take().len(), 1);
    }
}
