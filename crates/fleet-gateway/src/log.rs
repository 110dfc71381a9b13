use crate::dispatch::RpcOperation;
use fleet_core::AppId;

/// One dispatch log event. `detail` carries the payload or the verbatim failure text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchEvent<'a> {
    pub event: &'static str,
    pub app_id: AppId,
    pub operation: RpcOperation,
    pub detail: &'a str,
}

/// Sink for dispatch log events, injected into the gateway.
pub trait DispatchLog: Send + Sync {
    fn trace(&self, event: DispatchEvent<'_>);

    fn debug(&self, event: DispatchEvent<'_>);

    fn warn(&self, event: DispatchEvent<'_>);
}

/// Forwards dispatch events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDispatchLog;

impl DispatchLog for TracingDispatchLog {
    fn trace(&self, e: DispatchEvent<'_>) {
        tracing::trace!(
            event = e.event,
            app_id = e.app_id,
            operation = e.operation.as_str(),
            detail = e.detail,
            "rpc dispatch"
        );
    }

    fn debug(&self, e: DispatchEvent<'_>) {
        tracing::debug!(
            event = e.event,
            app_id = e.app_id,
            operation = e.operation.as_str(),
            detail = e.detail,
            "rpc dispatch"
        );
    }

    fn warn(&self, e: DispatchEvent<'_>) {
        tracing::warn!(
            event = e.event,
            app_id = e.app_id,
            operation = e.operation.as_str(),
            detail = e.detail,
            "rpc dispatch failed"
        );
    }
}
