//! Shared core abstractions for the fleet gateway.
//!
//! This crate defines the contracts between the HTTP gateway and the worker fleet: the
//! consensus-engine RPC client, its closed outcome taxonomy, and the worker directory.
//!
//! # API notes
//! `fleet-core` is an internal crate (`publish = false`). `RpcError` wraps `anyhow::Error` for
//! transport and decode causes so callers keep the full context chain.

use async_trait::async_trait;
use std::fmt;

pub mod directory;
pub mod rpc;

pub use directory::{Worker, WorkerDirectory, WorkerPool};

/// Application identifier selecting one worker. Supplied by callers, never generated here.
pub type AppId = u64;

/// Default JSON-RPC request id used when the caller does not supply one.
pub const DEFAULT_RPC_ID: &str = "dontcare";

/// Result of any consensus-engine RPC operation.
///
/// `Ok` carries the raw textual response body. The error side is closed: see [`RpcError`].
pub type RpcOutcome = Result<String, RpcError>;

#[derive(Debug)]
pub enum RpcError {
    /// The RPC peer answered with a structured failure (non-2xx status or JSON-RPC `error`).
    RequestFailed {
        status: Option<u16>,
        message: String,
    },

    /// The request never completed (connect failure, timeout, body read failure).
    Transport(anyhow::Error),

    /// A response arrived but is not a JSON-RPC envelope.
    BodyMalformed(anyhow::Error),
}

impl RpcError {
    pub fn request_failed(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            message: message.into(),
        }
    }

    pub fn transport(err: impl Into<anyhow::Error>) -> Self {
        Self::Transport(err.into())
    }

    pub fn body_malformed(err: impl Into<anyhow::Error>) -> Self {
        Self::BodyMalformed(err.into())
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { message, .. } => f.write_str(message),
            Self::Transport(err) | Self::BodyMalformed(err) => write!(f, "{err:#}"),
        }
    }
}

impl std::error::Error for RpcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RequestFailed { .. } => None,
            Self::Transport(err) | Self::BodyMalformed(err) => Some(&**err),
        }
    }
}

/// Client for one worker's embedded consensus-engine RPC interface.
///
/// Implementations must resolve every call to an [`RpcOutcome`]; they never panic on peer input.
/// Retries, if any, belong to the implementation.
#[async_trait]
pub trait RpcClient: Send + Sync {
    async fn query(&self, path: &str, data: &str, id: &str) -> RpcOutcome;

    async fn status(&self) -> RpcOutcome;

    async fn broadcast_tx(&self, tx: &str, id: &str) -> RpcOutcome;
}
