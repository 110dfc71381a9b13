use crate::{AppId, RpcClient};
use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, PoisonError, RwLock},
};

/// Handle for one running worker.
///
/// Owned by the directory and handed out as `Arc<Worker>`; holders keep the worker alive even if
/// it is removed from the directory mid-request.
pub struct Worker {
    app_id: AppId,
    p2p_port: u16,
    rpc: Arc<dyn RpcClient>,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("app_id", &self.app_id)
            .field("p2p_port", &self.p2p_port)
            .field("rpc", &"<RpcClient>")
            .finish()
    }
}

impl Worker {
    pub fn new(app_id: AppId, p2p_port: u16, rpc: Arc<dyn RpcClient>) -> anyhow::Result<Self> {
        if p2p_port == 0 {
            anyhow::bail!("worker {app_id}: p2p port must be in 1..=65535");
        }
        Ok(Self {
            app_id,
            p2p_port,
            rpc,
        })
    }

    pub fn app_id(&self) -> AppId {
        self.app_id
    }

    pub fn p2p_port(&self) -> u16 {
        self.p2p_port
    }

    pub fn rpc_client(&self) -> Arc<dyn RpcClient> {
        Arc::clone(&self.rpc)
    }
}

/// Resolves application ids to live workers.
///
/// The registry's concurrency discipline belongs to the implementation. Callers treat returned
/// handles as request-scoped and never store them.
pub trait WorkerDirectory: Send + Sync {
    fn get(&self, app_id: AppId) -> Option<Arc<Worker>>;
}

impl dyn WorkerDirectory {
    /// Apply `f` to the worker for `app_id`, if one is registered.
    ///
    /// `f` is never called when the worker is absent. The handle stays alive until `f`'s future
    /// resolves.
    pub async fn with_worker<F, Fut, T>(&self, app_id: AppId, f: F) -> Option<T>
    where
        F: FnOnce(Arc<Worker>) -> Fut,
        Fut: Future<Output = T>,
    {
        let worker = self.get(app_id)?;
        Some(f(worker).await)
    }
}

/// In-memory worker registry.
#[derive(Debug, Default)]
pub struct WorkerPool {
    workers: RwLock<HashMap<AppId, Arc<Worker>>>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `worker`, returning the worker previously registered under the same id.
    pub fn register(&self, worker: Worker) -> Option<Arc<Worker>> {
        let app_id = worker.app_id();
        let previous = self
            .workers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(app_id, Arc::new(worker));
        tracing::debug!(
            event = "fleet.directory.registered",
            app_id,
            replaced = previous.is_some(),
            "worker registered"
        );
        previous
    }

    pub fn remove(&self, app_id: AppId) -> Option<Arc<Worker>> {
        let removed = self
            .workers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&app_id);
        if removed.is_some() {
            tracing::debug!(event = "fleet.directory.removed", app_id, "worker removed");
        }
        removed
    }

    pub fn app_ids(&self) -> Vec<AppId> {
        let mut ids: Vec<AppId> = self
            .workers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.workers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WorkerDirectory for WorkerPool {
    fn get(&self, app_id: AppId) -> Option<Arc<Worker>> {
        // Clone out of the guard; the lock is never held across an await.
        self.workers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&app_id)
            .cloned()
    }
}
