// src/pool.rs

//! Per-project concurrency limits for buck invocations.
//!
//! Each `(root, access)` pair owns one FIFO slot queue:
//!
//! - `Mutating` queues have capacity 1, so builds/installs/tests for a root
//!   never overlap each other.
//! - `ReadOnly` queues have capacity `max(1, N - 1)` for N hardware threads,
//!   collapsing to 1 when the buck daemon is disabled. Cold-starting several
//!   daemonless buck processes at once races on daemon startup state.
//!
//! Queues are created on first use and live as long as the pool. Mutating and
//! read-only queues are independent: a query may run while a build holds the
//! mutating slot.
//!
//! Waiting is cancellation-safe. Dropping a `submit` future that has not yet
//! been admitted removes it from its queue; the remaining waiters keep their
//! order.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::anyhow;
use tokio::sync::Semaphore;
use tracing::{debug, trace};

use crate::errors::Result;
use crate::types::{Access, ProjectRoot};

/// Registry key: one queue per root and access mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub root: ProjectRoot,
    pub access: Access,
}

#[derive(Debug)]
pub struct ConcurrencyPool {
    read_only_capacity: usize,
    queues: Mutex<HashMap<PoolKey, Arc<Semaphore>>>,
}

impl ConcurrencyPool {
    /// Create a pool with an explicit read-only capacity (clamped to >= 1).
    pub fn new(read_only_capacity: usize) -> Self {
        Self {
            read_only_capacity: read_only_capacity.max(1),
            queues: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self, access: Access) -> usize {
        match access {
            Access::ReadOnly => self.read_only_capacity,
            Access::Mutating => 1,
        }
    }

    /// Number of tasks currently admitted for `(root, access)`.
    pub fn in_flight(&self, root: &ProjectRoot, access: Access) -> usize {
        let key = PoolKey {
            root: root.clone(),
            access,
        };
        let queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        queues
            .get(&key)
            .map(|sem| self.capacity(access) - sem.available_permits())
            .unwrap_or(0)
    }

    fn queue_for(&self, root: &ProjectRoot, access: Access) -> Arc<Semaphore> {
        let key = PoolKey {
            root: root.clone(),
            access,
        };
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        queues
            .entry(key)
            .or_insert_with(|| {
                let capacity = self.capacity(access);
                debug!(root = %root, ?access, capacity, "creating invocation queue");
                Arc::new(Semaphore::new(capacity))
            })
            .clone()
    }

    /// Run `task` once a slot for `(root, access)` is free.
    ///
    /// `task` is not polled until admitted. The slot is released when the
    /// task finishes or the returned future is dropped.
    pub async fn submit<F, T>(&self, root: &ProjectRoot, access: Access, task: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        let queue = self.queue_for(root, access);
        trace!(root = %root, ?access, available = queue.available_permits(), "waiting for slot");

        let _permit = queue
            .acquire_owned()
            .await
            .map_err(|e| anyhow!("invocation queue for {} closed: {}", root, e))?;

        trace!(root = %root, ?access, "slot acquired");
        Ok(task.await)
    }
}

/// `max(1, available_parallelism - 1)`, or 1 when the daemon is disabled.
pub fn default_read_only_capacity(no_daemon: bool) -> usize {
    if no_daemon {
        return 1;
    }
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    cpus.saturating_sub(1).max(1)
}
