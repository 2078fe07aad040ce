//! Coalescing command queue shared by the UI and the device worker.
//!
//! Holding down a volume key must not flood the receiver, so a volume
//! operation replaces a volume operation waiting at the tail and a refresh is
//! dropped while another refresh is still pending. Everything else keeps FIFO
//! order.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use tokio::sync::Notify;
use tracing::debug;

use crate::message::{DeviceOp, QueuedOp};

pub struct CommandQueue {
    ops: Mutex<VecDeque<QueuedOp>>,
    notify: Notify,
    next_id: AtomicU64,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            ops: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Append `op`, applying the coalescing rules. Returns the id of the entry
    /// that now carries the operation, or `None` when it was dropped.
    pub fn push(&self, op: DeviceOp) -> Option<u64> {
        let mut ops = self.lock();
        if op.is_refresh() && ops.iter().any(|q| q.op.is_refresh()) {
            debug!("Refresh already pending, dropping");
            return None;
        }
        let entry = self.entry(op);
        let id = entry.id;
        match ops.back_mut() {
            Some(tail) if tail.op.is_volume() && entry.op.is_volume() => {
                debug!("Coalescing {} into pending {}", entry.op, tail.op);
                *tail = entry;
            }
            _ => ops.push_back(entry),
        }
        drop(ops);
        self.notify.notify_one();
        Some(id)
    }

    /// Put `op` at the head so it runs next. A pending refresh is moved
    /// rather than duplicated.
    pub fn push_front(&self, op: DeviceOp) -> u64 {
        let mut ops = self.lock();
        if op.is_refresh() {
            ops.retain(|q| !q.op.is_refresh());
        }
        let entry = self.entry(op);
        let id = entry.id;
        ops.push_front(entry);
        drop(ops);
        self.notify.notify_one();
        id
    }

    pub fn pop(&self) -> Option<QueuedOp> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Pending operations, head first.
    pub fn snapshot(&self) -> Vec<DeviceOp> {
        self.lock().iter().map(|q| q.op.clone()).collect()
    }

    /// Resolves after the next push (or immediately if one happened since the
    /// last wait).
    pub async fn notified(&self) {
        self.notify.notified().await;
    }

    fn entry(&self, op: DeviceOp) -> QueuedOp {
        QueuedOp {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            op,
            enqueued_at: Instant::now(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<QueuedOp>> {
        // A panic while holding the lock leaves the deque intact.
        self.ops.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}
