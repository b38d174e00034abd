//! Liveness status shared between a resolved descriptor and its process.

use serde::{Serialize, Serializer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Owner value of a cell that no process has claimed.
const UNOWNED: u64 = 0;

/// Observed state of a local service.
///
/// Serializes as `null` (pending), `true` (alive) or `false` (exited).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceStatus {
    /// Resolved, no output observed yet.
    #[default]
    Pending,
    /// The process has produced output.
    Alive,
    /// The process has exited.
    Exited,
}

impl ServiceStatus {
    pub fn as_option(&self) -> Option<bool> {
        match self {
            ServiceStatus::Pending => None,
            ServiceStatus::Alive => Some(true),
            ServiceStatus::Exited => Some(false),
        }
    }
}

impl Serialize for ServiceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.as_option().serialize(serializer)
    }
}

/// Shared status cell.
///
/// Clones observe the same value. A fresh resolution creates a fresh cell,
/// which is the only way back to `Pending`.
///
/// A cell is owned by at most one process generation at a time. Updates
/// made through [`StatusHandle::mark_alive_by`] and
/// [`StatusHandle::mark_exited_by`] only apply while the caller owns the
/// cell, and an exit releases ownership. Owner checks and writes happen
/// under the channel's write lock.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    sender: Arc<watch::Sender<ServiceStatus>>,
    owner: Arc<AtomicU64>,
}

impl StatusHandle {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(ServiceStatus::Pending);
        Self {
            sender: Arc::new(sender),
            owner: Arc::new(AtomicU64::new(UNOWNED)),
        }
    }

    pub fn get(&self) -> ServiceStatus {
        *self.sender.borrow()
    }

    /// Record observed output. Returns `true` if this changed the status.
    pub fn mark_alive(&self) -> bool {
        self.sender.send_if_modified(|status| {
            if *status == ServiceStatus::Alive {
                false
            } else {
                *status = ServiceStatus::Alive;
                true
            }
        })
    }

    /// Record process exit.
    pub fn mark_exited(&self) {
        self.sender.send_replace(ServiceStatus::Exited);
    }

    /// Hand the cell to a process generation. `generation` must be non-zero.
    pub fn claim(&self, generation: u64) {
        self.sender.send_if_modified(|_| {
            self.owner.store(generation, Ordering::SeqCst);
            false
        });
    }

    /// Record output from `generation`. Ignored unless it owns the cell.
    pub fn mark_alive_by(&self, generation: u64) -> bool {
        self.sender.send_if_modified(|status| {
            if self.owner.load(Ordering::SeqCst) != generation || *status == ServiceStatus::Alive {
                return false;
            }
            *status = ServiceStatus::Alive;
            true
        })
    }

    /// Record the exit of `generation` and release the cell. Ignored unless
    /// it owns the cell.
    pub fn mark_exited_by(&self, generation: u64) -> bool {
        self.sender.send_if_modified(|status| {
            if self.owner.load(Ordering::SeqCst) != generation {
                return false;
            }
            self.owner.store(UNOWNED, Ordering::SeqCst);
            *status = ServiceStatus::Exited;
            true
        })
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<ServiceStatus> {
        self.sender.subscribe()
    }

    /// Whether two handles share the same cell.
    pub fn same_cell(&self, other: &StatusHandle) -> bool {
        Arc::ptr_eq(&self.sender, &other.sender)
    }
}

impl Default for StatusHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for StatusHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.get().serialize(serializer)
    }
}
