//! Engine-to-host notification queue.

use std::collections::VecDeque;

use gb_ir::{MachineId, Notification};
use parking_lot::Mutex;

const INITIAL_CAPACITY: usize = 256;

/// FIFO of notifications, filled by the engine and drained by the host.
///
/// The queue has its own lock so pushing never contends with the graph.
pub struct NotificationQueue {
    queue: Mutex<VecDeque<Notification>>,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self { queue: Mutex::new(VecDeque::with_capacity(INITIAL_CAPACITY)) }
    }

    pub fn push(&self, notification: Notification) {
        self.queue.lock().push_back(notification);
    }

    /// Pop notifications one at a time and hand them to `f` until the
    /// queue is empty. The lock is not held while `f` runs, so `f` may push.
    ///
    /// Returns the number of notifications delivered.
    pub fn drain(&self, mut f: impl FnMut(Notification)) -> usize {
        let mut delivered = 0;
        loop {
            let next = self.queue.lock().pop_front();
            let Some(notification) = next else {
                return delivered;
            };
            f(notification);
            delivered += 1;
        }
    }

    /// Drop every queued notification that names `machine`.
    pub fn purge(&self, machine: MachineId) -> usize {
        let mut queue = self.queue.lock();
        let before = queue.len();
        queue.retain(|n| !n.names(machine));
        before - queue.len()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
