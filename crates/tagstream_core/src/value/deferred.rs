use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::Value;

#[derive(Default)]
struct Slot {
    value: Mutex<Option<Value>>,
    ready: Condvar,
}

/// A value that may not be realized yet.
///
/// Clones share the same slot. The encoder waits on it for at most the
/// configured deref timeout.
#[derive(Clone)]
pub struct Deferred {
    slot: Arc<Slot>,
}

/// Write side of a pending [`Deferred`].
pub struct Promise {
    slot: Arc<Slot>,
}

impl Deferred {
    /// An already realized value.
    pub fn ready(value: Value) -> Self {
        let slot = Slot {
            value: Mutex::new(Some(value)),
            ready: Condvar::new(),
        };
        Self {
            slot: Arc::new(slot),
        }
    }

    /// An unrealized value and the promise that will deliver it.
    pub fn pending() -> (Self, Promise) {
        let slot = Arc::new(Slot::default());
        (
            Self { slot: slot.clone() },
            Promise { slot },
        )
    }

    /// Blocks until the value is realized or `timeout` elapses.
    pub fn wait(&self, timeout: Duration) -> Option<Value> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.slot.value.lock();

        while guard.is_none() {
            if self.slot.ready.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }

        guard.clone()
    }

    /// The value if it is already realized.
    pub fn peek(&self) -> Option<Value> {
        self.slot.value.lock().clone()
    }

    pub fn is_realized(&self) -> bool {
        self.slot.value.lock().is_some()
    }
}

impl Promise {
    /// Realizes the value and wakes every waiter. Consumes the promise, so a
    /// value is delivered at most once.
    pub fn deliver(self, value: impl Into<Value>) {
        *self.slot.value.lock() = Some(value.into());
        self.slot.ready.notify_all();
    }
}

impl PartialEq for Deferred {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot) || self.peek() == other.peek()
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek() {
            Some(v) => f.debug_tuple("Deferred").field(&v).finish(),
            None => f.write_str("Deferred(<pending>)"),
        }
    }
}
