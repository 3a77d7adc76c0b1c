//! Single-flight lock shared by checkpoint and branch creation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

static GLOBAL: LazyLock<Arc<SingleFlight>> = LazyLock::new(|| Arc::new(SingleFlight::new()));

/// Compare-and-swap flag that admits one transaction at a time.
///
/// A second caller does not wait: [`try_acquire`](Self::try_acquire) returns
/// `None` while the flag is held.
///
/// # Examples
///
/// ```
/// use chronicler_session::SingleFlight;
/// use std::sync::Arc;
///
/// let lock = Arc::new(SingleFlight::new());
/// let guard = lock.try_acquire().unwrap();
/// assert!(lock.try_acquire().is_none());
/// drop(guard);
/// assert!(!lock.is_held());
/// ```
#[derive(Debug, Default)]
pub struct SingleFlight {
    held: AtomicBool,
}

impl SingleFlight {
    /// Unheld lock.
    pub const fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
        }
    }

    /// Process-wide lock used by default.
    pub fn global() -> Arc<SingleFlight> {
        Arc::clone(&GLOBAL)
    }

    /// Take the lock, or `None` if another transaction holds it.
    pub fn try_acquire(self: &Arc<Self>) -> Option<SingleFlightGuard> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SingleFlightGuard {
                lock: Arc::clone(self),
            })
    }

    /// Whether a transaction holds the lock.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Releases the lock when dropped.
#[derive(Debug)]
pub struct SingleFlightGuard {
    lock: Arc<SingleFlight>,
}

impl Drop for SingleFlightGuard {
    fn drop(&mut self) {
        self.lock.held.store(false, Ordering::Release);
    }
}
