//! Resettable one-shot deadline.
//!
//! A [`Deadline`] owns a single driver task that sleeps until the currently
//! armed instant and then invokes the fire callback. Arming, re-arming and
//! stopping only update shared state and wake the driver, so resetting once
//! per chunk does not spawn anything.
//!
//! # Invariants
//! - The callback runs at most once per arm
//! - After `stop()` returns, no expiry belonging to an earlier arm can fire;
//!   the driver re-checks the armed instant under the lock before firing
//! - The driver task is aborted when the last clone is dropped

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

type FireFn = Box<dyn Fn() + Send + Sync>;

/// A resettable one-shot timer whose expiry calls a callback.
///
/// Clones share the same timer. Must be created inside a Tokio runtime.
#[derive(Clone)]
pub struct Deadline {
    shared: Arc<Shared>,
    _driver: Arc<Driver>,
}

struct Shared {
    expires_at: Mutex<Option<Instant>>,
    changed: Notify,
    on_fire: FireFn,
}

struct Driver(JoinHandle<()>);

impl Drop for Driver {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl Deadline {
    /// Create a disarmed deadline.
    pub fn new<F>(on_fire: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared {
            expires_at: Mutex::new(None),
            changed: Notify::new(),
            on_fire: Box::new(on_fire),
        });
        let driver = tokio::spawn(drive(Arc::clone(&shared)));

        Self {
            shared,
            _driver: Arc::new(Driver(driver)),
        }
    }

    /// Create a deadline that is already armed to fire after `timeout`.
    pub fn after<F>(timeout: Duration, on_fire: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let deadline = Self::new(on_fire);
        deadline.reset(timeout);
        deadline
    }

    /// Arm (or re-arm) the deadline to fire `timeout` from now.
    ///
    /// Returns whether the deadline was armed before the call.
    pub fn reset(&self, timeout: Duration) -> bool {
        let was_armed = self
            .shared
            .state()
            .replace(Instant::now() + timeout)
            .is_some();
        self.shared.changed.notify_one();
        was_armed
    }

    /// Disarm the deadline.
    ///
    /// Returns `false` if it was not armed, which includes the case where it
    /// has already fired.
    pub fn stop(&self) -> bool {
        let was_armed = self.shared.state().take().is_some();
        if was_armed {
            self.shared.changed.notify_one();
        }
        was_armed
    }

    pub fn is_armed(&self) -> bool {
        self.shared.state().is_some()
    }
}

impl fmt::Debug for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deadline")
            .field("expires_at", &*self.shared.state())
            .finish()
    }
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, Option<Instant>> {
        self.expires_at.lock().expect("deadline mutex poisoned")
    }

    /// Take the armed instant if it has passed.
    fn take_expired(&self) -> bool {
        let mut state = self.state();
        match *state {
            Some(at) if at <= Instant::now() => {
                *state = None;
                true
            }
            _ => false,
        }
    }
}

async fn drive(shared: Arc<Shared>) {
    loop {
        let armed = *shared.state();
        match armed {
            None => shared.changed.notified().await,
            Some(at) => {
                tokio::select! {
                    () = time::sleep_until(at) => {
                        if shared.take_expired() {
                            tracing::trace!("Deadline expired");
                            (shared.on_fire)();
                        }
                    }
                    () = shared.changed.notified() => {}
                }
            }
        }
    }
}
