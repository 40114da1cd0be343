use std::sync::Mutex;

use chrono::DateTime;
use chrono::Utc;

/// Injected time source for the repository. Keeping `now()` behind a trait (rather than
/// calling `Utc::now()` directly in `repository.rs`) is what lets tests drive lock-TTL
/// expiry deterministically instead of sleeping for real.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// Test double: starts at a fixed instant and only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(start: DateTime<Utc>) -> Self { Self(Mutex::new(start)) }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.0.lock().unwrap();
        *guard += delta;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.0.lock().unwrap() = to;
    }
}

impl Clock for MutableClock {
    fn now(&self) -> DateTime<Utc> { *self.0.lock().unwrap() }
}
