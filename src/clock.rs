//! Injectable time source.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// A shareable "current time" function.
///
/// Registrations and the expiry-bound rule read the time through a `Clock` so
/// tests can pin "now" to a fixed instant.
#[derive(Clone)]
pub struct Clock(Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>);

impl Clock {
    pub fn new<F>(now: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        Self(Arc::new(now))
    }

    /// The real wall clock.
    pub fn system() -> Self {
        Self::new(Utc::now)
    }

    /// A clock frozen at `instant`.
    pub fn fixed(instant: DateTime<Utc>) -> Self {
        Self::new(move || instant)
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.0)()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Clock(func)")
    }
}

/// Reads the time from `clock`, falling back to the wall clock when unset.
pub fn now_from(clock: Option<&Clock>) -> DateTime<Utc> {
    clock.map_or_else(Utc::now, Clock::now)
}
