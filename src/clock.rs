use chrono::{DateTime, Utc};

/// Abstracts "now" so grace-period expiry and scheduler ticks are
/// deterministically testable, mirroring the teacher's `SystemSimulator`
/// clock abstraction.
pub trait Clock: std::fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock whose value is set explicitly, for tests that assert grace-period
/// and scheduler behavior without real sleeping.
#[derive(Debug, Clone)]
pub struct FixedClock {
    inner: std::sync::Arc<std::sync::RwLock<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { inner: std::sync::Arc::new(std::sync::RwLock::new(at)) }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.inner.write().expect("clock lock poisoned") = at;
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.inner.write().expect("clock lock poisoned");
        *guard += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.inner.read().expect("clock lock poisoned")
    }
}
