use chrono::{DateTime, Utc};

/// Wall-clock port. Staleness checks and timestamps go through it so tests
/// can pin time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
