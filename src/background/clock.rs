use chrono::{DateTime, FixedOffset, Utc};

/// The one place "now" comes from. Everything that schedules or scans takes a
/// `Clock` so tests can move time by hand.
pub trait Clock: Send {
    fn now(&self) -> DateTime<FixedOffset>;

    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Wall clock, reported in the configured UTC offset.
pub struct SystemClock {
    tz: FixedOffset,
}

impl SystemClock {
    pub fn new(tz: FixedOffset) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.tz)
    }
}

#[cfg(test)]
pub use manual::ManualClock;

#[cfg(test)]
mod manual {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Shared, hand-driven clock. Clones observe the same time.
    #[derive(Clone)]
    pub struct ManualClock {
        now: Arc<Mutex<DateTime<FixedOffset>>>,
    }

    impl ManualClock {
        pub fn new(start: DateTime<FixedOffset>) -> Self {
            Self { now: Arc::new(Mutex::new(start)) }
        }

        pub fn set(&self, to: DateTime<FixedOffset>) {
            *self.now.lock().unwrap() = to;
        }

        pub fn advance(&self, by: chrono::Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<FixedOffset> {
            *self.now.lock().unwrap()
        }
    }
}
