use chrono::{DateTime, Local, NaiveDate, Utc};

/// Source of "now" for all date-relative logic (past-date rejection, today's
/// appointments, the no-show lookback window). Services take an
/// `Arc<dyn Clock>` so tests can pin the calendar.
pub trait Clock: Send + Sync {
    /// The current calendar date in the clinic's local timezone.
    fn today(&self) -> NaiveDate;

    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a fixed instant, for deterministic tests.
#[derive(Debug, Clone)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0.date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
