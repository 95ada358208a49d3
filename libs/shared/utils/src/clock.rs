use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};
use tracing::warn;

use shared_config::AppConfig;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type SharedClock = Arc<dyn Clock>;

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: RwLock::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Wall-clock time as seen from the clinic's timezone.
#[derive(Clone)]
pub struct Clinic {
    clock: SharedClock,
    offset: FixedOffset,
}

impl Clinic {
    pub fn new(clock: SharedClock, offset: FixedOffset) -> Self {
        Self { clock, offset }
    }

    pub fn from_config(config: &AppConfig, clock: SharedClock) -> Self {
        let offset = config.clinic_offset().unwrap_or_else(|| {
            warn!("Invalid clinic offset, using UTC");
            utc_offset()
        });
        Self::new(clock, offset)
    }

    pub fn utc(clock: SharedClock) -> Self {
        Self::new(clock, utc_offset())
    }

    pub fn now_utc(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn now_local(&self) -> NaiveDateTime {
        self.clock.now().with_timezone(&self.offset).naive_local()
    }

    pub fn today(&self) -> NaiveDate {
        self.now_local().date()
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

impl std::fmt::Debug for Clinic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clinic")
            .field("now_utc", &self.now_utc())
            .field("offset", &self.offset)
            .finish()
    }
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}
