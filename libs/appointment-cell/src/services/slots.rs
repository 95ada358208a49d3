use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use shared_config::ScheduleConfig;

use crate::models::AppointmentError;

/// Result of a per-day slot computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAvailability {
    pub available: Vec<NaiveTime>,
    pub total: usize,
    pub booked: usize,
}

/// The fixed grid of bookable start times in a working day.
#[derive(Debug, Clone)]
pub struct SlotSchedule {
    slots: Vec<NaiveTime>,
}

impl SlotSchedule {
    pub fn new(config: ScheduleConfig) -> Self {
        let start = minutes_of(config.day_start);
        let end = minutes_of(config.day_end);
        let step = config.slot_minutes.max(1);

        let slots = (start..)
            .step_by(step as usize)
            .take_while(|minute| minute + step <= end)
            .filter_map(|minute| NaiveTime::from_hms_opt(minute / 60, minute % 60, 0))
            .collect();

        Self { slots }
    }

    pub fn slots(&self) -> &[NaiveTime] {
        &self.slots
    }

    pub fn labels(&self) -> Vec<String> {
        self.slots.iter().map(|t| t.format("%H:%M").to_string()).collect()
    }

    pub fn is_working_slot(&self, time: NaiveTime) -> bool {
        self.slots.contains(&time)
    }

    /// Slots still open on `date` given the times already taken.
    ///
    /// Past dates are rejected. On the current day, only slots strictly after
    /// `now` remain.
    pub fn available(
        &self,
        date: NaiveDate,
        booked: &[NaiveTime],
        now: NaiveDateTime,
    ) -> Result<SlotAvailability, AppointmentError> {
        let today = now.date();
        if date < today {
            return Err(AppointmentError::PastDate);
        }

        let available = self
            .slots
            .iter()
            .copied()
            .filter(|slot| !booked.contains(slot))
            .filter(|slot| date > today || *slot > truncate_to_minute(now.time()))
            .collect();

        Ok(SlotAvailability {
            available,
            total: self.slots.len(),
            booked: booked.len(),
        })
    }
}

impl Default for SlotSchedule {
    fn default() -> Self {
        Self::new(ScheduleConfig::default())
    }
}

/// A slot is in the past once its start is at or before `now`.
pub fn slot_has_started(date: NaiveDate, time: NaiveTime, now: NaiveDateTime) -> bool {
    date.and_time(time) <= now
}

fn minutes_of(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}
