use std::{
    collections::BTreeSet,
    sync::{PoisonError, RwLock},
};

use alarmclock_models::WeekDays;
use chrono::{Datelike, NaiveDate};

pub trait WorkCalendar: Send + Sync {
    fn is_non_working_day(&self, date: NaiveDate) -> bool;
}

/// Weekend days plus an externally supplied set of holidays.
pub struct HolidayCalendar {
    weekend: WeekDays,
    holidays: RwLock<BTreeSet<NaiveDate>>,
}

impl HolidayCalendar {
    pub fn new(weekend: WeekDays) -> Self {
        Self {
            weekend,
            holidays: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn with_holidays(self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.set_holidays(holidays);
        self
    }

    /// Replaces the whole holiday set. Callers should recompute schedules afterwards.
    pub fn set_holidays(&self, holidays: impl IntoIterator<Item = NaiveDate>) {
        let holidays: BTreeSet<NaiveDate> = holidays.into_iter().collect();
        log::info!("[CALENDAR] Using {} holidays", holidays.len());

        *self.holidays.write().unwrap_or_else(PoisonError::into_inner) = holidays;
    }

    pub fn holidays(&self) -> Vec<NaiveDate> {
        let holidays = self.holidays.read().unwrap_or_else(PoisonError::into_inner);
        holidays.iter().copied().collect()
    }
}

impl Default for HolidayCalendar {
    fn default() -> Self {
        Self::new(WeekDays::WEEKEND)
    }
}

impl WorkCalendar for HolidayCalendar {
    fn is_non_working_day(&self, date: NaiveDate) -> bool {
        if self.weekend.contains(date.weekday()) {
            return true;
        }

        self.holidays
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&date)
    }
}
