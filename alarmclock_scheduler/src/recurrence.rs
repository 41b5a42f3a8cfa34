use alarmclock_models::AlarmRecord;
use chrono::{
    DateTime, Datelike, Days, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeDelta, TimeZone,
    Utc,
};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::calendar::WorkCalendar;

/// A year plus one week covers any weekday pattern, even when holidays swallow
/// every occurrence for a while under the suppressive policy.
const MAX_LOOKAHEAD_DAYS: u64 = 371;

/// How the `non_working_days` flag combines with the weekday pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonWorkingDaysPolicy {
    /// Flag set: also fire on every non-working day, selected or not.
    #[default]
    Additive,
    /// Flag unset: skip selected days that are non-working.
    Suppressive,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecurrenceEvaluator {
    policy: NonWorkingDaysPolicy,
}

impl RecurrenceEvaluator {
    pub fn new(policy: NonWorkingDaysPolicy) -> Self {
        Self { policy }
    }

    /// Whether the alarm's day pattern selects `date`. Ignores `enabled`.
    pub fn fires_on(
        &self,
        alarm: &AlarmRecord,
        date: NaiveDate,
        calendar: &dyn WorkCalendar,
    ) -> bool {
        let selected = alarm.days.contains(date.weekday());

        match self.policy {
            NonWorkingDaysPolicy::Additive => {
                selected || (alarm.non_working_days && calendar.is_non_working_day(date))
            }
            NonWorkingDaysPolicy::Suppressive => {
                selected && (alarm.non_working_days || !calendar.is_non_working_day(date))
            }
        }
    }

    pub fn should_fire(
        &self,
        alarm: &AlarmRecord,
        date: NaiveDate,
        calendar: &dyn WorkCalendar,
    ) -> bool {
        alarm.enabled && self.fires_on(alarm, date, calendar)
    }

    pub fn never_fires(&self, alarm: &AlarmRecord) -> bool {
        match self.policy {
            NonWorkingDaysPolicy::Additive => alarm.has_no_schedule(),
            NonWorkingDaysPolicy::Suppressive => alarm.days.is_empty(),
        }
    }

    /// Earliest instant `>= not_before` at which the alarm's wall-clock time
    /// falls on a selected date in `timezone`.
    pub fn next_occurrence(
        &self,
        alarm: &AlarmRecord,
        not_before: DateTime<Utc>,
        timezone: Tz,
        calendar: &dyn WorkCalendar,
    ) -> Option<DateTime<Utc>> {
        if self.never_fires(alarm) {
            return None;
        }

        let first_date = not_before.with_timezone(&timezone).date_naive();
        let fire_time = alarm.time.as_naive_time();

        (0..=MAX_LOOKAHEAD_DAYS)
            .filter_map(|offset| first_date.checked_add_days(Days::new(offset)))
            .filter(|date| self.fires_on(alarm, *date, calendar))
            .filter_map(|date| resolve_local(timezone, date.and_time(fire_time)))
            .find(|at| *at >= not_before)
    }
}

/// Maps a local wall-clock time to an instant. A repeated local time takes its
/// first occurrence; a skipped one moves to the end of the gap, the first
/// valid local time after the transition.
pub(crate) fn resolve_local(timezone: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    match timezone.from_local_datetime(&local) {
        LocalResult::Single(at) => Some(at.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => gap_end(timezone, local),
    }
}

fn gap_end(timezone: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    let offset_seconds = |local: NaiveDateTime| -> Option<i64> {
        let offset = timezone.offset_from_local_datetime(&local).earliest()?;
        Some(offset.fix().local_minus_utc().into())
    };
    let before = offset_seconds(local - TimeDelta::days(1))?;
    let after = offset_seconds(local + TimeDelta::days(1))?;

    // the transition instant lies in (low, high], found to the second
    let local_seconds = local.and_utc().timestamp();
    let mut low = local_seconds - after;
    let mut high = local_seconds - before;
    while high - low > 1 {
        let middle = low + (high - low) / 2;
        let at = DateTime::from_timestamp(middle, 0)?;
        let offset: i64 = timezone
            .offset_from_utc_datetime(&at.naive_utc())
            .fix()
            .local_minus_utc()
            .into();
        if offset == before {
            low = middle;
        } else {
            high = middle;
        }
    }

    DateTime::from_timestamp(high, 0)
}
