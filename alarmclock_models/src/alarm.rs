use std::fmt;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

pub type AlarmId = i64;

/// Wall-clock time of day an alarm goes off at, with minute precision.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawAlarmTime")]
pub struct AlarmTime {
    hour: u32,
    minute: u32,
}

/// Unchecked hour and minute as they arrive from outside.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub struct RawAlarmTime {
    pub hour: i64,
    pub minute: i64,
}

impl TryFrom<RawAlarmTime> for AlarmTime {
    type Error = ValidationError;

    fn try_from(raw: RawAlarmTime) -> Result<Self, Self::Error> {
        crate::validation::alarm_time(raw.hour, raw.minute)
    }
}

impl AlarmTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self, ValidationError> {
        if hour > 23 {
            return Err(ValidationError::Hour(hour.into()));
        }
        if minute > 59 {
            return Err(ValidationError::Minute(minute.into()));
        }

        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn as_naive_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for AlarmTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Independent weekday flags. Missing keys deserialize as `false`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WeekDays {
    pub mon: bool,
    pub tue: bool,
    pub wed: bool,
    pub thu: bool,
    pub fri: bool,
    pub sat: bool,
    pub sun: bool,
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

impl WeekDays {
    pub const NONE: WeekDays = WeekDays {
        mon: false,
        tue: false,
        wed: false,
        thu: false,
        fri: false,
        sat: false,
        sun: false,
    };

    pub const WEEKEND: WeekDays = WeekDays {
        sat: true,
        sun: true,
        ..WeekDays::NONE
    };

    pub const WORKDAYS: WeekDays = WeekDays {
        mon: true,
        tue: true,
        wed: true,
        thu: true,
        fri: true,
        ..WeekDays::NONE
    };

    pub fn contains(&self, day: Weekday) -> bool {
        match day {
            Weekday::Mon => self.mon,
            Weekday::Tue => self.tue,
            Weekday::Wed => self.wed,
            Weekday::Thu => self.thu,
            Weekday::Fri => self.fri,
            Weekday::Sat => self.sat,
            Weekday::Sun => self.sun,
        }
    }

    pub fn set(&mut self, day: Weekday, selected: bool) {
        let flag = match day {
            Weekday::Mon => &mut self.mon,
            Weekday::Tue => &mut self.tue,
            Weekday::Wed => &mut self.wed,
            Weekday::Thu => &mut self.thu,
            Weekday::Fri => &mut self.fri,
            Weekday::Sat => &mut self.sat,
            Weekday::Sun => &mut self.sun,
        };
        *flag = selected;
    }

    pub fn with(mut self, day: Weekday) -> Self {
        self.set(day, true);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Selected days, monday first.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        WEEK.into_iter().filter(|day| self.contains(*day))
    }
}

impl FromIterator<Weekday> for WeekDays {
    fn from_iter<T: IntoIterator<Item = Weekday>>(iter: T) -> Self {
        iter.into_iter()
            .fold(WeekDays::NONE, |days, day| days.with(day))
    }
}

impl fmt::Display for WeekDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("No day selected");
        }

        let names: Vec<String> = self
            .iter()
            .map(|day| day.to_string().to_lowercase())
            .collect();
        f.write_str(&names.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmRecord {
    pub id: AlarmId,
    pub time: AlarmTime,
    pub enabled: bool,
    pub days: WeekDays,
    pub non_working_days: bool,
    pub timeout_minutes: u32,
    pub volume: u8,
    pub repeat: bool,
    pub shuffle: bool,
}

impl AlarmRecord {
    /// True when neither the weekday pattern nor the override can ever select a date.
    pub fn has_no_schedule(&self) -> bool {
        self.days.is_empty() && !self.non_working_days
    }
}
