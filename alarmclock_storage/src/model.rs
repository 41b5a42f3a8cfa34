use alarmclock_models::{
    AlarmId, AlarmRecord, AlarmTime, ValidationError, WeekDays, validation,
};
use serde::Deserialize;

const DEFAULT_TIMEOUT_MINUTES: u32 = 15;
const DEFAULT_VOLUME: u8 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewAlarm {
    pub time: AlarmTime,
    #[serde(default)]
    pub days: WeekDays,
    #[serde(default)]
    pub non_working_days: bool,
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: u32,
    #[serde(default = "default_volume")]
    pub volume: u8,
    #[serde(default)]
    pub repeat: bool,
    #[serde(default)]
    pub shuffle: bool,
}

fn default_timeout_minutes() -> u32 {
    DEFAULT_TIMEOUT_MINUTES
}

fn default_volume() -> u8 {
    DEFAULT_VOLUME
}

impl NewAlarm {
    pub fn at(time: AlarmTime) -> Self {
        Self {
            time,
            days: WeekDays::NONE,
            non_working_days: false,
            timeout_minutes: DEFAULT_TIMEOUT_MINUTES,
            volume: DEFAULT_VOLUME,
            repeat: false,
            shuffle: false,
        }
    }

    pub fn on_days(mut self, days: WeekDays) -> Self {
        self.days = days;
        self
    }

    pub fn on_non_working_days(mut self, enabled: bool) -> Self {
        self.non_working_days = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::timeout_minutes(self.timeout_minutes.into())?;
        validation::volume(self.volume.into())?;
        Ok(())
    }

    pub(crate) fn into_record(self, id: AlarmId) -> AlarmRecord {
        AlarmRecord {
            id,
            time: self.time,
            enabled: true,
            days: self.days,
            non_working_days: self.non_working_days,
            timeout_minutes: self.timeout_minutes,
            volume: self.volume,
            repeat: self.repeat,
            shuffle: self.shuffle,
        }
    }
}

/// Field replacements for an existing alarm. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateAlarm {
    pub id: AlarmId,
    pub time: Option<AlarmTime>,
    pub days: Option<WeekDays>,
    pub non_working_days: Option<bool>,
    pub timeout_minutes: Option<u32>,
    pub volume: Option<u8>,
    pub repeat: Option<bool>,
    pub shuffle: Option<bool>,
}

impl UpdateAlarm {
    pub fn new(id: AlarmId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Builds the edited record without touching `current`.
    pub(crate) fn apply_to(&self, current: &AlarmRecord) -> Result<AlarmRecord, ValidationError> {
        let edited = AlarmRecord {
            id: current.id,
            enabled: current.enabled,
            time: self.time.unwrap_or(current.time),
            days: self.days.unwrap_or(current.days),
            non_working_days: self.non_working_days.unwrap_or(current.non_working_days),
            timeout_minutes: self.timeout_minutes.unwrap_or(current.timeout_minutes),
            volume: self.volume.unwrap_or(current.volume),
            repeat: self.repeat.unwrap_or(current.repeat),
            shuffle: self.shuffle.unwrap_or(current.shuffle),
        };

        validation::timeout_minutes(edited.timeout_minutes.into())?;
        validation::volume(edited.volume.into())?;

        Ok(edited)
    }
}
