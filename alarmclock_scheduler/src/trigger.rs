use alarmclock_models::{AlarmId, AlarmRecord, AlarmTime};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Payload handed to playback when an alarm fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    pub alarm_id: AlarmId,
    pub time: AlarmTime,
    pub timeout_minutes: u32,
    pub volume: u8,
    pub repeat: bool,
    pub shuffle: bool,
    /// Instant of the logical fire. Identical for redelivered events.
    pub fire_at: DateTime<Utc>,
}

impl TriggerEvent {
    pub fn new(alarm: &AlarmRecord, fire_at: DateTime<Utc>) -> Self {
        Self {
            alarm_id: alarm.id,
            time: alarm.time,
            timeout_minutes: alarm.timeout_minutes,
            volume: alarm.volume,
            repeat: alarm.repeat,
            shuffle: alarm.shuffle,
            fire_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScheduleEvent {
    Scheduled {
        alarm_id: AlarmId,
        fire_at: DateTime<Utc>,
    },
    Unscheduled {
        alarm_id: AlarmId,
    },
    Triggered(TriggerEvent),
}
