use std::sync::Arc;

use alarmclock_models::{AlarmId, AlarmRecord, AlarmTime, RawAlarmTime, WeekDays, validation};
use alarmclock_scheduler::{HolidayCalendar, TriggerScheduler};
use alarmclock_storage::{AlarmStorage, NewAlarm, UpdateAlarm};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::playback::TimedPlayback;

/// One request line of the control channel, e.g. `{"command": "toggle_alarm", "alarm_id": 1}`.
///
/// Numbers arrive unchecked and go through `validation` before reaching the store.
#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum AlarmCommand {
    AddAlarm {
        alarm_time: RawAlarmTime,
        #[serde(default)]
        days: WeekDays,
        #[serde(default)]
        non_working_days: bool,
        timeout: Option<i64>,
        volume: Option<i64>,
        #[serde(default)]
        repeat: bool,
        #[serde(default)]
        shuffle: bool,
    },
    EditAlarm {
        #[serde(alias = "alarm_uuid")]
        alarm_id: AlarmId,
        alarm_time: Option<RawAlarmTime>,
        days: Option<WeekDays>,
        non_working_days: Option<bool>,
        timeout: Option<i64>,
        volume: Option<i64>,
        repeat: Option<bool>,
        shuffle: Option<bool>,
    },
    RemoveAlarm {
        #[serde(alias = "alarm_uuid")]
        alarm_id: AlarmId,
    },
    ToggleAlarm {
        #[serde(alias = "alarm_uuid")]
        alarm_id: AlarmId,
    },
    GetAlarm {
        #[serde(alias = "alarm_uuid")]
        alarm_id: AlarmId,
    },
    ListAlarms,
    NextAlarm,
    StopAlarm {
        #[serde(alias = "alarm_uuid")]
        alarm_id: AlarmId,
    },
    SetHolidays {
        days: Vec<NaiveDate>,
    },
}

#[derive(Debug, PartialEq, Serialize)]
pub struct CommandResponse {
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CommandResponse {
    fn success(data: Option<Value>) -> Self {
        Self {
            error: false,
            message: None,
            data,
        }
    }

    fn failure(message: impl ToString) -> Self {
        Self {
            error: true,
            message: Some(message.to_string()),
            data: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AlarmView {
    #[serde(flatten)]
    alarm: AlarmRecord,
    days_label: String,
    next_fire: Option<DateTime<Utc>>,
}

pub struct CommandHandler {
    storage: Arc<dyn AlarmStorage>,
    scheduler: Arc<TriggerScheduler>,
    calendar: Arc<HolidayCalendar>,
    playback: Arc<TimedPlayback>,
}

impl CommandHandler {
    pub fn new(
        storage: Arc<dyn AlarmStorage>,
        scheduler: Arc<TriggerScheduler>,
        calendar: Arc<HolidayCalendar>,
        playback: Arc<TimedPlayback>,
    ) -> Self {
        Self {
            storage,
            scheduler,
            calendar,
            playback,
        }
    }

    pub async fn handle_line(&self, line: &str) -> CommandResponse {
        match serde_json::from_str::<AlarmCommand>(line) {
            Ok(command) => self.handle(command).await,
            Err(error) => {
                log::warn!("Rejected malformed command: {error}");
                CommandResponse::failure(format!("Invalid command: {error}"))
            }
        }
    }

    pub async fn handle(&self, command: AlarmCommand) -> CommandResponse {
        log::debug!("Handling {command:?}");

        match self.execute(command).await {
            Ok(data) => CommandResponse::success(data),
            Err(error) => {
                log::warn!("Command failed: {error}");
                CommandResponse::failure(error)
            }
        }
    }

    async fn execute(&self, command: AlarmCommand) -> anyhow::Result<Option<Value>> {
        let data = match command {
            AlarmCommand::AddAlarm {
                alarm_time,
                days,
                non_working_days,
                timeout,
                volume,
                repeat,
                shuffle,
            } => {
                let mut alarm = NewAlarm::at(AlarmTime::try_from(alarm_time)?)
                    .on_days(days)
                    .on_non_working_days(non_working_days);
                if let Some(timeout) = timeout {
                    alarm.timeout_minutes = validation::timeout_minutes(timeout)?;
                }
                if let Some(volume) = volume {
                    alarm.volume = validation::volume(volume)?;
                }
                alarm.repeat = repeat;
                alarm.shuffle = shuffle;

                let record = self.storage.add(alarm).await?;
                Some(json!(record.id))
            }
            AlarmCommand::EditAlarm {
                alarm_id,
                alarm_time,
                days,
                non_working_days,
                timeout,
                volume,
                repeat,
                shuffle,
            } => {
                let update = UpdateAlarm {
                    id: alarm_id,
                    time: alarm_time.map(AlarmTime::try_from).transpose()?,
                    days,
                    non_working_days,
                    timeout_minutes: timeout.map(validation::timeout_minutes).transpose()?,
                    volume: volume.map(validation::volume).transpose()?,
                    repeat,
                    shuffle,
                };

                let record = self.storage.edit(update).await?;
                Some(self.view(record))
            }
            AlarmCommand::RemoveAlarm { alarm_id } => {
                self.storage.remove(alarm_id).await?;
                self.playback.forget(alarm_id);
                None
            }
            AlarmCommand::ToggleAlarm { alarm_id } => {
                let enabled = self.storage.toggle(alarm_id).await?;
                Some(json!(enabled))
            }
            AlarmCommand::GetAlarm { alarm_id } => {
                let record = self.storage.get(alarm_id).await?;
                Some(self.view(record))
            }
            AlarmCommand::ListAlarms => {
                let alarms: Vec<Value> = self
                    .storage
                    .list()
                    .await
                    .into_iter()
                    .map(|alarm| self.view(alarm))
                    .collect();
                Some(Value::Array(alarms))
            }
            AlarmCommand::NextAlarm => {
                let next = self
                    .scheduler
                    .next_pending()
                    .map(|(fire_at, alarm_id)| json!({ "alarmId": alarm_id, "fireAt": fire_at }));
                Some(next.unwrap_or(Value::Null))
            }
            AlarmCommand::StopAlarm { alarm_id } => {
                anyhow::ensure!(self.playback.stop(alarm_id), "Alarm {alarm_id} is not playing");
                None
            }
            AlarmCommand::SetHolidays { days } => {
                self.calendar.set_holidays(days);
                self.scheduler.recompute_all();
                None
            }
        };

        Ok(data)
    }

    fn view(&self, alarm: AlarmRecord) -> Value {
        let view = AlarmView {
            days_label: alarm.days.to_string(),
            next_fire: self.scheduler.next_fire(alarm.id),
            alarm,
        };

        serde_json::to_value(view).unwrap_or(Value::Null)
    }
}
