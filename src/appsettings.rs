use std::time::Duration;

use alarmclock_models::WeekDays;
use alarmclock_scheduler::{NonWorkingDaysPolicy, SchedulerOptions};
use alarmclock_storage::NewAlarm;
use chrono::NaiveDate;
use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct SchedulerSettings {
    pub timezone: String,
    pub max_sleep_secs: u64,
    pub non_working_days_policy: NonWorkingDaysPolicy,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_owned(),
            max_sleep_secs: 60,
            non_working_days_policy: NonWorkingDaysPolicy::Additive,
        }
    }
}

impl SchedulerSettings {
    pub fn options(&self) -> anyhow::Result<SchedulerOptions> {
        let timezone: Tz = self
            .timezone
            .parse()
            .map_err(|error| anyhow::anyhow!("Unknown timezone {}: {error}", self.timezone))?;
        anyhow::ensure!(self.max_sleep_secs > 0, "max_sleep_secs must be positive");

        Ok(SchedulerOptions {
            timezone,
            policy: self.non_working_days_policy,
            max_sleep: Duration::from_secs(self.max_sleep_secs),
        })
    }
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct CalendarSettings {
    pub weekend: WeekDays,
    pub holidays: Vec<NaiveDate>,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            weekend: WeekDays::WEEKEND,
            holidays: Vec::new(),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct AppSettings {
    pub scheduler: SchedulerSettings,
    pub calendar: CalendarSettings,
    /// Added to the store on startup.
    pub alarms: Vec<NewAlarm>,
}

impl AppSettings {
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("appsettings").required(false))
            .add_source(File::with_name("appsettings.local").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn from_toml(toml: &str) -> AppSettings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn empty_settings_use_defaults() {
        let settings = from_toml("");
        let options = settings.scheduler.options().unwrap();

        assert_eq!(options.timezone, Tz::UTC);
        assert_eq!(options.policy, NonWorkingDaysPolicy::Additive);
        assert_eq!(options.max_sleep, Duration::from_secs(60));
        assert_eq!(settings.calendar.weekend, WeekDays::WEEKEND);
        assert!(settings.alarms.is_empty());
    }

    #[test]
    fn full_settings_are_read() {
        let settings = from_toml(
            r#"
            [scheduler]
            timezone = "Europe/Paris"
            max_sleep_secs = 30
            non_working_days_policy = "suppressive"

            [calendar]
            weekend = { sun = true }
            holidays = ["2026-12-25"]

            [[alarms]]
            time = { hour = 7, minute = 30 }
            days = { mon = true, fri = true }
            volume = 80
            "#,
        );
        let options = settings.scheduler.options().unwrap();

        assert_eq!(options.timezone, chrono_tz::Europe::Paris);
        assert_eq!(options.policy, NonWorkingDaysPolicy::Suppressive);
        assert_eq!(settings.calendar.weekend, WeekDays { sun: true, ..WeekDays::NONE });
        assert_eq!(
            settings.calendar.holidays,
            vec![NaiveDate::from_ymd_opt(2026, 12, 25).unwrap()]
        );

        let alarm = &settings.alarms[0];
        assert_eq!(alarm.time.to_string(), "07:30");
        assert!(alarm.days.mon && alarm.days.fri && !alarm.days.tue);
        assert_eq!(alarm.volume, 80);
        assert_eq!(alarm.timeout_minutes, 15, "default timeout");
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let settings = from_toml("[scheduler]\ntimezone = \"Mars/Olympus\"");

        assert!(settings.scheduler.options().is_err());
    }
}
