mod appsettings;
mod commands;
mod playback;

use std::sync::Arc;

use alarmclock_scheduler::{HolidayCalendar, SystemClock, TriggerScheduler};
use alarmclock_storage::{AlarmStorage, InMemoryAlarmStorage};
use anyhow::Context;
use appsettings::AppSettings;
use commands::CommandHandler;
use playback::{LogAudioOutput, TimedPlayback};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let settings = AppSettings::load().context("Failed to load settings")?;
    let options = settings.scheduler.options()?;

    let calendar = Arc::new(
        HolidayCalendar::new(settings.calendar.weekend).with_holidays(settings.calendar.holidays),
    );
    let scheduler = Arc::new(TriggerScheduler::new(
        Arc::new(SystemClock),
        calendar.clone(),
        options,
    ));
    let storage: Arc<dyn AlarmStorage> =
        Arc::new(InMemoryAlarmStorage::new().with_observer(scheduler.clone()));

    for alarm in settings.alarms {
        let record = storage
            .add(alarm)
            .await
            .context("Invalid alarm in settings")?;
        log::info!("Loaded alarm {} at {}", record.id, record.time);
    }

    let playback = Arc::new(TimedPlayback::new(Arc::new(LogAudioOutput)));
    spawn_event_log(&scheduler, &storage, &playback);
    let scheduler_handle = scheduler.spawn(playback.clone());

    let handler = CommandHandler::new(storage, scheduler, calendar, playback);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    log::info!("Accepting commands on stdin");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    let response = handler.handle_line(&line).await;
                    println!("{}", serde_json::to_string(&response)?);
                }
                None => {
                    log::info!("Stdin closed, running until interrupted");
                    tokio::signal::ctrl_c().await?;
                    break;
                }
            }
        }
    }

    scheduler_handle.shutdown().await;
    log::info!("Stopped");

    Ok(())
}

fn init_logging() {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned());
    pretty_env_logger::formatted_timed_builder()
        .parse_filters(&filters)
        .init();
}

fn spawn_event_log(
    scheduler: &TriggerScheduler,
    storage: &Arc<dyn AlarmStorage>,
    playback: &TimedPlayback,
) {
    let mut schedule_events = scheduler.subscribe();
    tokio::spawn(async move {
        loop {
            match schedule_events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => log::debug!("[EVENT] {json}"),
                    Err(error) => log::warn!("Failed to encode schedule event: {error}"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Event log skipped {skipped} schedule events")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut stopped = playback.subscribe();
    tokio::spawn(async move {
        loop {
            match stopped.recv().await {
                Ok(stopped) => log::info!(
                    "[PLAYBACK] Alarm {} stopped ({:?})",
                    stopped.alarm_id,
                    stopped.reason
                ),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut alarms = storage.subscribe();
    tokio::spawn(async move {
        while alarms.changed().await.is_ok() {
            let count = alarms.borrow_and_update().len();
            log::debug!("[STORE] Alarm list now holds {count} alarms");
        }
    });
}
