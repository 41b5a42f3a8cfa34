use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use alarmclock_models::AlarmId;
use alarmclock_scheduler::{PlaybackController, TriggerEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

const STOPPED_CAPACITY: usize = 16;

pub trait AudioOutput: Send + Sync + 'static {
    fn start(&self, event: &TriggerEvent);
    fn stop(&self, alarm_id: AlarmId);
}

pub struct LogAudioOutput;

impl AudioOutput for LogAudioOutput {
    fn start(&self, event: &TriggerEvent) {
        log::info!(
            "[PLAYBACK] Playing alarm {} for {} minutes. [volume = {}, repeat = {}, shuffle = {}]",
            event.alarm_id,
            event.timeout_minutes,
            event.volume,
            event.repeat,
            event.shuffle
        );
    }

    fn stop(&self, alarm_id: AlarmId) {
        log::info!("[PLAYBACK] Stopped alarm {}", alarm_id);
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Timeout,
    Stopped,
    /// A newer fire of the same alarm took over.
    Superseded,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStopped {
    pub alarm_id: AlarmId,
    pub fire_at: DateTime<Utc>,
    pub reason: StopReason,
}

struct ActivePlayback {
    fire_at: DateTime<Utc>,
    cancellation_token: CancellationToken,
}

#[derive(Default)]
struct PlaybackState {
    active: HashMap<AlarmId, ActivePlayback>,
    // last fire started per alarm, to drop redelivered triggers
    played: HashMap<AlarmId, DateTime<Utc>>,
}

/// Runs playback for triggered alarms until their timeout or an explicit stop.
pub struct TimedPlayback {
    output: Arc<dyn AudioOutput>,
    state: Arc<Mutex<PlaybackState>>,
    stopped_tx: broadcast::Sender<PlaybackStopped>,
}

impl TimedPlayback {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        let (stopped_tx, _) = broadcast::channel(STOPPED_CAPACITY);

        Self {
            output,
            state: Arc::new(Mutex::new(PlaybackState::default())),
            stopped_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackStopped> {
        self.stopped_tx.subscribe()
    }

    pub fn is_playing(&self, alarm_id: AlarmId) -> bool {
        lock(&self.state).active.contains_key(&alarm_id)
    }

    /// Returns false when the alarm was not playing.
    pub fn stop(&self, alarm_id: AlarmId) -> bool {
        let active = lock(&self.state).active.remove(&alarm_id);
        self.finish(alarm_id, active, StopReason::Stopped)
    }

    /// Drops everything kept for a deleted alarm, stopping it if it still plays.
    pub fn forget(&self, alarm_id: AlarmId) {
        let active = {
            let mut state = lock(&self.state);
            state.played.remove(&alarm_id);
            state.active.remove(&alarm_id)
        };
        self.finish(alarm_id, active, StopReason::Removed);
    }

    fn finish(&self, alarm_id: AlarmId, active: Option<ActivePlayback>, reason: StopReason) -> bool {
        let Some(active) = active else {
            return false;
        };

        active.cancellation_token.cancel();
        self.output.stop(alarm_id);
        let _ = self.stopped_tx.send(PlaybackStopped {
            alarm_id,
            fire_at: active.fire_at,
            reason,
        });

        true
    }

    fn spawn_timeout(&self, alarm_id: AlarmId, fire_at: DateTime<Utc>, timeout: Duration, token: CancellationToken) {
        let state = Arc::clone(&self.state);
        let output = Arc::clone(&self.output);
        let stopped_tx = self.stopped_tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    let timed_out = {
                        let mut state = lock(&state);
                        let current = state.active.get(&alarm_id).is_some_and(|active| active.fire_at == fire_at);
                        if current {
                            state.active.remove(&alarm_id);
                        }
                        current
                    };

                    if timed_out {
                        log::info!("[PLAYBACK] Alarm {} reached its timeout", alarm_id);
                        output.stop(alarm_id);
                        let _ = stopped_tx.send(PlaybackStopped {
                            alarm_id,
                            fire_at,
                            reason: StopReason::Timeout,
                        });
                    }
                }
            }
        });
    }
}

#[async_trait]
impl PlaybackController for TimedPlayback {
    async fn handle_trigger(&self, event: TriggerEvent) {
        let alarm_id = event.alarm_id;
        let timeout = Duration::from_secs(u64::from(event.timeout_minutes) * 60);
        let token = CancellationToken::new();

        {
            let mut state = lock(&self.state);
            if state.played.get(&alarm_id) == Some(&event.fire_at) {
                log::debug!(
                    "Ignoring repeated trigger. [alarm_id = {}, fire_at = {}]",
                    alarm_id,
                    event.fire_at
                );
                return;
            }
            state.played.insert(alarm_id, event.fire_at);

            if let Some(previous) = state.active.remove(&alarm_id) {
                previous.cancellation_token.cancel();
                self.output.stop(alarm_id);
                let _ = self.stopped_tx.send(PlaybackStopped {
                    alarm_id,
                    fire_at: previous.fire_at,
                    reason: StopReason::Superseded,
                });
            }

            self.output.start(&event);
            state.active.insert(
                alarm_id,
                ActivePlayback {
                    fire_at: event.fire_at,
                    cancellation_token: token.clone(),
                },
            );
        }

        self.spawn_timeout(alarm_id, event.fire_at, timeout, token);
    }
}

fn lock(state: &Mutex<PlaybackState>) -> MutexGuard<'_, PlaybackState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
