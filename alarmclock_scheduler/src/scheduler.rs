use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use alarmclock_models::{AlarmId, AlarmRecord};
use alarmclock_storage::{AlarmChange, AlarmObserver};
use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use tokio::{
    sync::{Notify, broadcast},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    Clock, NonWorkingDaysPolicy, PlaybackController, RecurrenceEvaluator, ScheduleEvent,
    SchedulingInvariantError, TriggerEvent, WorkCalendar,
};

const DEFAULT_MAX_SLEEP: Duration = Duration::from_secs(60);
const EVENTS_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    pub timezone: Tz,
    pub policy: NonWorkingDaysPolicy,
    /// Upper bound on a single wait, so wall-clock jumps are picked up.
    pub max_sleep: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            policy: NonWorkingDaysPolicy::default(),
            max_sleep: DEFAULT_MAX_SLEEP,
        }
    }
}

struct ScheduledAlarm {
    alarm: AlarmRecord,
    /// Computed for disabled alarms too; only enabled ones sit in `pending`.
    next_fire: Option<DateTime<Utc>>,
    last_fired: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct ScheduleState {
    alarms: HashMap<AlarmId, ScheduledAlarm>,
    // ordered by instant, then by id
    pending: BTreeSet<(DateTime<Utc>, AlarmId)>,
}

/// Single owner of the pending-fire ordering.
pub struct TriggerScheduler {
    state: Mutex<ScheduleState>,
    wakeup: Notify,
    clock: Arc<dyn Clock>,
    calendar: Arc<dyn WorkCalendar>,
    evaluator: RecurrenceEvaluator,
    timezone: Tz,
    max_sleep: Duration,
    events: broadcast::Sender<ScheduleEvent>,
}

pub struct SchedulerHandle {
    task_handle: JoinHandle<()>,
    cancellation_token: CancellationToken,
}

impl SchedulerHandle {
    /// Cancels the pending wait and waits for the loop to exit. Nothing fires after this.
    pub async fn shutdown(self) {
        self.cancellation_token.cancel();
        if let Err(error) = self.task_handle.await {
            log::error!("Scheduler task failed while shutting down: {error}");
        }
    }
}

impl TriggerScheduler {
    pub fn new(
        clock: Arc<dyn Clock>,
        calendar: Arc<dyn WorkCalendar>,
        options: SchedulerOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENTS_CAPACITY);

        Self {
            state: Mutex::new(ScheduleState::default()),
            wakeup: Notify::new(),
            clock,
            calendar,
            evaluator: RecurrenceEvaluator::new(options.policy),
            timezone: options.timezone,
            max_sleep: options.max_sleep,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScheduleEvent> {
        self.events.subscribe()
    }

    /// Replaces the scheduling copy of an alarm and recomputes its pending entry.
    pub fn upsert_alarm(&self, alarm: AlarmRecord) {
        let now = self.clock.now();
        {
            let mut state = self.lock_state();
            self.schedule(&mut state, alarm, now);
        }
        self.wakeup.notify_one();
    }

    pub fn remove_alarm(&self, id: AlarmId) {
        {
            let mut state = self.lock_state();
            let state = &mut *state;
            if let Some(previous) = state.alarms.remove(&id) {
                let was_pending = previous
                    .next_fire
                    .is_some_and(|at| state.pending.remove(&(at, id)));
                log::info!("[UNSCHEDULE] Alarm {} removed", id);
                if was_pending {
                    self.emit(ScheduleEvent::Unscheduled { alarm_id: id });
                }
            }
        }
        self.wakeup.notify_one();
    }

    /// Recomputes every alarm from the current clock, e.g. after the holiday set changed.
    pub fn recompute_all(&self) {
        let now = self.clock.now();
        {
            let mut state = self.lock_state();
            let alarms: Vec<AlarmRecord> =
                state.alarms.values().map(|entry| entry.alarm.clone()).collect();
            for alarm in alarms {
                self.schedule(&mut state, alarm, now);
            }
        }
        self.wakeup.notify_one();
    }

    pub fn next_fire(&self, id: AlarmId) -> Option<DateTime<Utc>> {
        self.lock_state()
            .alarms
            .get(&id)
            .and_then(|entry| entry.next_fire)
    }

    pub fn pending(&self) -> Vec<(DateTime<Utc>, AlarmId)> {
        self.lock_state().pending.iter().copied().collect()
    }

    pub fn next_pending(&self) -> Option<(DateTime<Utc>, AlarmId)> {
        self.lock_state().pending.first().copied()
    }

    /// Pops every entry due at the current clock, in order, and re-inserts each
    /// alarm's following occurrence.
    pub fn fire_due(&self) -> Vec<TriggerEvent> {
        let now = self.clock.now();
        let mut guard = self.lock_state();
        let state = &mut *guard;
        let mut fired = Vec::new();

        while let Some(&(at, id)) = state.pending.first() {
            if at > now {
                break;
            }
            state.pending.pop_first();

            let Some(entry) = state.alarms.get_mut(&id) else {
                log::warn!("Dropping pending fire of unknown alarm. [alarm_id = {id}, at = {at}]");
                continue;
            };
            if !entry.alarm.enabled {
                log::warn!("Dropping pending fire of disabled alarm. [alarm_id = {id}, at = {at}]");
                continue;
            }

            let event = TriggerEvent::new(&entry.alarm, at);
            log::info!("[TRIGGER] Alarm {} fired for {}", id, at);

            entry.last_fired = Some(at);
            entry.next_fire = self.compute_next(&entry.alarm, now, entry.last_fired);
            if let Some(next) = entry.next_fire {
                state.pending.insert((next, id));
                log::info!("[SCHEDULE] Alarm {} next fires at {}", id, next);
                self.emit(ScheduleEvent::Scheduled {
                    alarm_id: id,
                    fire_at: next,
                });
            }

            self.emit(ScheduleEvent::Triggered(event.clone()));
            fired.push(event);
        }

        fired
    }

    pub fn spawn(self: &Arc<Self>, playback: Arc<dyn PlaybackController>) -> SchedulerHandle {
        let cancellation_token = CancellationToken::new();
        let task_cancellation_token = cancellation_token.child_token();
        let scheduler = Arc::clone(self);

        let task_handle = tokio::spawn(async move {
            scheduler.run(playback, task_cancellation_token).await;
        });

        SchedulerHandle {
            task_handle,
            cancellation_token,
        }
    }

    pub async fn run(
        self: Arc<Self>,
        playback: Arc<dyn PlaybackController>,
        shutdown: CancellationToken,
    ) {
        log::info!("[SCHEDULER] Started. [timezone = {}]", self.timezone);

        while !shutdown.is_cancelled() {
            for event in self.fire_due() {
                playback.handle_trigger(event).await;
            }

            let sleep_for = self
                .time_until_next()
                .map_or(self.max_sleep, |delay| delay.min(self.max_sleep));

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = self.wakeup.notified() => {
                    log::debug!("[SCHEDULER] Woken up by an alarm change");
                }
                _ = tokio::time::sleep(sleep_for) => {}
            }
        }

        log::info!("[SCHEDULER] Shutting down");
    }

    fn time_until_next(&self) -> Option<Duration> {
        let (at, _) = self.next_pending()?;
        Some((at - self.clock.now()).to_std().unwrap_or(Duration::ZERO))
    }

    fn schedule(&self, state: &mut ScheduleState, alarm: AlarmRecord, now: DateTime<Utc>) {
        let id = alarm.id;
        let (last_fired, was_pending, overdue) = match state.alarms.remove(&id) {
            Some(previous) => {
                let was_pending = previous
                    .next_fire
                    .is_some_and(|at| state.pending.remove(&(at, id)));
                // a due fire the run loop has not reached yet survives unless the pattern changed
                let overdue = previous.next_fire.filter(|at| {
                    was_pending && *at <= now && alarm.enabled && same_pattern(&previous.alarm, &alarm)
                });
                (previous.last_fired, was_pending, overdue)
            }
            None => (None, false, None),
        };

        let next_fire = overdue.or_else(|| self.compute_next(&alarm, now, last_fired));
        match next_fire {
            Some(at) if alarm.enabled => {
                state.pending.insert((at, id));
                if overdue.is_some() {
                    log::debug!("Alarm {} keeps its due fire at {}", id, at);
                } else {
                    log::info!("[SCHEDULE] Alarm {} next fires at {}", id, at);
                    self.emit(ScheduleEvent::Scheduled {
                        alarm_id: id,
                        fire_at: at,
                    });
                }
            }
            _ => {
                if next_fire.is_none() {
                    log::debug!("Alarm {} has no selectable day and never fires", id);
                }
                if was_pending {
                    log::info!("[UNSCHEDULE] Alarm {} has no pending fire", id);
                    self.emit(ScheduleEvent::Unscheduled { alarm_id: id });
                }
            }
        }

        state.alarms.insert(
            id,
            ScheduledAlarm {
                alarm,
                next_fire,
                last_fired,
            },
        );
    }

    /// Always derived from the current clock, never from a previous target plus an offset.
    fn compute_next(
        &self,
        alarm: &AlarmRecord,
        now: DateTime<Utc>,
        last_fired: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        let not_before = last_fired.map_or(now, |fired| now.max(fired + TimeDelta::seconds(1)));
        let next = self.evaluator.next_occurrence(
            alarm,
            not_before,
            self.timezone,
            self.calendar.as_ref(),
        )?;

        if next < now {
            let error = SchedulingInvariantError {
                alarm_id: alarm.id,
                computed: next,
                now,
            };
            log::error!("{error}");

            return self
                .evaluator
                .next_occurrence(alarm, now, self.timezone, self.calendar.as_ref())
                .filter(|at| *at >= now);
        }

        Some(next)
    }

    fn emit(&self, event: ScheduleEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn lock_state(&self) -> MutexGuard<'_, ScheduleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn same_pattern(previous: &AlarmRecord, current: &AlarmRecord) -> bool {
    previous.time == current.time
        && previous.days == current.days
        && previous.non_working_days == current.non_working_days
}

impl AlarmObserver for TriggerScheduler {
    fn alarm_changed(&self, change: &AlarmChange) {
        match change {
            AlarmChange::Upserted(alarm) => self.upsert_alarm(alarm.clone()),
            AlarmChange::Removed(id) => self.remove_alarm(*id),
        }
    }
}
