use alarmclock_models::AlarmId;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Recomputation produced an instant before the clock. Logged and corrected,
/// never returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Next fire for alarm {alarm_id} at {computed} is before now ({now})")]
pub struct SchedulingInvariantError {
    pub alarm_id: AlarmId,
    pub computed: DateTime<Utc>,
    pub now: DateTime<Utc>,
}
