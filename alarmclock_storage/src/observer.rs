use alarmclock_models::{AlarmId, AlarmRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmChange {
    /// Added, edited or toggled. Carries the record as stored after the change.
    Upserted(AlarmRecord),
    Removed(AlarmId),
}

impl AlarmChange {
    pub fn alarm_id(&self) -> AlarmId {
        match self {
            AlarmChange::Upserted(alarm) => alarm.id,
            AlarmChange::Removed(id) => *id,
        }
    }
}

/// Called synchronously while the store still holds its write lock, so an
/// observer sees changes in the same order they were applied.
pub trait AlarmObserver: Send + Sync {
    fn alarm_changed(&self, change: &AlarmChange);
}
