use alarmclock_models::{AlarmId, ValidationError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Alarm does not exist {0}")]
    NotFound(AlarmId),
}
