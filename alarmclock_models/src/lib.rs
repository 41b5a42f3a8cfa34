pub mod alarm;
pub mod validation;

pub use alarm::{AlarmId, AlarmRecord, AlarmTime, RawAlarmTime, WeekDays};
pub use validation::ValidationError;
