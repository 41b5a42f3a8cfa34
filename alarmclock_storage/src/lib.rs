mod alarm_storage;
mod error;
mod model;
mod observer;

pub use alarm_storage::{AlarmList, AlarmStorage, InMemoryAlarmStorage};
pub use error::StoreError;
pub use model::{NewAlarm, UpdateAlarm};
pub use observer::{AlarmChange, AlarmObserver};

#[cfg(test)]
mod tests;
