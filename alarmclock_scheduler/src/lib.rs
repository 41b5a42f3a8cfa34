mod calendar;
mod clock;
mod error;
mod playback;
mod recurrence;
mod scheduler;
mod trigger;

pub use calendar::{HolidayCalendar, WorkCalendar};
pub use clock::{Clock, SimulatedClock, SystemClock};
pub use error::SchedulingInvariantError;
pub use playback::PlaybackController;
pub use recurrence::{NonWorkingDaysPolicy, RecurrenceEvaluator};
pub use scheduler::{SchedulerHandle, SchedulerOptions, TriggerScheduler};
pub use trigger::{ScheduleEvent, TriggerEvent};
