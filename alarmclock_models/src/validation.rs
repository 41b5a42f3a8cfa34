use thiserror::Error;

use crate::alarm::AlarmTime;

pub const MAX_VOLUME: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Hour must be between 0 and 23, got {0}")]
    Hour(i64),

    #[error("Minute must be between 0 and 59, got {0}")]
    Minute(i64),

    #[error("Timeout must be a positive number of minutes, got {0}")]
    Timeout(i64),

    #[error("Volume must be between 0 and 100, got {0}")]
    Volume(i64),
}

pub fn alarm_time(hour: i64, minute: i64) -> Result<AlarmTime, ValidationError> {
    let hour = u32::try_from(hour).map_err(|_| ValidationError::Hour(hour))?;
    let minute = u32::try_from(minute).map_err(|_| ValidationError::Minute(minute))?;

    AlarmTime::new(hour, minute)
}

pub fn timeout_minutes(timeout: i64) -> Result<u32, ValidationError> {
    match u32::try_from(timeout) {
        Ok(minutes) if minutes > 0 => Ok(minutes),
        _ => Err(ValidationError::Timeout(timeout)),
    }
}

pub fn volume(volume: i64) -> Result<u8, ValidationError> {
    match u8::try_from(volume) {
        Ok(volume) if volume <= MAX_VOLUME => Ok(volume),
        _ => Err(ValidationError::Volume(volume)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_values_are_rejected() {
        assert_eq!(alarm_time(-1, 0), Err(ValidationError::Hour(-1)));
        assert_eq!(alarm_time(0, -5), Err(ValidationError::Minute(-5)));
        assert_eq!(timeout_minutes(-3), Err(ValidationError::Timeout(-3)));
        assert_eq!(volume(-1), Err(ValidationError::Volume(-1)));
    }

    #[test]
    fn bounds_are_inclusive() {
        assert_eq!(alarm_time(0, 0).unwrap().to_string(), "00:00");
        assert_eq!(alarm_time(23, 59).unwrap().to_string(), "23:59");
        assert_eq!(volume(0), Ok(0));
        assert_eq!(volume(100), Ok(100));
        assert_eq!(volume(101), Err(ValidationError::Volume(101)));
        assert_eq!(timeout_minutes(0), Err(ValidationError::Timeout(0)));
        assert_eq!(timeout_minutes(1), Ok(1));
    }
}
