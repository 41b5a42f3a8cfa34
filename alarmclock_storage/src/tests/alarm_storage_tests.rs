use std::sync::{Arc, Mutex};

use alarmclock_models::{AlarmTime, ValidationError, WeekDays};
use chrono::Weekday;

use crate::{
    AlarmChange, AlarmObserver, AlarmStorage, InMemoryAlarmStorage, NewAlarm, StoreError,
    UpdateAlarm,
};

type ReceivedChanges = Arc<Mutex<Vec<AlarmChange>>>;

struct RecordingObserver {
    received_changes: ReceivedChanges,
}

impl AlarmObserver for RecordingObserver {
    fn alarm_changed(&self, change: &AlarmChange) {
        self.received_changes.lock().unwrap().push(change.clone());
    }
}

struct TestContext {
    received_changes: ReceivedChanges,
    storage: InMemoryAlarmStorage,
}

impl TestContext {
    fn new() -> Self {
        let received_changes = Arc::new(Mutex::new(Vec::new()));
        let observer = RecordingObserver {
            received_changes: received_changes.clone(),
        };
        let storage = InMemoryAlarmStorage::new().with_observer(Arc::new(observer));

        Self {
            received_changes,
            storage,
        }
    }

    fn changes(&self) -> Vec<AlarmChange> {
        self.received_changes.lock().unwrap().clone()
    }
}

fn alarm_at(hour: u32, minute: u32) -> NewAlarm {
    NewAlarm::at(AlarmTime::new(hour, minute).unwrap()).on_days(WeekDays::WORKDAYS)
}

#[tokio::test]
async fn add_assigns_fresh_ids_and_enables_alarm() {
    let ctx = TestContext::new();

    let first = ctx.storage.add(alarm_at(7, 0)).await.unwrap();
    let second = ctx.storage.add(alarm_at(8, 30)).await.unwrap();

    assert_ne!(first.id, second.id);
    assert!(first.enabled && second.enabled);
    assert_eq!(first.days, WeekDays::WORKDAYS);

    let ids: Vec<_> = ctx.storage.list().await.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![first.id, second.id], "list keeps creation order");
}

#[tokio::test]
async fn add_rejects_invalid_fields_without_mutation() {
    let ctx = TestContext::new();

    let mut zero_timeout = alarm_at(7, 0);
    zero_timeout.timeout_minutes = 0;
    let mut too_loud = alarm_at(7, 0);
    too_loud.volume = 101;

    assert_eq!(
        ctx.storage.add(zero_timeout).await,
        Err(StoreError::Validation(ValidationError::Timeout(0)))
    );
    assert_eq!(
        ctx.storage.add(too_loud).await,
        Err(StoreError::Validation(ValidationError::Volume(101)))
    );
    assert!(ctx.storage.list().await.is_empty());
    assert!(ctx.changes().is_empty());
}

#[tokio::test]
async fn remove_unknown_id_fails_and_leaves_store_unchanged() {
    let ctx = TestContext::new();
    let alarm = ctx.storage.add(alarm_at(7, 0)).await.unwrap();
    let before = ctx.storage.list().await;

    assert_eq!(ctx.storage.remove(42).await, Err(StoreError::NotFound(42)));

    assert_eq!(ctx.storage.list().await, before);
    assert_eq!(ctx.changes(), vec![AlarmChange::Upserted(alarm)]);
}

#[tokio::test]
async fn second_remove_fails() {
    let ctx = TestContext::new();
    let alarm = ctx.storage.add(alarm_at(7, 0)).await.unwrap();

    ctx.storage.remove(alarm.id).await.unwrap();

    assert_eq!(
        ctx.storage.remove(alarm.id).await,
        Err(StoreError::NotFound(alarm.id))
    );
    assert_eq!(
        ctx.storage.get(alarm.id).await,
        Err(StoreError::NotFound(alarm.id))
    );
}

#[tokio::test]
async fn toggle_flips_enabled_and_notifies() {
    let ctx = TestContext::new();
    let alarm = ctx.storage.add(alarm_at(7, 0)).await.unwrap();

    assert_eq!(ctx.storage.toggle(alarm.id).await, Ok(false));
    assert!(!ctx.storage.get(alarm.id).await.unwrap().enabled);
    assert_eq!(ctx.storage.toggle(alarm.id).await, Ok(true));
    assert_eq!(ctx.storage.toggle(99).await, Err(StoreError::NotFound(99)));

    let enabled_states: Vec<bool> = ctx
        .changes()
        .iter()
        .filter_map(|change| match change {
            AlarmChange::Upserted(alarm) => Some(alarm.enabled),
            AlarmChange::Removed(_) => None,
        })
        .collect();
    assert_eq!(enabled_states, vec![true, false, true]);
}

#[tokio::test]
async fn edit_keeps_unspecified_fields_and_position() {
    let ctx = TestContext::new();
    let first = ctx.storage.add(alarm_at(7, 0)).await.unwrap();
    let second = ctx.storage.add(alarm_at(9, 0)).await.unwrap();
    ctx.storage.toggle(first.id).await.unwrap();

    let update = UpdateAlarm {
        time: Some(AlarmTime::new(6, 45).unwrap()),
        volume: Some(80),
        ..UpdateAlarm::new(first.id)
    };
    let edited = ctx.storage.edit(update).await.unwrap();

    assert_eq!(edited.id, first.id);
    assert_eq!(edited.time.to_string(), "06:45");
    assert_eq!(edited.volume, 80);
    assert_eq!(edited.days, first.days);
    assert_eq!(edited.timeout_minutes, first.timeout_minutes);
    assert!(!edited.enabled, "edit does not re-enable a disabled alarm");

    let ids: Vec<_> = ctx.storage.list().await.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
}

#[tokio::test]
async fn invalid_edit_is_not_applied() {
    let ctx = TestContext::new();
    let alarm = ctx.storage.add(alarm_at(7, 0)).await.unwrap();

    let update = UpdateAlarm {
        timeout_minutes: Some(0),
        days: Some(WeekDays::NONE.with(Weekday::Sun)),
        ..UpdateAlarm::new(alarm.id)
    };

    assert_eq!(
        ctx.storage.edit(update).await,
        Err(StoreError::Validation(ValidationError::Timeout(0)))
    );
    assert_eq!(ctx.storage.get(alarm.id).await.unwrap(), alarm);
    assert_eq!(
        ctx.storage.edit(UpdateAlarm::new(77)).await,
        Err(StoreError::NotFound(77))
    );
}

#[tokio::test]
async fn subscribers_observe_the_latest_list() {
    let ctx = TestContext::new();
    let mut rx = ctx.storage.subscribe();
    assert!(rx.borrow().is_empty());

    let alarm = ctx.storage.add(alarm_at(7, 0)).await.unwrap();
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().as_slice(), &[alarm.clone()]);

    ctx.storage.remove(alarm.id).await.unwrap();
    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().is_empty());
}
