use std::{collections::BTreeMap, sync::Arc};

use alarmclock_models::{AlarmId, AlarmRecord};
use async_trait::async_trait;
use tokio::sync::{RwLock, watch};

use crate::{AlarmChange, AlarmObserver, NewAlarm, StoreError, UpdateAlarm};

/// Snapshot of every alarm in creation order.
pub type AlarmList = Arc<Vec<AlarmRecord>>;

#[async_trait]
pub trait AlarmStorage: Send + Sync {
    async fn add(&self, alarm: NewAlarm) -> Result<AlarmRecord, StoreError>;
    async fn remove(&self, id: AlarmId) -> Result<(), StoreError>;
    async fn toggle(&self, id: AlarmId) -> Result<bool, StoreError>;
    async fn edit(&self, update: UpdateAlarm) -> Result<AlarmRecord, StoreError>;
    async fn get(&self, id: AlarmId) -> Result<AlarmRecord, StoreError>;
    async fn list(&self) -> Vec<AlarmRecord>;

    /// Receives the full alarm list after every mutation.
    fn subscribe(&self) -> watch::Receiver<AlarmList>;
}

struct AlarmStore {
    next_id: AlarmId,
    // ids are handed out in increasing order, so key order is creation order
    alarms: BTreeMap<AlarmId, AlarmRecord>,
}

pub struct InMemoryAlarmStorage {
    store: RwLock<AlarmStore>,
    observers: Vec<Arc<dyn AlarmObserver>>,
    list_tx: watch::Sender<AlarmList>,
}

impl InMemoryAlarmStorage {
    pub fn new() -> Self {
        let (list_tx, _) = watch::channel(Arc::new(Vec::new()));

        InMemoryAlarmStorage {
            store: RwLock::new(AlarmStore {
                next_id: 1,
                alarms: BTreeMap::new(),
            }),
            observers: Vec::new(),
            list_tx,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn AlarmObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    fn publish(&self, store: &AlarmStore, change: AlarmChange) {
        for observer in &self.observers {
            observer.alarm_changed(&change);
        }

        let list: Vec<AlarmRecord> = store.alarms.values().cloned().collect();
        self.list_tx.send_replace(Arc::new(list));
    }
}

impl Default for InMemoryAlarmStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlarmStorage for InMemoryAlarmStorage {
    async fn add(&self, alarm: NewAlarm) -> Result<AlarmRecord, StoreError> {
        alarm.validate()?;

        let mut store = self.store.write().await;
        let id = store.next_id;
        let record = alarm.into_record(id);

        store.alarms.insert(id, record.clone());
        store.next_id += 1;

        log::info!("[STORE] Added alarm {} at {} on {}", id, record.time, record.days);
        self.publish(&store, AlarmChange::Upserted(record.clone()));

        Ok(record)
    }

    async fn remove(&self, id: AlarmId) -> Result<(), StoreError> {
        let mut store = self.store.write().await;
        if store.alarms.remove(&id).is_none() {
            return Err(StoreError::NotFound(id));
        }

        log::info!("[STORE] Removed alarm {}", id);
        self.publish(&store, AlarmChange::Removed(id));

        Ok(())
    }

    async fn toggle(&self, id: AlarmId) -> Result<bool, StoreError> {
        let mut store = self.store.write().await;
        let alarm = store.alarms.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        alarm.enabled = !alarm.enabled;

        let record = alarm.clone();
        log::info!("[STORE] Alarm {} enabled = {}", id, record.enabled);
        self.publish(&store, AlarmChange::Upserted(record.clone()));

        Ok(record.enabled)
    }

    async fn edit(&self, update: UpdateAlarm) -> Result<AlarmRecord, StoreError> {
        let mut store = self.store.write().await;
        let current = store
            .alarms
            .get(&update.id)
            .ok_or(StoreError::NotFound(update.id))?;

        let edited = update.apply_to(current)?;
        store.alarms.insert(edited.id, edited.clone());

        log::info!("[STORE] Edited alarm {}", edited.id);
        self.publish(&store, AlarmChange::Upserted(edited.clone()));

        Ok(edited)
    }

    async fn get(&self, id: AlarmId) -> Result<AlarmRecord, StoreError> {
        let store = self.store.read().await;
        store.alarms.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn list(&self) -> Vec<AlarmRecord> {
        let store = self.store.read().await;
        store.alarms.values().cloned().collect()
    }

    fn subscribe(&self) -> watch::Receiver<AlarmList> {
        self.list_tx.subscribe()
    }
}
