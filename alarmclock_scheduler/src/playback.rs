use async_trait::async_trait;

use crate::TriggerEvent;

/// Receives trigger events. Delivery is at-least-once: the same `fire_at`
/// may arrive twice and implementations are expected to play it once.
#[async_trait]
pub trait PlaybackController: Send + Sync + 'static {
    async fn handle_trigger(&self, event: TriggerEvent);
}
