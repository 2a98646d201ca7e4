use async_trait::async_trait;
use crate::error::Result;
use crate::events::position::PositionEvent;

/// Fire-and-forget sink for position open/close events. Delivery is
/// at-least-once; consumers deduplicate on the event id.
#[async_trait]
pub trait PositionEventPublisher: Send + Sync {
    /// Returns the sequence assigned to the event by the transport.
    async fn publish(&self, event: PositionEvent) -> Result<u64>;
}
