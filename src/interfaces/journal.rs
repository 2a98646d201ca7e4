use async_trait::async_trait;
use crate::error::Result;
use crate::types::ids::{JournalId, PositionId, UserId};

/// Creates the empty journal/annotation record that accompanies every new
/// position. External collaborator; failures are logged, never fatal to the
/// committed transition.
#[async_trait]
pub trait JournalStore: Send + Sync {
    async fn create_empty(&self, position_id: PositionId, user_id: UserId) -> Result<JournalId>;
}
