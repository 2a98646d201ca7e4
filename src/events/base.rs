use serde::{Deserialize, Serialize};
use sha2::{Sha256, Digest};
use crate::types::ids::EventId;
use crate::types::timestamp::Timestamp;

/// Envelope shared by all domain events. Delivery is at-least-once; the
/// event id plus checksum lets consumers deduplicate and verify integrity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BaseEvent {
    pub event_id: EventId,
    pub event_type: EventType,
    pub timestamp: Timestamp,
    pub sequence: u64,  // Set by the publisher
    pub checksum: String,
}

impl BaseEvent {
    pub fn new(event_type: EventType) -> Self {
        let mut event = BaseEvent {
            event_id: EventId::new(),
            event_type,
            timestamp: Timestamp::now(),
            sequence: 0,
            checksum: String::new(),
        };
        event.checksum = event.calculate_checksum();
        event
    }

    /// Stamps the transport-assigned sequence. The checksum covers the
    /// sequence, so it is recomputed here.
    pub fn set_sequence(&mut self, sequence: u64) {
        self.sequence = sequence;
        self.checksum = self.calculate_checksum();
    }

    pub fn calculate_checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.event_id.0.as_bytes());
        hasher.update(self.sequence.to_le_bytes());
        hasher.update(self.timestamp.as_millis().to_le_bytes());
        hasher.update(format!("{:?}", self.event_type).as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn verify_checksum(&self) -> bool {
        self.checksum == self.calculate_checksum()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    PositionOpened,
    PositionClosed,
}
