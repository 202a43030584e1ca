//! Domain events emitted by FileNest operations.
//!
//! Every committed folder-tree mutation publishes one event. Listeners use
//! it to decide whether a listing they display is stale.

pub mod tree;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use tree::TreeEvent;

/// Wrapper for a domain event with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    pub payload: TreeEvent,
}

impl DomainEvent {
    /// Create a new domain event.
    pub fn new(payload: TreeEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }
}
