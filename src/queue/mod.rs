//! Queue contract between the find and do stages.
//!
//! One message describes one (resource, operation, cycle) triple. The queue
//! itself delivers at least once; everything above it (cycle expiration,
//! operation idempotence, the one-op-per-resource rule) turns that into
//! at-most-one successful invocation per cycle.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::catalog::{OpTag, Service, Tag};
use crate::clock::CycleInstant;
use crate::errors::QueueError;

/// One queued operation request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpRequest {
    pub cycle_start: CycleInstant,
    pub service: Service,
    pub rsrc_type: String,
    pub rsrc_id: String,
    pub op: OpTag,
    /// The resource's full tag list at discovery time, for child-tag
    /// propagation
    pub tags: Vec<Tag>,
    /// Operation-specific arguments, e.g. a stack's parameter-key list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_kwargs: Option<Value>,
}

impl OpRequest {
    /// Serialize, enforcing the configured payload cap before send
    pub fn encode(&self, bytes_max: usize) -> Result<String, QueueError> {
        let body = serde_json::to_string(self).map_err(|e| QueueError::Send {
            reason: format!("request failed to serialize: {}", e),
        })?;
        if body.len() > bytes_max {
            return Err(QueueError::Oversize {
                bytes: body.len(),
                cap: bytes_max,
            });
        }
        Ok(body)
    }

    pub fn decode(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

/// One delivery of a queued message
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub id: String,
    /// Delivery-scoped handle used to acknowledge or release
    pub receipt: String,
    pub body: String,
    /// How many times this message has been delivered, this one included
    pub receive_count: u32,
}

/// The durable queue linking the two stages.
///
/// Implementations must be safe for concurrent use; the find stage sends
/// from parallel scans and every do worker receives independently.
#[async_trait]
pub trait OpQueue: Send + Sync {
    async fn send(&self, body: &str) -> Result<(), QueueError>;

    /// Long-polling receive of up to `max` messages
    async fn receive(&self, max: usize, wait: Duration) -> Result<Vec<QueueMessage>, QueueError>;

    /// Acknowledge: the message is done and must not redeliver
    async fn delete(&self, receipt: &str) -> Result<(), QueueError>;

    /// Make the message immediately visible again for redelivery
    async fn release(&self, receipt: &str) -> Result<(), QueueError>;

    /// Route a message to the dead-letter channel for human inspection
    async fn dead_letter(&self, msg: &QueueMessage) -> Result<(), QueueError>;
}
