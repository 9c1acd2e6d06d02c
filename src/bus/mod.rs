//! Event channel abstraction: a flat namespace of named topics carrying
//! JSON envelopes. The RabbitMQ implementation lives in [`rabbit`]; an
//! in-memory implementation for tests lives in [`memory`].

pub mod memory;
pub mod rabbit;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;

use crate::{error::AppError, events::EventEnvelope};

#[async_trait]
pub trait EventBus: Send + Sync {
    /// Writes one already-encoded message to the named topic.
    async fn publish(&self, topic: &str, message: Vec<u8>) -> Result<(), AppError>;
}

/// Wraps outbound payloads in the common envelope before handing them to
/// the bus. Callers must only publish state that is already durably
/// committed; a publish failure is surfaced but never rolls anything back.
#[derive(Clone)]
pub struct EventPublisher {
    bus: Arc<dyn EventBus>,
    origin_service: String,
}

impl EventPublisher {
    pub fn new(bus: Arc<dyn EventBus>, origin_service: impl Into<String>) -> Self {
        Self {
            bus,
            origin_service: origin_service.into(),
        }
    }

    pub async fn publish<T: Serialize + Send>(
        &self,
        topic: &str,
        event_type: &str,
        data: T,
    ) -> Result<(), AppError> {
        let envelope = EventEnvelope {
            event_type: event_type.to_string(),
            data,
            timestamp: Utc::now(),
            origin_service: self.origin_service.clone(),
        };
        let message = serde_json::to_vec(&envelope)
            .map_err(|err| AppError::Messaging(format!("Failed to encode {event_type}: {err}")))?;

        self.bus.publish(topic, message).await?;
        tracing::info!("Published {} to topic '{}'", event_type, topic);
        Ok(())
    }
}
