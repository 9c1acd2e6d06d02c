//! In-memory event bus, useful for tests and local development where no
//! broker is running. Records every published frame per topic.

use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::{bus::EventBus, error::AppError, events::EventEnvelope};

#[derive(Default)]
pub struct MemoryEventBus {
    published: Mutex<Vec<(String, Vec<u8>)>>,
    fail_next: AtomicBool,
}

impl MemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next publish fail with a `Messaging` error, modeling a
    /// broker outage. One-shot: subsequent publishes succeed again.
    pub fn fail_next_publish(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// All frames published to `topic`, in publish order.
    pub fn published_on(&self, topic: &str) -> Vec<Vec<u8>> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, frame)| frame.clone())
            .collect()
    }

    /// Decodes every envelope published to `topic` into the given payload
    /// type. Panics on frames that do not match, so tests fail loudly.
    pub fn envelopes_on<T: DeserializeOwned>(&self, topic: &str) -> Vec<EventEnvelope<T>> {
        self.published_on(topic)
            .iter()
            .map(|frame| serde_json::from_slice(frame).expect("published frame must decode"))
            .collect()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, topic: &str, message: Vec<u8>) -> Result<(), AppError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AppError::Messaging(format!(
                "Broker unavailable for topic '{topic}'"
            )));
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), message));
        Ok(())
    }
}
