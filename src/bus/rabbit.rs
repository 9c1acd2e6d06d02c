//! RabbitMQ-backed event channel.
//!
//! Topology: every logical topic is a durable fanout exchange. Each
//! consuming service gets its own durable queue (`<service>.<topic>`)
//! bound to that exchange, with a companion dead-letter exchange/queue
//! (`<topic>.dlx` / `<service>.<topic>.dlq`). A handler that returns `Err`
//! gets its message nacked without requeue, which routes it to the DLQ for
//! operator inspection instead of being silently dropped.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures_lite::StreamExt;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind,
    message::Delivery,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
        ConfirmSelectOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    publisher_confirm::Confirmation,
    types::{AMQPValue, FieldTable},
};

use crate::{bus::EventBus, error::AppError, state::AppState};

/// Signature every consumer handler must have: `Ok` means the message is
/// done (ack), `Err` means it goes to the dead-letter queue (nack).
pub type ConsumerHandler = fn(Delivery, Arc<AppState>) -> BoxFuture<'static, Result<()>>;

pub async fn connect(amqp_url: &str) -> Result<Connection> {
    let connection = Connection::connect(amqp_url, ConnectionProperties::default())
        .await
        .context("Failed to connect to RabbitMQ")?;
    Ok(connection)
}

pub struct RabbitEventBus {
    channel: Channel,
}

impl RabbitEventBus {
    /// Opens a publishing channel with confirms enabled and declares the
    /// exchanges for the given topics.
    pub async fn new(connection: &Connection, topics: &[&str]) -> Result<Self> {
        let channel = connection
            .create_channel()
            .await
            .context("Failed to create a publish channel")?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .context("Failed to enable publisher confirms")?;

        for topic in topics {
            declare_topic_exchange(&channel, topic).await?;
        }

        Ok(Self { channel })
    }
}

#[async_trait]
impl EventBus for RabbitEventBus {
    async fn publish(&self, topic: &str, message: Vec<u8>) -> Result<(), AppError> {
        let confirmation = self
            .channel
            .basic_publish(
                topic,
                "",
                BasicPublishOptions::default(),
                &message,
                BasicProperties::default().with_content_type("application/json".into()),
            )
            .await?
            .await?;

        match confirmation {
            Confirmation::Nack(_) => Err(AppError::Messaging(format!(
                "Broker nacked publish to topic '{topic}'"
            ))),
            _ => Ok(()),
        }
    }
}

async fn declare_topic_exchange(channel: &Channel, topic: &str) -> Result<()> {
    channel
        .exchange_declare(
            topic,
            ExchangeKind::Fanout,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .with_context(|| format!("Failed to declare exchange '{topic}'"))?;
    Ok(())
}

/// Declares the consume-side topology for one topic and returns the queue
/// name the service should consume from.
async fn declare_consumer_queue(channel: &Channel, service: &str, topic: &str) -> Result<String> {
    declare_topic_exchange(channel, topic).await?;

    let dlx = format!("{topic}.dlx");
    let dlq = format!("{service}.{topic}.dlq");
    channel
        .exchange_declare(
            &dlx,
            ExchangeKind::Fanout,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .with_context(|| format!("Failed to declare dead-letter exchange '{dlx}'"))?;
    channel
        .queue_declare(
            &dlq,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .with_context(|| format!("Failed to declare dead-letter queue '{dlq}'"))?;
    channel
        .queue_bind(&dlq, &dlx, "", QueueBindOptions::default(), FieldTable::default())
        .await
        .with_context(|| format!("Failed to bind '{dlq}' to '{dlx}'"))?;

    let queue = format!("{service}.{topic}");
    let mut args = FieldTable::default();
    args.insert("x-dead-letter-exchange".into(), AMQPValue::LongString(dlx.into()));
    channel
        .queue_declare(
            &queue,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            args,
        )
        .await
        .with_context(|| format!("Failed to declare queue '{queue}'"))?;
    channel
        .queue_bind(&queue, topic, "", QueueBindOptions::default(), FieldTable::default())
        .await
        .with_context(|| format!("Failed to bind '{queue}' to '{topic}'"))?;

    Ok(queue)
}

/// Spawns one long-lived consumer task per `(topic, handler)` binding.
pub async fn spawn_consumers(
    connection: &Connection,
    service: &str,
    state: Arc<AppState>,
    bindings: &[(&'static str, ConsumerHandler)],
) -> Result<()> {
    for (topic, handler) in bindings {
        let channel = connection
            .create_channel()
            .await
            .context("Failed to create a consumer channel")?;
        let queue = declare_consumer_queue(&channel, service, topic).await?;

        let mut consumer = channel
            .basic_consume(
                &queue,
                &format!("{service}-{topic}-consumer"),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .with_context(|| format!("Failed to consume from '{queue}'"))?;

        let state = state.clone();
        let handler = *handler;
        let topic = topic.to_string();
        tokio::spawn(async move {
            tracing::info!("Consuming from queue '{}'", queue);
            while let Some(delivery) = consumer.next().await {
                let delivery = match delivery {
                    Ok(delivery) => delivery,
                    Err(err) => {
                        tracing::error!("Consumer error on topic '{}': {}", topic, err);
                        continue;
                    }
                };

                let acker = delivery.acker.clone();
                match handler(delivery, state.clone()).await {
                    Ok(()) => {
                        if let Err(err) = acker.ack(BasicAckOptions::default()).await {
                            tracing::error!("Failed to ack on topic '{}': {}", topic, err);
                        }
                    }
                    Err(err) => {
                        tracing::error!(
                            "Handler failed on topic '{}', dead-lettering: {:#}",
                            topic,
                            err
                        );
                        let nack = BasicNackOptions {
                            requeue: false,
                            ..Default::default()
                        };
                        if let Err(err) = acker.nack(nack).await {
                            tracing::error!("Failed to nack on topic '{}': {}", topic, err);
                        }
                    }
                }
            }
            tracing::warn!("Consumer for topic '{}' stopped", topic);
        });
    }

    Ok(())
}
