use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use lapin::Connection;
use reqwest::Client;

use crate::{
    api::catalog::CatalogClient,
    bus::{EventPublisher, rabbit::RabbitEventBus},
    config::Config,
    db,
    events::{ORDERS_TOPIC, PAYMENTS_TOPIC},
    service::OrderService,
    store::postgres::PgStore,
};

/// Shared per-process state handed to every request handler and consumer.
#[derive(Clone)]
pub struct AppState {
    pub service_name: &'static str,
    pub orders: OrderService,
    pub started_at: Instant,
}

impl AppState {
    /// Wires the production stack: Postgres pool, RabbitMQ bus, catalog
    /// client. Returns the broker connection so the caller can keep it
    /// alive for the consumers' lifetime.
    pub async fn initialize(
        service_name: &'static str,
        config: &Config,
    ) -> Result<(Self, Connection)> {
        let pool = db::build_pool(&config.database_url).await?;
        let store = Arc::new(PgStore::new(pool));

        let rabbit = crate::bus::rabbit::connect(&config.amqp_url).await?;
        let bus = Arc::new(RabbitEventBus::new(&rabbit, &[PAYMENTS_TOPIC, ORDERS_TOPIC]).await?);
        let publisher = EventPublisher::new(bus, service_name);

        let stock = Arc::new(CatalogClient::new(
            Client::new(),
            config.catalog_service_url.clone(),
        ));

        let orders = OrderService::new(store.clone(), store, stock, publisher);

        Ok((
            Self {
                service_name,
                orders,
                started_at: Instant::now(),
            },
            rabbit,
        ))
    }
}
