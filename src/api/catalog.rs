//! Catalog-service client: current stock and live unit price per
//! (product, size). Stock is always read fresh at validation time; the
//! migration step captures the price it sees here into the detail rows.

use std::{collections::HashMap, sync::Mutex};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One sellable (product, size) combination as the catalog reports it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StockLevel {
    pub product_id: i32,
    pub size: String,
    pub unit_price: f32,
    pub available: i32,
}

#[async_trait]
pub trait StockValidator: Send + Sync {
    /// Current stock levels for the given products, all sizes.
    async fn stock_levels(&self, product_ids: &[i32]) -> Result<Vec<StockLevel>, AppError>;
}

pub struct CatalogClient {
    client: Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl StockValidator for CatalogClient {
    async fn stock_levels(&self, product_ids: &[i32]) -> Result<Vec<StockLevel>, AppError> {
        let ids_query = product_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let levels: Vec<StockLevel> = self
            .client
            .get(format!("{}/products/stock", self.base_url))
            .query(&[("ids", ids_query)])
            .send()
            .await
            .map_err(|_| AppError::ServiceUnreachable("CatalogService".into()))?
            .json()
            .await
            .context("Failed to parse stock levels JSON")?;

        Ok(levels)
    }
}

/// Fixed stock table for tests: set levels up front, mutate them mid-test
/// to model concurrent catalog changes.
#[derive(Default)]
pub struct FixedStockValidator {
    levels: Mutex<HashMap<(i32, String), StockLevel>>,
}

impl FixedStockValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_level(&self, product_id: i32, size: &str, unit_price: f32, available: i32) {
        self.levels.lock().unwrap().insert(
            (product_id, size.to_string()),
            StockLevel {
                product_id,
                size: size.to_string(),
                unit_price,
                available,
            },
        );
    }
}

#[async_trait]
impl StockValidator for FixedStockValidator {
    async fn stock_levels(&self, product_ids: &[i32]) -> Result<Vec<StockLevel>, AppError> {
        let levels = self.levels.lock().unwrap();
        Ok(levels
            .values()
            .filter(|level| product_ids.contains(&level.product_id))
            .cloned()
            .collect())
    }
}
