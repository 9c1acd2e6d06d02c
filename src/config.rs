use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub amqp_url: String,
    pub catalog_service_url: String,
    pub port: u16,
}

/// Loads service configuration from the environment. `DATABASE_URL` and
/// `AMQP_URL` are mandatory; the rest fall back to local defaults.
pub fn load() -> Result<Config> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    let amqp_url = std::env::var("AMQP_URL").context("AMQP_URL is not set")?;
    let catalog_service_url = std::env::var("CATALOG_SERVICE_URL")
        .unwrap_or("http://localhost:3000/catalog-service".to_string());
    let port = std::env::var("PORT")
        .unwrap_or("3001".to_string())
        .parse()
        .context("PORT is not a valid port number")?;

    Ok(Config {
        database_url,
        amqp_url,
        catalog_service_url,
        port,
    })
}
