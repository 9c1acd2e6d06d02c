pub mod api;
pub mod bootstrap;
pub mod bus;
pub mod config;
pub mod consumers;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod routes;
pub mod schema;
pub mod service;
pub mod state;
pub mod store;
pub mod swagger;

pub const SERVICE_NAME: &str = "OrderService";
