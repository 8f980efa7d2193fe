use std::env;

use checkout_common::helpers::{env_or_default, parse_boolean_flag, parse_env_or_default};
use gateway_tools::GatewayEndpoints;
use log::*;

const DEFAULT_CHECKOUT_HOST: &str = "127.0.0.1";
const DEFAULT_CHECKOUT_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/checkout.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// Capacity of each event channel. Publishers wait when a handler falls this far behind.
    pub event_buffer_size: usize,
    /// Run the embedded migrations against the database on start-up.
    pub auto_migrate: bool,
    /// Gateway base URLs. Credentials are per-organization and never read from the environment.
    pub gateways: GatewayEndpoints,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CHECKOUT_HOST.to_string(),
            port: DEFAULT_CHECKOUT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            auto_migrate: false,
            gateways: GatewayEndpoints::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env_or_default("CHECKOUT_HOST", DEFAULT_CHECKOUT_HOST);
        let port = parse_env_or_default("CHECKOUT_PORT", DEFAULT_CHECKOUT_PORT);
        let database_url = env::var("CHECKOUT_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ CHECKOUT_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = parse_env_or_default("CHECKOUT_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let event_buffer_size = parse_env_or_default("CHECKOUT_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE);
        let auto_migrate = parse_boolean_flag(env::var("CHECKOUT_SQLITE_AUTO_MIGRATE").ok(), false);
        let gateways = GatewayEndpoints::new_from_env_or_default();
        Self { host, port, database_url, max_connections, event_buffer_size, auto_migrate, gateways }
    }
}
