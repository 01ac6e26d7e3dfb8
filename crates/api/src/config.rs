//! Server configuration from the environment.

use std::net::SocketAddr;

use stockflow_infra::InventoryConfig;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub inventory: InventoryConfig,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `STOCKFLOW_BIND_ADDR` plus everything [`InventoryConfig`] reads.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_addr: SocketAddr = ([0, 0, 0, 0], 8080).into();
        let bind_addr = match lookup("STOCKFLOW_BIND_ADDR") {
            None => default_addr,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(
                    value = %raw,
                    default = DEFAULT_BIND_ADDR,
                    "invalid STOCKFLOW_BIND_ADDR; using default"
                );
                default_addr
            }),
        };

        Self {
            bind_addr,
            inventory: InventoryConfig::from_lookup(lookup),
        }
    }
}
