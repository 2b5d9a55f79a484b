//! Environment-driven process configuration.

use thiserror::Error;

use shopfront_notifications::{LowStockGuard, NotificationConfig, UnknownGuard};
use shopfront_observability::{LogConfig, LogFormat, UnknownLogFormat};

pub const LOG_FORMAT_VAR: &str = "SHOPFRONT_LOG_FORMAT";
pub const LOW_STOCK_GUARD_VAR: &str = "SHOPFRONT_LOW_STOCK_GUARD";
pub const NOTIFICATIONS_COLLECTION_VAR: &str = "SHOPFRONT_NOTIFICATIONS_COLLECTION";
pub const ORDERS_COLLECTION_VAR: &str = "SHOPFRONT_ORDERS_COLLECTION";
pub const PRODUCTS_COLLECTION_VAR: &str = "SHOPFRONT_PRODUCTS_COLLECTION";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SHOPFRONT_LOG_FORMAT: {0}")]
    LogFormat(#[from] UnknownLogFormat),

    #[error("SHOPFRONT_LOW_STOCK_GUARD: {0}")]
    LowStockGuard(#[from] UnknownGuard),

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub log: LogConfig,
    pub notifications: NotificationConfig,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; unset variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(LOG_FORMAT_VAR) {
            config.log.format = raw.parse::<LogFormat>()?;
        }
        if let Some(raw) = lookup(LOW_STOCK_GUARD_VAR) {
            config.notifications.low_stock_guard = raw.parse::<LowStockGuard>()?;
        }

        let collections = [
            (NOTIFICATIONS_COLLECTION_VAR, &mut config.notifications.notifications_collection),
            (ORDERS_COLLECTION_VAR, &mut config.notifications.orders_collection),
            (PRODUCTS_COLLECTION_VAR, &mut config.notifications.products_collection),
        ];
        for (var, slot) in collections {
            if let Some(raw) = lookup(var) {
                let name = raw.trim();
                if name.is_empty() {
                    return Err(ConfigError::Empty(var));
                }
                *slot = name.to_string();
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(AppConfig::from_lookup(env(&[])).unwrap(), AppConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = AppConfig::from_lookup(env(&[
            (LOG_FORMAT_VAR, "text"),
            (LOW_STOCK_GUARD_VAR, "check_then_act"),
            (NOTIFICATIONS_COLLECTION_VAR, "alerts"),
            (ORDERS_COLLECTION_VAR, "purchases"),
            (PRODUCTS_COLLECTION_VAR, " items "),
        ]))
        .unwrap();

        assert_eq!(config.log.format, LogFormat::Text);
        assert_eq!(config.notifications.low_stock_guard, LowStockGuard::CheckThenAct);
        assert_eq!(config.notifications.notifications_collection, "alerts");
        assert_eq!(config.notifications.orders_collection, "purchases");
        assert_eq!(config.notifications.products_collection, "items");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            AppConfig::from_lookup(env(&[(LOG_FORMAT_VAR, "xml")])),
            Err(ConfigError::LogFormat(_))
        ));
        assert!(matches!(
            AppConfig::from_lookup(env(&[(LOW_STOCK_GUARD_VAR, "yolo")])),
            Err(ConfigError::LowStockGuard(_))
        ));
        assert_eq!(
            AppConfig::from_lookup(env(&[(ORDERS_COLLECTION_VAR, "  ")])),
            Err(ConfigError::Empty(ORDERS_COLLECTION_VAR))
        );
    }
}
