use analysis_core::{StockDataError, StockDataProvider};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::FetchConfig;
use crate::provider::YahooProvider;
use crate::rate_limiter::CooldownLimiter;

pub type ProviderFactory =
    fn(&FetchConfig, Arc<CooldownLimiter>) -> Result<Arc<dyn StockDataProvider>, StockDataError>;

/// Provider name to constructor, filled in at startup.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, ProviderFactory>,
}

fn yahoo_factory(
    config: &FetchConfig,
    limiter: Arc<CooldownLimiter>,
) -> Result<Arc<dyn StockDataProvider>, StockDataError> {
    Ok(Arc::new(YahooProvider::from_config(config, limiter)?))
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in providers (`yahoo_finance`, alias `yahoo`).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(YahooProvider::NAME, yahoo_factory);
        registry.register("yahoo", yahoo_factory);
        registry
    }

    /// Later registrations under the same name replace earlier ones.
    pub fn register(&mut self, name: &str, factory: ProviderFactory) {
        self.factories.insert(name.trim().to_ascii_lowercase(), factory);
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn create(
        &self,
        name: &str,
        config: &FetchConfig,
        limiter: Arc<CooldownLimiter>,
    ) -> Result<Arc<dyn StockDataProvider>, StockDataError> {
        let key = name.trim().to_ascii_lowercase();
        let factory = self.factories.get(&key).ok_or_else(|| {
            StockDataError::UnknownProvider(format!(
                "'{}' (available: {})",
                name,
                self.names().join(", ")
            ))
        })?;
        tracing::debug!("Creating data provider '{}'", key);
        factory(config, limiter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults_registered() {
        let registry = ProviderRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["yahoo", "yahoo_finance"]);
    }

    #[test]
    fn test_create_known_provider_case_insensitive() {
        let registry = ProviderRegistry::with_defaults();
        let config = FetchConfig::default();
        let limiter = Arc::new(CooldownLimiter::new(Duration::from_secs(2)));

        let provider = registry.create("Yahoo_Finance", &config, limiter).unwrap();
        assert_eq!(provider.name(), "yahoo_finance");
    }

    #[test]
    fn test_unknown_provider_lists_available() {
        let registry = ProviderRegistry::with_defaults();
        let err = registry
            .create("bloomberg", &FetchConfig::default(), Arc::new(CooldownLimiter::new(Duration::ZERO)))
            .err()
            .unwrap();

        match err {
            StockDataError::UnknownProvider(msg) => {
                assert!(msg.contains("bloomberg"));
                assert!(msg.contains("yahoo_finance"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
