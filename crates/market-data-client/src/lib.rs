//! Rate-limited access to market data providers.

pub mod clock;
pub mod config;
pub mod fetch;
pub mod provider;
pub mod rate_limiter;
pub mod registry;
pub mod retry;
pub mod yahoo;

#[cfg(test)]
mod fetch_tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::FetchConfig;
pub use fetch::{FetchClient, RawQuotePayload, RequestKind, Transport};
pub use provider::YahooProvider;
pub use rate_limiter::CooldownLimiter;
pub use registry::{ProviderFactory, ProviderRegistry};
pub use retry::RetryPolicy;
pub use yahoo::YahooTransport;
