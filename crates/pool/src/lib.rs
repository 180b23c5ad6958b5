//! Bounded browser pooling for a single-property scraper.
//!
//! Headless browsers are expensive to start and memory-heavy, while
//! scraping issues many short concurrent browser operations. This crate
//! bounds live browsers per logical session, reuses warm handles,
//! health-checks on release, gates repeated failures behind a per-session
//! circuit breaker, and reports lifecycle events to a metrics collector.

/// Per-session circuit breaker gating browser creation.
pub mod breaker;
/// Pool configuration and strategy types.
pub mod config;
/// Launcher/process traits keeping the headless engine opaque.
pub mod driver;
/// Pool error taxonomy.
pub mod error;
/// Browser handle and lifecycle state.
pub mod handle;
/// Event collection and summaries.
pub mod metrics;
/// Per-session pool multiplexing.
pub mod manager;
/// The bounded pool itself.
pub mod pool;

pub use breaker::{BreakerConfig, BreakerOptions, CircuitBreaker, CircuitState};
pub use config::{PoolConfig, PoolOptions, PoolStrategy};
pub use driver::{BrowserLauncher, BrowserProcess};
pub use error::{LaunchError, PoolError, Result};
pub use handle::{BrowserHandle, HandleState};
pub use manager::SessionPoolManager;
pub use metrics::{MetricEvent, MetricKind, MetricsCollector, MetricsSummary, SessionSummary};
pub use pool::{BrowserPool, PoolStats};
