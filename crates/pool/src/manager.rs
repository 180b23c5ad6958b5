//! Per-session pool multiplexing and process-wide shutdown.
//!
//! One manager owns every [`BrowserPool`], the shared [`CircuitBreaker`]
//! registry, and the [`MetricsCollector`]. Construct one per process and
//! hand it to collaborators explicitly; there is no global instance.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::breaker::{BreakerConfig, CircuitBreaker, CircuitState};
use crate::config::{PoolConfig, PoolStrategy};
use crate::driver::BrowserLauncher;
use crate::error::{PoolError, Result};
use crate::handle::BrowserHandle;
use crate::metrics::{MetricEvent, MetricKind, MetricsCollector, MetricsSummary};
use crate::pool::{BrowserPool, PoolStats};

/// Routes acquire/release calls to the right session's pool, creating
/// pools lazily. With pooling disabled it degrades to one-shot
/// launch/close per request while keeping the same call surface.
pub struct SessionPoolManager {
	config: PoolConfig,
	strategy: PoolStrategy,
	enabled: bool,
	launcher: Arc<dyn BrowserLauncher>,
	breaker: Arc<CircuitBreaker>,
	metrics: Arc<MetricsCollector>,
	pools: Mutex<HashMap<String, Arc<OnceCell<Arc<BrowserPool>>>>>,
	draining: AtomicBool,
}

impl SessionPoolManager {
	pub fn new(config: PoolConfig, breaker_config: BreakerConfig, launcher: Arc<dyn BrowserLauncher>) -> Self {
		Self {
			config,
			strategy: PoolStrategy::PerSession,
			enabled: true,
			launcher,
			breaker: Arc::new(CircuitBreaker::new(breaker_config)),
			metrics: Arc::new(MetricsCollector::new()),
			pools: Mutex::new(HashMap::new()),
			draining: AtomicBool::new(false),
		}
	}

	/// Disables pooling: every acquire launches a fresh browser and every
	/// release closes it.
	pub fn with_pooling_disabled(mut self) -> Self {
		self.enabled = false;
		self
	}

	/// Shared event sink, for subscribers and summaries.
	pub fn metrics(&self) -> &Arc<MetricsCollector> {
		&self.metrics
	}

	/// Shared per-session failure gate.
	pub fn breaker(&self) -> &Arc<CircuitBreaker> {
		&self.breaker
	}

	/// Checks out a browser for `session`, creating that session's pool on
	/// first use. Pool creation is race-free (concurrent first-users share
	/// one pool) without serializing sessions: the map lock only covers the
	/// cell lookup, and construction runs outside it.
	pub async fn acquire_browser(&self, session: &str) -> Result<BrowserHandle> {
		if self.draining.load(Ordering::Acquire) {
			return Err(PoolError::Draining { session: session.to_string() });
		}

		if !self.enabled {
			return self.acquire_one_shot(session).await;
		}

		let pool = match self.strategy {
			PoolStrategy::PerSession => self.pool_for(session).await,
		};
		// drain_all may have run while this pool was being constructed and
		// missed it; settle the race before handing out a handle.
		if self.draining.load(Ordering::Acquire) {
			pool.drain().await;
			return Err(PoolError::Draining { session: session.to_string() });
		}
		pool.acquire().await
	}

	/// Hands a browser back to its session's pool.
	///
	/// Fails with [`PoolError::UnknownSession`] when no pool exists for
	/// `session`; that is a caller bug, not a retryable condition.
	pub async fn release_browser(&self, handle: BrowserHandle, session: &str) -> Result<()> {
		if !self.enabled {
			self.release_one_shot(handle, session).await;
			return Ok(());
		}

		let Some(pool) = self.existing_pool(session).await else {
			warn!(target = "lh.pool", session = %session, handle = handle.id(), "release for unknown session");
			return Err(PoolError::UnknownSession { session: session.to_string() });
		};
		pool.release(handle).await;
		Ok(())
	}

	/// Drains every pool; used at process shutdown. Idempotent.
	pub async fn drain_all(&self) {
		if self.draining.swap(true, Ordering::SeqCst) {
			return;
		}
		let pools = self.live_pools().await;
		info!(target = "lh.pool", pools = pools.len(), "draining all session pools");
		for pool in pools {
			pool.drain().await;
		}
	}

	/// Snapshot for one session's pool, if it exists.
	pub async fn pool_stats(&self, session: &str) -> Option<PoolStats> {
		match self.existing_pool(session).await {
			Some(pool) => Some(pool.stats().await),
			None => None,
		}
	}

	/// Process-wide rollup: metric aggregates joined with live pool
	/// accounting (pool stats are authoritative for active/idle counts).
	pub async fn summary(&self) -> MetricsSummary {
		let mut summary = self.metrics.summary(&self.breaker);

		let mut live: HashMap<String, PoolStats> = HashMap::new();
		for pool in self.live_pools().await {
			live.insert(pool.session().to_string(), pool.stats().await);
		}

		for session in &mut summary.sessions {
			if let Some(stats) = live.get(&session.session) {
				session.active_browsers = stats.active as u64;
				session.idle_browsers = stats.idle as u64;
			}
		}
		summary.total_active_browsers = summary.sessions.iter().map(|s| s.active_browsers).sum();
		summary.total_idle_browsers = summary.sessions.iter().map(|s| s.idle_browsers).sum();
		summary
	}

	/// Pool construction pre-warms `min_size` browsers, which can take
	/// seconds; it must never run under the map lock or every other
	/// session would queue behind it. Same-session callers converge on the
	/// cell and share the one constructed pool.
	async fn pool_for(&self, session: &str) -> Arc<BrowserPool> {
		let cell = {
			let mut pools = self.pools.lock().await;
			Arc::clone(pools.entry(session.to_string()).or_default())
		};
		let pool = cell
			.get_or_init(|| async {
				debug!(target = "lh.pool", session = %session, "creating pool for session");
				BrowserPool::new(
					session,
					self.config.clone(),
					Arc::clone(&self.launcher),
					Arc::clone(&self.breaker),
					Arc::clone(&self.metrics),
				)
				.await
			})
			.await;
		Arc::clone(pool)
	}

	/// Already-constructed pool for `session`, if any. A cell whose
	/// construction is still in flight counts as absent.
	async fn existing_pool(&self, session: &str) -> Option<Arc<BrowserPool>> {
		let pools = self.pools.lock().await;
		pools.get(session).and_then(|cell| cell.get()).cloned()
	}

	async fn live_pools(&self) -> Vec<Arc<BrowserPool>> {
		let pools = self.pools.lock().await;
		pools.values().filter_map(|cell| cell.get()).cloned().collect()
	}

	/// Pool-bypass acquire: breaker-gated fresh launch with the configured
	/// retry budget, no pooled state.
	async fn acquire_one_shot(&self, session: &str) -> Result<BrowserHandle> {
		if !self.breaker.is_available(session) {
			return Err(PoolError::CircuitOpen { session: session.to_string() });
		}

		let start = Instant::now();
		let budget = self.config.launch_attempts();
		let mut attempts = 0;
		let mut last_message = String::new();

		while attempts < budget {
			attempts += 1;
			match self.launcher.launch(session).await {
				Ok(process) => {
					self.breaker.record_success(session);
					self.metrics.record(MetricEvent::now(session, MetricKind::BrowserCreated));
					self.metrics
						.record(MetricEvent::now(session, MetricKind::Acquire { wait: start.elapsed() }));
					return Ok(BrowserHandle::new(session, process));
				}
				Err(err) => {
					self.breaker.record_failure(session);
					self.metrics.record(MetricEvent::now(session, MetricKind::Failure));
					last_message = err.0;
					if self.breaker.state(session) == CircuitState::Open {
						break;
					}
				}
			}
		}

		Err(PoolError::CreationFailure {
			session: session.to_string(),
			attempts,
			message: last_message,
		})
	}

	async fn release_one_shot(&self, mut handle: BrowserHandle, session: &str) {
		self.metrics.record(MetricEvent::now(session, MetricKind::Release));
		handle.destroy().await;
	}
}

impl std::fmt::Debug for SessionPoolManager {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionPoolManager")
			.field("strategy", &self.strategy)
			.field("enabled", &self.enabled)
			.finish_non_exhaustive()
	}
}
