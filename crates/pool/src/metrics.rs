//! Pool event collection and point-in-time rollups.
//!
//! Pools report lifecycle events through [`MetricsCollector::record`];
//! aggregation is O(1) per event. External observers subscribe to a
//! broadcast channel rather than registering callbacks, so a slow
//! subscriber can only lag (and lose old events), never block a pool.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::breaker::{CircuitBreaker, CircuitState};

const SUBSCRIBER_BUFFER: usize = 256;

/// One pool lifecycle event.
#[derive(Debug, Clone)]
pub struct MetricEvent {
	pub session: String,
	pub timestamp: SystemTime,
	pub kind: MetricKind,
}

/// Event payloads reported by pools.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricKind {
	/// A browser process was launched.
	BrowserCreated,
	/// A handle was checked out; `wait` is time spent in `acquire`.
	Acquire { wait: Duration },
	/// A handle was handed back.
	Release,
	/// A launch or health check failed.
	Failure,
}

impl MetricEvent {
	pub fn now(session: &str, kind: MetricKind) -> Self {
		Self {
			session: session.to_string(),
			timestamp: SystemTime::now(),
			kind,
		}
	}
}

#[derive(Debug, Default, Clone)]
struct SessionAggregate {
	created: u64,
	acquisitions: u64,
	releases: u64,
	failures: u64,
	total_wait: Duration,
	active: i64,
	idle_hint: i64,
}

/// Per-session rollup inside a [`MetricsSummary`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
	pub session: String,
	pub total_acquisitions: u64,
	pub browsers_created: u64,
	pub failures: u64,
	pub avg_acquire_ms: f64,
	pub active_browsers: u64,
	pub idle_browsers: u64,
	pub circuit_state: CircuitState,
}

/// Point-in-time view across every session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
	pub total_sessions: usize,
	pub total_active_browsers: u64,
	pub total_idle_browsers: u64,
	pub global_failure_rate: f64,
	pub circuits_open: usize,
	pub sessions: Vec<SessionSummary>,
}

/// Process-wide sink for pool events.
#[derive(Debug)]
pub struct MetricsCollector {
	aggregates: Mutex<HashMap<String, SessionAggregate>>,
	events: broadcast::Sender<MetricEvent>,
}

impl MetricsCollector {
	pub fn new() -> Self {
		let (events, _) = broadcast::channel(SUBSCRIBER_BUFFER);
		Self {
			aggregates: Mutex::new(HashMap::new()),
			events,
		}
	}

	/// Folds an event into the per-session aggregates and fans it out to
	/// subscribers. Never blocks; send failures just mean nobody listens.
	pub fn record(&self, event: MetricEvent) {
		{
			let mut aggregates = self.aggregates.lock();
			let agg = aggregates.entry(event.session.clone()).or_default();
			match event.kind {
				MetricKind::BrowserCreated => agg.created += 1,
				MetricKind::Acquire { wait } => {
					agg.acquisitions += 1;
					agg.total_wait += wait;
					agg.active += 1;
					agg.idle_hint = (agg.idle_hint - 1).max(0);
				}
				MetricKind::Release => {
					agg.releases += 1;
					agg.active = (agg.active - 1).max(0);
					agg.idle_hint += 1;
				}
				MetricKind::Failure => agg.failures += 1,
			}
		}
		let _ = self.events.send(event);
	}

	/// New subscription to the raw event stream.
	pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
		self.events.subscribe()
	}

	/// Snapshot rollup; circuit states are joined in from `breaker`.
	///
	/// Safe to call concurrently with ongoing pool activity: the aggregate
	/// map is cloned under the lock and the rollup is computed outside it.
	pub fn summary(&self, breaker: &CircuitBreaker) -> MetricsSummary {
		let aggregates: Vec<(String, SessionAggregate)> = {
			let map = self.aggregates.lock();
			map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
		};

		let mut sessions: Vec<SessionSummary> = aggregates
			.into_iter()
			.map(|(session, agg)| {
				let avg_acquire_ms = if agg.acquisitions == 0 {
					0.0
				} else {
					agg.total_wait.as_secs_f64() * 1000.0 / agg.acquisitions as f64
				};
				let circuit_state = breaker.state(&session);
				SessionSummary {
					session,
					total_acquisitions: agg.acquisitions,
					browsers_created: agg.created,
					failures: agg.failures,
					avg_acquire_ms,
					active_browsers: agg.active.max(0) as u64,
					idle_browsers: agg.idle_hint.max(0) as u64,
					circuit_state,
				}
			})
			.collect();
		sessions.sort_by(|a, b| a.session.cmp(&b.session));

		let total_attempts: u64 = sessions.iter().map(|s| s.total_acquisitions + s.failures).sum();
		let total_failures: u64 = sessions.iter().map(|s| s.failures).sum();
		let global_failure_rate = if total_attempts == 0 {
			0.0
		} else {
			total_failures as f64 / total_attempts as f64
		};

		MetricsSummary {
			total_sessions: sessions.len(),
			total_active_browsers: sessions.iter().map(|s| s.active_browsers).sum(),
			total_idle_browsers: sessions.iter().map(|s| s.idle_browsers).sum(),
			global_failure_rate,
			circuits_open: breaker.open_count(),
			sessions,
		}
	}
}

impl Default for MetricsCollector {
	fn default() -> Self {
		Self::new()
	}
}
