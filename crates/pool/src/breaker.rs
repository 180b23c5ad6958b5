//! Per-session circuit breaker gating browser creation.
//!
//! Each session name tracks its own failure streak; one session's open
//! circuit never affects another. The breaker only gates *creation* of new
//! browsers, so already-live handles keep circulating.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Breaker thresholds, shared by every session.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
	/// Consecutive failures that trip the circuit.
	pub threshold: u32,
	/// How long an open circuit stays closed to traffic.
	pub open_duration: Duration,
}

impl Default for BreakerConfig {
	fn default() -> Self {
		Self {
			threshold: 3,
			open_duration: Duration::from_secs(30),
		}
	}
}

/// Breaker section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BreakerOptions {
	pub threshold: u32,
	pub open_duration_ms: u64,
}

impl Default for BreakerOptions {
	fn default() -> Self {
		let config = BreakerConfig::default();
		Self {
			threshold: config.threshold,
			open_duration_ms: config.open_duration.as_millis() as u64,
		}
	}
}

impl BreakerOptions {
	pub fn to_config(&self) -> BreakerConfig {
		BreakerConfig {
			threshold: self.threshold.max(1),
			open_duration: Duration::from_millis(self.open_duration_ms),
		}
	}
}

/// Observable circuit state for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
	#[default]
	Closed,
	Open,
	HalfOpen,
}

#[derive(Debug, Default)]
struct SessionCircuit {
	state: CircuitState,
	consecutive_failures: u32,
	opened_at: Option<Instant>,
	/// Set while the single half-open probe is in flight.
	probing: bool,
}

/// Failure gate keyed by session name.
#[derive(Debug)]
pub struct CircuitBreaker {
	config: BreakerConfig,
	circuits: Mutex<HashMap<String, SessionCircuit>>,
}

impl CircuitBreaker {
	pub fn new(config: BreakerConfig) -> Self {
		Self {
			config,
			circuits: Mutex::new(HashMap::new()),
		}
	}

	/// Resets the failure streak; a half-open probe success re-closes the circuit.
	pub fn record_success(&self, session: &str) {
		let mut circuits = self.circuits.lock();
		let circuit = circuits.entry(session.to_string()).or_default();
		if circuit.state == CircuitState::HalfOpen {
			debug!(target = "lh.pool.breaker", session = %session, "probe succeeded; closing circuit");
		}
		circuit.state = CircuitState::Closed;
		circuit.consecutive_failures = 0;
		circuit.opened_at = None;
		circuit.probing = false;
	}

	/// Counts a failure; trips the circuit at the threshold, and re-opens
	/// immediately when a half-open probe fails.
	pub fn record_failure(&self, session: &str) {
		let mut circuits = self.circuits.lock();
		let circuit = circuits.entry(session.to_string()).or_default();
		circuit.consecutive_failures += 1;

		let reopen = circuit.state == CircuitState::HalfOpen;
		if reopen || circuit.consecutive_failures >= self.config.threshold {
			if circuit.state != CircuitState::Open {
				warn!(
					target = "lh.pool.breaker",
					session = %session,
					failures = circuit.consecutive_failures,
					reopened = reopen,
					"circuit opened"
				);
			}
			circuit.state = CircuitState::Open;
			circuit.opened_at = Some(Instant::now());
			circuit.probing = false;
		}
	}

	/// Whether creation may be attempted for `session` right now.
	///
	/// An expired open circuit transitions to half-open here and admits
	/// exactly one probe; other callers see `false` until the probe
	/// resolves through [`record_success`] or [`record_failure`].
	///
	/// [`record_success`]: Self::record_success
	/// [`record_failure`]: Self::record_failure
	pub fn is_available(&self, session: &str) -> bool {
		let mut circuits = self.circuits.lock();
		let circuit = circuits.entry(session.to_string()).or_default();
		match circuit.state {
			CircuitState::Closed => true,
			CircuitState::HalfOpen => !circuit.probing,
			CircuitState::Open => {
				let expired = circuit
					.opened_at
					.is_none_or(|opened| opened.elapsed() >= self.config.open_duration);
				if !expired {
					return false;
				}
				debug!(target = "lh.pool.breaker", session = %session, "cooldown elapsed; admitting half-open probe");
				circuit.state = CircuitState::HalfOpen;
				circuit.probing = true;
				true
			}
		}
	}

	/// Whether `session` is open and still inside its cooldown.
	///
	/// Read-only, unlike [`is_available`]: it never transitions state and
	/// never consumes the half-open probe, so paths that don't intend to
	/// create a browser (queueing on a full pool) can consult it freely.
	/// An open circuit whose cooldown has elapsed no longer blocks.
	///
	/// [`is_available`]: Self::is_available
	pub fn is_blocking(&self, session: &str) -> bool {
		let circuits = self.circuits.lock();
		let Some(circuit) = circuits.get(session) else {
			return false;
		};
		if circuit.state != CircuitState::Open {
			return false;
		}
		circuit
			.opened_at
			.is_some_and(|opened| opened.elapsed() < self.config.open_duration)
	}

	/// Point-in-time state for `session` (closed when never seen).
	pub fn state(&self, session: &str) -> CircuitState {
		self.circuits.lock().get(session).map(|c| c.state).unwrap_or_default()
	}

	/// Number of sessions whose circuit is currently open.
	pub fn open_count(&self) -> usize {
		self.circuits
			.lock()
			.values()
			.filter(|c| c.state == CircuitState::Open)
			.count()
	}
}

impl Default for CircuitBreaker {
	fn default() -> Self {
		Self::new(BreakerConfig::default())
	}
}
