//! Bounded browser pool for one session.
//!
//! Capacity is enforced with a semaphore sized to `max_size`: every
//! checked-out handle corresponds to a forgotten permit, returned on
//! release or destruction. Idle handles hold no permits, so
//! `idle + active` can never exceed the cap. Tokio's semaphore queues
//! waiters strictly FIFO, which is exactly the fairness the pool promises.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::breaker::{CircuitBreaker, CircuitState};
use crate::config::PoolConfig;
use crate::driver::BrowserLauncher;
use crate::error::{PoolError, Result};
use crate::handle::BrowserHandle;
use crate::metrics::{MetricEvent, MetricKind, MetricsCollector};

/// How long `drain` waits for active handles to come back before giving up
/// on them; stragglers are destroyed at their eventual release.
const DRAIN_GRACE: Duration = Duration::from_secs(5);
const DRAIN_POLL: Duration = Duration::from_millis(25);

/// Mutable pool state, linearized through one lock.
struct PoolCore {
	idle: Vec<BrowserHandle>,
	active: usize,
	created: u64,
	reused: u64,
	destroyed: u64,
	failures: u64,
}

/// Coherent snapshot of pool accounting.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
	pub created: u64,
	pub reused: u64,
	pub destroyed: u64,
	pub failures: u64,
	pub active: usize,
	pub idle: usize,
	pub total: usize,
}

/// Bounded pool of live browser handles for a single session.
pub struct BrowserPool {
	session: String,
	config: PoolConfig,
	launcher: Arc<dyn BrowserLauncher>,
	breaker: Arc<CircuitBreaker>,
	metrics: Arc<MetricsCollector>,
	semaphore: Arc<Semaphore>,
	core: Mutex<PoolCore>,
	waiters: AtomicUsize,
	draining: AtomicBool,
	reaper: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl BrowserPool {
	/// Builds the pool, pre-warms `min_size` handles (best-effort), and
	/// starts the idle reaper.
	pub async fn new(
		session: &str,
		config: PoolConfig,
		launcher: Arc<dyn BrowserLauncher>,
		breaker: Arc<CircuitBreaker>,
		metrics: Arc<MetricsCollector>,
	) -> Arc<Self> {
		let pool = Arc::new(Self {
			session: session.to_string(),
			semaphore: Arc::new(Semaphore::new(config.max_size)),
			config,
			launcher,
			breaker,
			metrics,
			core: Mutex::new(PoolCore {
				idle: Vec::new(),
				active: 0,
				created: 0,
				reused: 0,
				destroyed: 0,
				failures: 0,
			}),
			waiters: AtomicUsize::new(0),
			draining: AtomicBool::new(false),
			reaper: parking_lot::Mutex::new(None),
		});

		for _ in 0..pool.config.min_size {
			match pool.launch_once().await {
				Ok(mut handle) => {
					handle.mark_idle();
					pool.core.lock().await.idle.push(handle);
				}
				Err(err) => {
					debug!(target = "lh.pool", session = %pool.session, error = %err, "pre-warm launch failed");
					break;
				}
			}
		}

		if pool.config.max_idle_time > Duration::ZERO {
			let task = tokio::spawn(reap_loop(Arc::downgrade(&pool)));
			*pool.reaper.lock() = Some(task);
		}

		pool
	}

	/// Session this pool serves.
	pub fn session(&self) -> &str {
		&self.session
	}

	/// Checks out a browser handle, waiting up to `acquire_timeout` when
	/// the pool is at capacity. Fails fast with [`PoolError::CircuitOpen`]
	/// instead of queueing while the session's circuit is open.
	pub async fn acquire(&self) -> Result<BrowserHandle> {
		if self.draining.load(Ordering::Acquire) {
			return Err(PoolError::Draining { session: self.session.clone() });
		}

		let start = Instant::now();
		let permit = match Arc::clone(&self.semaphore).try_acquire_owned() {
			Ok(permit) => permit,
			Err(TryAcquireError::Closed) => {
				return Err(PoolError::Draining { session: self.session.clone() });
			}
			Err(TryAcquireError::NoPermits) => {
				// Expiry-aware and side-effect free: an open circuit past
				// its cooldown lets callers queue for a reused handle.
				if self.breaker.is_blocking(&self.session) {
					return Err(PoolError::CircuitOpen { session: self.session.clone() });
				}
				self.wait_for_permit(start).await?
			}
		};

		self.checkout(permit, start).await
	}

	/// Queues on the semaphore with the acquire deadline. A timed-out
	/// waiter's acquire future is dropped, which removes it from the
	/// semaphore queue; it can never be handed a permit afterwards.
	async fn wait_for_permit(&self, start: Instant) -> Result<OwnedSemaphorePermit> {
		let _guard = WaiterGuard::enter(&self.waiters);
		let waited = tokio::time::timeout(
			self.config.acquire_timeout,
			Arc::clone(&self.semaphore).acquire_owned(),
		)
		.await;

		match waited {
			Ok(Ok(permit)) => Ok(permit),
			Ok(Err(_closed)) => Err(PoolError::Draining { session: self.session.clone() }),
			Err(_elapsed) => {
				debug!(
					target = "lh.pool",
					session = %self.session,
					waited_ms = start.elapsed().as_millis() as u64,
					"acquire timed out"
				);
				Err(PoolError::AcquireTimeout {
					session: self.session.clone(),
					waited: start.elapsed(),
				})
			}
		}
	}

	async fn checkout(&self, permit: OwnedSemaphorePermit, start: Instant) -> Result<BrowserHandle> {
		if self.draining.load(Ordering::Acquire) {
			return Err(PoolError::Draining { session: self.session.clone() });
		}

		let parked = {
			let mut core = self.core.lock().await;
			core.idle.pop()
		};

		let handle = match parked {
			Some(mut handle) => {
				handle.mark_active();
				let mut core = self.core.lock().await;
				core.reused += 1;
				core.active += 1;
				handle
			}
			None => {
				if !self.breaker.is_available(&self.session) {
					// Permit drops here, freeing the slot for other callers.
					return Err(PoolError::CircuitOpen { session: self.session.clone() });
				}
				let handle = self.launch_with_retry().await?;
				self.core.lock().await.active += 1;
				handle
			}
		};

		permit.forget();
		self.metrics
			.record(MetricEvent::now(&self.session, MetricKind::Acquire { wait: start.elapsed() }));
		Ok(handle)
	}

	/// Hands a handle back. Healthy handles return to the idle stack;
	/// unhealthy ones are destroyed, and when waiters are queued the pool
	/// attempts one warm replacement before freeing the slot.
	pub async fn release(&self, mut handle: BrowserHandle) {
		self.metrics.record(MetricEvent::now(&self.session, MetricKind::Release));

		if self.draining.load(Ordering::Acquire) {
			handle.destroy().await;
			let mut core = self.core.lock().await;
			core.active = core.active.saturating_sub(1);
			core.destroyed += 1;
			return;
		}

		if handle.check_health().await {
			handle.mark_idle();
			let mut core = self.core.lock().await;
			core.active = core.active.saturating_sub(1);
			core.idle.push(handle);
			drop(core);
			self.semaphore.add_permits(1);
			return;
		}

		warn!(
			target = "lh.pool",
			session = %self.session,
			handle = handle.id(),
			"released handle failed health check; destroying"
		);
		handle.mark_unhealthy();
		handle.destroy().await;
		self.breaker.record_failure(&self.session);
		self.metrics.record(MetricEvent::now(&self.session, MetricKind::Failure));
		{
			let mut core = self.core.lock().await;
			core.active = core.active.saturating_sub(1);
			core.destroyed += 1;
			core.failures += 1;
		}

		// Replacement policy: a queued waiter gets a warm handle when we
		// can launch one into the slot the dead handle vacated. Best
		// effort; on failure the waiter creates its own after waking.
		if self.waiters.load(Ordering::SeqCst) > 0 && self.breaker.is_available(&self.session) {
			match self.launch_once().await {
				Ok(mut replacement) => {
					replacement.mark_idle();
					self.core.lock().await.idle.push(replacement);
				}
				Err(err) => {
					debug!(target = "lh.pool", session = %self.session, error = %err, "replacement launch failed");
				}
			}
		}
		self.semaphore.add_permits(1);
	}

	/// Stops accepting work, rejects queued waiters, destroys idle handles,
	/// and waits up to a bounded grace period for active handles to be
	/// released (a release during drain destroys the handle). Idempotent.
	pub async fn drain(&self) {
		if self.draining.swap(true, Ordering::SeqCst) {
			return;
		}
		debug!(target = "lh.pool", session = %self.session, "draining pool");

		// Wakes every queued waiter with a closed error.
		self.semaphore.close();

		if let Some(task) = self.reaper.lock().take() {
			task.abort();
		}

		let mut idle = {
			let mut core = self.core.lock().await;
			std::mem::take(&mut core.idle)
		};
		let destroyed = idle.len() as u64;
		for handle in &mut idle {
			handle.destroy().await;
		}
		self.core.lock().await.destroyed += destroyed;

		let deadline = Instant::now() + DRAIN_GRACE;
		loop {
			if self.core.lock().await.active == 0 {
				break;
			}
			if Instant::now() >= deadline {
				let active = self.core.lock().await.active;
				warn!(
					target = "lh.pool",
					session = %self.session,
					active,
					"drain grace elapsed; remaining handles destroyed on release"
				);
				break;
			}
			tokio::time::sleep(DRAIN_POLL).await;
		}
	}

	/// Whether `drain` has begun.
	pub fn is_draining(&self) -> bool {
		self.draining.load(Ordering::Acquire)
	}

	/// Accounting snapshot taken under the state lock.
	pub async fn stats(&self) -> PoolStats {
		let core = self.core.lock().await;
		PoolStats {
			created: core.created,
			reused: core.reused,
			destroyed: core.destroyed,
			failures: core.failures,
			active: core.active,
			idle: core.idle.len(),
			total: core.active + core.idle.len(),
		}
	}

	/// One launch attempt, with breaker and metrics bookkeeping.
	async fn launch_once(&self) -> Result<BrowserHandle> {
		match self.launcher.launch(&self.session).await {
			Ok(process) => {
				self.breaker.record_success(&self.session);
				self.metrics.record(MetricEvent::now(&self.session, MetricKind::BrowserCreated));
				let mut core = self.core.lock().await;
				core.created += 1;
				Ok(BrowserHandle::new(&self.session, process))
			}
			Err(err) => {
				self.breaker.record_failure(&self.session);
				self.metrics.record(MetricEvent::now(&self.session, MetricKind::Failure));
				self.core.lock().await.failures += 1;
				Err(PoolError::CreationFailure {
					session: self.session.clone(),
					attempts: 1,
					message: err.0,
				})
			}
		}
	}

	/// Launches with the configured retry budget, stopping early if the
	/// failures trip the circuit.
	async fn launch_with_retry(&self) -> Result<BrowserHandle> {
		let budget = self.config.launch_attempts();
		let mut attempts = 0;
		let mut last_message = String::new();

		while attempts < budget {
			attempts += 1;
			match self.launch_once().await {
				Ok(handle) => return Ok(handle),
				Err(PoolError::CreationFailure { message, .. }) => {
					warn!(
						target = "lh.pool",
						session = %self.session,
						attempt = attempts,
						error = %message,
						"browser launch failed"
					);
					last_message = message;
					if self.breaker.state(&self.session) == CircuitState::Open {
						break;
					}
				}
				Err(other) => return Err(other),
			}
		}

		Err(PoolError::CreationFailure {
			session: self.session.clone(),
			attempts,
			message: last_message,
		})
	}

	/// Destroys idle handles older than `max_idle_time`, never shrinking
	/// total live handles below the `min_size` floor. Oldest go first.
	async fn reap_idle(&self) {
		let mut reaped = {
			let mut core = self.core.lock().await;
			let mut total = core.active + core.idle.len();
			let max_idle_time = self.config.max_idle_time;
			let min_size = self.config.min_size;

			let mut victims = Vec::new();
			// Oldest entries sit at the bottom of the LIFO stack.
			let mut index = 0;
			while index < core.idle.len() {
				if total <= min_size {
					break;
				}
				if core.idle[index].last_used_at().elapsed() > max_idle_time {
					victims.push(core.idle.remove(index));
					total -= 1;
				} else {
					index += 1;
				}
			}
			core.destroyed += victims.len() as u64;
			victims
		};

		if !reaped.is_empty() {
			debug!(target = "lh.pool", session = %self.session, count = reaped.len(), "reaping idle handles");
		}
		for handle in &mut reaped {
			handle.destroy().await;
		}
	}
}

/// Keeps the waiter count accurate even when an acquire future is
/// cancelled mid-wait.
struct WaiterGuard<'a> {
	waiters: &'a AtomicUsize,
}

impl<'a> WaiterGuard<'a> {
	fn enter(waiters: &'a AtomicUsize) -> Self {
		waiters.fetch_add(1, Ordering::SeqCst);
		Self { waiters }
	}
}

impl Drop for WaiterGuard<'_> {
	fn drop(&mut self) {
		self.waiters.fetch_sub(1, Ordering::SeqCst);
	}
}

/// Background reaper; exits when the pool is dropped or draining.
async fn reap_loop(pool: std::sync::Weak<BrowserPool>) {
	let interval = {
		let Some(pool) = pool.upgrade() else { return };
		// Check twice per idle window so eviction lag stays below the
		// configured age.
		(pool.config.max_idle_time / 2).max(Duration::from_millis(50))
	};

	loop {
		tokio::time::sleep(interval).await;
		let Some(pool) = pool.upgrade() else { return };
		if pool.is_draining() {
			return;
		}
		pool.reap_idle().await;
	}
}

impl Drop for BrowserPool {
	fn drop(&mut self) {
		if let Some(task) = self.reaper.lock().take() {
			task.abort();
		}
	}
}
