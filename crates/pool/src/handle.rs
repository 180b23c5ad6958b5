//! Handle wrapping one live browser process and its lifecycle state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::driver::BrowserProcess;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle state of a [`BrowserHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
	/// Parked in the pool, available for checkout.
	Idle,
	/// Checked out by exactly one caller.
	Active,
	/// Failed a health check; pending destruction.
	Unhealthy,
	/// Underlying process has been closed.
	Destroyed,
}

/// One live browser process owned by a pool.
///
/// A caller holding the handle in `Active` state has exclusive use of the
/// process until it hands the handle back via
/// [`release_browser`](crate::manager::SessionPoolManager::release_browser).
pub struct BrowserHandle {
	id: u64,
	session: String,
	created_at: Instant,
	last_used_at: Instant,
	state: HandleState,
	process: Box<dyn BrowserProcess>,
}

impl BrowserHandle {
	pub(crate) fn new(session: &str, process: Box<dyn BrowserProcess>) -> Self {
		let now = Instant::now();
		Self {
			id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
			session: session.to_string(),
			created_at: now,
			last_used_at: now,
			state: HandleState::Active,
			process,
		}
	}

	/// Process-wide unique handle id.
	pub fn id(&self) -> u64 {
		self.id
	}

	/// Session this handle belongs to.
	pub fn session(&self) -> &str {
		&self.session
	}

	/// When the underlying process was launched.
	pub fn created_at(&self) -> Instant {
		self.created_at
	}

	/// Last checkout or park time; drives idle reaping.
	pub fn last_used_at(&self) -> Instant {
		self.last_used_at
	}

	/// Current lifecycle state.
	pub fn state(&self) -> HandleState {
		self.state
	}

	/// The browser process, for the caller to drive.
	pub fn process(&mut self) -> &mut dyn BrowserProcess {
		self.process.as_mut()
	}

	pub(crate) fn mark_active(&mut self) {
		self.state = HandleState::Active;
		self.last_used_at = Instant::now();
	}

	pub(crate) fn mark_idle(&mut self) {
		self.state = HandleState::Idle;
		self.last_used_at = Instant::now();
	}

	pub(crate) fn mark_unhealthy(&mut self) {
		self.state = HandleState::Unhealthy;
	}

	pub(crate) async fn check_health(&mut self) -> bool {
		self.process.is_healthy().await
	}

	pub(crate) async fn destroy(&mut self) {
		if self.state == HandleState::Destroyed {
			return;
		}
		self.process.close().await;
		self.state = HandleState::Destroyed;
	}
}

impl std::fmt::Debug for BrowserHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BrowserHandle")
			.field("id", &self.id)
			.field("session", &self.session)
			.field("state", &self.state)
			.finish_non_exhaustive()
	}
}
