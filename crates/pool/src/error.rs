//! Pool error taxonomy shared across acquire/release/drain paths.

use std::time::Duration;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PoolError>;

/// Failure reported by a [`BrowserLauncher`] implementation.
///
/// Carries only a message; the pool folds it into
/// [`PoolError::CreationFailure`] together with the session name and the
/// attempt count.
///
/// [`BrowserLauncher`]: crate::driver::BrowserLauncher
#[derive(Debug, Error)]
#[error("{0}")]
pub struct LaunchError(pub String);

/// Errors surfaced by pool and manager operations.
///
/// `AcquireTimeout` and `CircuitOpen` are retryable by the caller (the
/// latter only after a backoff); `Draining` and `UnknownSession` are not.
#[derive(Debug, Error)]
pub enum PoolError {
	/// Pool was at capacity and no handle freed up before the deadline.
	#[error("timed out after {waited:?} waiting for a browser in session '{session}'")]
	AcquireTimeout { session: String, waited: Duration },

	/// The session's circuit breaker is open; creation is not attempted.
	#[error("circuit open for session '{session}'; browsers for this session keep failing")]
	CircuitOpen { session: String },

	/// Pool is shutting down and rejects new work.
	#[error("pool for session '{session}' is draining")]
	Draining { session: String },

	/// A release referenced a session no pool was ever created for.
	#[error("no pool exists for session '{session}'; release does not match any acquire")]
	UnknownSession { session: String },

	/// The underlying browser process failed to start.
	#[error("failed to launch browser for session '{session}' after {attempts} attempt(s): {message}")]
	CreationFailure {
		session: String,
		attempts: u32,
		message: String,
	},
}

impl PoolError {
	/// Whether the caller may retry the same operation later.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::AcquireTimeout { .. } | Self::CircuitOpen { .. } | Self::CreationFailure { .. })
	}
}
