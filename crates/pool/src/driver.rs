//! Launcher and process seams keeping the headless engine opaque.
//!
//! The pool never talks to a concrete browser engine. It is handed a
//! [`BrowserLauncher`] at construction and treats every live browser as a
//! boxed [`BrowserProcess`]. Tests inject an in-memory fake through the
//! same seam.

use async_trait::async_trait;

use crate::error::LaunchError;

/// One live headless browser process.
///
/// Health checks must be lightweight (a liveness probe, not a page load);
/// they run on the release path while other callers may be waiting.
#[async_trait]
pub trait BrowserProcess: Send {
	/// Probes whether the process is still usable.
	async fn is_healthy(&mut self) -> bool;

	/// Terminates the process. Failures are the implementation's to log;
	/// the pool treats close as infallible.
	async fn close(&mut self);
}

/// Factory for browser processes, injected into every pool.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
	/// Launches a fresh browser process for `session`.
	async fn launch(&self, session: &str) -> std::result::Result<Box<dyn BrowserProcess>, LaunchError>;
}
