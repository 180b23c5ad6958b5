//! Retention cleanup for persisted session files.
//!
//! Two policies run in order: age (sessions unused for strictly longer
//! than `maxSessionAge` go) and count (of the survivors, only the
//! `maxSessions` most recently used stay). Deletion failures are per-item
//! and never abort the batch.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::record::{SessionRecord, now_ms};
use crate::store::SessionStore;

/// Retention policy inputs.
#[derive(Debug, Clone)]
pub struct CleanupConfig {
	/// Maximum time since last use; a session aged exactly this is kept.
	pub max_session_age: Duration,
	/// Maximum surviving sessions after the age pass; 0 disables the cap.
	pub max_sessions: usize,
	/// Whether `run_startup_cleanup` does anything.
	pub cleanup_on_startup: bool,
	/// Background cadence; zero disables the periodic task.
	pub cleanup_interval: Duration,
}

impl Default for CleanupConfig {
	fn default() -> Self {
		Self {
			max_session_age: Duration::from_secs(7 * 24 * 60 * 60),
			max_sessions: 10,
			cleanup_on_startup: true,
			cleanup_interval: Duration::ZERO,
		}
	}
}

/// Cleanup section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CleanupOptions {
	pub max_session_age_ms: u64,
	pub max_sessions: usize,
	pub cleanup_on_startup: bool,
	pub cleanup_interval_ms: u64,
}

impl Default for CleanupOptions {
	fn default() -> Self {
		let config = CleanupConfig::default();
		Self {
			max_session_age_ms: config.max_session_age.as_millis() as u64,
			max_sessions: config.max_sessions,
			cleanup_on_startup: config.cleanup_on_startup,
			cleanup_interval_ms: config.cleanup_interval.as_millis() as u64,
		}
	}
}

impl CleanupOptions {
	pub fn to_config(&self) -> CleanupConfig {
		CleanupConfig {
			max_session_age: Duration::from_millis(self.max_session_age_ms),
			max_sessions: self.max_sessions,
			cleanup_on_startup: self.cleanup_on_startup,
			cleanup_interval: Duration::from_millis(self.cleanup_interval_ms),
		}
	}
}

/// One session that could not be deleted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupFailure {
	pub name: String,
	pub error: String,
}

/// Outcome of one retention pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResult {
	/// Sessions removed (or, in a dry run, that would be removed).
	pub cleaned: Vec<String>,
	/// Sessions surviving the pass.
	pub kept: Vec<String>,
	/// Per-session deletion failures; never aborts the batch.
	pub errors: Vec<CleanupFailure>,
	pub dry_run: bool,
	/// Epoch milliseconds when the pass ran.
	pub timestamp: u64,
}

/// Applies the retention policy to a [`SessionStore`] directory.
///
/// Runs are single-flight per scheduler: an invocation overlapping a
/// running pass is skipped (two concurrent scans over a mutating
/// directory could double-report or race on deletion).
#[derive(Debug)]
pub struct SessionCleanupScheduler {
	store: SessionStore,
	config: CleanupConfig,
	running: Mutex<()>,
}

impl SessionCleanupScheduler {
	pub fn new(store: SessionStore, config: CleanupConfig) -> Self {
		Self {
			store,
			config,
			running: Mutex::new(()),
		}
	}

	/// One retention pass. Returns `None` when another pass is already
	/// running on this scheduler.
	pub async fn cleanup(&self, dry_run: bool) -> Result<Option<CleanupResult>> {
		let Ok(_guard) = self.running.try_lock() else {
			warn!(target = "lh.cleanup", "cleanup already running; skipping overlapping invocation");
			return Ok(None);
		};

		let now = now_ms();

		// Expired records are already filtered out by the store's listing.
		let records = self.store.list()?;
		let (mut cleaned, kept) = plan_retention(records, now, &self.config);

		let mut errors = Vec::new();
		if !dry_run {
			for name in &cleaned {
				if let Err(err) = self.store.delete(name) {
					warn!(target = "lh.cleanup", session = %name, error = %err, "failed to delete session file");
					errors.push(CleanupFailure {
						name: name.clone(),
						error: err.to_string(),
					});
				}
			}
			cleaned.retain(|name| !errors.iter().any(|e| &e.name == name));
		}

		info!(
			target = "lh.cleanup",
			cleaned = cleaned.len(),
			kept = kept.len(),
			errors = errors.len(),
			dry_run,
			"session cleanup pass finished"
		);
		Ok(Some(CleanupResult {
			cleaned,
			kept,
			errors,
			dry_run,
			timestamp: now,
		}))
	}

	/// Runs one pass at startup when configured; `None` otherwise.
	pub async fn run_startup_cleanup(&self) -> Result<Option<CleanupResult>> {
		if !self.config.cleanup_on_startup {
			debug!(target = "lh.cleanup", "startup cleanup disabled");
			return Ok(None);
		}
		self.cleanup(false).await
	}

	/// Retention policy inputs in effect.
	pub fn config(&self) -> &CleanupConfig {
		&self.config
	}

	/// Spawns the periodic pass when an interval is configured. The task
	/// runs until aborted or the scheduler is dropped.
	pub fn spawn_periodic(self: &Arc<Self>) -> Option<JoinHandle<()>> {
		if self.config.cleanup_interval.is_zero() {
			return None;
		}
		let scheduler = Arc::downgrade(self);
		let interval = self.config.cleanup_interval;
		Some(tokio::spawn(async move {
			loop {
				tokio::time::sleep(interval).await;
				let Some(scheduler) = scheduler.upgrade() else { return };
				if let Err(err) = scheduler.cleanup(false).await {
					warn!(target = "lh.cleanup", error = %err, "periodic cleanup failed");
				}
			}
		}))
	}
}

/// Pure retention partition: `(cleaned, kept)` session names.
///
/// Age policy first (strictly-exceeding only: a record aged exactly
/// `max_session_age` is kept), then the count cap over the survivors,
/// newest `lastUsed` first.
fn plan_retention(mut records: Vec<SessionRecord>, now: u64, config: &CleanupConfig) -> (Vec<String>, Vec<String>) {
	let max_age_ms = config.max_session_age.as_millis() as u64;
	records.sort_by(|a, b| b.metadata.last_used.cmp(&a.metadata.last_used));

	let mut cleaned = Vec::new();
	let mut kept = Vec::new();
	for record in records {
		if record.age_ms(now) > max_age_ms {
			cleaned.push(record.name);
		} else {
			kept.push(record.name);
		}
	}

	if config.max_sessions > 0 && kept.len() > config.max_sessions {
		let excess = kept.split_off(config.max_sessions);
		cleaned.extend(excess);
	}

	(cleaned, kept)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(name: &str, last_used: u64) -> SessionRecord {
		let mut record = SessionRecord::new(name);
		record.metadata.created = last_used;
		record.metadata.last_used = last_used;
		record
	}

	fn config(max_age_ms: u64, max_sessions: usize) -> CleanupConfig {
		CleanupConfig {
			max_session_age: Duration::from_millis(max_age_ms),
			max_sessions,
			cleanup_on_startup: true,
			cleanup_interval: Duration::ZERO,
		}
	}

	const WEEK_MS: u64 = 7 * 24 * 60 * 60 * 1000;

	#[test]
	fn age_exactly_at_boundary_is_kept() {
		let now = 10 * WEEK_MS;
		let records = vec![
			record("exact", now - WEEK_MS),
			record("over-by-one-ms", now - WEEK_MS - 1),
			record("fresh", now),
		];

		let (cleaned, kept) = plan_retention(records, now, &config(WEEK_MS, 0));
		assert_eq!(cleaned, vec!["over-by-one-ms".to_string()]);
		assert_eq!(kept, vec!["fresh".to_string(), "exact".to_string()]);
	}

	#[test]
	fn count_cap_applies_after_age_policy() {
		let now = 100 * WEEK_MS;
		let day = 24 * 60 * 60 * 1000;
		let records = (1..=5u64).map(|d| record(&format!("day{d}"), now - d * day)).collect();

		let (cleaned, kept) = plan_retention(records, now, &config(52 * WEEK_MS, 2));
		assert_eq!(kept, vec!["day1".to_string(), "day2".to_string()]);
		assert_eq!(cleaned, vec!["day3".to_string(), "day4".to_string(), "day5".to_string()]);
	}

	#[test]
	fn zero_max_sessions_disables_the_cap() {
		let now = WEEK_MS;
		let records = (0..20u64).map(|i| record(&format!("s{i}"), now - i)).collect();
		let (cleaned, kept) = plan_retention(records, now, &config(WEEK_MS, 0));
		assert!(cleaned.is_empty());
		assert_eq!(kept.len(), 20);
	}
}
