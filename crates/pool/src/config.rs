//! Pool configuration: runtime settings and their serde-facing shape.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How browser capacity is partitioned across sessions.
///
/// Closed enum with a single live variant; a future capacity-sharing
/// strategy would be added here rather than behind a trait object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PoolStrategy {
	/// One isolated pool per session name.
	#[default]
	PerSession,
}

/// Per-session pool settings, immutable once a pool is constructed.
#[derive(Debug, Clone)]
pub struct PoolConfig {
	/// Pre-warmed floor of live handles.
	pub min_size: usize,
	/// Hard cap of live handles.
	pub max_size: usize,
	/// Idle age after which a handle is eligible for reaping.
	pub max_idle_time: Duration,
	/// Maximum wait before `acquire` fails.
	pub acquire_timeout: Duration,
	/// Whether failed launches are retried before surfacing an error.
	pub retry_on_failure: bool,
	/// Launch retry budget when `retry_on_failure` is set.
	pub max_retries: u32,
	/// Whether launchers should reset tabs instead of recreating them.
	/// Informational for the launcher; irrelevant to pool accounting.
	pub reuse_pages: bool,
}

impl Default for PoolConfig {
	fn default() -> Self {
		Self {
			min_size: 0,
			max_size: 4,
			max_idle_time: Duration::from_secs(60),
			acquire_timeout: Duration::from_secs(30),
			retry_on_failure: true,
			max_retries: 2,
			reuse_pages: true,
		}
	}
}

impl PoolConfig {
	pub fn with_min_size(mut self, size: usize) -> Self {
		self.min_size = size;
		self
	}

	pub fn with_max_size(mut self, size: usize) -> Self {
		self.max_size = size;
		self
	}

	pub fn with_max_idle_time(mut self, age: Duration) -> Self {
		self.max_idle_time = age;
		self
	}

	pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
		self.acquire_timeout = timeout;
		self
	}

	pub fn with_retry_on_failure(mut self, retry: bool) -> Self {
		self.retry_on_failure = retry;
		self
	}

	pub fn with_max_retries(mut self, retries: u32) -> Self {
		self.max_retries = retries;
		self
	}

	/// Launch attempts per acquire: 1 plus the retry budget when enabled.
	pub(crate) fn launch_attempts(&self) -> u32 {
		if self.retry_on_failure { 1 + self.max_retries } else { 1 }
	}
}

/// Pool section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PoolOptions {
	/// When false, pooling is bypassed: one-shot launch/close per acquire.
	pub enabled: bool,
	pub strategy: PoolStrategy,
	pub min_size: usize,
	pub max_size: usize,
	pub max_idle_time_ms: u64,
	pub acquire_timeout_ms: u64,
	pub retry_on_failure: bool,
	pub max_retries: u32,
	pub reuse_pages: bool,
}

impl Default for PoolOptions {
	fn default() -> Self {
		let config = PoolConfig::default();
		Self {
			enabled: true,
			strategy: PoolStrategy::PerSession,
			min_size: config.min_size,
			max_size: config.max_size,
			max_idle_time_ms: config.max_idle_time.as_millis() as u64,
			acquire_timeout_ms: config.acquire_timeout.as_millis() as u64,
			retry_on_failure: config.retry_on_failure,
			max_retries: config.max_retries,
			reuse_pages: config.reuse_pages,
		}
	}
}

impl PoolOptions {
	/// Runtime config derived from the file-facing shape.
	pub fn to_config(&self) -> PoolConfig {
		PoolConfig {
			min_size: self.min_size.min(self.max_size),
			max_size: self.max_size.max(1),
			max_idle_time: Duration::from_millis(self.max_idle_time_ms),
			acquire_timeout: Duration::from_millis(self.acquire_timeout_ms),
			retry_on_failure: self.retry_on_failure,
			max_retries: self.max_retries,
			reuse_pages: self.reuse_pages,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builder_setters_apply() {
		let config = PoolConfig::default()
			.with_min_size(2)
			.with_max_size(8)
			.with_acquire_timeout(Duration::from_millis(250))
			.with_max_idle_time(Duration::from_secs(5))
			.with_retry_on_failure(false);

		assert_eq!(config.min_size, 2);
		assert_eq!(config.max_size, 8);
		assert_eq!(config.acquire_timeout, Duration::from_millis(250));
		assert_eq!(config.max_idle_time, Duration::from_secs(5));
		assert!(!config.retry_on_failure);
	}

	#[test]
	fn launch_attempts_respect_retry_flag() {
		let config = PoolConfig::default().with_max_retries(3);
		assert_eq!(config.launch_attempts(), 4);
		assert_eq!(config.with_retry_on_failure(false).launch_attempts(), 1);
	}

	#[test]
	fn options_parse_with_defaults() {
		let options: PoolOptions = serde_json::from_str(r#"{ "maxSize": 6, "acquireTimeoutMs": 100 }"#).unwrap();
		assert!(options.enabled);
		assert_eq!(options.strategy, PoolStrategy::PerSession);
		assert_eq!(options.max_size, 6);

		let config = options.to_config();
		assert_eq!(config.max_size, 6);
		assert_eq!(config.acquire_timeout, Duration::from_millis(100));
	}

	#[test]
	fn to_config_clamps_degenerate_sizes() {
		let options = PoolOptions {
			min_size: 9,
			max_size: 0,
			..Default::default()
		};
		let config = options.to_config();
		assert_eq!(config.max_size, 1);
		assert_eq!(config.min_size, 0);
	}
}
