//! Config file loading for the scraper's pool, breaker, and retention
//! settings.
//!
//! One JSON document, camelCase keys, tolerant of missing sections. The
//! path resolves from `--config`, then `LH_CONFIG`, then the user config
//! directory.

use std::fs;
use std::path::{Path, PathBuf};

use lh_pool::{BreakerOptions, PoolOptions};
use lh_session::CleanupOptions;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// On-disk configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HarvestConfig {
	pub schema: u32,
	pub pool: PoolOptions,
	pub breaker: BreakerOptions,
	pub cleanup: CleanupOptions,
	/// Directory holding persisted session records; `None` uses the
	/// default under the user config dir.
	pub sessions_dir: Option<PathBuf>,
}

impl Default for HarvestConfig {
	fn default() -> Self {
		Self {
			schema: CONFIG_SCHEMA_VERSION,
			pool: PoolOptions::default(),
			breaker: BreakerOptions::default(),
			cleanup: CleanupOptions::default(),
			sessions_dir: None,
		}
	}
}

impl HarvestConfig {
	/// Loads from `path` when given, else the env/default path. A missing
	/// file yields defaults; a malformed file is an error, not a silent
	/// fallback.
	pub fn load(path: Option<&Path>) -> crate::error::Result<Self> {
		let path = match path {
			Some(path) => path.to_path_buf(),
			None => default_config_path(),
		};

		let content = match fs::read_to_string(&path) {
			Ok(content) => content,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
				debug!(target = "lh.cli", path = %path.display(), "no config file; using defaults");
				return Ok(Self::default());
			}
			Err(err) => return Err(err.into()),
		};

		let config: Self = serde_json::from_str(&content)?;
		if config.schema > CONFIG_SCHEMA_VERSION {
			warn!(
				target = "lh.cli",
				schema = config.schema,
				supported = CONFIG_SCHEMA_VERSION,
				"config schema is newer than this binary"
			);
		}
		Ok(config)
	}

	/// Directory holding persisted session records.
	pub fn sessions_dir(&self) -> PathBuf {
		self.sessions_dir.clone().unwrap_or_else(default_sessions_dir)
	}
}

fn config_root() -> PathBuf {
	dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("lh")
}

fn default_config_path() -> PathBuf {
	if let Ok(path) = std::env::var("LH_CONFIG") {
		return PathBuf::from(path);
	}
	config_root().join("config.json")
}

fn default_sessions_dir() -> PathBuf {
	config_root().join("sessions")
}
