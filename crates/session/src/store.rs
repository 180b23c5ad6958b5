//! Directory-backed persistence for session records.
//!
//! One `<name>.json` per session under the store directory. Already
//! expired records are filtered out of listings here, so downstream
//! consumers (including the cleanup scheduler) never see them.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, SessionError};
use crate::record::{SessionRecord, now_ms};

/// Filesystem store for [`SessionRecord`]s.
#[derive(Debug, Clone)]
pub struct SessionStore {
	dir: PathBuf,
}

impl SessionStore {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	/// Store directory (may not exist yet).
	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Backing file path for `name`.
	pub fn path_for(&self, name: &str) -> Result<PathBuf> {
		validate_name(name)?;
		Ok(self.dir.join(format!("{name}.json")))
	}

	/// All non-expired records, unsorted. Unparseable files are skipped
	/// with a warning rather than failing the listing.
	pub fn list(&self) -> Result<Vec<SessionRecord>> {
		let entries = match fs::read_dir(&self.dir) {
			Ok(entries) => entries,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(err) => return Err(err.into()),
		};

		let now = now_ms();
		let mut records = Vec::new();
		for entry in entries {
			let path = entry?.path();
			if path.extension().and_then(|e| e.to_str()) != Some("json") {
				continue;
			}
			match read_record(&path) {
				Ok(record) if record.is_expired(now) => {
					debug!(target = "lh.session", name = %record.name, "skipping expired session");
				}
				Ok(record) => records.push(record),
				Err(err) => {
					warn!(target = "lh.session", path = %path.display(), error = %err, "skipping unreadable session file");
				}
			}
		}
		Ok(records)
	}

	/// Loads one record by name.
	pub fn load(&self, name: &str) -> Result<SessionRecord> {
		let path = self.path_for(name)?;
		if !path.exists() {
			return Err(SessionError::NotFound { name: name.to_string() });
		}
		read_record(&path)
	}

	/// Persists a record, creating the store directory if needed.
	pub fn save(&self, record: &SessionRecord) -> Result<()> {
		let path = self.path_for(&record.name)?;
		fs::create_dir_all(&self.dir)?;
		let json = serde_json::to_string_pretty(record)?;
		fs::write(&path, json)?;
		debug!(target = "lh.session", name = %record.name, path = %path.display(), "saved session record");
		Ok(())
	}

	/// Removes a record's backing file. Returns whether anything existed.
	pub fn delete(&self, name: &str) -> Result<bool> {
		let path = self.path_for(name)?;
		match fs::remove_file(&path) {
			Ok(()) => Ok(true),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
			Err(err) => Err(err.into()),
		}
	}

	/// Renames a session, updating both the file and the embedded name.
	/// Fails loudly on a missing source or an existing destination.
	pub fn rename(&self, from: &str, to: &str) -> Result<()> {
		let to_path = self.path_for(to)?;
		if to_path.exists() {
			return Err(SessionError::AlreadyExists { name: to.to_string() });
		}

		let mut record = self.load(from)?;
		record.name = to.to_string();
		record.touch(now_ms());

		let json = serde_json::to_string_pretty(&record)?;
		fs::write(&to_path, json)?;
		fs::remove_file(self.path_for(from)?)?;
		debug!(target = "lh.session", from = %from, to = %to, "renamed session");
		Ok(())
	}
}

fn read_record(path: &Path) -> Result<SessionRecord> {
	let content = fs::read_to_string(path)?;
	Ok(serde_json::from_str(&content)?)
}

fn validate_name(name: &str) -> Result<()> {
	let valid = !name.is_empty()
		&& !name.starts_with('.')
		&& name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
	if valid {
		Ok(())
	} else {
		Err(SessionError::InvalidName { name: name.to_string() })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_path_escaping_names() {
		assert!(validate_name("default").is_ok());
		assert!(validate_name("cap-one_2024.v1").is_ok());
		assert!(validate_name("").is_err());
		assert!(validate_name("../evil").is_err());
		assert!(validate_name("a/b").is_err());
		assert!(validate_name(".hidden").is_err());
	}
}
