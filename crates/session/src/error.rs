//! Session store error taxonomy.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors from persisted-session operations.
#[derive(Debug, Error)]
pub enum SessionError {
	#[error("no persisted session named '{name}'")]
	NotFound { name: String },

	#[error("a persisted session named '{name}' already exists")]
	AlreadyExists { name: String },

	#[error("invalid session name '{name}': only alphanumerics, '-', '_' and '.' are allowed")]
	InvalidName { name: String },

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error("malformed session file: {0}")]
	Json(#[from] serde_json::Error),
}
