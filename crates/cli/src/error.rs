//! CLI error type folding library errors into one surface.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LhError>;

#[derive(Debug, Error)]
pub enum LhError {
	#[error(transparent)]
	Session(#[from] lh_session::SessionError),

	#[error(transparent)]
	Pool(#[from] lh_pool::PoolError),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}
