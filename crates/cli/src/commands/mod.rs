//! Command dispatch.

pub mod cleanup;
pub mod session;

use crate::cli::Commands;
use crate::config::HarvestConfig;
use crate::error::Result;

pub async fn dispatch(command: Commands, config: HarvestConfig) -> Result<()> {
	match command {
		Commands::Session(cmd) => session::run(cmd, &config),
		Commands::Cleanup { dry_run } => cleanup::run(dry_run, &config).await,
	}
}
