//! `lh cleanup` subcommand.

use anyhow::anyhow;
use lh_session::{SessionCleanupScheduler, SessionStore};
use serde_json::json;
use tracing::info;

use crate::config::HarvestConfig;
use crate::error::Result;
use crate::output::{ResultBuilder, print_result};

pub async fn run(dry_run: bool, config: &HarvestConfig) -> Result<()> {
	let store = SessionStore::new(config.sessions_dir());
	let scheduler = SessionCleanupScheduler::new(store, config.cleanup.to_config());

	let result = scheduler
		.cleanup(dry_run)
		.await?
		.ok_or_else(|| crate::error::LhError::Anyhow(anyhow!("another cleanup pass is already running")))?;

	info!(
		target = "lh.cli",
		cleaned = result.cleaned.len(),
		kept = result.kept.len(),
		errors = result.errors.len(),
		dry_run,
		"cleanup pass finished"
	);

	let envelope = ResultBuilder::new("cleanup").data(json!({ "result": result })).build();
	print_result(&envelope)
}
