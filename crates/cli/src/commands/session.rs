//! `lh session` subcommands.

use lh_session::{SessionStore, now_ms};
use serde_json::json;

use crate::cli::SessionCommands;
use crate::config::HarvestConfig;
use crate::error::Result;
use crate::output::{ResultBuilder, print_result};

pub fn run(command: SessionCommands, config: &HarvestConfig) -> Result<()> {
	let store = SessionStore::new(config.sessions_dir());
	match command {
		SessionCommands::List => list(&store),
		SessionCommands::Info { name } => info(&store, &name),
		SessionCommands::Delete { name } => delete(&store, &name),
		SessionCommands::Rename { from, to } => rename(&store, &from, &to),
	}
}

fn list(store: &SessionStore) -> Result<()> {
	let mut records = store.list()?;
	records.sort_by(|a, b| b.metadata.last_used.cmp(&a.metadata.last_used));

	let now = now_ms();
	let sessions: Vec<_> = records
		.iter()
		.map(|record| {
			json!({
				"name": record.name,
				"cookies": record.cookies.len(),
				"created": record.metadata.created,
				"lastUsed": record.metadata.last_used,
				"expires": record.metadata.expires,
				"ageMs": record.age_ms(now),
			})
		})
		.collect();

	let envelope = ResultBuilder::new("session.list")
		.data(json!({ "count": sessions.len(), "sessions": sessions }))
		.build();
	print_result(&envelope)
}

fn info(store: &SessionStore, name: &str) -> Result<()> {
	let record = store.load(name)?;
	let envelope = ResultBuilder::new("session.info").data(json!({ "session": record })).build();
	print_result(&envelope)
}

fn delete(store: &SessionStore, name: &str) -> Result<()> {
	let existed = store.delete(name)?;
	let envelope = ResultBuilder::new("session.delete")
		.data(json!({ "name": name, "deleted": existed }))
		.build();
	print_result(&envelope)
}

fn rename(store: &SessionStore, from: &str, to: &str) -> Result<()> {
	store.rename(from, to)?;
	let envelope = ResultBuilder::new("session.rename").data(json!({ "from": from, "to": to })).build();
	print_result(&envelope)
}
