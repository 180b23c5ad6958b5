use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "lh")]
#[command(about = "LeetHarvest - browser pools and session lifecycle for scraping")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Configuration file (defaults to the user config dir)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Override the session records directory
	#[arg(long, global = true, value_name = "DIR")]
	pub sessions_dir: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Inspect and manage persisted sessions
	#[command(subcommand, alias = "sess")]
	Session(SessionCommands),

	/// Apply the retention policy to stored sessions
	Cleanup {
		/// Report what would be removed without deleting anything
		#[arg(long)]
		dry_run: bool,
	},
}

#[derive(Subcommand, Debug)]
pub enum SessionCommands {
	/// List stored sessions, newest first
	#[command(alias = "ls")]
	List,

	/// Show one session record in full
	Info { name: String },

	/// Delete a stored session
	#[command(alias = "rm")]
	Delete { name: String },

	/// Rename a stored session
	#[command(alias = "mv")]
	Rename { from: String, to: String },
}
