use clap::Parser;
use lh_cli::{cli::Cli, commands, config::HarvestConfig, logging, output};
use tracing::error;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let mut config = match HarvestConfig::load(cli.config.as_deref()) {
		Ok(config) => config,
		Err(err) => {
			error!(target = "lh", error = %err, "failed to load configuration");
			std::process::exit(1);
		}
	};
	if let Some(dir) = cli.sessions_dir {
		config.sessions_dir = Some(dir);
	}

	if let Err(err) = commands::dispatch(cli.command, config).await {
		error!(target = "lh", error = %err, "command failed");
		let envelope = output::ResultBuilder::<serde_json::Value>::new("lh").error(err.to_string()).build();
		let _ = output::print_result(&envelope);
		std::process::exit(1);
	}
}
