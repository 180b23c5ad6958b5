//! Tracing bootstrap driven by the CLI verbosity flag.

use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber. `LH_LOG` overrides the verbosity
/// flag when set; diagnostics go to stderr so stdout stays parseable.
pub fn init_logging(verbose: u8) {
	let default_filter = match verbose {
		0 => "warn",
		1 => "info",
		_ => "debug",
	};
	let filter = EnvFilter::try_from_env("LH_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}
