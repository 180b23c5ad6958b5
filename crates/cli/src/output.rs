//! JSON result envelope printed on stdout.
//!
//! Every command emits one `{ok, op, data}` object (plus `error` on
//! failure) so callers can pipe output without scraping log lines.

use std::io::{self, Write};

use serde::Serialize;
use serde_json::json;

/// Builder for a single command's result envelope.
pub struct ResultBuilder<T: Serialize> {
	op: String,
	data: Option<T>,
	error: Option<String>,
}

impl<T: Serialize> ResultBuilder<T> {
	pub fn new(op: impl Into<String>) -> Self {
		Self {
			op: op.into(),
			data: None,
			error: None,
		}
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, message: impl Into<String>) -> Self {
		self.error = Some(message.into());
		self
	}

	pub fn build(self) -> serde_json::Value {
		let mut envelope = json!({
			"ok": self.error.is_none(),
			"op": self.op,
		});
		if let Some(data) = self.data {
			envelope["data"] = serde_json::to_value(data).unwrap_or(serde_json::Value::Null);
		}
		if let Some(error) = self.error {
			envelope["error"] = json!(error);
		}
		envelope
	}
}

/// Writes the envelope to stdout as pretty JSON followed by a newline.
pub fn print_result(envelope: &serde_json::Value) -> crate::error::Result<()> {
	let stdout = io::stdout();
	let mut out = stdout.lock();
	serde_json::to_writer_pretty(&mut out, envelope)?;
	out.write_all(b"\n")?;
	Ok(())
}
