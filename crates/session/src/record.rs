//! Persisted session record schema.
//!
//! One JSON document per session name: the cookies and storage snapshots
//! needed to restore a logical identity into a fresh browser, plus
//! retention metadata. Durable state only; live pool bookkeeping never
//! touches these files.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// One cookie captured from a live session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
	pub name: String,
	pub value: String,
	pub domain: String,
	#[serde(default = "default_cookie_path")]
	pub path: String,
	/// Expiry as epoch milliseconds; `None` for session cookies.
	#[serde(default)]
	pub expires: Option<u64>,
	#[serde(default)]
	pub http_only: bool,
	#[serde(default)]
	pub secure: bool,
}

fn default_cookie_path() -> String {
	"/".to_string()
}

/// Retention metadata on a persisted session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
	/// Creation time, epoch milliseconds.
	pub created: u64,
	/// Last restore/save time, epoch milliseconds; drives retention.
	pub last_used: u64,
	/// Hard expiry, epoch milliseconds; `None` never expires.
	#[serde(default)]
	pub expires: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
}

/// Durable snapshot of one named session identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
	pub name: String,
	#[serde(default)]
	pub cookies: Vec<Cookie>,
	#[serde(default)]
	pub local_storage: HashMap<String, String>,
	#[serde(default)]
	pub session_storage: HashMap<String, String>,
	pub metadata: SessionMetadata,
}

/// Current wall-clock time as epoch milliseconds.
pub fn now_ms() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_millis() as u64)
		.unwrap_or(0)
}

impl SessionRecord {
	/// Fresh record with empty cookie/storage snapshots.
	pub fn new(name: &str) -> Self {
		let now = now_ms();
		Self {
			name: name.to_string(),
			cookies: Vec::new(),
			local_storage: HashMap::new(),
			session_storage: HashMap::new(),
			metadata: SessionMetadata {
				created: now,
				last_used: now,
				expires: None,
				description: None,
			},
		}
	}

	/// Whether the record's hard expiry has passed.
	pub fn is_expired(&self, now: u64) -> bool {
		self.metadata.expires.is_some_and(|expires| expires <= now)
	}

	/// Bumps `lastUsed`; called on every restore or save.
	pub fn touch(&mut self, now: u64) {
		self.metadata.last_used = now;
	}

	/// Age since last use, in milliseconds.
	pub fn age_ms(&self, now: u64) -> u64 {
		now.saturating_sub(self.metadata.last_used)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_through_the_wire_shape() {
		let json = r#"{
			"name": "default",
			"cookies": [{"name": "csrftoken", "value": "abc", "domain": ".leetcode.com", "httpOnly": true, "secure": true}],
			"localStorage": {"theme": "dark"},
			"sessionStorage": {},
			"metadata": {"created": 1000, "lastUsed": 2000, "expires": null}
		}"#;

		let record: SessionRecord = serde_json::from_str(json).unwrap();
		assert_eq!(record.name, "default");
		assert_eq!(record.cookies[0].path, "/");
		assert!(record.cookies[0].http_only);
		assert_eq!(record.local_storage["theme"], "dark");
		assert_eq!(record.metadata.last_used, 2000);

		let out = serde_json::to_value(&record).unwrap();
		assert_eq!(out["cookies"][0]["httpOnly"], true);
		assert_eq!(out["metadata"]["lastUsed"], 2000);
	}

	#[test]
	fn expiry_is_inclusive_at_the_boundary() {
		let mut record = SessionRecord::new("s");
		record.metadata.expires = Some(5000);
		assert!(!record.is_expired(4999));
		assert!(record.is_expired(5000));
		assert!(record.is_expired(5001));
	}

	#[test]
	fn touch_bumps_last_used_only() {
		let mut record = SessionRecord::new("s");
		let created = record.metadata.created;
		record.touch(created + 42);
		assert_eq!(record.metadata.last_used, created + 42);
		assert_eq!(record.metadata.created, created);
	}
}
