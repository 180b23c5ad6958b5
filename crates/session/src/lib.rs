//! Durable session state: persisted records, their store, and the
//! retention cleanup scheduler.
//!
//! A session is a named identity (cookies plus storage snapshots) saved
//! as one JSON file. Live browser pooling is a separate concern handled
//! by `lh-pool`; this crate only deals with what is on disk.

/// Retention cleanup scheduler.
pub mod cleanup;
/// Store error taxonomy.
pub mod error;
/// Persisted record schema.
pub mod record;
/// Directory-backed record store.
pub mod store;

pub use cleanup::{CleanupConfig, CleanupFailure, CleanupOptions, CleanupResult, SessionCleanupScheduler};
pub use error::{Result, SessionError};
pub use record::{Cookie, SessionMetadata, SessionRecord, now_ms};
pub use store::SessionStore;
