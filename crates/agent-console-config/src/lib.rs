//! Configuration aggregation for the agent console client.
//!
//! One store fans out over every independent backend config domain,
//! isolates per-domain failures, and preserves known-successful mutations
//! when an authoritative refresh fails.

pub mod store;

pub use store::{ConfigState, ConfigStore};
