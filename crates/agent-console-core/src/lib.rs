//! Core abstractions for the agent console client state layer.
//!
//! This crate provides the fundamental building blocks:
//! - Shared payload types (`UserProfile`, tokens, per-domain config entries)
//! - `AuthApi` / `ConfigApi` - seams to the backend clients
//! - `SessionVault` - fail-soft persistence of the session subset
//! - `Notifier` - transient user-facing message sink
//! - `ResetRegistry` - cross-store teardown coordination on logout

pub mod error;
pub mod notify;
pub mod registry;
pub mod traits;
pub mod types;

pub use error::{ApiError, VaultError};
pub use notify::{LogNotifier, Severity};
pub use registry::{ResetRegistry, ResetScope};
pub use traits::{AuthApi, ConfigApi, Notifier, SessionVault};
