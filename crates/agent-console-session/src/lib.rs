//! Authentication session lifecycle for the agent console client.
//!
//! - `AuthSessionStore` - login/register/refresh/logout with single-flight
//!   refresh and one-time hydration
//! - Vault backends - in-memory (default) and file-backed persistence

pub mod store;
pub mod vault;

pub use store::{AuthSessionStore, GuardState, SessionSnapshot};
