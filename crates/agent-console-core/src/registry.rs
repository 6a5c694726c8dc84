//! Process-wide registry of store reset callbacks.
//!
//! Logout has to tear down every session-scoped store without the auth
//! store importing any of them. Stores register a reset closure here;
//! logout runs the whole list, excluding the auth store's own entry so it
//! is not reset out from under the logout sequence.

use std::sync::Mutex;

use futures::future::BoxFuture;

/// Registry name the auth session store registers under.
pub const AUTH_STORE: &str = "auth";

/// Which resetters a pass invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetScope {
    /// Every registered resetter, the auth store included.
    All,
    /// Every resetter except those named [`AUTH_STORE`].
    ExceptAuth,
}

type ResetFn = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Mapping from store name to reset callback.
///
/// Names need not be unique; each registered resetter runs exactly once
/// per pass, in registration order.
#[derive(Default)]
pub struct ResetRegistry {
    resetters: Mutex<Vec<(String, ResetFn)>>,
}

impl ResetRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reset callback under `name`.
    pub fn register<F, Fut>(&self, name: impl Into<String>, reset: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.resetters
            .lock()
            .unwrap()
            .push((name.into(), Box::new(move || Box::pin(reset()))));
    }

    /// Run one reset pass over the registered stores.
    pub async fn reset_all(&self, scope: ResetScope) {
        // Build the futures under the lock, await them outside it, so a
        // resetter may itself register without deadlocking.
        let pending: Vec<BoxFuture<'static, ()>> = {
            let resetters = self.resetters.lock().unwrap();
            resetters
                .iter()
                .filter(|(name, _)| scope == ResetScope::All || name != AUTH_STORE)
                .map(|(_, reset)| reset())
                .collect()
        };

        tracing::debug!("Resetting {} store(s)", pending.len());
        for reset in pending {
            reset.await;
        }
    }

    /// Number of registered resetters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resetters.lock().unwrap().len()
    }

    /// True if no resetter has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
