//! Auth session store: owns the session entity and its lifecycle.

use std::sync::Arc;

use agent_console_core::registry::AUTH_STORE;
use agent_console_core::types::{
    AuthPayload, Credentials, PersistedSession, RegisterParams, UserProfile,
};
use agent_console_core::{ApiError, AuthApi, ResetRegistry, ResetScope, SessionVault};
use tokio::sync::{Mutex, RwLock};

/// Point-in-time view of the session.
///
/// Mutations happen whole-snapshot under one write lock, so a reader never
/// observes a half-updated session (a new access token without its user,
/// for example).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
    /// Whether the one-time restore from the vault has happened.
    pub is_hydrated: bool,
    /// Whether a refresh call is in flight.
    pub is_refreshing: bool,
}

/// What a route guard should do right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Hydration has not finished; render nothing yet.
    Pending,
    /// No session; redirect to login.
    Anonymous,
    /// Session present; render children.
    Authenticated,
}

/// Owns login/register/refresh/logout and the persisted session subset.
pub struct AuthSessionStore {
    api: Arc<dyn AuthApi>,
    vault: Arc<dyn SessionVault>,
    registry: Arc<ResetRegistry>,
    state: RwLock<SessionSnapshot>,
    // Single-flight gate: a concurrent refresh fails the try_lock and
    // short-circuits without a network call.
    refresh_gate: Mutex<()>,
}

impl AuthSessionStore {
    /// Create the store and register its reset under the auth name.
    ///
    /// The registry skips the auth entry during logout's own reset pass;
    /// other flows may still reset the session through it.
    #[must_use]
    pub fn new(
        api: Arc<dyn AuthApi>,
        vault: Arc<dyn SessionVault>,
        registry: Arc<ResetRegistry>,
    ) -> Arc<Self> {
        let store = Arc::new(Self {
            api,
            vault,
            registry,
            state: RwLock::new(SessionSnapshot::default()),
            refresh_gate: Mutex::new(()),
        });

        // Weak reference: the registry outlives nothing here, but a cycle
        // through it would keep the store alive forever.
        let weak = Arc::downgrade(&store);
        store.registry.register(AUTH_STORE, move || {
            let weak = weak.clone();
            async move {
                if let Some(store) = weak.upgrade() {
                    store.reset().await;
                }
            }
        });

        store
    }

    /// One-time restore of the persisted session subset.
    ///
    /// Marks the store hydrated unconditionally, even when nothing was
    /// stored or the blob was malformed, so guards never wait forever.
    /// Calling again after hydration is a no-op.
    pub async fn hydrate(&self) {
        let mut state = self.state.write().await;
        if state.is_hydrated {
            return;
        }
        if let Some(stored) = self.vault.load().await {
            state.access_token = stored.access_token;
            state.refresh_token = stored.refresh_token;
            // A user without an access token is not a session.
            state.user = if state.access_token.is_some() {
                stored.user
            } else {
                None
            };
        }
        state.is_hydrated = true;
    }

    /// Exchange credentials for a session.
    ///
    /// # Errors
    /// Propagates the upstream error unmodified; the session is untouched
    /// on failure.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, ApiError> {
        let payload = self.api.login(credentials).await?;
        Ok(self.install(payload).await)
    }

    /// Create an account and install the resulting session.
    ///
    /// # Errors
    /// Propagates the upstream error unmodified; the session is untouched
    /// on failure.
    pub async fn register(&self, params: &RegisterParams) -> Result<UserProfile, ApiError> {
        let payload = self.api.register(params).await?;
        Ok(self.install(payload).await)
    }

    /// Re-fetch the profile for the current session.
    ///
    /// Returns `Ok(None)` without any network call when no access token is
    /// present, and also when the session was torn down while the fetch
    /// was in flight - a token-less session never gets a user re-installed.
    ///
    /// # Errors
    /// Propagates the upstream error unmodified.
    pub async fn fetch_me(&self) -> Result<Option<UserProfile>, ApiError> {
        let Some(token) = self.state.read().await.access_token.clone() else {
            return Ok(None);
        };
        let profile = self.api.me(&token).await?;
        {
            let mut state = self.state.write().await;
            if state.access_token.is_none() {
                return Ok(None);
            }
            state.user = Some(profile.clone());
        }
        self.persist().await;
        Ok(Some(profile))
    }

    /// Exchange the refresh token for a fresh token pair.
    ///
    /// Single-flight: returns `false` immediately when a refresh is
    /// already in flight or no refresh token exists. Any upstream failure
    /// is converted into a full [`logout`](Self::logout) and `false` -
    /// callers must treat `false` as "no longer authenticated", not as a
    /// retryable failure.
    pub async fn refresh(&self) -> bool {
        let Ok(_gate) = self.refresh_gate.try_lock() else {
            tracing::debug!("Refresh already in flight");
            return false;
        };

        let refresh_token = {
            let mut state = self.state.write().await;
            let Some(token) = state.refresh_token.clone() else {
                return false;
            };
            state.is_refreshing = true;
            token
        };

        match self.api.refresh(&refresh_token).await {
            Ok(tokens) => {
                {
                    let mut state = self.state.write().await;
                    state.access_token = Some(tokens.access_token);
                    state.refresh_token = Some(tokens.refresh_token);
                    state.is_refreshing = false;
                }
                self.persist().await;
                true
            }
            Err(e) => {
                tracing::warn!("Session refresh rejected, logging out: {e}");
                // Full teardown, no retry; the reset clears is_refreshing
                // with the rest of the state.
                self.logout().await;
                false
            }
        }
    }

    /// Tear down the session and every other session-scoped store.
    ///
    /// Clears the vault, resets all non-auth stores through the registry,
    /// resets own state, and marks the store hydrated so guards settle on
    /// "anonymous" instead of flashing a loading state.
    pub async fn logout(&self) {
        if let Err(e) = self.vault.clear().await {
            tracing::warn!("Failed to clear persisted session: {e}");
        }
        self.registry.reset_all(ResetScope::ExceptAuth).await;
        self.reset().await;
    }

    /// Current guard decision from `{access_token, is_hydrated}`.
    pub async fn guard_state(&self) -> GuardState {
        let state = self.state.read().await;
        if !state.is_hydrated {
            GuardState::Pending
        } else if state.access_token.is_some() {
            GuardState::Authenticated
        } else {
            GuardState::Anonymous
        }
    }

    /// Clone of the current session state.
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.read().await.clone()
    }

    /// Current access token, if any.
    pub async fn access_token(&self) -> Option<String> {
        self.state.read().await.access_token.clone()
    }

    /// Whether a refresh call is in flight.
    pub async fn is_refreshing(&self) -> bool {
        self.state.read().await.is_refreshing
    }

    // Reset to a known-anonymous session. Hydration stays true: wiping it
    // would wedge any guard already past the hydration wait.
    async fn reset(&self) {
        let mut state = self.state.write().await;
        *state = SessionSnapshot {
            is_hydrated: true,
            ..SessionSnapshot::default()
        };
    }

    async fn install(&self, payload: AuthPayload) -> UserProfile {
        {
            let mut state = self.state.write().await;
            state.access_token = Some(payload.tokens.access_token.clone());
            state.refresh_token = Some(payload.tokens.refresh_token.clone());
            state.user = Some(payload.user.clone());
        }
        self.persist().await;
        payload.user
    }

    // Best-effort write of the persisted subset; the in-memory session
    // stays authoritative when the vault misbehaves.
    async fn persist(&self) {
        let blob = {
            let state = self.state.read().await;
            PersistedSession::new(
                state.access_token.clone(),
                state.refresh_token.clone(),
                state.user.clone(),
            )
        };
        if let Err(e) = self.vault.save(&blob).await {
            tracing::warn!("Failed to persist session: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use std::time::Duration;

    use agent_console_core::types::{PERSISTED_SESSION_VERSION, TokenPair};
    use async_trait::async_trait;
    use uuid::Uuid;

    use super::*;
    use crate::vault::MemoryVault;

    fn profile(username: &str) -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: None,
        }
    }

    fn payload(username: &str) -> AuthPayload {
        AuthPayload {
            tokens: TokenPair {
                access_token: "t1".into(),
                refresh_token: "r1".into(),
            },
            user: profile(username),
        }
    }

    #[derive(Default)]
    struct MockAuthApi {
        me_calls: AtomicUsize,
        refresh_calls: AtomicUsize,
        fail_login: AtomicBool,
        fail_refresh: AtomicBool,
        me_delay_ms: AtomicU64,
        refresh_delay_ms: AtomicU64,
    }

    #[async_trait]
    impl AuthApi for MockAuthApi {
        async fn login(&self, credentials: &Credentials) -> Result<AuthPayload, ApiError> {
            if self.fail_login.load(Ordering::SeqCst) {
                return Err(ApiError::Upstream("invalid credentials".into()));
            }
            Ok(payload(&credentials.username))
        }

        async fn register(&self, params: &RegisterParams) -> Result<AuthPayload, ApiError> {
            Ok(payload(&params.username))
        }

        async fn me(&self, _access_token: &str) -> Result<UserProfile, ApiError> {
            self.me_calls.fetch_add(1, Ordering::SeqCst);
            let delay = self.me_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            Ok(profile("me"))
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<TokenPair, ApiError> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            let delay = self.refresh_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if self.fail_refresh.load(Ordering::SeqCst) {
                return Err(ApiError::SessionExpired);
            }
            Ok(TokenPair {
                access_token: "t2".into(),
                refresh_token: "r2".into(),
            })
        }
    }

    struct Fixture {
        api: Arc<MockAuthApi>,
        vault: Arc<MemoryVault>,
        registry: Arc<ResetRegistry>,
        store: Arc<AuthSessionStore>,
    }

    fn fixture() -> Fixture {
        let api = Arc::new(MockAuthApi::default());
        let vault = Arc::new(MemoryVault::new());
        let registry = Arc::new(ResetRegistry::new());
        let store = AuthSessionStore::new(
            Arc::clone(&api) as Arc<dyn AuthApi>,
            Arc::clone(&vault) as Arc<dyn SessionVault>,
            Arc::clone(&registry),
        );
        Fixture {
            api,
            vault,
            registry,
            store,
        }
    }

    async fn login(fx: &Fixture) -> UserProfile {
        fx.store
            .login(&Credentials {
                username: "u".into(),
                password: "p".into(),
            })
            .await
            .unwrap()
    }

    fn counting_resetter(registry: &ResetRegistry, name: &str) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        registry.register(name, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        count
    }

    #[tokio::test]
    async fn login_installs_the_full_session() {
        let fx = fixture();
        let user = login(&fx).await;

        let snapshot = fx.store.snapshot().await;
        assert_eq!(snapshot.access_token.as_deref(), Some("t1"));
        assert_eq!(snapshot.refresh_token.as_deref(), Some("r1"));
        assert_eq!(snapshot.user, Some(user));

        let persisted = fx.vault.load().await.unwrap();
        assert_eq!(persisted.access_token.as_deref(), Some("t1"));
        assert_eq!(persisted.version, PERSISTED_SESSION_VERSION);
    }

    #[tokio::test]
    async fn login_failure_leaves_the_session_untouched() {
        let fx = fixture();
        fx.api.fail_login.store(true, Ordering::SeqCst);

        let result = login_raw(&fx).await;
        assert!(matches!(result, Err(ApiError::Upstream(_))));
        assert_eq!(fx.store.snapshot().await, SessionSnapshot::default());
    }

    async fn login_raw(fx: &Fixture) -> Result<UserProfile, ApiError> {
        fx.store
            .login(&Credentials {
                username: "u".into(),
                password: "p".into(),
            })
            .await
    }

    #[tokio::test]
    async fn fetch_me_without_token_skips_the_network() {
        let fx = fixture();
        assert_eq!(fx.store.fetch_me().await.unwrap(), None);
        assert_eq!(fx.api.me_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_me_replaces_the_profile() {
        let fx = fixture();
        login(&fx).await;

        let fetched = fx.store.fetch_me().await.unwrap().unwrap();
        assert_eq!(fetched.username, "me");
        assert_eq!(fx.store.snapshot().await.user, Some(fetched));
    }

    #[tokio::test]
    async fn fetch_me_resolving_after_logout_does_not_resurrect_the_user() {
        let fx = fixture();
        login(&fx).await;
        fx.api.me_delay_ms.store(20, Ordering::SeqCst);

        let store = Arc::clone(&fx.store);
        let (fetched, ()) = tokio::join!(fx.store.fetch_me(), async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            store.logout().await;
        });

        assert_eq!(fetched.unwrap(), None);
        let snapshot = fx.store.snapshot().await;
        assert!(snapshot.access_token.is_none());
        assert!(snapshot.user.is_none());
        // Persist was skipped too: the vault stays cleared.
        assert!(fx.vault.load().await.is_none());
    }

    #[tokio::test]
    async fn concurrent_refreshes_issue_one_network_call() {
        let fx = fixture();
        login(&fx).await;
        fx.api.refresh_delay_ms.store(10, Ordering::SeqCst);

        let (first, second) = tokio::join!(fx.store.refresh(), fx.store.refresh());

        assert!(first);
        assert!(!second);
        assert_eq!(fx.api.refresh_calls.load(Ordering::SeqCst), 1);
        assert!(!fx.store.is_refreshing().await);
        assert_eq!(fx.store.access_token().await.as_deref(), Some("t2"));
    }

    #[tokio::test]
    async fn refresh_without_token_returns_false_without_calling() {
        let fx = fixture();
        assert!(!fx.store.refresh().await);
        assert_eq!(fx.api.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refresh_rejection_becomes_a_full_logout() {
        let fx = fixture();
        let config_resets = counting_resetter(&fx.registry, "config");
        login(&fx).await;
        assert_eq!(fx.store.access_token().await.as_deref(), Some("t1"));
        fx.api.fail_refresh.store(true, Ordering::SeqCst);

        assert!(!fx.store.refresh().await);

        let snapshot = fx.store.snapshot().await;
        assert_eq!(
            snapshot,
            SessionSnapshot {
                is_hydrated: true,
                ..SessionSnapshot::default()
            }
        );
        assert_eq!(config_resets.load(Ordering::SeqCst), 1);
        assert!(fx.vault.load().await.is_none());
    }

    #[tokio::test]
    async fn logout_resets_everything_but_stays_hydrated() {
        let fx = fixture();
        let config_resets = counting_resetter(&fx.registry, "config");
        let chat_resets = counting_resetter(&fx.registry, "chat");
        login(&fx).await;

        fx.store.logout().await;

        let snapshot = fx.store.snapshot().await;
        assert!(snapshot.access_token.is_none());
        assert!(snapshot.refresh_token.is_none());
        assert!(snapshot.user.is_none());
        assert!(snapshot.is_hydrated);
        assert_eq!(config_resets.load(Ordering::SeqCst), 1);
        assert_eq!(chat_resets.load(Ordering::SeqCst), 1);
        assert!(fx.vault.load().await.is_none());
    }

    #[tokio::test]
    async fn hydrate_restores_the_persisted_subset() {
        let fx = fixture();
        let user = profile("stored");
        fx.vault
            .save(&PersistedSession::new(
                Some("t0".into()),
                Some("r0".into()),
                Some(user.clone()),
            ))
            .await
            .unwrap();

        fx.store.hydrate().await;

        let snapshot = fx.store.snapshot().await;
        assert_eq!(snapshot.access_token.as_deref(), Some("t0"));
        assert_eq!(snapshot.refresh_token.as_deref(), Some("r0"));
        assert_eq!(snapshot.user, Some(user));
        assert!(snapshot.is_hydrated);
    }

    #[tokio::test]
    async fn hydrate_with_empty_vault_still_marks_hydrated() {
        let fx = fixture();
        assert_eq!(fx.store.guard_state().await, GuardState::Pending);

        fx.store.hydrate().await;

        assert_eq!(fx.store.guard_state().await, GuardState::Anonymous);
    }

    #[tokio::test]
    async fn hydrate_after_hydration_is_a_no_op() {
        let fx = fixture();
        fx.store.hydrate().await;
        login(&fx).await;

        fx.store.hydrate().await;

        assert_eq!(fx.store.access_token().await.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn hydrate_drops_a_user_without_a_token() {
        let fx = fixture();
        fx.vault
            .save(&PersistedSession::new(None, None, Some(profile("ghost"))))
            .await
            .unwrap();

        fx.store.hydrate().await;

        let snapshot = fx.store.snapshot().await;
        assert!(snapshot.user.is_none());
        assert_eq!(fx.store.guard_state().await, GuardState::Anonymous);
    }

    #[tokio::test]
    async fn guard_state_follows_the_session() {
        let fx = fixture();
        assert_eq!(fx.store.guard_state().await, GuardState::Pending);

        fx.store.hydrate().await;
        assert_eq!(fx.store.guard_state().await, GuardState::Anonymous);

        login(&fx).await;
        assert_eq!(fx.store.guard_state().await, GuardState::Authenticated);

        fx.store.logout().await;
        assert_eq!(fx.store.guard_state().await, GuardState::Anonymous);
    }
}
