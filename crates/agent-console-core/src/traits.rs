//! Seams to the backend clients, persistence, and the notification sink.
//!
//! The stores never perform network or disk I/O themselves; everything
//! flows through these traits so tests and demos can inject in-memory
//! collaborators.

use async_trait::async_trait;

use crate::error::{ApiError, VaultError};
use crate::notify::Severity;
use crate::types::{
    A2aServerConfig, AgentConfig, AuthPayload, Credentials, InstallSkillParams, LlmConfig,
    McpServerConfig, PersistedSession, RegisterParams, Skill, SkillRiskPolicy, SkillTool,
    TokenPair, UserProfile,
};

/// Authentication endpoints.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for tokens and a profile.
    async fn login(&self, credentials: &Credentials) -> Result<AuthPayload, ApiError>;

    /// Create an account; same response shape as login.
    async fn register(&self, params: &RegisterParams) -> Result<AuthPayload, ApiError>;

    /// Fetch the profile for the given access token.
    async fn me(&self, access_token: &str) -> Result<UserProfile, ApiError>;

    /// Exchange a refresh token for a fresh token pair.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError>;
}

/// Per-domain configuration endpoints.
///
/// Every getter and mutator is independent; a failure in one domain says
/// nothing about its siblings.
#[async_trait]
pub trait ConfigApi: Send + Sync {
    async fn llm_config(&self) -> Result<LlmConfig, ApiError>;
    async fn agent_config(&self) -> Result<AgentConfig, ApiError>;

    async fn mcp_servers(&self) -> Result<Vec<McpServerConfig>, ApiError>;
    async fn add_mcp_server(&self, server: &McpServerConfig) -> Result<(), ApiError>;
    async fn delete_mcp_server(&self, name: &str) -> Result<(), ApiError>;
    async fn set_mcp_server_enabled(&self, name: &str, enabled: bool) -> Result<(), ApiError>;

    async fn a2a_servers(&self) -> Result<Vec<A2aServerConfig>, ApiError>;
    async fn add_a2a_server(&self, server: &A2aServerConfig) -> Result<(), ApiError>;
    async fn delete_a2a_server(&self, name: &str) -> Result<(), ApiError>;

    async fn skills(&self) -> Result<Vec<Skill>, ApiError>;
    async fn install_skill(&self, params: &InstallSkillParams) -> Result<(), ApiError>;
    async fn uninstall_skill(&self, name: &str) -> Result<(), ApiError>;
    async fn set_skill_enabled(&self, name: &str, enabled: bool) -> Result<(), ApiError>;

    async fn skill_tools(&self) -> Result<Vec<SkillTool>, ApiError>;
    async fn skill_risk_policy(&self) -> Result<SkillRiskPolicy, ApiError>;
    async fn update_skill_risk_policy(&self, policy: &SkillRiskPolicy) -> Result<(), ApiError>;
}

/// Persistence of the session subset under one fixed key.
#[async_trait]
pub trait SessionVault: Send + Sync {
    /// Restore the stored session, if any.
    ///
    /// Fail-soft: absent, malformed, or wrong-version content is `None`,
    /// never an error.
    async fn load(&self) -> Option<PersistedSession>;

    /// Persist the session subset, replacing any previous blob.
    ///
    /// # Errors
    /// Returns error if the blob cannot be written.
    async fn save(&self, session: &PersistedSession) -> Result<(), VaultError>;

    /// Remove the stored blob.
    ///
    /// # Errors
    /// Returns error if an existing blob cannot be removed.
    async fn clear(&self) -> Result<(), VaultError>;
}

/// Sink for transient user-facing messages.
pub trait Notifier: Send + Sync {
    /// Emit one message; display and auto-clear are the sink's problem.
    fn notify(&self, severity: Severity, text: String);
}
