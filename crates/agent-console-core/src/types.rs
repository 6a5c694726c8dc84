//! Payload types shared between the stores and the backend client seams.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Authenticated user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Backend user identifier.
    pub id: Uuid,
    /// Login name.
    pub username: String,
    /// Optional contact address.
    #[serde(default)]
    pub email: Option<String>,
}

/// Login credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Registration parameters.
#[derive(Debug, Clone)]
pub struct RegisterParams {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

/// Access/refresh token pair as issued by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Successful login or registration response.
#[derive(Debug, Clone)]
pub struct AuthPayload {
    pub tokens: TokenPair,
    pub user: UserProfile,
}

/// Current schema version of the persisted session blob.
pub const PERSISTED_SESSION_VERSION: u32 = 1;

/// The subset of the auth session that survives restarts.
///
/// `is_hydrated` and the refresh in-flight flag are deliberately absent:
/// they describe the in-memory store, not the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedSession {
    /// Schema version; blobs with an unknown version hydrate as no session.
    pub version: u32,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
}

impl PersistedSession {
    /// Create a blob at the current schema version.
    #[must_use]
    pub const fn new(
        access_token: Option<String>,
        refresh_token: Option<String>,
        user: Option<UserProfile>,
    ) -> Self {
        Self {
            version: PERSISTED_SESSION_VERSION,
            access_token,
            refresh_token,
            user,
        }
    }
}

/// LLM backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model_name: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

/// Agent runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum agent loop iterations per task.
    pub max_steps: u32,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

/// How an MCP server is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum McpTransport {
    /// Spawned subprocess speaking MCP over stdio.
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// Server-sent events endpoint.
    Sse { url: String },
    /// Streamable HTTP endpoint.
    Http { url: String },
}

/// Registered MCP server entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerConfig {
    pub name: String,
    #[serde(flatten)]
    pub transport: McpTransport,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

impl McpServerConfig {
    /// Normalize and check the entry before it is sent anywhere.
    ///
    /// Trims the name and transport fields and rejects entries missing a
    /// field their declared transport requires.
    ///
    /// # Errors
    /// Returns `ApiError::Validation` on an empty name, an empty command
    /// for a stdio transport, or an empty url for an sse/http transport.
    pub fn validated(mut self) -> Result<Self, ApiError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(ApiError::Validation("MCP server name is required".into()));
        }
        match &mut self.transport {
            McpTransport::Stdio { command, .. } => {
                *command = command.trim().to_string();
                if command.is_empty() {
                    return Err(ApiError::Validation(format!(
                        "MCP server '{}' uses stdio transport but has no command",
                        self.name
                    )));
                }
            }
            McpTransport::Sse { url } | McpTransport::Http { url } => {
                *url = url.trim().to_string();
                if url.is_empty() {
                    return Err(ApiError::Validation(format!(
                        "MCP server '{}' uses a remote transport but has no url",
                        self.name
                    )));
                }
            }
        }
        Ok(self)
    }
}

/// Registered agent-to-agent server entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct A2aServerConfig {
    pub name: String,
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl A2aServerConfig {
    /// Normalize and check the entry before it is sent anywhere.
    ///
    /// # Errors
    /// Returns `ApiError::Validation` on an empty name or url.
    pub fn validated(mut self) -> Result<Self, ApiError> {
        self.name = self.name.trim().to_string();
        self.url = self.url.trim().to_string();
        if self.name.is_empty() {
            return Err(ApiError::Validation("A2A server name is required".into()));
        }
        if self.url.is_empty() {
            return Err(ApiError::Validation(format!(
                "A2A server '{}' has no url",
                self.name
            )));
        }
        Ok(self)
    }
}

/// Installed skill entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Parameters for installing a skill from a source reference.
#[derive(Debug, Clone)]
pub struct InstallSkillParams {
    pub name: String,
    /// Registry reference or git url the skill is fetched from.
    pub source: String,
}

impl InstallSkillParams {
    /// Normalize and check the parameters.
    ///
    /// # Errors
    /// Returns `ApiError::Validation` on an empty name or source.
    pub fn validated(mut self) -> Result<Self, ApiError> {
        self.name = self.name.trim().to_string();
        self.source = self.source.trim().to_string();
        if self.name.is_empty() {
            return Err(ApiError::Validation("Skill name is required".into()));
        }
        if self.source.is_empty() {
            return Err(ApiError::Validation(format!(
                "Skill '{}' has no install source",
                self.name
            )));
        }
        Ok(self)
    }
}

/// Tool exposed by an installed skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillTool {
    pub skill: String,
    pub tool: String,
    pub risk: RiskLevel,
}

/// Risk classification for skill tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Policy controlling which skill tools run without approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRiskPolicy {
    /// Tools at or below this level are auto-approved.
    pub auto_approve_up_to: RiskLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mcp_stdio_without_command_is_rejected() {
        let cfg = McpServerConfig {
            name: "files".into(),
            transport: McpTransport::Stdio {
                command: "   ".into(),
                args: vec![],
            },
            enabled: true,
        };
        assert!(matches!(cfg.validated(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn mcp_remote_entry_is_trimmed() {
        let cfg = McpServerConfig {
            name: "  search  ".into(),
            transport: McpTransport::Sse {
                url: " https://mcp.example.com/sse ".into(),
            },
            enabled: true,
        };
        let cfg = cfg.validated().unwrap();
        assert_eq!(cfg.name, "search");
        assert_eq!(
            cfg.transport,
            McpTransport::Sse {
                url: "https://mcp.example.com/sse".into()
            }
        );
    }

    #[test]
    fn mcp_config_serializes_with_transport_tag() {
        let cfg = McpServerConfig {
            name: "files".into(),
            transport: McpTransport::Stdio {
                command: "mcp-files".into(),
                args: vec!["--root".into(), "/tmp".into()],
            },
            enabled: true,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"transport\":\"stdio\""));

        let parsed: McpServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn persisted_session_defaults_to_unknown_version() {
        let blob: PersistedSession = serde_json::from_str("{\"version\": 0}").unwrap();
        assert_ne!(blob.version, PERSISTED_SESSION_VERSION);
        assert!(blob.access_token.is_none());
    }

    #[test]
    fn risk_levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
    }
}
