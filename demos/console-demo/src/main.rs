//! Demo wiring of the console state layer with in-memory collaborators.
//!
//! Run with: cargo run -p console-demo
//!
//! Walks the full session lifecycle: hydrate, login, config fan-out, a
//! mutation with a failing refresh, then logout teardown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use agent_console_core::types::{
    A2aServerConfig, AgentConfig, AuthPayload, Credentials, InstallSkillParams, LlmConfig,
    McpServerConfig, McpTransport, RegisterParams, RiskLevel, Skill, SkillRiskPolicy, SkillTool,
    TokenPair, UserProfile,
};
use agent_console_core::{
    ApiError, AuthApi, ConfigApi, LogNotifier, Notifier, ResetRegistry, SessionVault,
};
use agent_console_config::ConfigStore;
use agent_console_session::AuthSessionStore;
use agent_console_session::vault::MemoryVault;
use async_trait::async_trait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Canned auth backend: any credentials work.
struct DemoAuthApi;

#[async_trait]
impl AuthApi for DemoAuthApi {
    async fn login(&self, credentials: &Credentials) -> Result<AuthPayload, ApiError> {
        Ok(AuthPayload {
            tokens: TokenPair {
                access_token: "demo-access".into(),
                refresh_token: "demo-refresh".into(),
            },
            user: UserProfile {
                id: Uuid::new_v4(),
                username: credentials.username.clone(),
                email: None,
            },
        })
    }

    async fn register(&self, params: &RegisterParams) -> Result<AuthPayload, ApiError> {
        self.login(&Credentials {
            username: params.username.clone(),
            password: params.password.clone(),
        })
        .await
    }

    async fn me(&self, _access_token: &str) -> Result<UserProfile, ApiError> {
        Ok(UserProfile {
            id: Uuid::new_v4(),
            username: "demo".into(),
            email: Some("demo@example.com".into()),
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenPair, ApiError> {
        Ok(TokenPair {
            access_token: "demo-access-2".into(),
            refresh_token: "demo-refresh-2".into(),
        })
    }
}

/// Canned config backend with a switch to make list refreshes fail.
#[derive(Default)]
struct DemoConfigApi {
    mcp: std::sync::Mutex<Vec<McpServerConfig>>,
    refresh_down: AtomicBool,
}

#[async_trait]
impl ConfigApi for DemoConfigApi {
    async fn llm_config(&self) -> Result<LlmConfig, ApiError> {
        Ok(LlmConfig {
            model_name: "gpt-4o".into(),
            base_url: None,
            temperature: Some(0.2),
        })
    }

    async fn agent_config(&self) -> Result<AgentConfig, ApiError> {
        Ok(AgentConfig {
            max_steps: 25,
            system_prompt: None,
        })
    }

    async fn mcp_servers(&self) -> Result<Vec<McpServerConfig>, ApiError> {
        if self.refresh_down.load(Ordering::SeqCst) {
            return Err(ApiError::Upstream("mcp listing unavailable".into()));
        }
        Ok(self.mcp.lock().unwrap().clone())
    }

    async fn add_mcp_server(&self, server: &McpServerConfig) -> Result<(), ApiError> {
        self.mcp.lock().unwrap().push(server.clone());
        Ok(())
    }

    async fn delete_mcp_server(&self, name: &str) -> Result<(), ApiError> {
        self.mcp.lock().unwrap().retain(|s| s.name != name);
        Ok(())
    }

    async fn set_mcp_server_enabled(&self, name: &str, enabled: bool) -> Result<(), ApiError> {
        for server in self.mcp.lock().unwrap().iter_mut() {
            if server.name == name {
                server.enabled = enabled;
            }
        }
        Ok(())
    }

    async fn a2a_servers(&self) -> Result<Vec<A2aServerConfig>, ApiError> {
        // Simulated dead domain so partial-failure isolation is visible.
        Err(ApiError::Upstream("a2a registry unreachable".into()))
    }

    async fn add_a2a_server(&self, _server: &A2aServerConfig) -> Result<(), ApiError> {
        Err(ApiError::Upstream("a2a registry unreachable".into()))
    }

    async fn delete_a2a_server(&self, _name: &str) -> Result<(), ApiError> {
        Err(ApiError::Upstream("a2a registry unreachable".into()))
    }

    async fn skills(&self) -> Result<Vec<Skill>, ApiError> {
        Ok(vec![Skill {
            name: "search".into(),
            description: Some("web search".into()),
            enabled: true,
        }])
    }

    async fn install_skill(&self, _params: &InstallSkillParams) -> Result<(), ApiError> {
        Ok(())
    }

    async fn uninstall_skill(&self, _name: &str) -> Result<(), ApiError> {
        Ok(())
    }

    async fn set_skill_enabled(&self, _name: &str, _enabled: bool) -> Result<(), ApiError> {
        Ok(())
    }

    async fn skill_tools(&self) -> Result<Vec<SkillTool>, ApiError> {
        Ok(vec![SkillTool {
            skill: "search".into(),
            tool: "web_search".into(),
            risk: RiskLevel::Low,
        }])
    }

    async fn skill_risk_policy(&self) -> Result<SkillRiskPolicy, ApiError> {
        Ok(SkillRiskPolicy {
            auto_approve_up_to: RiskLevel::Low,
        })
    }

    async fn update_skill_risk_policy(&self, _policy: &SkillRiskPolicy) -> Result<(), ApiError> {
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let registry = Arc::new(ResetRegistry::new());
    let config_api = Arc::new(DemoConfigApi::default());

    let auth = AuthSessionStore::new(
        Arc::new(DemoAuthApi) as Arc<dyn AuthApi>,
        Arc::new(MemoryVault::new()) as Arc<dyn SessionVault>,
        Arc::clone(&registry),
    );
    let config = ConfigStore::new(
        Arc::clone(&config_api) as Arc<dyn ConfigApi>,
        Arc::new(LogNotifier) as Arc<dyn Notifier>,
    );
    config.register_reset(&registry);

    auth.hydrate().await;
    tracing::info!("After hydration: {:?}", auth.guard_state().await);

    let user = auth
        .login(&Credentials {
            username: "demo".into(),
            password: "demo".into(),
        })
        .await?;
    tracing::info!("Logged in as {}", user.username);
    tracing::info!("Guard: {:?}", auth.guard_state().await);

    // Fan-out load; the A2A branch fails and is reported without
    // disturbing the other six domains.
    config.load_all().await;
    let state = config.snapshot().await;
    tracing::info!(
        "Loaded config: llm={:?}, skills={}, a2a={}",
        state.llm_config.map(|c| c.model_name),
        state.skills.len(),
        state.a2a_servers.len(),
    );

    // Mutation succeeds, the list refresh fails, the entry survives.
    config_api.refresh_down.store(true, Ordering::SeqCst);
    let added = config
        .add_mcp_server(McpServerConfig {
            name: "files".into(),
            transport: McpTransport::Stdio {
                command: "mcp-files".into(),
                args: vec![],
            },
            enabled: true,
        })
        .await?;
    tracing::info!(
        "Added MCP server (refresh down): added={added}, listed={}",
        config.snapshot().await.mcp_servers.len()
    );

    assert!(auth.refresh().await);
    tracing::info!("Refreshed token: {:?}", auth.access_token().await);

    auth.logout().await;
    tracing::info!(
        "After logout: {:?}, config cleared={}",
        auth.guard_state().await,
        config.snapshot().await.mcp_servers.is_empty()
    );

    Ok(())
}
