//! Config aggregation store: fan-out loads, per-domain mutations.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use agent_console_core::types::{
    A2aServerConfig, AgentConfig, InstallSkillParams, LlmConfig, McpServerConfig, Skill,
    SkillRiskPolicy, SkillTool,
};
use agent_console_core::{ApiError, ConfigApi, Notifier, ResetRegistry, Severity};
use tokio::sync::RwLock;

/// Registry name the config store registers under.
pub const CONFIG_STORE: &str = "config";

/// Aggregate of every config domain plus operation flags.
///
/// Each sub-resource is independently empty until its first successful
/// load; a failed fetch of one domain never touches another.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigState {
    pub llm_config: Option<LlmConfig>,
    pub agent_config: Option<AgentConfig>,
    pub mcp_servers: Vec<McpServerConfig>,
    pub a2a_servers: Vec<A2aServerConfig>,
    pub skills: Vec<Skill>,
    pub skill_tools: Vec<SkillTool>,
    pub skill_risk_policy: Option<SkillRiskPolicy>,
    /// True only while `load_all` is in flight.
    pub is_loading: bool,
    /// True only while a skill install is in flight.
    pub is_installing_skill: bool,
    /// True only while a risk policy update is in flight.
    pub is_risk_policy_updating: bool,
}

/// Owns the config aggregate and drives the config client.
pub struct ConfigStore {
    api: Arc<dyn ConfigApi>,
    notifier: Arc<dyn Notifier>,
    state: RwLock<ConfigState>,
    // Bumped on reset; results captured under an older generation are
    // stale and must not be applied to the fresh state.
    generation: AtomicU64,
}

impl ConfigStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(api: Arc<dyn ConfigApi>, notifier: Arc<dyn Notifier>) -> Arc<Self> {
        Arc::new(Self {
            api,
            notifier,
            state: RwLock::new(ConfigState::default()),
            generation: AtomicU64::new(0),
        })
    }

    /// Register this store's reset with the logout teardown pass.
    pub fn register_reset(self: &Arc<Self>, registry: &ResetRegistry) {
        let weak = Arc::downgrade(self);
        registry.register(CONFIG_STORE, move || {
            let weak = weak.clone();
            async move {
                if let Some(store) = weak.upgrade() {
                    store.reset().await;
                }
            }
        });
    }

    /// Clear every sub-resource and invalidate in-flight results.
    pub async fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.state.write().await = ConfigState::default();
        tracing::debug!("Config store reset");
    }

    /// Clone of the current aggregate.
    pub async fn snapshot(&self) -> ConfigState {
        self.state.read().await.clone()
    }

    /// Fetch every config domain concurrently.
    ///
    /// Each branch's failure is caught locally: the sub-resource keeps its
    /// previous value and one error notification is emitted. Completes
    /// only after every branch has settled.
    pub async fn load_all(&self) {
        // Flag first, generation second: a reset that lands in between
        // leaves a wipe pending behind this lock, so the flag it clears
        // can never be the one a newer generation still owns.
        self.state.write().await.is_loading = true;
        let generation = self.generation.load(Ordering::SeqCst);

        let (llm, agent, mcp, a2a, skills, tools, policy) = tokio::join!(
            self.api.llm_config(),
            self.api.agent_config(),
            self.api.mcp_servers(),
            self.api.a2a_servers(),
            self.api.skills(),
            self.api.skill_tools(),
            self.api.skill_risk_policy(),
        );

        let mut state = self.state.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            // Reset raced the fan-out. Its wipe clears is_loading: either
            // it already ran, or it is queued behind this write lock.
            return;
        }
        state.is_loading = false;
        self.apply_opt(&mut state.llm_config, llm, "LLM config");
        self.apply_opt(&mut state.agent_config, agent, "agent config");
        self.apply_list(&mut state.mcp_servers, mcp, "MCP servers");
        self.apply_list(&mut state.a2a_servers, a2a, "A2A servers");
        self.apply_list(&mut state.skills, skills, "skills");
        self.apply_list(&mut state.skill_tools, tools, "skill tools");
        self.apply_opt(&mut state.skill_risk_policy, policy, "skill risk policy");
    }

    /// Register a new MCP server.
    ///
    /// Returns `false` when the mutating call fails (state untouched). A
    /// refresh failure after a successful mutation patches the list
    /// optimistically and still returns `true`.
    ///
    /// # Errors
    /// Returns `ApiError::Validation` before any network call when the
    /// entry is missing a field its declared transport requires.
    pub async fn add_mcp_server(&self, server: McpServerConfig) -> Result<bool, ApiError> {
        let server = server.validated()?;
        if let Err(e) = self.api.add_mcp_server(&server).await {
            self.error(format!("Failed to add MCP server '{}': {e}", server.name));
            return Ok(false);
        }
        let name = server.name.clone();
        self.refresh_mcp_servers(move |list| {
            list.retain(|s| s.name != server.name);
            list.push(server);
        })
        .await;
        self.success(format!("MCP server '{name}' added"));
        Ok(true)
    }

    /// Remove an MCP server by name.
    pub async fn delete_mcp_server(&self, name: &str) -> bool {
        if let Err(e) = self.api.delete_mcp_server(name).await {
            self.error(format!("Failed to delete MCP server '{name}': {e}"));
            return false;
        }
        let name_owned = name.to_string();
        self.refresh_mcp_servers(move |list| list.retain(|s| s.name != name_owned))
            .await;
        self.success(format!("MCP server '{name}' deleted"));
        true
    }

    /// Enable or disable an MCP server.
    pub async fn set_mcp_server_enabled(&self, name: &str, enabled: bool) -> bool {
        if let Err(e) = self.api.set_mcp_server_enabled(name, enabled).await {
            self.error(format!("Failed to update MCP server '{name}': {e}"));
            return false;
        }
        let name_owned = name.to_string();
        self.refresh_mcp_servers(move |list| {
            for server in list.iter_mut().filter(|s| s.name == name_owned) {
                server.enabled = enabled;
            }
        })
        .await;
        true
    }

    /// Register a new A2A server.
    ///
    /// Same contract as [`add_mcp_server`](Self::add_mcp_server).
    ///
    /// # Errors
    /// Returns `ApiError::Validation` on a malformed entry.
    pub async fn add_a2a_server(&self, server: A2aServerConfig) -> Result<bool, ApiError> {
        let server = server.validated()?;
        if let Err(e) = self.api.add_a2a_server(&server).await {
            self.error(format!("Failed to add A2A server '{}': {e}", server.name));
            return Ok(false);
        }
        let name = server.name.clone();
        self.refresh_a2a_servers(move |list| {
            list.retain(|s| s.name != server.name);
            list.push(server);
        })
        .await;
        self.success(format!("A2A server '{name}' added"));
        Ok(true)
    }

    /// Remove an A2A server by name.
    pub async fn delete_a2a_server(&self, name: &str) -> bool {
        if let Err(e) = self.api.delete_a2a_server(name).await {
            self.error(format!("Failed to delete A2A server '{name}': {e}"));
            return false;
        }
        let name_owned = name.to_string();
        self.refresh_a2a_servers(move |list| list.retain(|s| s.name != name_owned))
            .await;
        self.success(format!("A2A server '{name}' deleted"));
        true
    }

    /// Install a skill from a source reference.
    ///
    /// `is_installing_skill` is set for the duration of the call and
    /// cleared on success and failure alike.
    ///
    /// # Errors
    /// Returns `ApiError::Validation` on malformed parameters, before the
    /// busy flag is touched.
    pub async fn install_skill(&self, params: InstallSkillParams) -> Result<bool, ApiError> {
        let params = params.validated()?;
        self.state.write().await.is_installing_skill = true;
        let installed = self.install_skill_inner(params).await;
        self.state.write().await.is_installing_skill = false;
        Ok(installed)
    }

    async fn install_skill_inner(&self, params: InstallSkillParams) -> bool {
        if let Err(e) = self.api.install_skill(&params).await {
            self.error(format!("Failed to install skill '{}': {e}", params.name));
            return false;
        }
        let name = params.name.clone();
        self.refresh_skills(move |skills| {
            if !skills.iter().any(|s| s.name == params.name) {
                skills.push(Skill {
                    name: params.name,
                    description: None,
                    enabled: true,
                });
            }
        })
        .await;
        self.success(format!("Skill '{name}' installed"));
        true
    }

    /// Uninstall a skill by name.
    pub async fn uninstall_skill(&self, name: &str) -> bool {
        if let Err(e) = self.api.uninstall_skill(name).await {
            self.error(format!("Failed to uninstall skill '{name}': {e}"));
            return false;
        }
        let name_owned = name.to_string();
        self.refresh_skills(move |skills| skills.retain(|s| s.name != name_owned))
            .await;
        self.success(format!("Skill '{name}' uninstalled"));
        true
    }

    /// Enable or disable a skill.
    pub async fn set_skill_enabled(&self, name: &str, enabled: bool) -> bool {
        if let Err(e) = self.api.set_skill_enabled(name, enabled).await {
            self.error(format!("Failed to update skill '{name}': {e}"));
            return false;
        }
        let name_owned = name.to_string();
        self.refresh_skills(move |skills| {
            for skill in skills.iter_mut().filter(|s| s.name == name_owned) {
                skill.enabled = enabled;
            }
        })
        .await;
        true
    }

    /// Replace the skill risk policy.
    ///
    /// `is_risk_policy_updating` brackets the whole call; a refresh failure
    /// after a successful update keeps the submitted policy rather than
    /// rolling back.
    pub async fn update_skill_risk_policy(&self, policy: SkillRiskPolicy) -> bool {
        self.state.write().await.is_risk_policy_updating = true;
        let updated = self.update_skill_risk_policy_inner(policy).await;
        self.state.write().await.is_risk_policy_updating = false;
        updated
    }

    async fn update_skill_risk_policy_inner(&self, policy: SkillRiskPolicy) -> bool {
        let generation = self.generation.load(Ordering::SeqCst);
        if let Err(e) = self.api.update_skill_risk_policy(&policy).await {
            self.error(format!("Failed to update skill risk policy: {e}"));
            return false;
        }

        let fetched = self.api.skill_risk_policy().await;
        let mut state = self.state.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            // Reset while the update was in flight: the backend took the
            // change, but nothing about it is reported or applied to the
            // fresh state.
            return true;
        }
        match fetched {
            Ok(fresh) => state.skill_risk_policy = Some(fresh),
            Err(e) => {
                // The update itself succeeded; keep it.
                state.skill_risk_policy = Some(policy);
                self.error(format!("Failed to refresh skill risk policy: {e}"));
            }
        }
        drop(state);
        self.success("Skill risk policy updated".to_string());
        true
    }

    // Refresh the authoritative MCP list after a successful mutation. On
    // refresh failure the optimistic patch is applied instead of rolling
    // the list back to stale server truth.
    async fn refresh_mcp_servers(&self, patch: impl FnOnce(&mut Vec<McpServerConfig>)) {
        let generation = self.generation.load(Ordering::SeqCst);
        let fetched = self.api.mcp_servers().await;
        let mut state = self.state.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        match fetched {
            Ok(list) => state.mcp_servers = list,
            Err(e) => {
                patch(&mut state.mcp_servers);
                self.error(format!("Failed to refresh MCP servers: {e}"));
            }
        }
    }

    async fn refresh_a2a_servers(&self, patch: impl FnOnce(&mut Vec<A2aServerConfig>)) {
        let generation = self.generation.load(Ordering::SeqCst);
        let fetched = self.api.a2a_servers().await;
        let mut state = self.state.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        match fetched {
            Ok(list) => state.a2a_servers = list,
            Err(e) => {
                patch(&mut state.a2a_servers);
                self.error(format!("Failed to refresh A2A servers: {e}"));
            }
        }
    }

    async fn refresh_skills(&self, patch: impl FnOnce(&mut Vec<Skill>)) {
        let generation = self.generation.load(Ordering::SeqCst);
        let fetched = self.api.skills().await;
        let mut state = self.state.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        match fetched {
            Ok(list) => state.skills = list,
            Err(e) => {
                patch(&mut state.skills);
                self.error(format!("Failed to refresh skills: {e}"));
            }
        }
    }

    fn apply_opt<T>(&self, slot: &mut Option<T>, fetched: Result<T, ApiError>, domain: &str) {
        match fetched {
            Ok(value) => *slot = Some(value),
            Err(e) => self.error(format!("Failed to load {domain}: {e}")),
        }
    }

    fn apply_list<T>(&self, slot: &mut Vec<T>, fetched: Result<Vec<T>, ApiError>, domain: &str) {
        match fetched {
            Ok(list) => *slot = list,
            Err(e) => self.error(format!("Failed to load {domain}: {e}")),
        }
    }

    fn error(&self, text: String) {
        self.notifier.notify(Severity::Error, text);
    }

    fn success(&self, text: String) {
        self.notifier.notify(Severity::Success, text);
    }
}
