/// TOML configuration

use crate::agent::{AgentKind, AgentProfile};
use crate::context::budget::{
    TokenBudget, DEFAULT_RESPONSE_BUFFER, DEFAULT_SUMMARIZE_THRESHOLD, DEFAULT_WARNING_THRESHOLD,
};
use crate::context::token_counter::DEFAULT_MODEL;
use crate::context::ContextFitter;
use crate::error::Result;
use crate::observability::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotomiConfig {
    pub budget: BudgetConfig,
    pub fitter: FitterConfig,
    pub client: ClientConfig,
    pub logging: LoggingConfig,
    pub agents: Vec<AgentConfig>,
}

impl MotomiConfig {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).await?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.budget.to_budget()?;
        for agent in &self.agents {
            agent.kind.parse::<AgentKind>()?;
        }
        Ok(())
    }

    /// Profile for `kind`, preferring a configured prompt over the default
    pub fn profile(&self, kind: AgentKind) -> Result<AgentProfile> {
        for agent in &self.agents {
            if agent.kind.parse::<AgentKind>()? == kind {
                let mut profile = AgentProfile::new(kind, agent.system_prompt.clone());
                if let Some(name) = &agent.name {
                    profile = profile.with_name(name.clone());
                }
                return Ok(profile);
            }
        }
        Ok(AgentProfile::default_for(kind))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub model: String,
    pub max_tokens: Option<usize>,
    pub response_buffer: usize,
    pub warning_threshold: f64,
    pub summarize_threshold: f64,
}

impl BudgetConfig {
    pub fn to_budget(&self) -> Result<TokenBudget> {
        TokenBudget::new(
            self.model.clone(),
            self.max_tokens,
            self.response_buffer,
            self.warning_threshold,
            self.summarize_threshold,
        )
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: None,
            response_buffer: DEFAULT_RESPONSE_BUFFER,
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
            summarize_threshold: DEFAULT_SUMMARIZE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitterConfig {
    pub preserve_recent: usize,
    pub min_truncation_budget: usize,
}

impl FitterConfig {
    pub fn to_fitter(&self) -> ContextFitter {
        ContextFitter::new(self.preserve_recent, self.min_truncation_budget)
    }
}

impl Default for FitterConfig {
    fn default() -> Self {
        Self {
            preserve_recent: 4,
            min_truncation_budget: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: String,
    /// Inline key; prefer `api_key_env` outside of tests
    pub api_key: Option<String>,
    pub api_key_env: String,
    /// Deployment to call; the budget model when unset
    pub model: Option<String>,
    pub max_reply_tokens: usize,
    pub timeout_secs: u64,
    /// Extra attempts after a transient failure
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/v1".to_string(),
            api_key: None,
            api_key_env: "MOTOMI_API_KEY".to_string(),
            model: None,
            max_reply_tokens: 2048,
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    pub system_prompt: String,
}

