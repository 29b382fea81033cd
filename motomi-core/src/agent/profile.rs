use crate::error::MotomiError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five Mo-To-Mi agent identities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Architect,
    Observer,
    Strategist,
    Builder,
    Validator,
}

impl AgentKind {
    pub const ALL: [AgentKind; 5] = [
        AgentKind::Architect,
        AgentKind::Observer,
        AgentKind::Strategist,
        AgentKind::Builder,
        AgentKind::Validator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Architect => "architect",
            AgentKind::Observer => "observer",
            AgentKind::Strategist => "strategist",
            AgentKind::Builder => "builder",
            AgentKind::Validator => "validator",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AgentKind::Architect => "Architect",
            AgentKind::Observer => "Observer",
            AgentKind::Strategist => "Strategist",
            AgentKind::Builder => "Builder",
            AgentKind::Validator => "Validator",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for AgentKind {
    type Err = MotomiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        AgentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| MotomiError::UnknownAgent(s.to_string()))
    }
}

/// Identity and base system prompt of one agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub kind: AgentKind,
    pub name: String,
    pub system_prompt: String,
}

impl AgentProfile {
    pub fn new(kind: AgentKind, system_prompt: impl Into<String>) -> Self {
        Self {
            kind,
            name: format!("{} Agent", kind.display_name()),
            system_prompt: system_prompt.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Profile with a generic prompt, for agents missing from config
    pub fn default_for(kind: AgentKind) -> Self {
        Self::new(
            kind,
            format!(
                "You are the {} Agent in the Mo-To-Mi framework. You are a helpful AI assistant.",
                kind.display_name()
            ),
        )
    }
}
