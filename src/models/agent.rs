use serde::{Deserialize, Serialize};

/// AI agent definition as returned by `/api/agents`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub system_prompt: String,
}

/// `/api/agents` returns bare names on older servers and full objects on newer ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentListing {
    Name(String),
    Agent(Agent),
}

impl AgentListing {
    /// Name used as the `agent` query parameter.
    pub fn name(&self) -> &str {
        match self {
            AgentListing::Name(name) => name,
            AgentListing::Agent(agent) => &agent.name,
        }
    }

    /// Human readable description, empty for bare names.
    pub fn description(&self) -> &str {
        match self {
            AgentListing::Name(_) => "",
            AgentListing::Agent(agent) => &agent.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_listing() {
        let json = r#"["default", {"name": "coder", "description": "Writes code",
            "model_name": "gemini", "system_prompt": "You code."}]"#;
        let agents: Vec<AgentListing> = serde_json::from_str(json).unwrap();
        assert_eq!(agents[0].name(), "default");
        assert_eq!(agents[0].description(), "");
        assert_eq!(agents[1].name(), "coder");
        assert_eq!(agents[1].description(), "Writes code");
    }
}
