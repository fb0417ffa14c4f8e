//! Agent endpoints: `/api/agents/{name}`.

use reqwest::Method;
use tracing::debug;

use super::{read_json, ChatClient, ClientError};
use crate::models::Agent;

const AGENTS: &str = "agents";

impl ChatClient {
    /// An agent by name.
    pub async fn agent_get(&self, name: &str) -> Result<Agent, ClientError> {
        self.get_json(&[AGENTS, name]).await
    }

    /// Create an agent for the current user.
    pub async fn agent_create(&self, agent: &Agent) -> Result<Agent, ClientError> {
        let url = self.endpoint(&[AGENTS])?;
        debug!(%url, name = %agent.name, "Creating agent");
        let response = self.send(self.request(Method::POST, url).json(agent)).await?;
        read_json(response).await
    }

    /// Replace the agent stored under `name`. The new definition may rename it.
    pub async fn agent_update(&self, name: &str, agent: &Agent) -> Result<Agent, ClientError> {
        let url = self.endpoint(&[AGENTS, name])?;
        debug!(%url, "Updating agent");
        let response = self.send(self.request(Method::PUT, url).json(agent)).await?;
        read_json(response).await
    }

    pub async fn agent_delete(&self, name: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&[AGENTS, name])?;
        debug!(%url, "Deleting agent");
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}
