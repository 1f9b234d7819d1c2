use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use corey_core::config::AgentsConfig;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Wire shape of an agent invocation result. `success: false` is an
/// agent-declared failure and carries `error`; transport problems surface as
/// `AgentTransportError` instead.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AgentResponseBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentResponseBody {
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AgentReply {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            response: Some(AgentResponseBody { result, message: None }),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, response: None, error: Some(error.into()) }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AgentTransportError {
    #[error("agent client could not be constructed: {reason}")]
    ClientBuild { reason: String },
    #[error("agent endpoint unreachable: {reason}")]
    Unreachable { reason: String },
    #[error("agent reply could not be decoded: {reason}")]
    MalformedReply { reason: String },
}

#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn invoke(
        &self,
        message: &str,
        agent: &AgentId,
        context: Option<&InvokeContext>,
    ) -> Result<AgentReply, AgentTransportError>;
}

#[derive(Debug, Serialize)]
struct InvokeRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a InvokeContext>,
}

/// reqwest-backed implementation of the invocation contract. The request
/// timeout from `[agents]` bounds the remote round trip, so a hung agent
/// call surfaces as `Unreachable` rather than suspending the caller forever.
#[derive(Clone, Debug)]
pub struct HttpAgentClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl HttpAgentClient {
    pub fn from_config(config: &AgentsConfig) -> Result<Self, AgentTransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| AgentTransportError::ClientBuild { reason: error.to_string() })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn invoke_url(&self, agent: &AgentId) -> String {
        format!("{}/v1/agents/{}/invoke", self.base_url, agent.0)
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn invoke(
        &self,
        message: &str,
        agent: &AgentId,
        context: Option<&InvokeContext>,
    ) -> Result<AgentReply, AgentTransportError> {
        tracing::debug!(agent = %agent, "invoking remote agent");

        let mut request = self
            .http
            .post(self.invoke_url(agent))
            .json(&InvokeRequest { message, context });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|error| AgentTransportError::Unreachable { reason: error.to_string() })?;

        response
            .json::<AgentReply>()
            .await
            .map_err(|error| AgentTransportError::MalformedReply { reason: error.to_string() })
    }
}
