use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{AgentState, ApiError, Credentials, ReasonCodeList, StatusDocument};
use crate::markup;

pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

const REASON_CODES_PATH: &str = "/ReasonCodes?category=NOT_READY";

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// The two fixed API hosts. Reads fail over from `primary` to `secondary`; writes never do.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Endpoints {
    pub primary: String,
    pub secondary: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Endpoints {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Anything that can report the current status of an agent.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, credentials: &Credentials) -> Result<StatusDocument, ApiError>;
}

pub struct FinesseClient {
    client: Client,
    endpoints: Endpoints,
}

impl FinesseClient {
    pub fn new(endpoints: Endpoints) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(endpoints.timeout())
            .user_agent(crate::version::user_agent())
            .build()?;
        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Reads the agent's `User` document, failing over to the secondary endpoint once.
    pub async fn fetch_status(
        &self,
        credentials: &Credentials,
    ) -> Result<StatusDocument, ApiError> {
        let body = self
            .read_with_failover(&user_path(&credentials.agent_id), credentials)
            .await?;
        let tree = markup::decode(&body)?;
        StatusDocument::from_tree(tree)
    }

    pub async fn list_reason_codes(
        &self,
        credentials: &Credentials,
    ) -> Result<ReasonCodeList, ApiError> {
        let body = self
            .read_with_failover(REASON_CODES_PATH, credentials)
            .await?;
        let tree = markup::decode(&body)?;
        ReasonCodeList::from_tree(&tree)
    }

    /// Asks the server to move the agent into `state`.
    ///
    /// Only the primary endpoint is contacted so a write is never duplicated.
    /// When the server acknowledges without echoing a document, the status is read back.
    pub async fn submit_state(
        &self,
        credentials: &Credentials,
        state: &AgentState,
        reason_code_id: Option<i32>,
    ) -> Result<StatusDocument, ApiError> {
        let url = endpoint_url(&self.endpoints.primary, &user_path(&credentials.agent_id));
        info!(
            agent_id = %credentials.agent_id,
            state = %state,
            reason_code_id = ?reason_code_id,
            "Submitting agent state change."
        );

        let response = self
            .client
            .put(&url)
            .header(AUTHORIZATION, credentials.authorization_header()?)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/xml"))
            .body(state_document(state, reason_code_id))
            .send()
            .await
            .map_err(|e| {
                error!(agent_id = %credentials.agent_id, error = %e, "State change request failed.");
                ApiError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(agent_id = %credentials.agent_id, status = status.as_u16(), "State change rejected.");
            return Err(ApiError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            debug!(agent_id = %credentials.agent_id, "State change acknowledged without a document; reading status back.");
            return self.fetch_status(credentials).await;
        }
        StatusDocument::from_tree(markup::decode(&body)?)
    }

    async fn read_with_failover(
        &self,
        path: &str,
        credentials: &Credentials,
    ) -> Result<String, ApiError> {
        let authorization = credentials.authorization_header()?;

        let primary = match self
            .get_once(&self.endpoints.primary, path, &authorization)
            .await
        {
            Ok(body) => return Ok(body),
            Err(e) => e,
        };
        warn!(endpoint = %self.endpoints.primary, error = %primary, "Primary endpoint failed, trying secondary.");

        self.get_once(&self.endpoints.secondary, path, &authorization)
            .await
            .map_err(|secondary| {
                error!(
                    endpoint = %self.endpoints.secondary,
                    error = %secondary,
                    "Secondary endpoint failed as well."
                );
                ApiError::Unreachable {
                    primary: Box::new(primary),
                    secondary: Box::new(secondary),
                }
            })
    }

    async fn get_once(
        &self,
        base: &str,
        path: &str,
        authorization: &HeaderValue,
    ) -> Result<String, ApiError> {
        let response = self
            .client
            .get(endpoint_url(base, path))
            .header(AUTHORIZATION, authorization.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl StatusSource for FinesseClient {
    async fn fetch_status(&self, credentials: &Credentials) -> Result<StatusDocument, ApiError> {
        FinesseClient::fetch_status(self, credentials).await
    }
}

fn user_path(agent_id: &str) -> String {
    format!("/User/{agent_id}/")
}

fn endpoint_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Body of a state-change request.
pub fn state_document(state: &AgentState, reason_code_id: Option<i32>) -> String {
    match reason_code_id {
        Some(id) => format!("<User><state>{state}</state><reasonCodeId>{id}</reasonCodeId></User>"),
        None => format!("<User><state>{state}</state></User>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_document() {
        assert_eq!(
            state_document(&AgentState::Ready, None),
            "<User><state>READY</state></User>"
        );
        assert_eq!(
            state_document(&AgentState::NotReady, Some(7)),
            "<User><state>NOT_READY</state><reasonCodeId>7</reasonCodeId></User>"
        );
    }

    #[test]
    fn test_endpoint_url_joins_without_double_slash() {
        assert_eq!(
            endpoint_url("https://host:8445/finesse/api/", &user_path("1001")),
            "https://host:8445/finesse/api/User/1001/"
        );
        assert_eq!(
            endpoint_url("https://host:8445/finesse/api", REASON_CODES_PATH),
            "https://host:8445/finesse/api/ReasonCodes?category=NOT_READY"
        );
    }

    #[test]
    fn test_endpoints_default_timeout() {
        let endpoints: Endpoints =
            toml::from_str("primary = \"https://a\"\nsecondary = \"https://b\"").unwrap();
        assert_eq!(endpoints.timeout(), Duration::from_millis(3000));
    }
}
