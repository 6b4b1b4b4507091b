use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use std::fmt;

use super::ApiError;
use crate::markup::{Element, Slot, Tree};

/// The pre-shared credential set for one monitored agent.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub agent_id: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        agent_id: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            agent_id: agent_id.into(),
        }
    }

    /// `Basic base64(username:password)`, marked sensitive so it never shows up in debug output.
    pub fn authorization_header(&self) -> Result<HeaderValue, ApiError> {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        let mut value = HeaderValue::from_str(&format!("Basic {token}"))
            .map_err(|e| ApiError::InvalidRequest(format!("invalid credential header: {e}")))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("agent_id", &self.agent_id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentState {
    Ready,
    NotReady,
    WorkReady,
    Logout,
    Other(String),
}

impl AgentState {
    pub fn parse(text: &str) -> Self {
        match text {
            "READY" => AgentState::Ready,
            "NOT_READY" => AgentState::NotReady,
            "WORK_READY" => AgentState::WorkReady,
            "LOGOUT" => AgentState::Logout,
            other => AgentState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AgentState::Ready => "READY",
            AgentState::NotReady => "NOT_READY",
            AgentState::WorkReady => "WORK_READY",
            AgentState::Logout => "LOGOUT",
            AgentState::Other(other) => other,
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded `User` document from a session that the server recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusDocument {
    tree: Tree,
}

impl StatusDocument {
    /// Wraps a decoded tree, unwrapping the `User` root when present.
    ///
    /// An `ApiErrors` document, or one without `firstName`, means the server did not
    /// accept the session and yields [`ApiError::Unauthorized`].
    pub fn from_tree(tree: Tree) -> Result<Self, ApiError> {
        if let Some(errors) = tree.first("ApiErrors") {
            return Err(ApiError::Unauthorized(api_error_message(errors)));
        }

        let user = match tree.get("User") {
            Some(Slot::Single(user)) if tree.len() == 1 => user.children().cloned(),
            _ => None,
        };
        let tree = user.unwrap_or(tree);

        if tree.first("firstName").is_none() {
            return Err(ApiError::Unauthorized(
                "response carries no agent identity".to_string(),
            ));
        }
        Ok(Self { tree })
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn first_name(&self) -> Option<&str> {
        self.tree.text("firstName")
    }

    pub fn last_name(&self) -> Option<&str> {
        self.tree.text("lastName")
    }

    pub fn state_text(&self) -> Option<&str> {
        self.tree.text("state")
    }

    pub fn state(&self) -> Option<AgentState> {
        self.state_text().map(AgentState::parse)
    }

    /// The numeric reason code; a missing or non-numeric value is treated as absent.
    pub fn reason_code_id(&self) -> Option<i32> {
        self.tree
            .text("reasonCodeId")
            .and_then(|text| text.parse().ok())
    }

    pub fn display_name(&self) -> String {
        match (self.first_name(), self.last_name()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.to_string(),
            _ => String::new(),
        }
    }
}

fn api_error_message(errors: &Element) -> String {
    errors
        .children()
        .and_then(|children| children.first("ApiError"))
        .and_then(Element::children)
        .and_then(|error| error.text("ErrorMessage").or_else(|| error.text("ErrorType")))
        .unwrap_or("server returned an error document")
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonCode {
    /// Identifier taken from the trailing segment of the code's `uri`.
    pub id: Option<i32>,
    pub label: String,
    pub code: Option<String>,
    pub category: Option<String>,
    pub for_all: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReasonCodeList {
    pub codes: Vec<ReasonCode>,
}

impl ReasonCodeList {
    pub fn from_tree(tree: &Tree) -> Result<Self, ApiError> {
        if let Some(errors) = tree.first("ApiErrors") {
            return Err(ApiError::Unauthorized(api_error_message(errors)));
        }
        let Some(root) = tree.first("ReasonCodes") else {
            return Err(ApiError::UnexpectedDocument(
                "response is not a reason code list".to_string(),
            ));
        };

        let codes: Vec<ReasonCode> = root
            .children()
            .and_then(|children| children.get("ReasonCode"))
            .map(|slot| slot.elements().iter().filter_map(reason_code).collect())
            .unwrap_or_default();
        Ok(Self { codes })
    }

    pub fn find(&self, id: i32) -> Option<&ReasonCode> {
        self.codes.iter().find(|code| code.id == Some(id))
    }
}

fn reason_code(element: &Element) -> Option<ReasonCode> {
    let fields = element.children()?;
    Some(ReasonCode {
        id: fields
            .text("uri")
            .and_then(|uri| uri.trim_end_matches('/').rsplit('/').next())
            .and_then(|segment| segment.parse().ok()),
        label: fields.text("label").unwrap_or_default().to_string(),
        code: fields.text("code").map(str::to_string),
        category: fields.text("category").map(str::to_string),
        for_all: fields.text("forAll") == Some("true"),
    })
}
