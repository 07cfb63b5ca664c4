//! Agent Backend Port - Interface to the natural-language agent backend.
//!
//! The backend is the only collaborator that produces response text. The
//! orchestration core hands it the accumulated context plus the user
//! message and receives text with a confidence score; what model or prompt
//! stack sits behind the trait is out of scope.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::conversation::ConversationContext;
use crate::domain::foundation::{ConversationId, EndUserId};

/// Port for invoking the agent backend.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Runs one handler invocation. Implementations should respect the
    /// deadline of the caller; the engine additionally bounds the call
    /// with its own timeout.
    async fn invoke(&self, request: AgentRequest) -> Result<AgentResponse, AgentError>;
}

/// One handler invocation.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// Conversation the invocation belongs to.
    pub conversation_id: ConversationId,
    /// Handler selected by agent routing.
    pub handler: String,
    /// The user message being answered.
    pub message: String,
    /// Accumulated context handed to the backend.
    pub context: ConversationContext,
    /// End user, when known.
    pub end_user_id: Option<EndUserId>,
}

impl AgentRequest {
    /// Creates a request for the given handler and message.
    pub fn new(
        conversation_id: ConversationId,
        handler: impl Into<String>,
        message: impl Into<String>,
        context: ConversationContext,
    ) -> Self {
        Self {
            conversation_id,
            handler: handler.into(),
            message: message.into(),
            context,
            end_user_id: None,
        }
    }

    /// Attaches the end user id.
    pub fn with_end_user(mut self, end_user_id: EndUserId) -> Self {
        self.end_user_id = Some(end_user_id);
        self
    }
}

/// Response from the agent backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Natural-language response text.
    pub response_text: String,
    /// Backend confidence in the response, in [0, 1].
    pub confidence: f64,
    /// Handler that actually produced the response.
    pub handler_used: String,
    /// Whether the backend asks for a human handoff.
    #[serde(default)]
    pub handoff_requested: bool,
    /// Free-form backend metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl AgentResponse {
    /// Creates a response with empty metadata.
    pub fn new(
        response_text: impl Into<String>,
        confidence: f64,
        handler_used: impl Into<String>,
    ) -> Self {
        Self {
            response_text: response_text.into(),
            confidence,
            handler_used: handler_used.into(),
            handoff_requested: false,
            metadata: BTreeMap::new(),
        }
    }
}

/// Agent backend failures.
///
/// Display texts feed the recovery selector's error vocabulary, so the
/// wording here is part of the contract: timeouts say "timed out",
/// connectivity failures say "connection", backend faults say "agent
/// backend".
#[derive(Debug, Clone, thiserror::Error)]
pub enum AgentError {
    /// Invocation exceeded its deadline.
    #[error("agent invocation timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u64,
    },

    /// Could not reach the backend.
    #[error("connection to agent backend failed: {0}")]
    Connection(String),

    /// The backend reached the handler but failed to produce a response.
    #[error("agent backend error: {0}")]
    Backend(String),

    /// The request itself was rejected as malformed.
    #[error("invalid agent request: {0}")]
    InvalidRequest(String),
}
