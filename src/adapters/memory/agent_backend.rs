//! Scripted agent backend for tests and local development.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::ports::{AgentBackend, AgentError, AgentRequest, AgentResponse};

enum Scripted {
    Reply { text: String, confidence: f64 },
    Fail(AgentError),
}

/// Agent backend that replays a scripted sequence of outcomes.
///
/// Outcomes are consumed in order; an exhausted script fails the call.
/// Every request is recorded for assertions.
#[derive(Default)]
pub struct MockAgentBackend {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<AgentRequest>>,
    delay: Option<Duration>,
}

impl MockAgentBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful reply. The handler echoed back is the one the
    /// request asked for.
    pub fn with_response(self, text: impl Into<String>, confidence: f64) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Scripted::Reply {
                text: text.into(),
                confidence,
            });
        self
    }

    /// Queues a failure.
    pub fn with_error(self, error: AgentError) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Scripted::Fail(error));
        self
    }

    /// Delays every invocation, for timeout and cancellation tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<AgentRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl AgentBackend for MockAgentBackend {
    async fn invoke(&self, request: AgentRequest) -> Result<AgentResponse, AgentError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let handler = request.handler.clone();
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(Scripted::Reply { text, confidence }) => {
                Ok(AgentResponse::new(text, confidence, handler))
            }
            Some(Scripted::Fail(error)) => Err(error),
            None => Err(AgentError::Backend("script exhausted".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::ConversationContext;
    use crate::domain::foundation::ConversationId;

    fn request(handler: &str) -> AgentRequest {
        AgentRequest::new(
            ConversationId::new(),
            handler,
            "hello",
            ConversationContext::default(),
        )
    }

    #[tokio::test]
    async fn replays_script_in_order() {
        let backend = MockAgentBackend::new()
            .with_response("first", 0.9)
            .with_error(AgentError::Connection("down".into()));

        let first = backend.invoke(request("h1")).await.unwrap();
        assert_eq!(first.response_text, "first");
        assert_eq!(first.handler_used, "h1");

        let second = backend.invoke(request("h1")).await.unwrap_err();
        assert!(matches!(second, AgentError::Connection(_)));
    }

    #[tokio::test]
    async fn exhausted_script_is_a_backend_error() {
        let backend = MockAgentBackend::new();
        let err = backend.invoke(request("h1")).await.unwrap_err();
        assert!(matches!(err, AgentError::Backend(_)));
    }

    #[tokio::test]
    async fn records_every_request() {
        let backend = MockAgentBackend::new().with_response("ok", 0.5);
        backend.invoke(request("dining_handler")).await.unwrap();
        let seen = backend.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].handler, "dining_handler");
    }
}
