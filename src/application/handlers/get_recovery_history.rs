//! GetRecoveryHistoryHandler - read side of the recovery attempt log.

use std::sync::Arc;

use crate::domain::foundation::ConversationId;
use crate::domain::recovery::{RecoveryAttempt, RecoveryHistory};

/// Handler for the recovery history query.
pub struct GetRecoveryHistoryHandler {
    history: Arc<RecoveryHistory>,
}

impl GetRecoveryHistoryHandler {
    pub fn new(history: Arc<RecoveryHistory>) -> Self {
        Self { history }
    }

    /// Non-expired attempts for a conversation, oldest first.
    pub fn handle(&self, conversation_id: ConversationId) -> Vec<RecoveryAttempt> {
        self.history.all(conversation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recovery::RecoveryStrategy;

    #[test]
    fn returns_attempts_for_the_requested_conversation_only() {
        let history = Arc::new(RecoveryHistory::new(3600));
        let id = ConversationId::new();
        history.append(RecoveryAttempt::new(
            id,
            RecoveryStrategy::RetrySameHandler,
            true,
            "timeout",
        ));
        history.append(RecoveryAttempt::new(
            ConversationId::new(),
            RecoveryStrategy::ResetConversation,
            true,
            "corrupt",
        ));

        let handler = GetRecoveryHistoryHandler::new(history);
        let attempts = handler.handle(id);
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].strategy, RecoveryStrategy::RetrySameHandler);
    }

    #[test]
    fn unknown_conversation_has_empty_history() {
        let handler = GetRecoveryHistoryHandler::new(Arc::new(RecoveryHistory::new(3600)));
        assert!(handler.handle(ConversationId::new()).is_empty());
    }
}
