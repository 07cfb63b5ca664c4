//! Typed conversation context.
//!
//! The context is the bag of facts the pipeline stages accumulate across a
//! conversation. Every key a stage may read or write is a named field here,
//! so stages cannot drift apart on key names; only tenant enrichment and
//! transfer metadata go through the `extra` map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::foundation::{Timestamp, WorkflowId};

/// Read-only business facts fetched from the tenant directory.
///
/// Enrichment is best-effort: a failed lookup leaves it `None` and never
/// fails the turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantEnrichment {
    /// Display name of the tenant.
    pub name: String,
    /// Coarse business category ("restaurant", "clinic", ...).
    pub category: String,
    /// Whether the tenant accepts bookings at all.
    pub booking_enabled: bool,
}

/// Facts accumulated for a conversation, written by pipeline stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationContext {
    /// Detected intent label ("booking", "order", ...).
    pub intent: Option<String>,
    /// Confidence of the intent detection, in [0, 1].
    pub intent_confidence: Option<f64>,
    /// Coarse intent category ("transactional", "informational", ...).
    pub intent_category: Option<String>,
    /// Whether the intent needs a scheduled follow-up workflow.
    #[serde(default)]
    pub requires_scheduling: bool,

    /// Structured facts gathered from the user (dates, party sizes, ...).
    #[serde(default)]
    pub facts: BTreeMap<String, String>,
    /// Required fields still missing for the detected intent.
    #[serde(default)]
    pub missing_fields: Vec<String>,
    /// True once every required field for the intent is populated.
    #[serde(default)]
    pub information_complete: bool,

    /// Handler selected by agent routing for this conversation.
    pub selected_handler: Option<String>,
    /// Confidence of the routing decision.
    pub handler_confidence: Option<f64>,
    /// Fallback handler candidate to switch to on backend failure.
    pub fallback_handler: Option<String>,
    /// When set, routing must pick this handler on the next turn.
    /// Written by the fallback-switch recovery strategy.
    pub forced_handler: Option<String>,

    /// Role the caller presented ("owner", "manager", "customer", ...).
    pub caller_role: Option<String>,

    /// Whether the turn's outcome requires explicit user confirmation.
    #[serde(default)]
    pub needs_confirmation: bool,
    /// Whether the backend asked for a human handoff.
    #[serde(default)]
    pub handoff_requested: bool,

    /// Whether a business workflow was started this conversation.
    #[serde(default)]
    pub workflow_triggered: bool,
    /// Identifier of the started workflow, if any.
    pub workflow_id: Option<WorkflowId>,

    /// Timestamp of the most recent in-turn recovery attempt.
    pub recovery_attempted_at: Option<Timestamp>,

    /// User preferences, preserved across conversation resets.
    #[serde(default)]
    pub preferences: BTreeMap<String, serde_json::Value>,

    /// Tenant profile enrichment, when the lookup succeeded.
    pub tenant_enrichment: Option<TenantEnrichment>,

    /// Escape hatch for transfer metadata and adapter-specific notes.
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ConversationContext {
    /// Returns a fresh context preserving only the reset allow-list
    /// (user preferences; tenant, user and mode live on the aggregate).
    ///
    /// Applying this twice yields the same result as applying it once.
    pub fn reset_preserving_allowed(&self) -> Self {
        Self {
            preferences: self.preferences.clone(),
            ..Self::default()
        }
    }

    /// Records the intent-detection outputs in one step.
    pub fn record_intent(
        &mut self,
        intent: impl Into<String>,
        confidence: f64,
        requires_scheduling: bool,
        category: impl Into<String>,
    ) {
        let intent = intent.into();
        // The workflow latch only guards re-firing for one transaction;
        // a changed intent starts a new one.
        if self.intent.as_deref() != Some(intent.as_str()) {
            self.workflow_triggered = false;
            self.workflow_id = None;
        }
        self.intent = Some(intent);
        self.intent_confidence = Some(confidence.clamp(0.0, 1.0));
        self.requires_scheduling = requires_scheduling;
        self.intent_category = Some(category.into());
    }

    /// Records the information-gathering diff.
    pub fn record_missing_fields(&mut self, missing: Vec<String>) {
        self.information_complete = missing.is_empty();
        self.missing_fields = missing;
    }

    /// Records the routing selection.
    pub fn record_routing(
        &mut self,
        handler: impl Into<String>,
        confidence: f64,
        fallback: impl Into<String>,
    ) {
        self.selected_handler = Some(handler.into());
        self.handler_confidence = Some(confidence.clamp(0.0, 1.0));
        self.fallback_handler = Some(fallback.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated_context() -> ConversationContext {
        let mut ctx = ConversationContext::default();
        ctx.record_intent("booking", 0.8, true, "transactional");
        ctx.facts.insert("party_size".into(), "4".into());
        ctx.record_missing_fields(vec!["date".into(), "time".into()]);
        ctx.record_routing("dining_handler", 0.75, "general_handler");
        ctx.preferences
            .insert("language".into(), serde_json::json!("en"));
        ctx.extra
            .insert("note".into(), serde_json::json!("vip customer"));
        ctx
    }

    #[test]
    fn reset_keeps_only_preferences() {
        let ctx = populated_context();
        let reset = ctx.reset_preserving_allowed();

        assert!(reset.intent.is_none());
        assert!(reset.facts.is_empty());
        assert!(reset.selected_handler.is_none());
        assert!(reset.extra.is_empty());
        assert_eq!(reset.preferences, ctx.preferences);
    }

    #[test]
    fn reset_is_idempotent() {
        let ctx = populated_context();
        let once = ctx.reset_preserving_allowed();
        let twice = once.reset_preserving_allowed();
        assert_eq!(once.preferences, twice.preferences);
        assert_eq!(
            serde_json::to_value(&once).unwrap(),
            serde_json::to_value(&twice).unwrap()
        );
    }

    #[test]
    fn intent_change_clears_the_workflow_latch() {
        let mut ctx = ConversationContext::default();
        ctx.record_intent("booking", 0.8, true, "transactional");
        ctx.workflow_triggered = true;
        ctx.workflow_id = Some(WorkflowId::new("wf-1"));

        // Same intent again: the latch holds.
        ctx.record_intent("booking", 0.6, true, "transactional");
        assert!(ctx.workflow_triggered);

        ctx.record_intent("order", 0.7, false, "transactional");
        assert!(!ctx.workflow_triggered);
        assert!(ctx.workflow_id.is_none());
    }

    #[test]
    fn record_intent_clamps_confidence() {
        let mut ctx = ConversationContext::default();
        ctx.record_intent("inquiry", 1.7, false, "informational");
        assert_eq!(ctx.intent_confidence, Some(1.0));
    }

    #[test]
    fn record_missing_fields_sets_completeness_flag() {
        let mut ctx = ConversationContext::default();
        ctx.record_missing_fields(vec!["date".into()]);
        assert!(!ctx.information_complete);

        ctx.record_missing_fields(vec![]);
        assert!(ctx.information_complete);
    }

    #[test]
    fn context_roundtrips_through_json() {
        let ctx = populated_context();
        let json = serde_json::to_string(&ctx).unwrap();
        let back: ConversationContext = serde_json::from_str(&json).unwrap();
        assert_eq!(back.intent.as_deref(), Some("booking"));
        assert_eq!(back.missing_fields, ctx.missing_fields);
        assert_eq!(back.fallback_handler, ctx.fallback_handler);
    }
}
