//! Agent routing - selecting a handler from the fixed candidate set.
//!
//! Handlers are keyed by (intent, mode, tenant category). Every selection
//! also names a fallback candidate so the recovery selector can switch
//! handlers without re-running routing.

use serde::{Deserialize, Serialize};

use crate::domain::conversation::ConversationMode;

/// The general-purpose handler every selection can fall back to.
pub const GENERAL_HANDLER: &str = "general_handler";

/// Outcome of agent routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerSelection {
    /// Selected handler.
    pub handler: String,
    /// Confidence of the selection, in [0, 1].
    pub confidence: f64,
    /// Fallback candidate for recovery.
    pub fallback: String,
}

impl HandlerSelection {
    fn new(handler: &str, confidence: f64) -> Self {
        let fallback = if handler == GENERAL_HANDLER {
            "support_handler"
        } else {
            GENERAL_HANDLER
        };
        Self {
            handler: handler.to_string(),
            confidence,
            fallback: fallback.to_string(),
        }
    }
}

/// Selects a handler for the detected intent in the given mode.
///
/// `tenant_category` comes from tenant enrichment and may be absent when
/// the directory lookup degraded.
pub fn select_handler(
    intent: &str,
    mode: ConversationMode,
    tenant_category: Option<&str>,
) -> HandlerSelection {
    match mode {
        ConversationMode::Management => HandlerSelection::new("management_handler", 0.9),
        ConversationMode::MultiTenant => HandlerSelection::new("discovery_handler", 0.85),
        ConversationMode::SingleTenant => select_single_tenant(intent, tenant_category),
    }
}

fn select_single_tenant(intent: &str, tenant_category: Option<&str>) -> HandlerSelection {
    match (intent, tenant_category) {
        ("booking" | "order", Some("restaurant")) => HandlerSelection::new("dining_handler", 0.9),
        ("appointment", Some("clinic" | "salon")) => {
            HandlerSelection::new("scheduling_handler", 0.9)
        }
        ("booking" | "appointment", _) => HandlerSelection::new("scheduling_handler", 0.75),
        ("order", _) => HandlerSelection::new("ordering_handler", 0.75),
        ("complaint" | "cancellation", _) => HandlerSelection::new("support_handler", 0.8),
        _ => HandlerSelection::new(GENERAL_HANDLER, 0.6),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn management_mode_always_routes_to_management_handler() {
        for intent in ["booking", "inquiry", "complaint"] {
            let selection = select_handler(intent, ConversationMode::Management, None);
            assert_eq!(selection.handler, "management_handler");
        }
    }

    #[test]
    fn multi_tenant_mode_routes_to_discovery() {
        let selection = select_handler("inquiry", ConversationMode::MultiTenant, None);
        assert_eq!(selection.handler, "discovery_handler");
    }

    #[test]
    fn restaurant_booking_gets_dining_handler() {
        let selection =
            select_handler("booking", ConversationMode::SingleTenant, Some("restaurant"));
        assert_eq!(selection.handler, "dining_handler");
        assert_eq!(selection.fallback, GENERAL_HANDLER);
        assert_eq!(selection.confidence, 0.9);
    }

    #[test]
    fn category_match_beats_intent_only_match() {
        let with_category =
            select_handler("appointment", ConversationMode::SingleTenant, Some("clinic"));
        let without = select_handler("appointment", ConversationMode::SingleTenant, None);
        assert_eq!(with_category.handler, without.handler);
        assert!(with_category.confidence > without.confidence);
    }

    #[test]
    fn unknown_intent_degrades_to_general_handler() {
        let selection = select_handler("inquiry", ConversationMode::SingleTenant, None);
        assert_eq!(selection.handler, GENERAL_HANDLER);
        // The general handler cannot be its own fallback.
        assert_eq!(selection.fallback, "support_handler");
    }

    #[test]
    fn every_selection_names_a_distinct_fallback() {
        for intent in ["booking", "order", "appointment", "complaint", "inquiry"] {
            for mode in [
                ConversationMode::SingleTenant,
                ConversationMode::Management,
                ConversationMode::MultiTenant,
            ] {
                let selection = select_handler(intent, mode, Some("restaurant"));
                assert_ne!(selection.handler, selection.fallback);
            }
        }
    }
}
