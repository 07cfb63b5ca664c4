//! Intent detection heuristics and static lookup tables.
//!
//! Lexical, deterministic intent signals. The quality of understanding is
//! the backend's job; these heuristics only have to be stable enough to
//! route and to know which facts a workflow needs.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::domain::conversation::ConversationMessage;
use crate::ports::WorkflowKind;

/// Keyword table per intent label, ordered by priority.
static INTENT_KEYWORDS: Lazy<Vec<(&'static str, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        (
            "booking",
            vec!["book", "reserve", "reservation", "table for"],
        ),
        (
            "order",
            vec!["order", "delivery", "takeaway", "take away", "pickup"],
        ),
        (
            "appointment",
            vec!["appointment", "schedule a visit", "consultation"],
        ),
        (
            "cancellation",
            vec!["cancel", "reschedule", "change my booking"],
        ),
        (
            "complaint",
            vec!["complaint", "complain", "refund", "terrible", "unhappy"],
        ),
    ]
});

/// Required-field lists per intent.
static REQUIRED_FIELDS: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    HashMap::from([
        ("booking", vec!["date", "time", "party_size", "contact"]),
        ("order", vec!["items", "delivery_address", "contact"]),
        ("appointment", vec!["date", "time", "service", "contact"]),
        ("cancellation", vec!["booking_reference"]),
    ])
});

/// Intents that need a scheduled follow-up workflow.
const SCHEDULING_INTENTS: [&str; 2] = ["booking", "appointment"];

/// Output of intent detection for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentSignal {
    /// Intent label ("booking", "order", ..., "inquiry" as fallback).
    pub label: String,
    /// Detection confidence in [0, 1].
    pub confidence: f64,
    /// Whether this intent triggers scheduling workflows.
    pub requires_scheduling: bool,
    /// Coarse category for routing and analytics.
    pub category: String,
}

/// Detects the user's intent from the latest message plus a bounded
/// trailing window of history.
pub fn detect_intent(message: &str, history: &[ConversationMessage]) -> IntentSignal {
    let lowered = message.to_ascii_lowercase();

    for (label, keywords) in INTENT_KEYWORDS.iter() {
        let hits = keywords.iter().filter(|kw| lowered.contains(*kw)).count();
        if hits > 0 {
            let confidence = if hits > 1 { 0.9 } else { 0.7 };
            return signal(label, confidence);
        }
    }

    // Fall back to history: a recent user message may still carry the
    // intent (e.g. the user is answering a follow-up question).
    for past in history.iter().rev() {
        let lowered = past.content.to_ascii_lowercase();
        for (label, keywords) in INTENT_KEYWORDS.iter() {
            if keywords.iter().any(|kw| lowered.contains(*kw)) {
                return signal(label, 0.6);
            }
        }
    }

    signal("inquiry", 0.5)
}

fn signal(label: &str, confidence: f64) -> IntentSignal {
    IntentSignal {
        label: label.to_string(),
        confidence,
        requires_scheduling: SCHEDULING_INTENTS.contains(&label),
        category: category_for(label).to_string(),
    }
}

fn category_for(label: &str) -> &'static str {
    match label {
        "booking" | "order" | "appointment" | "cancellation" => "transactional",
        "complaint" => "support",
        _ => "informational",
    }
}

/// The static required-field list for an intent. Unknown intents need
/// nothing.
pub fn required_fields(intent: &str) -> &'static [&'static str] {
    REQUIRED_FIELDS
        .get(intent)
        .map(|fields| fields.as_slice())
        .unwrap_or(&[])
}

/// Extracts structured facts mentioned in a message.
///
/// Deliberately shallow: a party size after "for", relative dates, and
/// clock-ish times. Everything subtler is the backend's problem.
pub fn extract_facts(message: &str) -> BTreeMap<String, String> {
    let mut facts = BTreeMap::new();
    let lowered = message.to_ascii_lowercase();

    // party_size: first integer following the word "for".
    let mut words = lowered.split_whitespace().peekable();
    while let Some(word) = words.next() {
        if word == "for" {
            if let Some(next) = words.peek() {
                let digits: String = next.chars().take_while(|c| c.is_ascii_digit()).collect();
                if !digits.is_empty() {
                    facts.insert("party_size".into(), digits);
                    break;
                }
            }
        }
    }

    // date: relative day words.
    for day in [
        "today", "tonight", "tomorrow", "monday", "tuesday", "wednesday", "thursday", "friday",
        "saturday", "sunday",
    ] {
        if lowered.contains(day) {
            facts.insert("date".into(), day.to_string());
            break;
        }
    }

    // time: a token containing a clock pattern ("7pm", "19:30").
    for token in lowered.split_whitespace() {
        let has_digit = token.chars().any(|c| c.is_ascii_digit());
        let clockish = token.contains(':') || token.ends_with("am") || token.ends_with("pm");
        if has_digit && clockish {
            facts.insert("time".into(), token.trim_matches(|c: char| c == '.').to_string());
            break;
        }
    }

    facts
}

/// Maps the scheduling flag and intent to the workflow to start, if any.
pub fn workflow_for(requires_scheduling: bool, intent: &str) -> Option<WorkflowKind> {
    match intent {
        "booking" | "appointment" if requires_scheduling => Some(WorkflowKind::Appointment),
        "order" => Some(WorkflowKind::Order),
        _ => None,
    }
}
