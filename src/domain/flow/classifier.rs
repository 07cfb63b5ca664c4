//! Flow classifier.
//!
//! Pure, total decision function mapping an inbound request to a
//! conversation mode. The rules are evaluated strictly in order and the
//! first match wins; every input resolves to a mode except an invalid
//! explicit mode tag, which is a caller error.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::conversation::{ConversationContext, ConversationMode};
use crate::domain::foundation::TenantId;

/// Keywords indicating tenant-side management work.
static MANAGEMENT_KEYWORDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "dashboard",
        "analytics",
        "settings",
        "configure",
        "revenue",
        "report",
        "staff",
        "inventory",
        "my business",
    ]
});

/// Keywords indicating cross-tenant discovery or comparison.
static DISCOVERY_KEYWORDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "compare",
        "comparison",
        "versus",
        " vs ",
        "best ",
        "nearby",
        "near me",
        "recommend",
        "which place",
        "options around",
    ]
});

/// Roles allowed into management mode without an explicit tag.
const PRIVILEGED_ROLES: [&str; 3] = ["owner", "manager", "admin"];

/// Raised when the caller supplies a mode tag the platform does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown conversation mode tag: {tag:?}")]
pub struct ClassificationError {
    /// The rejected tag.
    pub tag: String,
}

/// An inbound request, before any conversation exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowRequest {
    /// Explicit mode tag supplied by the caller, if any.
    pub explicit_mode: Option<String>,
    /// Tenant the request is addressed to, if known.
    pub tenant_id: Option<TenantId>,
    /// Free-text user message.
    pub message: String,
    /// Role the caller presented, if authenticated.
    pub caller_role: Option<String>,
    /// Explicit request to compare across tenants.
    #[serde(default)]
    pub cross_tenant_comparison: bool,
    /// Optional location hint for discovery requests.
    pub location_hint: Option<String>,
}

/// Which rule decided the classification, for diagnostics and metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationRule {
    ExplicitTag,
    ManagementKeyword,
    TenantAffinity,
    DiscoveryKeyword,
    PrivilegedRole,
    UnprivilegedRole,
    Default,
}

/// Outcome of classification: the mode plus the seed context for a new
/// conversation.
#[derive(Debug, Clone)]
pub struct Classification {
    /// Selected conversation mode.
    pub mode: ConversationMode,
    /// The rule that fired.
    pub rule: ClassificationRule,
    /// Initial context for a conversation created from this request.
    pub seed_context: ConversationContext,
}

/// Stateless classifier; one instance is shared by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct FlowClassifier;

impl FlowClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classifies a request into a conversation mode.
    ///
    /// Pure function of its input; identical requests always classify
    /// identically. The only error is an invalid explicit mode tag.
    pub fn classify(&self, request: &FlowRequest) -> Result<Classification, ClassificationError> {
        let (mode, rule) = self.decide(request)?;
        let mut seed_context = ConversationContext::default();
        seed_context.caller_role = request.caller_role.clone();

        Ok(Classification {
            mode,
            rule,
            seed_context,
        })
    }

    fn decide(
        &self,
        request: &FlowRequest,
    ) -> Result<(ConversationMode, ClassificationRule), ClassificationError> {
        // (a) explicit mode tag wins outright; an unknown tag is a caller
        // error, not a fallthrough.
        if let Some(tag) = &request.explicit_mode {
            return match tag.parse::<ConversationMode>() {
                Ok(mode) => Ok((mode, ClassificationRule::ExplicitTag)),
                Err(()) => Err(ClassificationError { tag: tag.clone() }),
            };
        }

        let message = request.message.to_ascii_lowercase();

        // (b) management vocabulary.
        if MANAGEMENT_KEYWORDS.iter().any(|kw| message.contains(kw)) {
            return Ok((
                ConversationMode::Management,
                ClassificationRule::ManagementKeyword,
            ));
        }

        // (c) addressed to one tenant and not asking to compare.
        if request.tenant_id.is_some() && !request.cross_tenant_comparison {
            return Ok((
                ConversationMode::SingleTenant,
                ClassificationRule::TenantAffinity,
            ));
        }

        // (d) discovery vocabulary.
        if DISCOVERY_KEYWORDS.iter().any(|kw| message.contains(kw)) {
            return Ok((
                ConversationMode::MultiTenant,
                ClassificationRule::DiscoveryKeyword,
            ));
        }

        // (e)/(f) tenant present: role decides.
        if request.tenant_id.is_some() {
            let privileged = request
                .caller_role
                .as_deref()
                .map(|role| {
                    let role = role.to_ascii_lowercase();
                    PRIVILEGED_ROLES.contains(&role.as_str())
                })
                .unwrap_or(false);

            return if privileged {
                Ok((
                    ConversationMode::Management,
                    ClassificationRule::PrivilegedRole,
                ))
            } else {
                Ok((
                    ConversationMode::SingleTenant,
                    ClassificationRule::UnprivilegedRole,
                ))
            };
        }

        // (g) nothing else matched: discovery.
        Ok((ConversationMode::MultiTenant, ClassificationRule::Default))
    }
}
