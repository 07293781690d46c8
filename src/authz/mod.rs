pub mod guard;
pub mod middleware;
pub mod resolver;

use std::fmt::{self, Display};

/// A verified caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    Authenticated,
    Owner,
    SelfAccess,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// 401, the detail is the public challenge error.
    Unauthenticated(String),

    /// 403, never says which check failed.
    Forbidden,

    /// 500, the identity backend failed while confirming the subject.
    Unavailable,
}

/// Outcome of one guard evaluation for one request. Decisions are never
/// cached or reused across requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allow { subject: Subject, reason: AllowReason },
    Deny(DenyReason),
}

impl AuthDecision {
    pub fn allow(subject: Subject, reason: AllowReason) -> Self {
        AuthDecision::Allow { subject, reason }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthDecision::Allow { .. })
    }
}

impl Display for AuthDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthDecision::Allow { subject, reason } => {
                write!(f, "allow {} ({reason:?})", subject.id)
            }
            AuthDecision::Deny(DenyReason::Unauthenticated(detail)) => {
                write!(f, "deny unauthenticated ({detail})")
            }
            AuthDecision::Deny(DenyReason::Forbidden) => write!(f, "deny forbidden"),
            AuthDecision::Deny(DenyReason::Unavailable) => write!(f, "deny unavailable"),
        }
    }
}
