use log::debug;

use crate::auth::jwt::JwtTokenValidator;

use super::resolver::{IdentityResolver, LookupError};
use super::{AllowReason, AuthDecision, DenyReason, Subject};

/// The authorization core. Every guard verifies the credential first and
/// only then touches storage; the first conclusive answer is returned.
pub struct Authorizer {
    validator: JwtTokenValidator,
    resolver: IdentityResolver,
}

impl Authorizer {
    pub fn new(validator: JwtTokenValidator, resolver: IdentityResolver) -> Self {
        Self {
            validator,
            resolver,
        }
    }

    /// Allows any caller holding a valid credential whose subject still
    /// exists.
    ///
    /// # Arguments
    /// * `credential` - Raw credential from the request, if any
    /// * `now` - Current unix time in seconds
    pub async fn require_authenticated(&self, credential: Option<&str>, now: u64) -> AuthDecision {
        let id = match self.validator.validate_token(credential, now) {
            Ok(id) => id,
            Err(e) => {
                debug!("Deny unauthenticated request: {}", e.detail());
                return AuthDecision::Deny(DenyReason::Unauthenticated(e.to_string()));
            }
        };

        match self.resolver.subject_exists(&id).await {
            Ok(()) => AuthDecision::allow(Subject { id }, AllowReason::Authenticated),
            Err(LookupError::NotFound) | Err(LookupError::TimedOut) => {
                debug!("Deny request from '{id}': subject not found");
                AuthDecision::Deny(DenyReason::Unauthenticated(String::from(
                    "subject not found",
                )))
            }
            Err(LookupError::Backend(_)) => AuthDecision::Deny(DenyReason::Unavailable),
        }
    }

    /// Allows the owner of `post_id` without a role lookup, otherwise
    /// requires the admin role.
    pub async fn require_owner_or_admin(
        &self,
        credential: Option<&str>,
        post_id: &str,
        now: u64,
    ) -> AuthDecision {
        let subject = match self.require_authenticated(credential, now).await {
            AuthDecision::Allow { subject, .. } => subject,
            deny => return deny,
        };

        match self.resolver.owner_of(post_id).await {
            Ok(owner) if owner == subject.id => {
                return AuthDecision::allow(subject, AllowReason::Owner);
            }
            Ok(_) => {}
            Err(e) => debug!("Owner lookup of post '{post_id}' failed ({e}), checking roles"),
        }

        self.admin_or_forbidden(subject).await
    }

    /// Allows a subject acting on itself without a role lookup, otherwise
    /// requires the admin role.
    pub async fn require_self_or_admin(
        &self,
        credential: Option<&str>,
        target_id: &str,
        now: u64,
    ) -> AuthDecision {
        let subject = match self.require_authenticated(credential, now).await {
            AuthDecision::Allow { subject, .. } => subject,
            deny => return deny,
        };

        if subject.id == target_id {
            return AuthDecision::allow(subject, AllowReason::SelfAccess);
        }

        self.admin_or_forbidden(subject).await
    }

    async fn admin_or_forbidden(&self, subject: Subject) -> AuthDecision {
        match self.resolver.roles_of(&subject.id).await {
            Ok(roles) if roles.is_admin() => AuthDecision::allow(subject, AllowReason::Admin),
            Ok(_) => {
                debug!("Deny request from '{}': not an admin", subject.id);
                AuthDecision::Deny(DenyReason::Forbidden)
            }
            Err(e) => {
                debug!("Deny request from '{}': role lookup failed ({e})", subject.id);
                AuthDecision::Deny(DenyReason::Forbidden)
            }
        }
    }
}
