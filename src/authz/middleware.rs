use std::future::{ready, Ready};
use std::sync::Arc;

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{Payload, ServiceRequest, ServiceResponse};
use actix_web::error::InternalError;
use actix_web::http::header;
use actix_web::middleware::Next;
use actix_web::web::Data;
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest, HttpResponse};
use log::{debug, error};

use crate::auth::cookie::credential_value;
use crate::auth::now;
use crate::context::ServerContext;
use crate::handlers::convert_response;
use crate::types::response::Response;

use super::{AuthDecision, DenyReason, Subject};

pub const CHALLENGE_REALM: &str = "blog-api";

#[derive(Debug, Clone, Copy)]
enum Policy {
    Authenticated,
    OwnerOrAdmin,
    SelfOrAdmin,
}

/// Any caller with a valid session whose user still exists.
pub async fn authenticated<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    guard(Policy::Authenticated, req, next).await
}

/// The owner of the post named by the `{id}` path segment, or an admin.
pub async fn post_owner_or_admin<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    guard(Policy::OwnerOrAdmin, req, next).await
}

/// The user named by the `{id}` path segment, or an admin.
pub async fn self_or_admin<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    guard(Policy::SelfOrAdmin, req, next).await
}

async fn guard<B: MessageBody>(
    policy: Policy,
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let sc = match req.app_data::<Data<Arc<ServerContext>>>() {
        Some(sc) => sc.clone(),
        None => {
            error!("Server context is not registered, deny {}", req.path());
            let resp = deny_response(&DenyReason::Unavailable);
            return Ok(req.into_response(resp).map_into_right_body());
        }
    };

    let credential = credential_value(req.cookie(&sc.cfg.session.cookie_name));
    let credential = credential.as_deref();
    let target = req.match_info().get("id").unwrap_or_default().to_string();
    let now = now();

    let decision = match policy {
        Policy::Authenticated => sc.authorizer.require_authenticated(credential, now).await,
        Policy::OwnerOrAdmin => {
            sc.authorizer
                .require_owner_or_admin(credential, &target, now)
                .await
        }
        Policy::SelfOrAdmin => {
            sc.authorizer
                .require_self_or_admin(credential, &target, now)
                .await
        }
    };
    debug!(
        "Guard {policy:?} on {} {}: {decision}",
        req.method(),
        req.path()
    );

    match decision {
        AuthDecision::Allow { subject, .. } => {
            req.extensions_mut().insert(subject);
            next.call(req)
                .await
                .map(ServiceResponse::map_into_left_body)
        }
        AuthDecision::Deny(reason) => {
            let resp = deny_response(&reason);
            Ok(req.into_response(resp).map_into_right_body())
        }
    }
}

pub fn deny_response(reason: &DenyReason) -> HttpResponse {
    match reason {
        DenyReason::Unauthenticated(detail) => HttpResponse::Unauthorized()
            .insert_header((header::WWW_AUTHENTICATE, challenge(detail)))
            .finish(),
        DenyReason::Forbidden => HttpResponse::Forbidden().finish(),
        DenyReason::Unavailable => convert_response(Response::<()>::internal_server_error(
            "Server error: identity lookup failed",
        )),
    }
}

fn challenge(detail: &str) -> String {
    let detail = detail.replace(['"', '\\'], "");
    format!("Cookie realm=\"{CHALLENGE_REALM}\", error=\"{detail}\"")
}

/// Handlers behind a guard take the verified caller as an argument. Without
/// a guard in front there is no subject and the request is rejected.
impl FromRequest for Subject {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let subject = req.extensions().get::<Subject>().cloned();
        ready(match subject {
            Some(subject) => Ok(subject),
            None => {
                error!("No verified subject for {} {}", req.method(), req.path());
                let resp = deny_response(&DenyReason::Unauthenticated(String::from(
                    "missing credential",
                )));
                Err(InternalError::from_response("missing subject", resp).into())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;

    use super::*;

    #[test]
    fn test_deny_response() {
        let resp = deny_response(&DenyReason::Unauthenticated(String::from(
            "invalid credential",
        )));
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let value = resp.headers().get(header::WWW_AUTHENTICATE).unwrap();
        assert_eq!(
            value.to_str().unwrap(),
            "Cookie realm=\"blog-api\", error=\"invalid credential\""
        );

        let resp = deny_response(&DenyReason::Forbidden);
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(resp.headers().get(header::WWW_AUTHENTICATE).is_none());

        let resp = deny_response(&DenyReason::Unavailable);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_challenge_strips_quotes() {
        assert_eq!(
            challenge("bad \"detail\""),
            "Cookie realm=\"blog-api\", error=\"bad detail\""
        );
    }
}
