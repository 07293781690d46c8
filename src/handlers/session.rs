use std::sync::Arc;

use actix_web::web::{self, Data, Json};
use actix_web::HttpResponse;
use log::{debug, error, info};

use crate::auth::cookie::{expired_cookie, session_cookie};
use crate::auth::now;
use crate::authz::Subject;
use crate::code::verify_password;
use crate::context::ServerContext;
use crate::types::response::Response;
use crate::types::user::{LoginRequest, SessionResponse};

use super::convert_response;

const LOGIN_FAILED: &str = "incorrect email or password";

/// Checks the password and sets the session cookie. Unknown emails and wrong
/// passwords get the same answer.
pub async fn login(req: Json<LoginRequest>, sc: Data<Arc<ServerContext>>) -> HttpResponse {
    let req = req.into_inner();
    debug!("Login attempt for {}", req.email);

    let email = req.email.clone();
    let up = match sc.db.run(move |tx| tx.get_user_password(&email)).await {
        Ok(Some(up)) => up,
        Ok(None) => {
            debug!("Login failed for {}: no such user", req.email);
            return convert_response(Response::<()>::unauthorized(LOGIN_FAILED));
        }
        Err(e) => {
            error!("Failed to get user password: {e:#}");
            return convert_response(Response::<()>::database_error());
        }
    };

    let password = req.password;
    let (salt, stored) = (up.salt, up.password);
    match web::block(move || verify_password(&password, &salt, &stored)).await {
        Ok(true) => {}
        Ok(false) => {
            debug!("Login failed for {}: wrong password", req.email);
            return convert_response(Response::<()>::unauthorized(LOGIN_FAILED));
        }
        Err(e) => {
            error!("Failed to verify password: {e}");
            return convert_response(Response::<()>::internal_server_error(
                "Verify password failed",
            ));
        }
    }

    let token = match sc.token_generator.generate_token(&up.id, now()) {
        Ok(token) => token,
        Err(e) => {
            error!("Failed to generate session token: {e:#}");
            return convert_response(Response::<()>::internal_server_error(
                "Generate token failed",
            ));
        }
    };

    let cookie = match session_cookie(&sc.cfg.session.cookie_name, &token) {
        Ok(cookie) => cookie,
        Err(e) => {
            error!("Failed to build session cookie: {e:#}");
            return convert_response(Response::<()>::internal_server_error(
                "Build session cookie failed",
            ));
        }
    };

    info!("User {} logged in", up.id);
    let mut resp = convert_response(Response::with_data(SessionResponse {
        id: up.id,
        expires_at: token.expires_at,
    }));
    if let Err(e) = resp.add_cookie(&cookie) {
        error!("Failed to set session cookie: {e}");
        return convert_response(Response::<()>::internal_server_error(
            "Set session cookie failed",
        ));
    }
    resp
}

/// Replaces the session cookie with an empty, already expired one.
pub async fn logout(subject: Subject, sc: Data<Arc<ServerContext>>) -> HttpResponse {
    let cookie = match expired_cookie(&sc.cfg.session.cookie_name, now()) {
        Ok(cookie) => cookie,
        Err(e) => {
            error!("Failed to build logout cookie: {e:#}");
            return convert_response(Response::<()>::internal_server_error(
                "Build session cookie failed",
            ));
        }
    };

    info!("User {} logged out", subject.id);
    let mut resp = convert_response(Response::<()>::ok());
    if let Err(e) = resp.add_cookie(&cookie) {
        error!("Failed to clear session cookie: {e}");
        return convert_response(Response::<()>::internal_server_error(
            "Set session cookie failed",
        ));
    }
    resp
}
