use std::sync::Arc;

use actix_web::web::{Data, Json, Path};
use log::{debug, error, info};

use crate::auth::now;
use crate::authz::Subject;
use crate::code::generate_object_id;
use crate::context::ServerContext;
use crate::db::types::{CreateUserParams, UpdateUserParams};
use crate::types::response::{CreatedResponse, Response};
use crate::types::user::{PatchUserRequest, PutUserRequest, Role, RoleSet, User};

use super::{check_id, derive_password};

/// Self-registration. New users always get exactly the `user` role.
pub async fn register(
    req: Json<PutUserRequest>,
    sc: Data<Arc<ServerContext>>,
) -> Response<CreatedResponse> {
    let req = req.into_inner();
    if let Err(e) = req.validate() {
        return Response::bad_request(format!("{e:#}"));
    }
    debug!("Register user: name={}, email={}", req.name, req.email);

    let (password, salt) =
        match derive_password(req.password, sc.cfg.salt_length, sc.cfg.password_rounds).await {
            Ok(derived) => derived,
            Err(e) => {
                error!("Failed to hash password: {e}");
                return Response::internal_server_error("Hash password failed");
            }
        };
    let params = CreateUserParams {
        id: generate_object_id(),
        name: req.name,
        email: req.email,
        password,
        salt,
        roles: RoleSet::from_iter([Role::User]),
        create_time: now(),
    };

    let id = params.id.clone();
    let result = sc
        .db
        .run(move |tx| {
            if tx.get_user_id_by_email(&params.email)?.is_some() {
                return Ok(false);
            }
            tx.create_user(params)?;
            Ok(true)
        })
        .await;

    match result {
        Ok(true) => {
            info!("Registered user {id}");
            Response::created(CreatedResponse { id })
        }
        Ok(false) => Response::conflict("user already exists"),
        Err(e) => {
            error!("Failed to register user: {e:#}");
            Response::database_error()
        }
    }
}

pub async fn get_user(
    _subject: Subject,
    id: Path<String>,
    sc: Data<Arc<ServerContext>>,
) -> Response<User> {
    let id = id.into_inner();
    if let Err(resp) = check_id(&id) {
        return resp;
    }

    match sc.db.run(move |tx| tx.get_user(&id)).await {
        Ok(Some(user)) => Response::with_data(user),
        Ok(None) => Response::resource_not_found(),
        Err(e) => {
            error!("Failed to get user: {e:#}");
            Response::database_error()
        }
    }
}

enum PatchResult {
    Patched,
    NotFound,
    Forbidden,
    EmailTaken,
}

/// Updates profile fields. Changing roles requires the caller to be an
/// admin, even when patching itself.
pub async fn patch_user(
    subject: Subject,
    id: Path<String>,
    req: Json<PatchUserRequest>,
    sc: Data<Arc<ServerContext>>,
) -> Response<()> {
    let id = id.into_inner();
    if let Err(resp) = check_id(&id) {
        return resp;
    }
    let req = req.into_inner();
    if let Err(e) = req.validate() {
        return Response::bad_request(format!("{e:#}"));
    }
    debug!(
        "Patch user {id} by {}: name={:?}, email={:?}, password={}, roles={:?}",
        subject.id,
        req.name,
        req.email,
        req.password.is_some(),
        req.roles
    );

    let password = match req.password.clone() {
        Some(password) => {
            match derive_password(password, sc.cfg.salt_length, sc.cfg.password_rounds).await {
                Ok(derived) => Some(derived),
                Err(e) => {
                    error!("Failed to hash password: {e}");
                    return Response::internal_server_error("Hash password failed");
                }
            }
        }
        None => None,
    };

    let result = sc
        .db
        .run(move |tx| {
            if !tx.has_user(&id)? {
                return Ok(PatchResult::NotFound);
            }

            if req.roles.is_some() {
                let caller = tx.get_user_roles(&subject.id)?.unwrap_or_default();
                if !caller.is_admin() {
                    return Ok(PatchResult::Forbidden);
                }
            }

            if let Some(email) = req.email.as_ref() {
                if let Some(owner) = tx.get_user_id_by_email(email)? {
                    if owner != id {
                        return Ok(PatchResult::EmailTaken);
                    }
                }
            }

            // Nothing is written until every check above has passed.
            if let Some(roles) = req.roles.as_ref() {
                tx.set_user_roles(&id, roles)?;
            }

            tx.update_user(UpdateUserParams {
                id,
                name: req.name,
                email: req.email,
                password,
                update_time: now(),
            })?;
            Ok(PatchResult::Patched)
        })
        .await;

    match result {
        Ok(PatchResult::Patched) => Response::ok(),
        Ok(PatchResult::NotFound) => Response::resource_not_found(),
        Ok(PatchResult::Forbidden) => Response::forbidden(),
        Ok(PatchResult::EmailTaken) => Response::conflict("email already in use"),
        Err(e) => {
            error!("Failed to patch user: {e:#}");
            Response::database_error()
        }
    }
}

pub async fn delete_user(id: Path<String>, sc: Data<Arc<ServerContext>>) -> Response<()> {
    let id = id.into_inner();
    if let Err(resp) = check_id(&id) {
        return resp;
    }
    debug!("Delete user {id}");

    let result = sc
        .db
        .run(move |tx| {
            if !tx.has_user(&id)? {
                return Ok(false);
            }
            tx.delete_user(&id)?;
            Ok(true)
        })
        .await;

    match result {
        Ok(true) => Response::ok(),
        Ok(false) => Response::resource_not_found(),
        Err(e) => {
            error!("Failed to delete user: {e:#}");
            Response::database_error()
        }
    }
}
