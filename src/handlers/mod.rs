pub mod post;
pub mod session;
pub mod status;
pub mod user;

use actix_web::body::BoxBody;
use actix_web::error::{BlockingError, InternalError};
use actix_web::web::{self, JsonConfig, QueryConfig};
use actix_web::{HttpRequest, HttpResponse, Responder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::code::{generate_salt, hash_password, is_object_id};
use crate::types::response::{self, Response};

pub fn convert_response<T>(resp: Response<T>) -> HttpResponse
where
    T: Serialize + DeserializeOwned,
{
    let mut http_resp = match resp.code {
        response::STATUS_OK => HttpResponse::Ok(),
        response::STATUS_CREATED => HttpResponse::Created(),
        response::STATUS_BAD_REQUEST => HttpResponse::BadRequest(),
        response::STATUS_UNAUTHORIZED => HttpResponse::Unauthorized(),
        response::STATUS_FORBIDDEN => HttpResponse::Forbidden(),
        response::STATUS_NOT_FOUND => HttpResponse::NotFound(),
        response::STATUS_CONFLICT => HttpResponse::Conflict(),
        _ => HttpResponse::InternalServerError(),
    };
    http_resp.json(resp)
}

impl<T> Responder for Response<T>
where
    T: Serialize + DeserializeOwned,
{
    type Body = BoxBody;

    fn respond_to(self, _req: &HttpRequest) -> HttpResponse<Self::Body> {
        convert_response(self)
    }
}

/// Malformed JSON bodies are answered with the usual envelope instead of
/// actix's plain text error.
pub fn json_config(payload_limit: usize) -> JsonConfig {
    JsonConfig::default()
        .limit(payload_limit)
        .error_handler(|err, _req| {
            let resp = convert_response(Response::<()>::bad_request(format!(
                "Invalid request body: {err}"
            )));
            InternalError::from_response(err, resp).into()
        })
}

pub fn query_config() -> QueryConfig {
    QueryConfig::default().error_handler(|err, _req| {
        let resp = convert_response(Response::<()>::bad_request(format!(
            "Invalid query: {err}"
        )));
        InternalError::from_response(err, resp).into()
    })
}

pub async fn default_handler(req: HttpRequest) -> Response<()> {
    let path = req.uri().path();
    let method = req.method().as_str();
    Response::not_found(format!("No route to {method} {path}"))
}

fn check_id<T>(id: &str) -> Result<(), Response<T>>
where
    T: Serialize + DeserializeOwned,
{
    if is_object_id(id) {
        Ok(())
    } else {
        Err(Response::bad_request("Invalid id"))
    }
}

/// Salts and hashes a new password on the blocking pool. Returns the hash and
/// its salt.
async fn derive_password(
    password: String,
    salt_length: usize,
    rounds: u32,
) -> Result<(String, String), BlockingError> {
    web::block(move || {
        let salt = generate_salt(salt_length);
        (hash_password(&password, &salt, rounds), salt)
    })
    .await
}
