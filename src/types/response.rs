use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const STATUS_OK: u32 = 200;
pub const STATUS_CREATED: u32 = 201;
pub const STATUS_BAD_REQUEST: u32 = 400;
pub const STATUS_UNAUTHORIZED: u32 = 401;
pub const STATUS_FORBIDDEN: u32 = 403;
pub const STATUS_NOT_FOUND: u32 = 404;
pub const STATUS_CONFLICT: u32 = 409;
pub const STATUS_INTERNAL_SERVER_ERROR: u32 = 500;

/// The JSON envelope every non-guard response is wrapped in. The HTTP status
/// always equals `code`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(bound = "T: Serialize + DeserializeOwned")]
pub struct Response<T: Serialize + DeserializeOwned> {
    pub code: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize + DeserializeOwned> Response<T> {
    pub fn ok() -> Self {
        Self {
            code: STATUS_OK,
            message: None,
            data: None,
        }
    }

    pub fn with_data(data: T) -> Self {
        Self {
            code: STATUS_OK,
            message: None,
            data: Some(data),
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            code: STATUS_CREATED,
            message: None,
            data: Some(data),
        }
    }

    pub fn bad_request(message: impl ToString) -> Self {
        Self::error(STATUS_BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl ToString) -> Self {
        Self::error(STATUS_UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl ToString) -> Self {
        Self::error(STATUS_NOT_FOUND, message)
    }

    pub fn resource_not_found() -> Self {
        Self::not_found("Resource not found")
    }

    pub fn conflict(message: impl ToString) -> Self {
        Self::error(STATUS_CONFLICT, message)
    }

    pub fn internal_server_error(message: impl ToString) -> Self {
        Self::error(STATUS_INTERNAL_SERVER_ERROR, message)
    }

    pub fn forbidden() -> Self {
        Self::error(STATUS_FORBIDDEN, "Operation not allowed")
    }

    pub fn database_error() -> Self {
        Self::internal_server_error("Database error")
    }

    fn error(code: u32, message: impl ToString) -> Self {
        Self {
            code,
            message: Some(message.to_string()),
            data: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "T: Serialize + DeserializeOwned")]
pub struct ListResponse<T: Serialize + DeserializeOwned> {
    pub items: Vec<T>,
    pub total: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub environment: String,
    pub version: String,
    pub up_since: String,
    pub uptime_secs: u64,
}
