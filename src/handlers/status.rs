use std::sync::Arc;

use actix_web::web::Data;
use chrono::{SecondsFormat, Utc};

use crate::context::ServerContext;
use crate::types::response::{Response, StatusResponse};

pub async fn get_status(sc: Data<Arc<ServerContext>>) -> Response<StatusResponse> {
    let now = Utc::now();
    let uptime = (now - sc.start_time).num_seconds().max(0) as u64;
    Response::with_data(StatusResponse {
        status: String::from("Available"),
        environment: sc.cfg.environment.clone(),
        version: String::from(env!("CARGO_PKG_VERSION")),
        up_since: sc.start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
        uptime_secs: uptime,
    })
}
