use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::auth::jwt::{JwtTokenGenerator, JwtTokenValidator};
use crate::authz::guard::Authorizer;
use crate::authz::resolver::{IdentityResolver, IdentityStore};
use crate::config::server::ServerConfig;
use crate::db::Database;

/// Everything a request needs, built once at startup and shared read-only
/// through `web::Data<Arc<ServerContext>>`.
pub struct ServerContext {
    pub db: Database,

    pub authorizer: Authorizer,
    pub token_generator: JwtTokenGenerator,

    pub cfg: ServerConfig,

    pub start_time: DateTime<Utc>,
}

impl ServerContext {
    pub fn new(cfg: ServerConfig, db: Database, secret: &[u8]) -> Result<Self> {
        let token_generator = JwtTokenGenerator::new(secret, cfg.session.ttl_secs)
            .context("init session token generator")?;
        let validator =
            JwtTokenValidator::new(secret).context("init session token validator")?;

        let store: Arc<dyn IdentityStore> = Arc::new(db.clone());
        let resolver =
            IdentityResolver::new(store, Duration::from_millis(cfg.guard.lookup_timeout_ms));

        Ok(Self {
            db,
            authorizer: Authorizer::new(validator, resolver),
            token_generator,
            cfg,
            start_time: Utc::now(),
        })
    }
}
