use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::dev::RequestHead;
use actix_web::http::header::{self, HeaderValue};
use actix_web::middleware::from_fn;
use actix_web::web::{self, Data, ServiceConfig};
use actix_web::{App, HttpServer};
use anyhow::{Context, Result};
use log::{info, warn};
use openssl::ssl::SslAcceptorBuilder;
use sd_notify::NotifyState;

use crate::authz::middleware::{authenticated, post_owner_or_admin, self_or_admin};
use crate::context::ServerContext;
use crate::handlers::{self, post, session, status, user};

pub struct RestfulServer {
    ssl: Option<SslAcceptorBuilder>,
    ctx: Arc<ServerContext>,

    keep_alive_secs: Option<u64>,
    workers: Option<u64>,

    bind: String,

    payload_limit_mib: u64,
}

impl RestfulServer {
    const DEFAULT_PAYLOAD_LIMIT_MIB: u64 = 1;

    pub fn new(bind: String, ctx: Arc<ServerContext>) -> Self {
        Self {
            ssl: None,
            ctx,
            keep_alive_secs: None,
            workers: None,
            bind,
            payload_limit_mib: Self::DEFAULT_PAYLOAD_LIMIT_MIB,
        }
    }

    pub fn set_ssl(&mut self, ssl: SslAcceptorBuilder) {
        self.ssl = Some(ssl);
    }

    pub fn set_keep_alive_secs(&mut self, keep_alive_secs: u64) {
        self.keep_alive_secs = Some(keep_alive_secs);
    }

    pub fn set_workers(&mut self, workers: u64) {
        self.workers = Some(workers);
    }

    pub fn set_payload_limit_mib(&mut self, payload_limit_mib: u64) {
        self.payload_limit_mib = payload_limit_mib;
    }

    pub async fn run(mut self) -> Result<()> {
        let ctx = self.ctx.clone();
        let payload_limit = (self.payload_limit_mib * 1024 * 1024) as usize;
        let origins = self.ctx.cfg.cors_allowed_origins.clone();
        let mut srv = HttpServer::new(move || {
            App::new()
                .wrap(cors(&origins))
                .app_data(Data::new(ctx.clone()))
                .configure(|cfg| configure(cfg, payload_limit))
                .default_service(web::route().to(handlers::default_handler))
        });

        if let Some(ssl) = self.ssl.take() {
            info!("Binding to https://{}", self.bind);
            srv = srv.bind_openssl(&self.bind, ssl).context("bind with ssl")?
        } else {
            warn!("Using HTTP (without SSL), session cookies travel in clear text");
            info!("Binding to http://{}", self.bind);
            srv = srv.bind(&self.bind).context("bind without ssl")?
        };

        if let Some(keep_alive) = self.keep_alive_secs {
            srv = srv.keep_alive(Duration::from_secs(keep_alive));
        }
        if let Some(workers) = self.workers {
            srv = srv.workers(workers as usize);
        }

        sd_notify::notify(true, &[NotifyState::Ready]).context("notify systemd")?;
        info!(
            "Starting restful server, environment: {}",
            self.ctx.cfg.environment
        );
        srv.run().await.context("run server")?;

        info!("Server stopped by user");
        Ok(())
    }
}

/// Cross-origin access for browser clients. Credentials are allowed, so the
/// matched origin is echoed back instead of `*`.
pub fn cors(origins: &[String]) -> Cors {
    let origins = origins.to_vec();
    Cors::default()
        .allowed_origin_fn(move |origin: &HeaderValue, _req: &RequestHead| {
            origin
                .to_str()
                .map(|origin| origin_allowed(&origins, origin))
                .unwrap_or(false)
        })
        .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .supports_credentials()
        .max_age(300)
}

fn origin_allowed(patterns: &[String], origin: &str) -> bool {
    patterns.iter().any(|pattern| match pattern.strip_suffix('*') {
        Some(prefix) => origin.starts_with(prefix) && origin.len() > prefix.len(),
        None => pattern == origin,
    })
}

/// Registers every route with its guard. Guarded routes wrap the handler, so
/// a denied request never reaches it.
pub fn configure(cfg: &mut ServiceConfig, payload_limit: usize) {
    cfg.app_data(handlers::json_config(payload_limit))
        .app_data(handlers::query_config())
        .route("/", web::get().to(status::get_status))
        .service(
            web::scope("/v1")
                .service(
                    web::scope("/posts")
                        .route("", web::get().to(post::list_posts))
                        .route(
                            "",
                            web::post()
                                .to(post::create_post)
                                .wrap(from_fn(authenticated)),
                        )
                        .route("/paging", web::get().to(post::list_paged_posts))
                        .route("/{id}", web::get().to(post::get_post))
                        .route(
                            "/{id}",
                            web::patch()
                                .to(post::patch_post)
                                .wrap(from_fn(post_owner_or_admin)),
                        )
                        .route(
                            "/{id}",
                            web::delete()
                                .to(post::delete_post)
                                .wrap(from_fn(post_owner_or_admin)),
                        ),
                )
                .service(
                    web::scope("/users")
                        .route("", web::post().to(user::register))
                        .route("/login", web::post().to(session::login))
                        .route(
                            "/logout",
                            web::get()
                                .to(session::logout)
                                .wrap(from_fn(authenticated)),
                        )
                        .route(
                            "/{id}",
                            web::get()
                                .to(user::get_user)
                                .wrap(from_fn(authenticated)),
                        )
                        .route(
                            "/{id}",
                            web::patch()
                                .to(user::patch_user)
                                .wrap(from_fn(self_or_admin)),
                        )
                        .route(
                            "/{id}",
                            web::delete()
                                .to(user::delete_user)
                                .wrap(from_fn(self_or_admin)),
                        ),
                ),
        );
}
