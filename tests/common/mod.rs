macro_rules! init_app {
    ($sc:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(blog_api::restful::cors(&$sc.cfg.cors_allowed_origins))
                .app_data(actix_web::web::Data::new($sc.clone()))
                .configure(|cfg| blog_api::restful::configure(cfg, 1024 * 1024))
                .default_service(
                    actix_web::web::route().to(blog_api::handlers::default_handler),
                ),
        )
        .await
    };
}

use std::sync::Arc;

use actix_web::cookie::Cookie;
use blog_api::code::{generate_salt, hash_password};
use blog_api::config::server::ServerConfig;
use blog_api::context::ServerContext;
use blog_api::db::types::{CreatePostParams, CreateUserParams};
use blog_api::db::Database;
use blog_api::types::user::{Role, RoleSet};

pub const SECRET: &[u8] = b"integration-test-session-secret";
pub const PASSWORD: &str = "Passw0rd!";
pub const ROUNDS: u32 = 1000;

pub const ALICE: &str = "aaaaaaaaaaaaaaaaaaaaaaaa";
pub const BOB: &str = "bbbbbbbbbbbbbbbbbbbbbbbb";
pub const ROOT: &str = "cccccccccccccccccccccccc";
pub const ALICE_POST: &str = "dddddddddddddddddddddddd";

/// A context over an in-memory store seeded with two users, one admin and
/// one post owned by alice.
pub fn test_context() -> Arc<ServerContext> {
    let db = Database::memory().unwrap();
    let mut cfg = ServerConfig::default();
    cfg.password_rounds = ROUNDS;

    db.with_transaction(|tx| {
        for (id, name, roles) in [
            (ALICE, "alice", vec![Role::User]),
            (BOB, "bob", vec![Role::User]),
            (ROOT, "root", vec![Role::User, Role::Admin]),
        ] {
            let salt = generate_salt(24);
            tx.create_user(CreateUserParams {
                id: id.to_string(),
                name: name.to_string(),
                email: format!("{name}@example.com"),
                password: hash_password(PASSWORD, &salt, ROUNDS),
                salt,
                roles: roles.into_iter().collect::<RoleSet>(),
                create_time: 100,
            })?;
        }
        tx.create_post(CreatePostParams {
            id: ALICE_POST.to_string(),
            title: String::from("Hello"),
            text: String::from("alice's first post"),
            owner: ALICE.to_string(),
            create_time: 200,
        })
    })
    .unwrap();

    Arc::new(ServerContext::new(cfg, db, SECRET).unwrap())
}

pub fn session(sc: &ServerContext, subject: &str) -> Cookie<'static> {
    let token = sc
        .token_generator
        .generate_token(subject, blog_api::auth::now())
        .unwrap();
    Cookie::new(sc.cfg.session.cookie_name.clone(), token.token)
}
