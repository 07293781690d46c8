pub mod auth;
pub mod authz;
pub mod code;
pub mod config;
pub mod context;
pub mod db;
pub mod handlers;
pub mod logs;
pub mod restful;
pub mod types;
