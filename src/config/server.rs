use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use openssl::ssl::{SslAcceptor, SslAcceptorBuilder, SslFiletype, SslMethod};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::context::ServerContext;
use crate::db::config::DbConfig;
use crate::logs;
use crate::restful::RestfulServer;

use super::{expandenv, CommonConfig, PathSet};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_bind")]
    pub bind: String,

    #[serde(default)]
    pub ssl: bool,

    /// Reported by the status endpoint, e.g. `development` or `production`.
    #[serde(default = "ServerConfig::default_environment")]
    pub environment: String,

    #[serde(default = "ServerConfig::default_log_level")]
    pub log_level: String,

    #[serde(default = "ServerConfig::default_salt_length")]
    pub salt_length: usize,

    /// PBKDF2 rounds for newly stored password hashes.
    #[serde(default = "ServerConfig::default_password_rounds")]
    pub password_rounds: u32,

    /// Browser origins allowed to call the API with credentials. An entry
    /// ending in `*` matches by prefix, e.g. `https://*`.
    #[serde(default = "ServerConfig::default_cors_allowed_origins")]
    pub cors_allowed_origins: Vec<String>,

    pub keep_alive_secs: Option<u64>,

    pub workers: Option<u64>,

    pub payload_limit_mib: Option<u64>,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub guard: GuardConfig,

    #[serde(default)]
    pub db: DbConfig,

    #[serde(skip)]
    pki_dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "SessionConfig::default_cookie_name")]
    pub cookie_name: String,

    /// HMAC secret for session tokens, supports `${ENV}` expansion. When
    /// empty, a random secret is generated once and kept in the pki dir.
    #[serde(default, skip_serializing)]
    pub secret: String,

    #[serde(default = "SessionConfig::default_ttl_secs")]
    pub ttl_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GuardConfig {
    /// Upper bound for every identity lookup a guard performs.
    #[serde(default = "GuardConfig::default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: Self::default_bind(),
            ssl: false,
            environment: Self::default_environment(),
            log_level: Self::default_log_level(),
            salt_length: Self::default_salt_length(),
            password_rounds: Self::default_password_rounds(),
            cors_allowed_origins: Self::default_cors_allowed_origins(),
            keep_alive_secs: None,
            workers: None,
            payload_limit_mib: None,
            session: SessionConfig::default(),
            guard: GuardConfig::default(),
            db: DbConfig::default(),
            pki_dir: PathBuf::new(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: Self::default_cookie_name(),
            secret: String::new(),
            ttl_secs: Self::default_ttl_secs(),
        }
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: Self::default_lookup_timeout_ms(),
        }
    }
}

impl CommonConfig for ServerConfig {
    fn complete(&mut self, ps: &PathSet) -> Result<()> {
        self.bind = expandenv("bind", &self.bind)?;
        if self.bind.is_empty() {
            bail!("bind is required");
        }

        if self.environment.is_empty() {
            bail!("environment is required");
        }

        logs::parse_level(&self.log_level).context("log_level")?;

        if self.salt_length < Self::MIN_SALT_LENGTH || self.salt_length > Self::MAX_SALT_LENGTH {
            bail!(
                "salt_length must be in range [{}, {}]",
                Self::MIN_SALT_LENGTH,
                Self::MAX_SALT_LENGTH
            );
        }

        if self.password_rounds < Self::MIN_PASSWORD_ROUNDS {
            bail!(
                "password_rounds must be at least {}",
                Self::MIN_PASSWORD_ROUNDS
            );
        }

        for origin in self.cors_allowed_origins.iter() {
            if origin.is_empty() || origin.chars().any(char::is_whitespace) {
                bail!("invalid cors origin {origin:?}");
            }
        }
        if self.cors_allowed_origins.is_empty() {
            warn!("No cors origin allowed, browsers on other origins cannot call the API");
        }

        if let Some(keep_alive_secs) = self.keep_alive_secs {
            if keep_alive_secs == 0 {
                bail!("keep_alive_secs must be greater than 0");
            }
        }

        if let Some(workers) = self.workers {
            if workers == 0 {
                bail!("workers must be greater than 0");
            }
        }

        if let Some(payload_limit_mib) = self.payload_limit_mib {
            if payload_limit_mib == 0 {
                bail!("payload_limit_mib must be greater than 0");
            }
        }

        self.session.complete(ps).context("session")?;
        self.guard.complete(ps).context("guard")?;
        self.db.complete(ps).context("db")?;

        self.pki_dir = ps.pki_dir.clone();

        Ok(())
    }
}

impl CommonConfig for SessionConfig {
    fn complete(&mut self, _ps: &PathSet) -> Result<()> {
        if self.cookie_name.is_empty() {
            bail!("cookie_name is required");
        }
        if !self
            .cookie_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            bail!("cookie_name may only contain ascii letters, digits, '-' and '_'");
        }

        self.secret = expandenv("secret", &self.secret)?;
        if !self.secret.is_empty() && self.secret.len() < Self::MIN_SECRET_LENGTH {
            warn!(
                "Session secret is shorter than {} bytes, consider a longer one",
                Self::MIN_SECRET_LENGTH
            );
        }

        if self.ttl_secs < Self::MIN_TTL_SECS || self.ttl_secs > Self::MAX_TTL_SECS {
            bail!(
                "ttl_secs must be in range [{}, {}]",
                Self::MIN_TTL_SECS,
                Self::MAX_TTL_SECS
            );
        }

        Ok(())
    }
}

impl CommonConfig for GuardConfig {
    fn complete(&mut self, _ps: &PathSet) -> Result<()> {
        if self.lookup_timeout_ms < Self::MIN_LOOKUP_TIMEOUT_MS
            || self.lookup_timeout_ms > Self::MAX_LOOKUP_TIMEOUT_MS
        {
            bail!(
                "lookup_timeout_ms must be in range [{}, {}]",
                Self::MIN_LOOKUP_TIMEOUT_MS,
                Self::MAX_LOOKUP_TIMEOUT_MS
            );
        }
        Ok(())
    }
}

impl ServerConfig {
    const MIN_SALT_LENGTH: usize = 8;
    const MAX_SALT_LENGTH: usize = 100;

    const MIN_PASSWORD_ROUNDS: u32 = 1000;

    pub fn build_ctx(&self) -> Result<Arc<ServerContext>> {
        let db = self.db.build().context("init database")?;
        let secret = self.read_session_secret()?;
        let ctx = ServerContext::new(self.clone(), db, &secret)?;
        Ok(Arc::new(ctx))
    }

    pub fn build_restful_server(&self, ctx: Arc<ServerContext>) -> Result<RestfulServer> {
        let mut srv = RestfulServer::new(self.bind.clone(), ctx);
        if self.ssl {
            let ssl = self.build_ssl()?;
            srv.set_ssl(ssl);
        }

        if let Some(keep_alive_secs) = self.keep_alive_secs {
            srv.set_keep_alive_secs(keep_alive_secs);
        }

        if let Some(workers) = self.workers {
            srv.set_workers(workers);
        }

        if let Some(payload_limit_mib) = self.payload_limit_mib {
            srv.set_payload_limit_mib(payload_limit_mib);
        }

        Ok(srv)
    }

    fn read_session_secret(&self) -> Result<Vec<u8>> {
        if !self.session.secret.is_empty() {
            return Ok(self.session.secret.clone().into_bytes());
        }

        let path = self.pki_dir.join("session.secret");
        if path.exists() {
            let secret = fs::read_to_string(&path).context("read session secret")?;
            let secret = secret.trim();
            if secret.is_empty() {
                bail!("session secret file {} is empty", path.display());
            }
            return Ok(secret.as_bytes().to_vec());
        }

        warn!("No session secret configured, generating a new one");
        let mut bytes = [0_u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let secret = hex::encode(bytes);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(&path)
            .context("create session secret file")?;
        file.write_all(secret.as_bytes())
            .context("write session secret")?;
        info!("Session secret saved to {}", path.display());

        Ok(secret.into_bytes())
    }

    fn build_ssl(&self) -> Result<SslAcceptorBuilder> {
        let key_path = self.pki_dir.join("key.pem");
        if !key_path.exists() {
            bail!("ssl key file not exists: {:?}", key_path);
        }

        let cert_path = self.pki_dir.join("cert.pem");
        if !cert_path.exists() {
            bail!("ssl cert file not exists: {:?}", cert_path);
        }

        let mut builder =
            SslAcceptor::mozilla_intermediate(SslMethod::tls()).context("init ssl acceptor")?;

        builder
            .set_private_key_file(&key_path, SslFiletype::PEM)
            .context("load ssl key file")?;
        builder
            .set_certificate_chain_file(&cert_path)
            .context("load ssl cert file")?;

        Ok(builder)
    }

    fn default_bind() -> String {
        String::from("127.0.0.1:4000")
    }

    fn default_environment() -> String {
        String::from("development")
    }

    fn default_log_level() -> String {
        String::from("info")
    }

    fn default_salt_length() -> usize {
        24
    }

    fn default_password_rounds() -> u32 {
        100_000
    }

    fn default_cors_allowed_origins() -> Vec<String> {
        vec![String::from("http://*"), String::from("https://*")]
    }
}

impl SessionConfig {
    const MIN_SECRET_LENGTH: usize = 16;

    const MIN_TTL_SECS: u64 = 60;
    const MAX_TTL_SECS: u64 = 60 * 60 * 24 * 365;

    fn default_cookie_name() -> String {
        String::from("blog-api-session")
    }

    fn default_ttl_secs() -> u64 {
        60 * 60 * 24
    }
}

impl GuardConfig {
    const MIN_LOOKUP_TIMEOUT_MS: u64 = 10;
    const MAX_LOOKUP_TIMEOUT_MS: u64 = 60 * 1000;

    fn default_lookup_timeout_ms() -> u64 {
        3000
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    #[test]
    fn test_parse() {
        let toml = r#"
            bind = "0.0.0.0:8080"
            environment = "production"

            [session]
            cookie_name = "sid"
            secret = "0123456789abcdef0123"
            ttl_secs = 3600

            [guard]
            lookup_timeout_ms = 500

            [db]
            memory = true
        "#;
        let cfg: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.bind, "0.0.0.0:8080");
        assert_eq!(cfg.environment, "production");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.session.cookie_name, "sid");
        assert_eq!(cfg.session.ttl_secs, 3600);
        assert_eq!(cfg.guard.lookup_timeout_ms, 500);
        assert!(cfg.db.memory);
    }

    #[test]
    fn test_defaults() {
        let cfg: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.bind, "127.0.0.1:4000");
        assert_eq!(cfg.session.cookie_name, "blog-api-session");
        assert_eq!(cfg.session.ttl_secs, 86400);
        assert_eq!(cfg.guard.lookup_timeout_ms, 3000);
        assert!(cfg.session.secret.is_empty());
        assert_eq!(cfg.password_rounds, 100_000);
        assert_eq!(cfg.cors_allowed_origins, vec!["http://*", "https://*"]);
    }

    #[test]
    fn test_complete_rejects_bad_values() {
        let dir = std::env::temp_dir().join(format!("blog-api-config-{}", std::process::id()));
        let ps = PathSet::new(Some(dir.join("config")), Some(dir.join("data"))).unwrap();

        let mut cfg = ServerConfig::default();
        assert!(cfg.complete(&ps).is_ok());

        let mut cfg = ServerConfig::default();
        cfg.guard.lookup_timeout_ms = 0;
        assert!(cfg.complete(&ps).is_err());

        let mut cfg = ServerConfig::default();
        cfg.session.cookie_name = String::from("bad name;");
        assert!(cfg.complete(&ps).is_err());

        let mut cfg = ServerConfig::default();
        cfg.log_level = String::from("loud");
        assert!(cfg.complete(&ps).is_err());

        let mut cfg = ServerConfig::default();
        cfg.password_rounds = 10;
        assert!(cfg.complete(&ps).is_err());

        let mut cfg = ServerConfig::default();
        cfg.cors_allowed_origins = vec![String::from("https://a.example.com b")];
        assert!(cfg.complete(&ps).is_err());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_secret_not_printed() {
        let toml = r#"
            [session]
            secret = "0123456789abcdef0123"
        "#;
        let cfg: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.session.secret, "0123456789abcdef0123");

        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("0123456789abcdef0123"));
        assert!(!json.contains("\"secret\""));
    }

    #[test]
    fn test_generated_secret_is_kept() {
        let dir = std::env::temp_dir().join(format!("blog-api-secret-{}", std::process::id()));
        let ps = PathSet::new(Some(dir.join("config")), Some(dir.join("data"))).unwrap();

        let mut cfg = ServerConfig::default();
        cfg.complete(&ps).unwrap();

        let first = cfg.read_session_secret().unwrap();
        let second = cfg.read_session_secret().unwrap();
        assert_eq!(first.len(), 64);
        assert_eq!(first, second);

        let meta = fs::metadata(ps.pki_dir.join("session.secret")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);

        let _ = fs::remove_dir_all(&dir);
    }
}
