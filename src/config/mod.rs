pub mod server;

use std::path::{Path, PathBuf};
use std::{env, fs, io};

use anyhow::{bail, Context, Result};
use clap::Args;
use log::warn;
use serde::de::DeserializeOwned;

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// The config directory, default is `~/.config/blog-api`, or `/etc/blog-api`
    /// when running as root.
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// The data directory, default is `~/.local/share/blog-api`, or
    /// `/var/lib/blog-api` when running as root.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn build_path_set(&self) -> Result<PathSet> {
        PathSet::new(self.config_dir.clone(), self.data_dir.clone())
    }

    pub fn load<T>(&self, name: &str) -> Result<T>
    where
        T: CommonConfig + DeserializeOwned + Default,
    {
        let ps = self.build_path_set()?;
        ps.load_config(name, T::default)
    }
}

pub struct PathSet {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub pki_dir: PathBuf,
}

impl PathSet {
    pub fn new(config_dir: Option<PathBuf>, data_dir: Option<PathBuf>) -> Result<Self> {
        let is_root = unsafe { libc::geteuid() == 0 };

        let config_dir = if let Some(path) = config_dir {
            path
        } else if let Ok(path) = env::var("BLOG_API_CONFIG") {
            PathBuf::from(path)
        } else if is_root {
            PathBuf::from("/etc/blog-api")
        } else {
            Self::home_dir()?.join(".config").join("blog-api")
        };

        let data_dir = if let Some(path) = data_dir {
            path
        } else if let Ok(path) = env::var("BLOG_API_DATA") {
            PathBuf::from(path)
        } else if is_root {
            PathBuf::from("/var/lib/blog-api")
        } else {
            Self::home_dir()?
                .join(".local")
                .join("share")
                .join("blog-api")
        };

        let pki_dir = config_dir.join("pki");

        ensure_dir_exists(&config_dir)
            .with_context(|| format!("ensure config directory: {}", config_dir.display()))?;
        ensure_dir_exists(&data_dir)
            .with_context(|| format!("ensure data directory: {}", data_dir.display()))?;
        ensure_dir_exists(&pki_dir)
            .with_context(|| format!("ensure pki directory: {}", pki_dir.display()))?;

        Ok(Self {
            config_dir,
            data_dir,
            pki_dir,
        })
    }

    pub fn load_config<T, F>(&self, name: &str, default_func: F) -> Result<T>
    where
        T: CommonConfig + DeserializeOwned,
        F: FnOnce() -> T,
    {
        let path = self.config_dir.join(format!("{name}.toml"));
        let mut cfg: T = match fs::read_to_string(&path) {
            Ok(s) => toml::from_str(&s).context("parse config toml")?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!("Config file for {name} not found, using defaults");
                default_func()
            }
            Err(err) => {
                return Err(err).context(format!("read config file: {}", path.display()));
            }
        };

        cfg.complete(self).context("validate config")?;
        Ok(cfg)
    }

    fn home_dir() -> Result<PathBuf> {
        let dir = env::var_os("HOME")
            .or_else(|| env::var_os("USERPROFILE"))
            .map(PathBuf::from);
        match dir {
            Some(dir) => Ok(dir),
            None => {
                bail!("could not determine home directory, please specify config dir manually")
            }
        }
    }
}

pub trait CommonConfig {
    fn complete(&mut self, ps: &PathSet) -> Result<()>;
}

pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// See: [`shellexpand::full`].
pub fn expandenv(name: &str, s: impl AsRef<str>) -> Result<String> {
    let s =
        shellexpand::full(s.as_ref()).with_context(|| format!("expand env value for '{name}'"))?;
    Ok(s.to_string())
}
