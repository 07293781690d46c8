use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{expandenv, CommonConfig, PathSet};

use super::sqlite::SqliteConnection;
use super::{Database, UnionConnection};

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct DbConfig {
    /// Use an in-memory sqlite database. Data is lost when the server stops.
    #[serde(default)]
    pub memory: bool,

    /// Path of the sqlite file, default is `blog.db` under the data dir.
    #[serde(default)]
    pub path: String,

    #[serde(skip)]
    db_path: PathBuf,
}

impl CommonConfig for DbConfig {
    fn complete(&mut self, ps: &PathSet) -> Result<()> {
        if self.memory {
            return Ok(());
        }

        self.db_path = if self.path.is_empty() {
            ps.data_dir.join("blog.db")
        } else {
            PathBuf::from(expandenv("db.path", &self.path)?)
        };

        Ok(())
    }
}

impl DbConfig {
    pub fn build(&self) -> Result<Database> {
        let conn = if self.memory {
            warn!("Using in-memory sqlite database, the data will be lost when the server stops");
            SqliteConnection::memory().context("open in-memory sqlite")?
        } else {
            info!("Using sqlite database: {}", self.db_path.display());
            SqliteConnection::open(&self.db_path)
                .with_context(|| format!("open sqlite file {}", self.db_path.display()))?
        };
        Ok(Database::new(UnionConnection::Sqlite(conn)))
    }
}
