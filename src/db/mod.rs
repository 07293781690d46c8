mod identity;
mod sql;
mod sqlite;

#[cfg(test)]
mod tests;

pub mod config;
pub mod types;

use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use sqlite::{SqliteConnection, SqliteTransaction};
use types::{
    Connection, CreatePostParams, CreateUserParams, PostQuery, Transaction, UpdatePostParams,
    UpdateUserParams, UserPassword,
};

use crate::types::post::Post;
use crate::types::user::{RoleSet, User};

/// Shared handle to the store. Cloning is cheap, all clones use the same
/// connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<UnionConnection>>,
}

impl Database {
    pub fn new(conn: UnionConnection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn memory() -> Result<Self> {
        let conn = SqliteConnection::memory()?;
        Ok(Self::new(UnionConnection::Sqlite(conn)))
    }

    /// Runs `f` inside a transaction. The transaction is committed when `f`
    /// returns `Ok`, and rolled back otherwise.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn Transaction) -> Result<T>,
    {
        let mut conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(e) => bail!("failed to lock connection: {:#}", e),
        };
        let tx = conn.transaction()?;

        let result = f(&tx);

        if result.is_ok() {
            tx.commit()
        } else {
            tx.rollback()
        }?;

        result
    }

    /// Async form of [`Database::with_transaction`]. The transaction runs on
    /// the blocking pool, so dropping the returned future abandons the wait
    /// without stalling the caller's worker.
    pub async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn Transaction) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_transaction(f))
            .await
            .context("join database task")?
    }
}

pub enum UnionConnection {
    Sqlite(SqliteConnection),
}

pub enum UnionTransaction<'a> {
    Sqlite(SqliteTransaction<'a>),
}

impl<'a> Connection<'a, UnionTransaction<'a>> for UnionConnection {
    fn transaction(&'a mut self) -> Result<UnionTransaction<'a>> {
        match self {
            UnionConnection::Sqlite(conn) => conn.transaction().map(UnionTransaction::Sqlite),
        }
    }
}

impl Transaction for UnionTransaction<'_> {
    fn create_user(&self, params: CreateUserParams) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.create_user(params),
        }
    }

    fn update_user(&self, params: UpdateUserParams) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.update_user(params),
        }
    }

    fn delete_user(&self, id: &str) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.delete_user(id),
        }
    }

    fn has_user(&self, id: &str) -> Result<bool> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.has_user(id),
        }
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.get_user(id),
        }
    }

    fn get_user_id_by_email(&self, email: &str) -> Result<Option<String>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.get_user_id_by_email(email),
        }
    }

    fn get_user_password(&self, email: &str) -> Result<Option<UserPassword>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.get_user_password(email),
        }
    }

    fn get_user_roles(&self, id: &str) -> Result<Option<RoleSet>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.get_user_roles(id),
        }
    }

    fn set_user_roles(&self, id: &str, roles: &RoleSet) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.set_user_roles(id, roles),
        }
    }

    fn create_post(&self, params: CreatePostParams) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.create_post(params),
        }
    }

    fn update_post(&self, params: UpdatePostParams) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.update_post(params),
        }
    }

    fn delete_post(&self, id: &str) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.delete_post(id),
        }
    }

    fn has_post(&self, id: &str) -> Result<bool> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.has_post(id),
        }
    }

    fn get_post(&self, id: &str) -> Result<Option<Post>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.get_post(id),
        }
    }

    fn get_post_owner(&self, id: &str) -> Result<Option<String>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.get_post_owner(id),
        }
    }

    fn list_posts(&self, query: PostQuery) -> Result<Vec<Post>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.list_posts(query),
        }
    }

    fn count_posts(&self) -> Result<u64> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.count_posts(),
        }
    }

    fn commit(self) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.commit(),
        }
    }

    fn rollback(self) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.rollback(),
        }
    }
}
