mod post;
mod user;

use std::path::Path;

use anyhow::Result;
use rusqlite::types::Value as DbValue;
use rusqlite::Connection as RawConnection;
use rusqlite::Transaction as RawTransaction;

use crate::types::post::Post;
use crate::types::user::{RoleSet, User};

use super::sql::Value;
use super::types::{
    Connection, CreatePostParams, CreateUserParams, PostQuery, Transaction, UpdatePostParams,
    UpdateUserParams, UserPassword,
};

/// SQLite-backed store. Supports both file-based and in-memory databases.
pub struct SqliteConnection {
    conn: RawConnection,
}

pub struct SqliteTransaction<'a> {
    tx: RawTransaction<'a>,
}

impl SqliteConnection {
    /// Opens a SQLite database file, creating it and all tables if needed.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = RawConnection::open(path)?;
        Self::init_tables(&conn)?;
        Ok(Self { conn })
    }

    /// In-memory database, content is lost when the process exits.
    pub fn memory() -> Result<Self> {
        let conn = RawConnection::open_in_memory()?;
        Self::init_tables(&conn)?;
        Ok(Self { conn })
    }

    fn init_tables(conn: &RawConnection) -> Result<()> {
        user::create_table(conn)?;
        post::create_table(conn)?;
        Ok(())
    }
}

impl<'a> Connection<'a, SqliteTransaction<'a>> for SqliteConnection {
    fn transaction(&'a mut self) -> Result<SqliteTransaction<'a>> {
        let tx = self.conn.transaction()?;
        Ok(SqliteTransaction { tx })
    }
}

impl Transaction for SqliteTransaction<'_> {
    fn create_user(&self, params: CreateUserParams) -> Result<()> {
        user::create(&self.tx, params)
    }

    fn update_user(&self, params: UpdateUserParams) -> Result<()> {
        user::update(&self.tx, params)
    }

    fn delete_user(&self, id: &str) -> Result<()> {
        user::delete(&self.tx, id)
    }

    fn has_user(&self, id: &str) -> Result<bool> {
        user::has(&self.tx, id)
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        user::get(&self.tx, id)
    }

    fn get_user_id_by_email(&self, email: &str) -> Result<Option<String>> {
        user::get_id_by_email(&self.tx, email)
    }

    fn get_user_password(&self, email: &str) -> Result<Option<UserPassword>> {
        user::get_password(&self.tx, email)
    }

    fn get_user_roles(&self, id: &str) -> Result<Option<RoleSet>> {
        user::get_roles(&self.tx, id)
    }

    fn set_user_roles(&self, id: &str, roles: &RoleSet) -> Result<()> {
        user::set_roles(&self.tx, id, roles)
    }

    fn create_post(&self, params: CreatePostParams) -> Result<()> {
        post::create(&self.tx, params)
    }

    fn update_post(&self, params: UpdatePostParams) -> Result<()> {
        post::update(&self.tx, params)
    }

    fn delete_post(&self, id: &str) -> Result<()> {
        post::delete(&self.tx, id)
    }

    fn has_post(&self, id: &str) -> Result<bool> {
        post::has(&self.tx, id)
    }

    fn get_post(&self, id: &str) -> Result<Option<Post>> {
        post::get(&self.tx, id)
    }

    fn get_post_owner(&self, id: &str) -> Result<Option<String>> {
        post::get_owner(&self.tx, id)
    }

    fn list_posts(&self, query: PostQuery) -> Result<Vec<Post>> {
        post::list(&self.tx, query)
    }

    fn count_posts(&self) -> Result<u64> {
        post::count(&self.tx)
    }

    fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }

    fn rollback(self) -> Result<()> {
        self.tx.rollback()?;
        Ok(())
    }
}

fn convert_values(values: Vec<Value>) -> Vec<DbValue> {
    values
        .into_iter()
        .map(|value| match value {
            Value::Text(text) => DbValue::Text(text),
            Value::Integer(integer) => DbValue::Integer(integer as i64),
        })
        .collect()
}
