use anyhow::Result;

use crate::types::post::Post;
use crate::types::user::{RoleSet, User};

pub trait Connection<'a, T>
where
    T: Transaction + 'a,
{
    fn transaction(&'a mut self) -> Result<T>;
}

/// All database reads and writes go through a transaction. `None` results
/// mean the row does not exist; errors are reserved for backend failures.
pub trait Transaction {
    fn create_user(&self, params: CreateUserParams) -> Result<()>;
    fn update_user(&self, params: UpdateUserParams) -> Result<()>;
    fn delete_user(&self, id: &str) -> Result<()>;
    fn has_user(&self, id: &str) -> Result<bool>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_id_by_email(&self, email: &str) -> Result<Option<String>>;
    fn get_user_password(&self, email: &str) -> Result<Option<UserPassword>>;
    fn get_user_roles(&self, id: &str) -> Result<Option<RoleSet>>;
    fn set_user_roles(&self, id: &str, roles: &RoleSet) -> Result<()>;

    fn create_post(&self, params: CreatePostParams) -> Result<()>;
    fn update_post(&self, params: UpdatePostParams) -> Result<()>;
    fn delete_post(&self, id: &str) -> Result<()>;
    fn has_post(&self, id: &str) -> Result<bool>;
    fn get_post(&self, id: &str) -> Result<Option<Post>>;
    fn get_post_owner(&self, id: &str) -> Result<Option<String>>;
    fn list_posts(&self, query: PostQuery) -> Result<Vec<Post>>;
    fn count_posts(&self) -> Result<u64>;

    fn commit(self) -> Result<()>;
    fn rollback(self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub id: String,
    pub name: String,
    pub email: String,

    /// Salted hash, see [`crate::code::hash_password`].
    pub password: String,
    pub salt: String,

    pub roles: RoleSet,
    pub create_time: u64,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUserParams {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,

    /// New salted hash and its salt, always updated together.
    pub password: Option<(String, String)>,

    pub update_time: u64,
}

#[derive(Debug, Clone)]
pub struct UserPassword {
    pub id: String,
    pub password: String,
    pub salt: String,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub id: String,
    pub title: String,
    pub text: String,
    pub owner: String,
    pub create_time: u64,
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePostParams {
    pub id: String,
    pub title: Option<String>,
    pub text: Option<String>,
    pub update_time: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}
