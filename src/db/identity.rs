use async_trait::async_trait;

use crate::authz::resolver::{IdentityStore, StoreError};
use crate::types::user::{RoleSet, User};

use super::Database;

#[async_trait]
impl IdentityStore for Database {
    async fn get_user_by_id(&self, id: &str) -> Result<User, StoreError> {
        let id = id.to_string();
        let user = self.run(move |tx| tx.get_user(&id)).await?;
        user.ok_or(StoreError::NotFound)
    }

    async fn get_user_roles(&self, id: &str) -> Result<RoleSet, StoreError> {
        let id = id.to_string();
        let roles = self.run(move |tx| tx.get_user_roles(&id)).await?;
        roles.ok_or(StoreError::NotFound)
    }

    async fn get_post_owner(&self, post_id: &str) -> Result<String, StoreError> {
        let post_id = post_id.to_string();
        let owner = self.run(move |tx| tx.get_post_owner(&post_id)).await?;
        owner.ok_or(StoreError::NotFound)
    }
}
