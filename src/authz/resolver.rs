use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use thiserror::Error;
use tokio::time::timeout;

use crate::types::user::{RoleSet, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Read access to the identity data guards depend on.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn get_user_by_id(&self, id: &str) -> Result<User, StoreError>;

    async fn get_user_roles(&self, id: &str) -> Result<RoleSet, StoreError>;

    async fn get_post_owner(&self, post_id: &str) -> Result<String, StoreError>;
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("not found")]
    NotFound,

    #[error("lookup timed out")]
    TimedOut,

    #[error("storage failure: {0:#}")]
    Backend(anyhow::Error),
}

/// Answers "who owns this post" and "what roles does this subject hold".
/// Every lookup is bounded by the configured timeout; an expired lookup is
/// dropped, not awaited.
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
    timeout: Duration,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn IdentityStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn subject_exists(&self, id: &str) -> Result<(), LookupError> {
        self.lookup("user", id, self.store.get_user_by_id(id))
            .await
            .map(|_| ())
    }

    pub async fn roles_of(&self, id: &str) -> Result<RoleSet, LookupError> {
        self.lookup("roles", id, self.store.get_user_roles(id)).await
    }

    pub async fn owner_of(&self, post_id: &str) -> Result<String, LookupError> {
        self.lookup("post owner", post_id, self.store.get_post_owner(post_id))
            .await
    }

    async fn lookup<T, F>(&self, kind: &str, key: &str, fut: F) -> Result<T, LookupError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(StoreError::NotFound)) => {
                debug!("Lookup {kind} for '{key}': not found");
                Err(LookupError::NotFound)
            }
            Ok(Err(StoreError::Backend(e))) => {
                error!("Lookup {kind} for '{key}' failed: {e:#}");
                Err(LookupError::Backend(e))
            }
            Err(_) => {
                error!(
                    "Lookup {kind} for '{key}' timed out after {}ms",
                    self.timeout.as_millis()
                );
                Err(LookupError::TimedOut)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use anyhow::anyhow;

    use super::*;
    use crate::types::user::Role;

    /// In-memory store that counts calls and can be told to fail or stall.
    #[derive(Default)]
    pub struct MockStore {
        pub users: Mutex<HashMap<String, RoleSet>>,
        pub posts: Mutex<HashMap<String, String>>,

        pub user_calls: AtomicUsize,
        pub role_calls: AtomicUsize,
        pub owner_calls: AtomicUsize,

        pub fail_users: Mutex<bool>,
        pub fail_roles: Mutex<bool>,
        pub fail_owners: Mutex<bool>,
        pub stall_users: Mutex<Option<Duration>>,
        pub stall_roles: Mutex<Option<Duration>>,
        pub stall_owners: Mutex<Option<Duration>>,
    }

    impl MockStore {
        pub fn add_user(&self, id: &str, roles: &[Role]) {
            let roles = roles.iter().copied().collect();
            self.users.lock().unwrap().insert(id.to_string(), roles);
        }

        pub fn remove_user(&self, id: &str) {
            self.users.lock().unwrap().remove(id);
        }

        pub fn add_post(&self, id: &str, owner: &str) {
            self.posts
                .lock()
                .unwrap()
                .insert(id.to_string(), owner.to_string());
        }

        pub fn calls(&self) -> (usize, usize, usize) {
            (
                self.user_calls.load(Ordering::SeqCst),
                self.role_calls.load(Ordering::SeqCst),
                self.owner_calls.load(Ordering::SeqCst),
            )
        }

        async fn maybe_stall(stall: &Mutex<Option<Duration>>) {
            let stall = *stall.lock().unwrap();
            if let Some(stall) = stall {
                tokio::time::sleep(stall).await;
            }
        }
    }

    #[async_trait]
    impl IdentityStore for MockStore {
        async fn get_user_by_id(&self, id: &str) -> Result<User, StoreError> {
            self.user_calls.fetch_add(1, Ordering::SeqCst);
            Self::maybe_stall(&self.stall_users).await;
            if *self.fail_users.lock().unwrap() {
                return Err(StoreError::Backend(anyhow!("users backend down")));
            }
            let roles = self.users.lock().unwrap().get(id).cloned();
            match roles {
                Some(roles) => Ok(User {
                    id: id.to_string(),
                    name: id.to_string(),
                    email: format!("{id}@example.com"),
                    roles,
                    create_time: 0,
                    update_time: 0,
                }),
                None => Err(StoreError::NotFound),
            }
        }

        async fn get_user_roles(&self, id: &str) -> Result<RoleSet, StoreError> {
            self.role_calls.fetch_add(1, Ordering::SeqCst);
            Self::maybe_stall(&self.stall_roles).await;
            if *self.fail_roles.lock().unwrap() {
                return Err(StoreError::Backend(anyhow!("roles backend down")));
            }
            let roles = self.users.lock().unwrap().get(id).cloned();
            roles.ok_or(StoreError::NotFound)
        }

        async fn get_post_owner(&self, post_id: &str) -> Result<String, StoreError> {
            self.owner_calls.fetch_add(1, Ordering::SeqCst);
            Self::maybe_stall(&self.stall_owners).await;
            if *self.fail_owners.lock().unwrap() {
                return Err(StoreError::Backend(anyhow!("posts backend down")));
            }
            let owner = self.posts.lock().unwrap().get(post_id).cloned();
            owner.ok_or(StoreError::NotFound)
        }
    }

    fn resolver(store: Arc<MockStore>, timeout_ms: u64) -> IdentityResolver {
        IdentityResolver::new(store, Duration::from_millis(timeout_ms))
    }

    #[tokio::test]
    async fn test_lookups() {
        let store = Arc::new(MockStore::default());
        store.add_user("alice", &[Role::User, Role::Admin]);
        store.add_post("p1", "alice");

        let resolver = resolver(store.clone(), 1000);
        assert!(resolver.subject_exists("alice").await.is_ok());
        assert!(resolver.roles_of("alice").await.unwrap().is_admin());
        assert_eq!(resolver.owner_of("p1").await.unwrap(), "alice");

        assert!(matches!(
            resolver.subject_exists("bob").await,
            Err(LookupError::NotFound)
        ));
        assert!(matches!(
            resolver.owner_of("p2").await,
            Err(LookupError::NotFound)
        ));
        assert_eq!(store.calls(), (2, 1, 2));
    }

    #[tokio::test]
    async fn test_backend_failure() {
        let store = Arc::new(MockStore::default());
        store.add_user("alice", &[Role::User]);
        *store.fail_roles.lock().unwrap() = true;

        let resolver = resolver(store, 1000);
        assert!(matches!(
            resolver.roles_of("alice").await,
            Err(LookupError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout() {
        let store = Arc::new(MockStore::default());
        store.add_user("alice", &[Role::User]);
        *store.stall_users.lock().unwrap() = Some(Duration::from_secs(30));

        let resolver = resolver(store, 20);
        assert!(matches!(
            resolver.subject_exists("alice").await,
            Err(LookupError::TimedOut)
        ));
    }
}
