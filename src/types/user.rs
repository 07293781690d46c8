use std::collections::BTreeSet;
use std::fmt::{self, Display};
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::{check_email, check_len, check_password};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => bail!("unknown role '{s}'"),
        }
    }
}

/// The set of roles granted to a user. Membership checks go through
/// [`RoleSet::contains`], never through string comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.contains(Role::Admin)
    }

    pub fn insert(&mut self, role: Role) -> bool {
        self.0.insert(role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Public view of a user. Password hash and salt never leave the database
/// layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub roles: RoleSet,
    pub create_time: u64,
    pub update_time: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PutUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl PutUserRequest {
    pub fn validate(&self) -> Result<()> {
        check_len("name", &self.name, 3, 20)?;
        check_email(&self.email)?;
        check_password(&self.password)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatchUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub roles: Option<RoleSet>,
}

impl PatchUserRequest {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.roles.is_none()
        {
            bail!("nothing to update");
        }
        if let Some(name) = self.name.as_ref() {
            check_len("name", name, 3, 20)?;
        }
        if let Some(email) = self.email.as_ref() {
            check_email(email)?;
        }
        if let Some(password) = self.password.as_ref() {
            check_password(password)?;
        }
        if let Some(roles) = self.roles.as_ref() {
            if roles.is_empty() {
                bail!("roles cannot be empty");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub id: String,
    pub expires_at: u64,
}
