//! In-memory user directory.
//!
//! Owns every user record and the generation of user identifiers. All access
//! goes through a single `RwLock`; registration checks the username and inserts
//! inside one write guard, so two concurrent registrations of the same name
//! cannot both succeed.

use crate::core::wire::ID_FIELD_SIZE;
use crate::error::{constants, ProtocolError, Result};
use rand::distr::Alphanumeric;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: String,
    pub username: String,
    /// Opaque bytes, stored but never interpreted
    pub public_key: Option<Vec<u8>>,
}

/// The part of a user record that goes into a user listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Default)]
struct DirectoryInner {
    users: HashMap<String, User>,
    /// Registration order, used for listings
    order: Vec<String>,
    usernames: HashSet<String>,
}

/// Registry of users keyed by their server-generated identifier
#[derive(Debug, Default)]
pub struct UserDirectory {
    inner: RwLock<DirectoryInner>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    // Mutations are single inserts/removes, so a poisoned guard still holds consistent maps.
    fn read(&self) -> RwLockReadGuard<'_, DirectoryInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DirectoryInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `username` and return its freshly generated identifier.
    ///
    /// Fails with [`ProtocolError::UsernameTaken`] when the name is already
    /// registered (case-sensitive), and with [`ProtocolError::Validation`] for an
    /// empty name. A failed registration leaves the directory untouched.
    pub fn register(&self, username: &str, public_key: Option<Vec<u8>>) -> Result<String> {
        if username.is_empty() {
            return Err(ProtocolError::Validation(
                constants::ERR_MISSING_USERNAME.to_string(),
            ));
        }

        let mut inner = self.write();
        if inner.usernames.contains(username) {
            warn!(username, "Registration rejected: username already exists");
            return Err(ProtocolError::UsernameTaken(username.to_string()));
        }

        let user_id = loop {
            let candidate = generate_user_id();
            if !inner.users.contains_key(&candidate) {
                break candidate;
            }
            debug!("User id collision, regenerating");
        };

        inner.usernames.insert(username.to_string());
        inner.order.push(user_id.clone());
        inner.users.insert(
            user_id.clone(),
            User {
                user_id: user_id.clone(),
                username: username.to_string(),
                public_key,
            },
        );

        info!(username, user_id = %user_id, "User registered");
        Ok(user_id)
    }

    /// Every user except `requester_id`, in registration order.
    pub fn list_excluding(&self, requester_id: &str) -> Vec<UserSummary> {
        let inner = self.read();
        inner
            .order
            .iter()
            .filter(|id| id.as_str() != requester_id)
            .filter_map(|id| inner.users.get(id))
            .map(|user| UserSummary {
                user_id: user.user_id.clone(),
                username: user.username.clone(),
            })
            .collect()
    }

    pub fn find_by_id(&self, user_id: &str) -> Result<User> {
        self.read()
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| ProtocolError::UserNotFound(user_id.to_string()))
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.read().users.contains_key(user_id)
    }

    pub fn username_taken(&self, username: &str) -> bool {
        self.read().usernames.contains(username)
    }

    /// Administrative removal. No request code reaches this.
    pub fn remove(&self, user_id: &str) -> Option<User> {
        let mut inner = self.write();
        let user = inner.users.remove(user_id)?;
        inner.usernames.remove(&user.username);
        inner.order.retain(|id| id != user_id);
        info!(user_id, username = %user.username, "User removed");
        Some(user)
    }

    pub fn clear(&self) {
        let mut inner = self.write();
        let removed = inner.users.len();
        *inner = DirectoryInner::default();
        info!(removed, "Directory cleared");
    }

    pub fn len(&self) -> usize {
        self.read().users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every record in registration order
    pub fn snapshot(&self) -> Vec<User> {
        let inner = self.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.users.get(id).cloned())
            .collect()
    }
}

/// Sixteen random ASCII alphanumerics: fills the id field exactly, never contains NUL.
fn generate_user_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_FIELD_SIZE)
        .map(char::from)
        .collect()
}
