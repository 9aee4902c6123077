//! # Mock Authentication
//!
//! Password-less "accounts": the user id is derived from the username, so
//! logging in twice with the same name lands in the same library. Nothing
//! here is a security boundary.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::core::store::{CURRENT_USER_KEY, Store, StoreError, USERS_KEY};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
}

impl User {
    /// Deterministic id derivation: `user_<username>`.
    pub fn from_username(username: &str) -> Self {
        Self {
            id: format!("user_{username}"),
            username: username.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum AuthError {
    EmptyUsername,
    Store(StoreError),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::EmptyUsername => write!(f, "username must not be empty"),
            AuthError::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        AuthError::Store(e)
    }
}

/// All known user records.
pub(crate) fn registered_users(store: &Store) -> Result<Vec<User>, StoreError> {
    store.read_or_default(USERS_KEY)
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<Store>,
    latency: Duration,
}

impl AuthService {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            latency: Duration::ZERO,
        }
    }

    /// Adds an artificial delay before each async operation.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Logs in as `username`, creating the user record on first use.
    pub async fn login(&self, username: &str) -> Result<User, AuthError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::EmptyUsername);
        }
        simulate_latency(self.latency).await;

        let user = User::from_username(username);
        self.store.update(USERS_KEY, |users: &mut Vec<User>| {
            if !users.iter().any(|u| u.id == user.id) {
                users.push(user.clone());
            }
        })?;
        self.store.write(CURRENT_USER_KEY, &user)?;

        info!("Logged in as {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Clears the current-user pointer. The user record is kept.
    pub async fn logout(&self) -> Result<(), AuthError> {
        simulate_latency(self.latency).await;
        self.store.remove(CURRENT_USER_KEY)?;
        info!("Logged out");
        Ok(())
    }

    pub fn current_user(&self) -> Result<Option<User>, AuthError> {
        let user: Option<User> = self.store.read(CURRENT_USER_KEY)?;
        debug!("Current user: {:?}", user.as_ref().map(|u| &u.id));
        Ok(user)
    }
}

/// Sleeps for `latency` unless it is zero.
pub(crate) async fn simulate_latency(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}
