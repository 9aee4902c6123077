//! # Script Library
//!
//! Saved code snippets, one flat collection under the `scripts` key,
//! newest first. Items are immutable: there is save, list and delete, no edit.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::core::auth::{User, registered_users, simulate_latency};
use crate::core::store::{SCRIPTS_KEY, Store, StoreError};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScriptItem {
    pub id: String,
    pub title: String,
    pub code: String,
    /// Unix milliseconds.
    pub created_at: i64,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl ScriptItem {
    pub fn line_count(&self) -> usize {
        self.code.lines().count()
    }
}

#[derive(Debug)]
pub enum LibraryError {
    /// The acting user has no record in the users collection.
    UnknownUser(String),
    /// The script belongs to someone else.
    NotOwner { script_id: String },
    Store(StoreError),
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::UnknownUser(id) => write!(f, "unknown user: {id}"),
            LibraryError::NotOwner { script_id } => {
                write!(f, "script {script_id} belongs to another user")
            }
            LibraryError::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LibraryError {}

impl From<StoreError> for LibraryError {
    fn from(e: StoreError) -> Self {
        LibraryError::Store(e)
    }
}

#[derive(Clone)]
pub struct ScriptLibrary {
    store: Arc<Store>,
    latency: Duration,
}

impl ScriptLibrary {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Saves a snippet for `user` and puts it at the front of the collection.
    pub async fn save(&self, user: &User, title: &str, code: &str) -> Result<ScriptItem, LibraryError> {
        simulate_latency(self.latency).await;

        if !registered_users(&self.store)?.iter().any(|u| u.id == user.id) {
            warn!("Refusing to save script for unknown user {}", user.id);
            return Err(LibraryError::UnknownUser(user.id.clone()));
        }

        let item = ScriptItem {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            code: code.to_string(),
            created_at: Utc::now().timestamp_millis(),
            user_id: user.id.clone(),
            tags: None,
        };

        self.store
            .update(SCRIPTS_KEY, |scripts: &mut Vec<ScriptItem>| {
                scripts.insert(0, item.clone());
            })?;

        info!("Saved script {} \"{}\" for {}", item.id, item.title, user.id);
        Ok(item)
    }

    /// All scripts owned by `user_id`, most recent first.
    pub async fn list(&self, user_id: &str) -> Result<Vec<ScriptItem>, LibraryError> {
        simulate_latency(self.latency).await;
        let scripts: Vec<ScriptItem> = self.store.read_or_default(SCRIPTS_KEY)?;
        Ok(scripts
            .into_iter()
            .filter(|s| s.user_id == user_id)
            .collect())
    }

    /// Removes a script by id regardless of owner. Unknown ids are a no-op.
    pub async fn delete(&self, id: &str) -> Result<(), LibraryError> {
        simulate_latency(self.latency).await;
        self.store
            .update(SCRIPTS_KEY, |scripts: &mut Vec<ScriptItem>| {
                scripts.retain(|s| s.id != id);
            })?;
        info!("Deleted script {id}");
        Ok(())
    }

    /// Removes a script only if `user` owns it.
    ///
    /// Returns `Ok(false)` when no script has that id.
    pub async fn delete_owned(&self, user: &User, id: &str) -> Result<bool, LibraryError> {
        simulate_latency(self.latency).await;
        let outcome = self
            .store
            .update(SCRIPTS_KEY, |scripts: &mut Vec<ScriptItem>| {
                match scripts.iter().position(|s| s.id == id) {
                    None => Ok(false),
                    Some(idx) if scripts[idx].user_id != user.id => {
                        Err(LibraryError::NotOwner {
                            script_id: id.to_string(),
                        })
                    }
                    Some(idx) => {
                        scripts.remove(idx);
                        Ok(true)
                    }
                }
            })??;
        if outcome {
            info!("Deleted script {id} owned by {}", user.id);
        }
        Ok(outcome)
    }
}
