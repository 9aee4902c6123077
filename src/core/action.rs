//! # Actions
//!
//! Everything that can happen in Water becomes an `Action`.
//! User presses Enter? That's `Action::Submit(text)`.
//! The model streams text? That's `Action::ResponseChunk { .. }`.
//!
//! The `update()` function takes the current state and an action, mutates
//! the state and returns an [`Effect`] describing the I/O the adapter
//! should start. No side effects here.
//!
//! ```text
//! State + Action  →  update()  →  New State + Effect
//! ```

use chrono::NaiveTime;
use log::{debug, info, warn};

use crate::core::auth::User;
use crate::core::library::ScriptItem;
use crate::core::state::{App, View};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate(View),

    // Chat
    Submit(String),
    ClearChat,
    CancelGeneration,
    /// Streamed text for the turn started at `generation`.
    ResponseChunk { generation: u64, text: String },
    ResponseDone { generation: u64 },
    ResponseFailed { generation: u64, error: String },

    // Auth
    Login(String),
    LoginFinished(Result<User, String>),
    Logout,

    // Library
    /// Save every code block of one reply, stamped with the local time.
    SaveCode { blocks: Vec<String>, at: NaiveTime },
    /// Put the code blocks of one reply on the system clipboard.
    CopyCode(Vec<String>),
    /// Number of blocks copied, or why the clipboard refused them.
    CodeCopied(Result<usize, String>),
    ScriptSaved(Result<ScriptItem, String>),
    ReloadLibrary,
    LibraryLoaded {
        user_id: String,
        result: Result<Vec<ScriptItem>, String>,
    },
    EditScript(ScriptItem),
    DeleteScript(String),
    ScriptDeleted(Result<String, String>),

    /// A background storage call failed outside any other flow.
    StorageFailed(String),
    Quit,
}

/// I/O the adapter performs after an update.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    Quit,
    /// Send the chat context to the model.
    SpawnRequest,
    Login(String),
    Logout,
    /// `(title, code)` pairs saved in order for `user`.
    SaveScripts { user: User, items: Vec<(String, String)> },
    LoadLibrary(String),
    DeleteScript { user: User, id: String },
    /// `(text, block count)` for the clipboard.
    CopyToClipboard { text: String, blocks: usize },
}

pub fn update(app: &mut App, action: Action) -> Effect {
    match action {
        Action::Navigate(view) => navigate(app, view),

        Action::Submit(text) => {
            if app.chat.send(&text) {
                app.status_message = String::from("Generating...");
                Effect::SpawnRequest
            } else {
                Effect::None
            }
        }
        Action::ClearChat => {
            app.chat.reset();
            app.status_message = String::from("Chat cleared");
            Effect::None
        }
        Action::CancelGeneration => {
            if app.chat.is_waiting() {
                app.chat.interrupt();
                app.status_message = String::from("Generation cancelled");
            }
            Effect::None
        }
        Action::ResponseChunk { generation, text } => {
            if is_current(app, generation) {
                app.chat.receive(&text);
            } else {
                debug!("Dropping stale chunk from generation {generation}");
            }
            Effect::None
        }
        Action::ResponseDone { generation } => {
            if is_current(app, generation) {
                app.chat.finish();
                app.status_message = String::from("Ready");
            }
            Effect::None
        }
        Action::ResponseFailed { generation, error } => {
            if is_current(app, generation) {
                warn!("Model request failed: {error}");
                app.chat.fail(&error);
                app.status_message = format!("Request failed: {error}");
            }
            Effect::None
        }

        Action::Login(username) => {
            let username = username.trim();
            if username.is_empty() {
                app.status_message = String::from("Enter a username");
                return Effect::None;
            }
            if app.login_pending {
                return Effect::None;
            }
            app.login_pending = true;
            app.status_message = String::from("Logging in...");
            Effect::Login(username.to_string())
        }
        Action::LoginFinished(result) => {
            app.login_pending = false;
            match result {
                Ok(user) => {
                    app.status_message = format!("Logged in as {}", user.username);
                    app.user = Some(user);
                    app.view = View::Generator;
                }
                Err(e) => {
                    warn!("Login failed: {e}");
                    app.status_message = format!("Login failed: {e}");
                }
            }
            Effect::None
        }
        Action::Logout => {
            if app.user.take().is_none() {
                return Effect::None;
            }
            app.scripts.clear();
            app.library_loading = false;
            app.view = View::Home;
            app.status_message = String::from("Logged out");
            Effect::Logout
        }

        Action::SaveCode { blocks, at } => save_code(app, blocks, at),
        Action::CopyCode(blocks) => {
            if blocks.is_empty() {
                app.status_message = String::from("No code block in this message");
                return Effect::None;
            }
            Effect::CopyToClipboard {
                blocks: blocks.len(),
                text: blocks.join("\n\n"),
            }
        }
        Action::CodeCopied(result) => {
            match result {
                Ok(1) => app.status_message = String::from("Code copied to clipboard"),
                Ok(n) => app.status_message = format!("{n} code blocks copied to clipboard"),
                Err(e) => {
                    warn!("Clipboard copy failed: {e}");
                    app.status_message = format!("Copy failed: {e}");
                }
            }
            Effect::None
        }
        Action::ScriptSaved(result) => {
            match result {
                Ok(item) => {
                    app.status_message = format!("Saved \"{}\"", item.title);
                    if app.user.as_ref().is_some_and(|u| u.id == item.user_id) {
                        app.scripts.insert(0, item);
                    }
                }
                Err(e) => app.status_message = format!("Save failed: {e}"),
            }
            Effect::None
        }
        Action::ReloadLibrary => load_library(app),
        Action::LibraryLoaded { user_id, result } => {
            if app.user.as_ref().map(|u| u.id.as_str()) != Some(user_id.as_str()) {
                debug!("Ignoring library listing for {user_id}");
                return Effect::None;
            }
            app.library_loading = false;
            match result {
                Ok(scripts) => {
                    app.status_message = format!("{} saved scripts", scripts.len());
                    app.scripts = scripts;
                }
                Err(e) => app.status_message = format!("Could not load library: {e}"),
            }
            Effect::None
        }
        Action::EditScript(script) => {
            info!("Editing script {} \"{}\"", script.id, script.title);
            app.chat.start_with_script(&script);
            app.active_script = Some(script);
            app.view = View::Generator;
            app.status_message = String::from("Generating...");
            Effect::SpawnRequest
        }
        Action::DeleteScript(id) => match app.user.clone() {
            Some(user) => Effect::DeleteScript { user, id },
            None => Effect::None,
        },
        Action::ScriptDeleted(result) => match result {
            Ok(id) => {
                if app.active_script.as_ref().is_some_and(|s| s.id == id) {
                    app.active_script = None;
                }
                app.status_message = String::from("Script deleted");
                load_library(app)
            }
            Err(e) => {
                app.status_message = format!("Delete failed: {e}");
                Effect::None
            }
        },

        Action::StorageFailed(e) => {
            app.status_message = format!("Storage error: {e}");
            Effect::None
        }
        Action::Quit => Effect::Quit,
    }
}

fn is_current(app: &App, generation: u64) -> bool {
    app.chat.is_waiting() && app.chat.generation() == generation
}

fn navigate(app: &mut App, view: View) -> Effect {
    match view {
        View::Generator => {
            if app.view != View::Generator {
                app.active_script = None;
                app.chat.start_fresh();
            }
            app.view = View::Generator;
            Effect::None
        }
        View::Library => {
            if app.user.is_none() {
                app.view = View::Login;
                app.status_message = String::from("Log in to see your library");
                return Effect::None;
            }
            app.view = View::Library;
            load_library(app)
        }
        View::Home | View::Login => {
            app.view = view;
            Effect::None
        }
    }
}

fn load_library(app: &mut App) -> Effect {
    match app.user.as_ref() {
        Some(user) => {
            app.library_loading = true;
            Effect::LoadLibrary(user.id.clone())
        }
        None => Effect::None,
    }
}

fn save_code(app: &mut App, blocks: Vec<String>, at: NaiveTime) -> Effect {
    if blocks.is_empty() {
        app.status_message = String::from("No code block in this message");
        return Effect::None;
    }
    let Some(user) = app.user.clone() else {
        app.view = View::Login;
        app.status_message = String::from("Log in to save scripts");
        return Effect::None;
    };

    let base = format!("Script Water IA - {}", at.format("%H:%M:%S"));
    let multiple = blocks.len() > 1;
    let items = blocks
        .into_iter()
        .enumerate()
        .map(|(i, code)| {
            let title = if multiple {
                format!("{base} ({})", i + 1)
            } else {
                base.clone()
            };
            (title, code)
        })
        .collect();

    app.status_message = String::from("Saving...");
    Effect::SaveScripts { user, items }
}
