//! # Application State
//!
//! Core business state for Water. This module contains domain logic only -
//! no TUI-specific types. Presentation state lives in the `tui` module.
//!
//! ```text
//! App
//! ├── provider: Arc<dyn CompletionProvider>  // model backend
//! ├── model_name: String                     // current model
//! ├── view: View                             // which panel is showing
//! ├── user: Option<User>                     // logged-in user
//! ├── chat: ChatSession                      // transcript + model context
//! ├── active_script: Option<ScriptItem>      // script being edited
//! ├── scripts: Vec<ScriptItem>               // user's library, newest first
//! ├── library_loading: bool                  // list request in flight
//! ├── login_pending: bool                    // login request in flight
//! └── status_message: String                 // status bar text
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use std::sync::Arc;

use crate::core::auth::User;
use crate::core::chat::ChatSession;
use crate::core::config::ResolvedConfig;
use crate::core::library::ScriptItem;
use crate::inference::CompletionProvider;

/// The four top-level panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Home,
    Generator,
    Library,
    Login,
}

impl View {
    pub const ALL: [View; 4] = [View::Home, View::Generator, View::Library, View::Login];

    pub fn label(self) -> &'static str {
        match self {
            View::Home => "Home",
            View::Generator => "Generator",
            View::Library => "Library",
            View::Login => "Login",
        }
    }
}

pub struct App {
    pub provider: Arc<dyn CompletionProvider>,
    pub model_name: String,
    pub view: View,
    pub user: Option<User>,
    pub chat: ChatSession,
    pub active_script: Option<ScriptItem>,
    pub scripts: Vec<ScriptItem>,
    pub library_loading: bool,
    pub login_pending: bool,
    pub status_message: String,
}

impl App {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        model_name: String,
        system_prompt: &str,
    ) -> Self {
        Self {
            provider,
            model_name,
            view: View::Home,
            user: None,
            chat: ChatSession::new(system_prompt),
            active_script: None,
            scripts: Vec::new(),
            library_loading: false,
            login_pending: false,
            status_message: String::from("Welcome to Water IA!"),
        }
    }

    pub fn from_config(provider: Arc<dyn CompletionProvider>, config: &ResolvedConfig) -> Self {
        Self::new(provider, config.model_name.clone(), &config.system_prompt)
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }
}
