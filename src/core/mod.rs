//! # Core Application Logic
//!
//! This module contains Water's business logic.
//! It knows nothing about any specific UI technology.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • State (app data)     │
//!                    │  • Action (events)      │
//!                    │  • update() (reducer)   │
//!                    └───────────┬─────────────┘
//!                                │
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!     ┌────────────┐      ┌────────────┐      ┌────────────┐
//!     │    TUI     │      │  Library   │      │   Auth     │
//!     │  Adapter   │      │  service   │      │  service   │
//!     │ (ratatui)  │      │  (store)   │      │  (store)   │
//!     └────────────┘      └────────────┘      └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`state`]: The `App` struct and the `View` router state
//! - [`action`]: The `Action` enum and the `update()` reducer
//! - [`chat`]: Transcript and model context for one conversation
//! - [`fence`]: Prose / fenced-code splitting of replies
//! - [`library`]: Saved scripts, scoped by user
//! - [`auth`]: Password-less mock login
//! - [`store`]: Key-value persistence behind a trait
//! - [`config`]: Layered settings

pub mod action;
pub mod auth;
pub mod chat;
pub mod config;
pub mod fence;
pub mod library;
pub mod state;
pub mod store;

pub use action::{Action, Effect, update};
pub use state::{App, View};
