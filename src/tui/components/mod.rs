//! # TUI Components
//!
//! All UI components for the terminal interface.
//!
//! ## Component Architecture
//!
//! ### Stateless Components (Props-Based Rendering)
//!
//! Display components that receive all data as fields, rebuilt each frame:
//! - `NavBar`: view tabs, model and signed-in user
//! - `HomePage`: landing panel
//! - `Message`: one chat message, code blocks highlighted
//!
//! ### Stateful Components (Event-Driven)
//!
//! Persistent state lives in `TuiState`; a transient wrapper borrows it to
//! render. Event handling happens on the state and emits a component event:
//! - `InputBox` → `InputEvent`
//! - `MessageListState` (scrolling only)
//! - `LibraryBrowserState` → `LibraryEvent`
//! - `LoginFormState` → `LoginEvent`
//!
//! Components never touch `App` directly. The run loop turns component
//! events into `core::Action`s.
//!
//! ```text
//! components/
//! ├── mod.rs           (this file)
//! ├── nav_bar.rs       (top line)
//! ├── home.rs          (Home view)
//! ├── message.rs       (single message)
//! ├── message_list.rs  (scrollable transcript)
//! ├── input_box.rs     (prompt editor)
//! ├── library.rs       (Library view)
//! └── login.rs         (Login view)
//! ```

pub mod home;
pub mod input_box;
pub mod library;
pub mod login;
pub mod message;
pub mod message_list;
pub mod nav_bar;

pub use home::HomePage;
pub use input_box::{InputBox, InputEvent};
pub use library::{LibraryBrowser, LibraryBrowserState, LibraryEvent};
pub use login::{LoginEvent, LoginForm, LoginFormState};
pub use message_list::{MessageList, MessageListState};
pub use nav_bar::NavBar;
