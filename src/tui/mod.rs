//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the UI,
//! translates keyboard events into `core::Action` values and carries out
//! the `Effect`s that `update()` returns.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Background work
//!
//! Model requests and storage calls run as tokio tasks. They report back
//! through an `mpsc` channel of `Action`s which the loop drains between
//! frames, so the UI thread never waits on the network or the disk.
//!
//! ## Redraw Strategy
//!
//! - **Animating** (reply streaming, library or login pending): draws every
//!   ~80ms for the spinner and the pulsing border.
//! - **Idle**: sleeps up to 500ms, only redraws on events or background
//!   actions.
//!
//! A `SteadyBlock` cursor style is used instead of a blinking cursor because
//! ratatui's `set_cursor_position` resets the terminal's blink timer on every
//! `draw()` call.

mod component;
mod components;
mod event;
pub mod markdown;
mod ui;

use log::{debug, info, warn};
use std::io::stdout;
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use tokio::task::AbortHandle;

use crate::Provider;
use crate::core::action::{Action, Effect, update};
use crate::core::auth::AuthService;
use crate::core::chat::Role;
use crate::core::config::ResolvedConfig;
use crate::core::fence::code_blocks;
use crate::core::library::ScriptLibrary;
use crate::core::state::{App, View};
use crate::core::store::{FileStore, Store};
use crate::inference::{
    CompletionProvider, CompletionRequest, GeminiProvider, OpenRouterProvider, ProviderError,
    StreamChunk,
};
use crate::tui::component::EventHandler;
use crate::tui::components::{
    InputBox, InputEvent, LibraryBrowserState, LibraryEvent, LoginEvent, LoginFormState,
    MessageListState,
};
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

/// Modal input mode for the generator view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Select messages with arrow keys, `s` saves code, `c` copies it. Typing
    /// switches to Input.
    Cursor,
    /// Text editing in the input box. Esc switches to Cursor.
    Input,
}

/// TUI-specific presentation state (not part of core business logic)
pub struct TuiState {
    pub message_list: MessageListState,
    pub input_box: InputBox,
    pub input_mode: InputMode,
    pub pulse_value: f32,
    pub library_browser: LibraryBrowserState,
    pub login_form: LoginFormState,
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            message_list: MessageListState::new(),
            input_box: InputBox::new(),
            input_mode: InputMode::Input, // User expects to type immediately
            pulse_value: 0.0,
            library_browser: LibraryBrowserState::new(),
            login_form: LoginFormState::new(),
        }
    }

    fn enter_cursor_mode(&mut self, app: &App) {
        self.input_mode = InputMode::Cursor;
        let count = app.chat.messages().len();
        self.message_list.selected_index = count.checked_sub(1);
        self.message_list.scroll_to_selected();
    }

    fn enter_input_mode(&mut self) {
        self.input_mode = InputMode::Input;
        self.message_list.selected_index = None;
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        // Kitty keyboard protocol (Shift+Enter detection) is ignored by
        // terminals that don't support it
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Show,
            SetCursorStyle::SteadyBlock,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )?;
        info!("Terminal modes enabled (mouse, bracketed paste, keyboard enhancement)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(
            stdout(),
            PopKeyboardEnhancementFlags,
            DisableMouseCapture,
            DisableBracketedPaste,
            Hide
        );
    }
}

/// Build the model client for the configured provider.
pub fn build_provider(config: &ResolvedConfig) -> Result<Arc<dyn CompletionProvider>, ProviderError> {
    let missing = |var: &str, section: &str| {
        ProviderError::Config(format!(
            "no API key for {}: set {var} or api_key under [{section}] in the config file",
            config.provider.label()
        ))
    };
    Ok(match config.provider {
        Provider::Gemini => {
            let key = config
                .gemini_api_key
                .clone()
                .ok_or_else(|| missing("GEMINI_API_KEY", "gemini"))?;
            Arc::new(GeminiProvider::new(
                key,
                Some(config.gemini_base_url.clone()),
                config.request_timeout,
            ))
        }
        Provider::OpenRouter => {
            let key = config
                .openrouter_api_key
                .clone()
                .ok_or_else(|| missing("OPENROUTER_API_KEY", "openrouter"))?;
            Arc::new(OpenRouterProvider::new(
                key,
                Some(config.openrouter_base_url.clone()),
                config.request_timeout,
            ))
        }
    })
}

/// Carries out effects: owns the services and the in-flight request.
struct Runtime {
    auth: AuthService,
    library: ScriptLibrary,
    tx: mpsc::Sender<Action>,
    request_handle: Option<AbortHandle>,
    /// Created on first copy and kept: on X11 the selection is served only
    /// while the clipboard handle is alive.
    clipboard: Option<arboard::Clipboard>,
}

impl Runtime {
    /// Runs `action` through `update()` and performs the resulting effect.
    /// Returns `true` when the app should quit.
    fn dispatch(&mut self, app: &mut App, tui: &mut TuiState, action: Action) -> bool {
        let epoch = app.chat.epoch();
        let effect = update(app, action);

        if app.chat.epoch() != epoch {
            tui.message_list.reset();
        }
        if !app.chat.is_waiting() {
            self.abort_request();
        }

        match effect {
            Effect::None => {}
            Effect::Quit => return true,
            Effect::SpawnRequest => {
                self.abort_request();
                self.request_handle = Some(spawn_request(app, self.tx.clone()));
            }
            Effect::Login(username) => {
                let auth = self.auth.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = auth.login(&username).await.map_err(|e| e.to_string());
                    send(&tx, Action::LoginFinished(result));
                });
            }
            Effect::Logout => {
                let auth = self.auth.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = auth.logout().await {
                        warn!("Logout failed: {e}");
                        send(&tx, Action::StorageFailed(e.to_string()));
                    }
                });
            }
            Effect::SaveScripts { user, items } => {
                let library = self.library.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    for (title, code) in items {
                        let result = library
                            .save(&user, &title, &code)
                            .await
                            .map_err(|e| e.to_string());
                        send(&tx, Action::ScriptSaved(result));
                    }
                });
            }
            Effect::LoadLibrary(user_id) => {
                let library = self.library.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = library.list(&user_id).await.map_err(|e| e.to_string());
                    send(&tx, Action::LibraryLoaded { user_id, result });
                });
            }
            Effect::CopyToClipboard { text, blocks } => {
                let result = self.copy_to_clipboard(text).map(|()| blocks);
                send(&self.tx, Action::CodeCopied(result));
            }
            Effect::DeleteScript { user, id } => {
                let library = self.library.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = match library.delete_owned(&user, &id).await {
                        Ok(_) => Ok(id),
                        Err(e) => Err(e.to_string()),
                    };
                    send(&tx, Action::ScriptDeleted(result));
                });
            }
        }
        false
    }

    fn copy_to_clipboard(&mut self, text: String) -> Result<(), String> {
        let clipboard = match self.clipboard.take() {
            Some(clipboard) => clipboard,
            None => arboard::Clipboard::new().map_err(|e| e.to_string())?,
        };
        self.clipboard
            .insert(clipboard)
            .set_text(text)
            .map_err(|e| e.to_string())
    }

    fn abort_request(&mut self) {
        if let Some(handle) = self.request_handle.take() {
            handle.abort();
        }
    }
}

fn send(tx: &mpsc::Sender<Action>, action: Action) {
    if tx.send(action).is_err() {
        warn!("Failed to send action: receiver dropped");
    }
}

pub fn run(config: ResolvedConfig, provider: Arc<dyn CompletionProvider>) -> std::io::Result<()> {
    let store = Arc::new(Store::new(FileStore::open(&config.data_dir)?));
    let auth = AuthService::new(store.clone()).with_latency(config.simulated_latency);
    let library = ScriptLibrary::new(store).with_latency(config.simulated_latency);

    let mut app = App::from_config(provider, &config);
    match auth.current_user() {
        Ok(Some(user)) => {
            info!("Restored session for {}", user.id);
            app.status_message = format!("Welcome back, {}!", user.username);
            app.user = Some(user);
        }
        Ok(None) => {}
        Err(e) => {
            warn!("Could not read current user: {e}");
            app.status_message = format!("Storage error: {e}");
        }
    }
    let mut tui = TuiState::new();

    let (tx, rx) = mpsc::channel();
    let mut runtime = Runtime {
        auth,
        library,
        tx,
        request_handle: None,
        clipboard: None,
    };

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();

    let start_time = Instant::now();
    let mut needs_redraw = true;

    'main: loop {
        // Sync InputBox props with App/TUI state
        tui.input_box.busy = app.chat.is_waiting();
        tui.input_box.focused = tui.input_mode == InputMode::Input;

        let animating = app.chat.is_waiting() || app.library_loading || app.login_pending;
        if animating {
            needs_redraw = true;
        }

        if needs_redraw {
            let elapsed = start_time.elapsed().as_secs_f32();
            tui.pulse_value = (elapsed * 5.0).sin() * 0.5 + 0.5;
            let spinner_frame = (elapsed * 12.0) as usize;
            terminal.draw(|f| ui::draw_ui(f, &app, &mut tui, spinner_frame))?;
            needs_redraw = false;
        }

        let timeout = if animating {
            Duration::from_millis(80)
        } else {
            Duration::from_millis(500)
        };
        let first_event = poll_event_timeout(timeout);
        if first_event.is_some() {
            needs_redraw = true;
        }

        // Process first event + drain everything pending before the next draw
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            let frame_area = terminal.get_frame().area();
            if handle_event(event, &mut app, &mut tui, &mut runtime, frame_area) {
                break 'main;
            }
        }

        // Background task results (stream chunks, storage replies)
        while let Ok(action) = rx.try_recv() {
            needs_redraw = true;
            debug!("Event loop received: {action:?}");
            if runtime.dispatch(&mut app, &mut tui, action) {
                break 'main;
            }
        }
    }

    runtime.abort_request();
    ratatui::restore();
    Ok(())
}

/// Routes one terminal event. Returns `true` when the app should quit.
fn handle_event(
    event: TuiEvent,
    app: &mut App,
    tui: &mut TuiState,
    runtime: &mut Runtime,
    frame_area: ratatui::layout::Rect,
) -> bool {
    match event {
        TuiEvent::ForceQuit => return runtime.dispatch(app, tui, Action::Quit),
        TuiEvent::Resize => return false,
        TuiEvent::SwitchView(view) => {
            if view == View::Generator && app.view != View::Generator {
                tui.enter_input_mode();
            }
            return runtime.dispatch(app, tui, Action::Navigate(view));
        }
        _ => {}
    }

    match app.view {
        View::Home => {
            if event == TuiEvent::Submit {
                tui.enter_input_mode();
                return runtime.dispatch(app, tui, Action::Navigate(View::Generator));
            }
            false
        }
        View::Generator => handle_generator_event(event, app, tui, runtime, frame_area),
        View::Library => match tui.library_browser.handle_event(&event, &app.scripts) {
            Some(LibraryEvent::Edit(script)) => {
                tui.enter_input_mode();
                runtime.dispatch(app, tui, Action::EditScript(script))
            }
            Some(LibraryEvent::Delete(id)) => runtime.dispatch(app, tui, Action::DeleteScript(id)),
            Some(LibraryEvent::Reload) => runtime.dispatch(app, tui, Action::ReloadLibrary),
            None => false,
        },
        View::Login => match tui.login_form.handle_event(&event, app.is_logged_in()) {
            Some(LoginEvent::Submit(name)) => runtime.dispatch(app, tui, Action::Login(name)),
            Some(LoginEvent::Logout) => runtime.dispatch(app, tui, Action::Logout),
            None => false,
        },
    }
}

fn handle_generator_event(
    event: TuiEvent,
    app: &mut App,
    tui: &mut TuiState,
    runtime: &mut Runtime,
    frame_area: ratatui::layout::Rect,
) -> bool {
    match event {
        TuiEvent::ClearChat => return runtime.dispatch(app, tui, Action::ClearChat),
        TuiEvent::Escape if app.chat.is_waiting() => {
            return runtime.dispatch(app, tui, Action::CancelGeneration);
        }
        TuiEvent::MouseMove(_, row) => {
            tui.message_list.selected_index = ui::hit_test_message(row, frame_area, app, tui);
            return false;
        }
        TuiEvent::MouseClick(_, row) => {
            if let Some(idx) = ui::hit_test_message(row, frame_area, app, tui) {
                tui.input_mode = InputMode::Cursor;
                tui.message_list.selected_index = Some(idx);
            }
            return false;
        }
        TuiEvent::ScrollUp
        | TuiEvent::ScrollDown
        | TuiEvent::ScrollPageUp
        | TuiEvent::ScrollPageDown => {
            tui.message_list.handle_event(&event);
            return false;
        }
        _ => {}
    }

    match tui.input_mode {
        InputMode::Input => {
            if event == TuiEvent::Escape {
                tui.enter_cursor_mode(app);
                return false;
            }
            if let Some(InputEvent::Submit(text)) = tui.input_box.handle_event(&event) {
                return runtime.dispatch(app, tui, Action::Submit(text));
            }
            false
        }
        InputMode::Cursor => match event {
            TuiEvent::Escape | TuiEvent::Submit | TuiEvent::InputChar('i') => {
                tui.enter_input_mode();
                false
            }
            TuiEvent::InputChar('s') => match selected_code(app, tui, "save") {
                Some(blocks) => runtime.dispatch(
                    app,
                    tui,
                    Action::SaveCode {
                        blocks,
                        at: chrono::Local::now().time(),
                    },
                ),
                None => false,
            },
            TuiEvent::InputChar('c') => match selected_code(app, tui, "copy") {
                Some(blocks) => runtime.dispatch(app, tui, Action::CopyCode(blocks)),
                None => false,
            },
            TuiEvent::CursorUp => {
                tui.message_list.move_selection(-1, app.chat.messages().len());
                false
            }
            TuiEvent::CursorDown => {
                tui.message_list.move_selection(1, app.chat.messages().len());
                false
            }
            TuiEvent::InputChar(_) | TuiEvent::Paste(_) => {
                tui.enter_input_mode();
                tui.input_box.handle_event(&event);
                false
            }
            _ => false,
        },
    }
}

/// Code blocks of the selected message, if it is a finished model reply.
/// `verb` names the attempted action in the status hint.
fn selected_code(app: &mut App, tui: &TuiState, verb: &str) -> Option<Vec<String>> {
    let idx = tui.message_list.selected_index?;
    let message = app.chat.messages().get(idx)?;
    let streaming = app.chat.is_waiting() && idx + 1 == app.chat.messages().len();
    if message.role != Role::Model || message.is_error || streaming {
        app.status_message = format!("Select a reply from Water IA to {verb} its code");
        return None;
    }
    Some(code_blocks(&message.text))
}

/// Streams one reply. Chunks are forwarded as they arrive; the outcome is
/// reported only after the last chunk, so it can never overtake them.
fn spawn_request(app: &App, tx: mpsc::Sender<Action>) -> AbortHandle {
    let generation = app.chat.generation();
    info!("Spawning model request (generation {generation})");

    let provider = app.provider.clone();
    let context = app.chat.context().clone();
    let model = app.model_name.clone();

    let handle = tokio::spawn(async move {
        let (chunk_tx, mut chunk_rx) = tokio::sync::mpsc::channel::<StreamChunk>(100);
        let request = CompletionRequest {
            context: &context,
            model: &model,
        };

        let request_start = Instant::now();
        let forward = async {
            let mut first_content: Option<Instant> = None;
            let mut total_len = 0usize;
            while let Some(chunk) = chunk_rx.recv().await {
                match chunk {
                    StreamChunk::Content(text) => {
                        first_content.get_or_insert_with(Instant::now);
                        total_len += text.len();
                        send(&tx, Action::ResponseChunk { generation, text });
                    }
                    StreamChunk::Completed => debug!("End-of-response marker received"),
                }
            }
            (first_content, total_len)
        };

        let (result, (first_content, total_len)) =
            tokio::join!(provider.stream_completion(request, chunk_tx), forward);

        match result {
            Ok(()) => {
                info!(
                    "Stream completed: {total_len} bytes, ttft={:?}, total={:?}",
                    first_content.map(|t| t - request_start),
                    request_start.elapsed()
                );
                send(&tx, Action::ResponseDone { generation });
            }
            Err(e) => {
                info!("Stream error after {total_len} bytes: {e}");
                send(
                    &tx,
                    Action::ResponseFailed {
                        generation,
                        error: e.to_string(),
                    },
                );
            }
        }
    });

    handle.abort_handle()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::User;
    use crate::core::chat::ChatMessage;
    use crate::core::config::{CliOverrides, WaterConfig, resolve_with};
    use crate::test_support::{test_app, test_services};

    fn config(provider: Provider) -> ResolvedConfig {
        let cli = CliOverrides {
            provider: Some(provider),
            ..Default::default()
        };
        resolve_with(&WaterConfig::default(), &cli, |_| None)
    }

    fn runtime() -> (Runtime, mpsc::Receiver<Action>) {
        let (auth, library) = test_services();
        let (tx, rx) = mpsc::channel();
        let runtime = Runtime {
            auth,
            library,
            tx,
            request_handle: None,
        clipboard: None,
        };
        (runtime, rx)
    }

    #[test]
    fn test_build_provider_requires_key() {
        let err = build_provider(&config(Provider::Gemini)).err().unwrap();
        assert!(matches!(err, ProviderError::Config(_)));
        assert!(err.to_string().contains("GEMINI_API_KEY"));

        let err = build_provider(&config(Provider::OpenRouter)).err().unwrap();
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn test_build_provider_selects_backend() {
        let mut cfg = config(Provider::OpenRouter);
        cfg.openrouter_api_key = Some("sk-test".to_string());
        assert_eq!(build_provider(&cfg).unwrap().name(), "openrouter");

        let mut cfg = config(Provider::Gemini);
        cfg.gemini_api_key = Some("g-test".to_string());
        assert_eq!(build_provider(&cfg).unwrap().name(), "gemini");
    }

    /// Sends one chunk, then fails like a dropped connection.
    struct FailingProvider;

    #[async_trait::async_trait]
    impl CompletionProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn stream_completion(
            &self,
            _request: CompletionRequest<'_>,
            sender: tokio::sync::mpsc::Sender<StreamChunk>,
        ) -> Result<(), ProviderError> {
            let _ = sender.send(StreamChunk::Content("local x".to_string())).await;
            Err(ProviderError::Network("connection reset".to_string()))
        }
    }

    /// Receives actions until the turn ends, then checks nothing follows.
    async fn collect_turn(rx: mpsc::Receiver<Action>) -> Vec<Action> {
        tokio::task::spawn_blocking(move || {
            let mut actions = Vec::new();
            while let Ok(action) = rx.recv_timeout(Duration::from_secs(5)) {
                let end = matches!(
                    action,
                    Action::ResponseDone { .. } | Action::ResponseFailed { .. }
                );
                actions.push(action);
                if end {
                    break;
                }
            }
            assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
            actions
        })
        .await
        .unwrap()
    }

    #[test]
    fn test_selected_code_needs_finished_model_reply() {
        let mut app = test_app();
        let mut tui = TuiState::new();

        // greeting has no code: empty block list, reducer reports it
        tui.message_list.selected_index = Some(0);
        assert_eq!(selected_code(&mut app, &tui, "save"), Some(vec![]));

        app.chat.send("make a door");
        tui.message_list.selected_index = Some(1);
        assert_eq!(selected_code(&mut app, &tui, "copy"), None);
        assert_eq!(
            app.status_message,
            "Select a reply from Water IA to copy its code"
        );
    }

    #[test]
    fn test_selected_code_collects_code_blocks() {
        let mut app = test_app();
        app.chat.send("door");
        app.chat.receive("Here:\n```lua\nprint(1)\n```");
        app.chat.finish();
        let mut tui = TuiState::new();
        tui.message_list.selected_index = Some(2);

        assert_eq!(
            selected_code(&mut app, &tui, "save"),
            Some(vec!["print(1)".to_string()])
        );
    }

    #[tokio::test]
    async fn test_copy_key_emits_clipboard_effect() {
        let (mut runtime, _rx) = runtime();
        let mut app = test_app();
        app.view = View::Generator;
        app.chat.send("door");
        app.chat.receive("```lua\nprint(1)\n```\n```lua\nprint(2)\n```");
        app.chat.finish();
        let mut tui = TuiState::new();
        tui.input_mode = InputMode::Cursor;
        tui.message_list.selected_index = Some(2);

        let blocks = selected_code(&mut app, &tui, "copy").unwrap();
        assert_eq!(
            update(&mut app, Action::CopyCode(blocks)),
            Effect::CopyToClipboard {
                text: "print(1)\n\nprint(2)".to_string(),
                blocks: 2,
            }
        );

        // 'c' on a user message never reaches the clipboard
        tui.message_list.selected_index = Some(1);
        let area = ratatui::layout::Rect::new(0, 0, 80, 24);
        assert!(!handle_event(TuiEvent::InputChar('c'), &mut app, &mut tui, &mut runtime, area));
        assert!(runtime.clipboard.is_none());
        assert_eq!(tui.input_mode, InputMode::Cursor);
    }

    #[tokio::test]
    async fn test_stream_failure_follows_its_chunks() {
        let (mut runtime, rx) = runtime();
        let mut app = App::new(Arc::new(FailingProvider), "m".to_string(), "sys");
        let mut tui = TuiState::new();

        runtime.dispatch(&mut app, &mut tui, Action::Submit("door".to_string()));
        let generation = app.chat.generation();
        let actions = collect_turn(rx).await;

        assert_eq!(
            actions,
            vec![
                Action::ResponseChunk {
                    generation,
                    text: "local x".to_string(),
                },
                Action::ResponseFailed {
                    generation,
                    error: "network error: connection reset".to_string(),
                },
            ]
        );

        for action in actions {
            runtime.dispatch(&mut app, &mut tui, action);
        }
        let messages = app.chat.messages();
        assert_eq!(messages[messages.len() - 2].text, "local x");
        assert!(messages[messages.len() - 1].is_error);
    }

    #[tokio::test]
    async fn test_stream_success_ends_with_done() {
        let (mut runtime, rx) = runtime();
        let mut app = test_app();
        let mut tui = TuiState::new();

        runtime.dispatch(&mut app, &mut tui, Action::Submit("door".to_string()));
        let generation = app.chat.generation();
        assert_eq!(
            collect_turn(rx).await,
            vec![Action::ResponseDone { generation }]
        );
    }

    #[tokio::test]
    async fn test_dispatch_login_reports_back() {
        let (mut runtime, rx) = runtime();
        let mut app = test_app();
        let mut tui = TuiState::new();

        assert!(!runtime.dispatch(&mut app, &mut tui, Action::Login("Bob".to_string())));
        assert!(app.login_pending);

        let action = tokio::task::spawn_blocking(move || rx.recv_timeout(Duration::from_secs(5)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(action, Action::LoginFinished(Ok(User::from_username("Bob"))));
    }

    #[tokio::test]
    async fn test_dispatch_save_then_load_library() {
        let (mut runtime, rx) = runtime();
        let mut app = test_app();
        let mut tui = TuiState::new();
        runtime.auth.login("Bob").await.unwrap();
        app.user = Some(User::from_username("Bob"));

        let at = chrono::NaiveTime::from_hms_opt(9, 5, 0).unwrap();
        runtime.dispatch(
            &mut app,
            &mut tui,
            Action::SaveCode {
                blocks: vec!["print(1)".to_string()],
                at,
            },
        );
        let (action, rx) = tokio::task::spawn_blocking(move || {
            let action = rx.recv_timeout(Duration::from_secs(5));
            (action, rx)
        })
        .await
        .unwrap();
        let Ok(Action::ScriptSaved(Ok(item))) = action else {
            panic!("expected a saved script");
        };
        assert_eq!(item.title, "Script Water IA - 09:05:00");

        runtime.dispatch(&mut app, &mut tui, Action::Navigate(View::Library));
        let action = tokio::task::spawn_blocking(move || rx.recv_timeout(Duration::from_secs(5)))
            .await
            .unwrap()
            .unwrap();
        match action {
            Action::LibraryLoaded { result: Ok(scripts), .. } => {
                assert_eq!(scripts.len(), 1);
                assert_eq!(scripts[0].code, "print(1)");
            }
            other => panic!("expected LibraryLoaded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_clear_chat_resets_message_list() {
        let (mut runtime, _rx) = runtime();
        let mut app = test_app();
        let mut tui = TuiState::new();
        app.view = View::Generator;
        tui.message_list.selected_index = Some(0);

        runtime.dispatch(&mut app, &mut tui, Action::ClearChat);
        assert_eq!(tui.message_list.selected_index, None);
        assert_eq!(app.chat.messages(), &[ChatMessage::model(crate::core::chat::CLEARED)]);
    }

    #[tokio::test]
    async fn test_cancel_aborts_request() {
        let (mut runtime, _rx) = runtime();
        let mut app = test_app();
        let mut tui = TuiState::new();

        runtime.dispatch(&mut app, &mut tui, Action::Submit("door".to_string()));
        assert!(runtime.request_handle.is_some());

        runtime.dispatch(&mut app, &mut tui, Action::CancelGeneration);
        assert!(runtime.request_handle.is_none());
        assert!(!app.chat.is_waiting());
    }
}
