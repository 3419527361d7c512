use std::time::Instant;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{debug, error, info};
use ratatui::style::Color;
use signage_core::{
    Error, PlaybackBackend, PlaybackSession, PlaybackState, Resolver, Settings, SignageConfig,
    VideoDraft, VideoRecord, VideoStore,
};

/// Id of the channel synthesized from the single-source settings
pub const SETTINGS_CHANNEL_ID: &str = "settings";

/// Application views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppView {
    /// Channel list with the call-to-action
    MainMenu,
    /// Playback of the active channel
    Player,
    /// Single-source settings form
    Settings,
    /// Channel manager
    Admin,
}

/// Which settings field has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    Url,
    Loop,
}

/// Single-source settings form
#[derive(Debug, Clone)]
pub struct SettingsForm {
    pub url: String,
    pub loop_enabled: bool,
    pub field: SettingsField,
    /// Field-level validation message
    pub error: Option<String>,
}

/// Which field of the channel form has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Url,
    Loop,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            FormField::Title => FormField::Url,
            FormField::Url => FormField::Loop,
            FormField::Loop => FormField::Title,
        }
    }
}

/// Create/edit form for a channel
#[derive(Debug, Clone)]
pub struct VideoForm {
    /// Id of the record being edited, `None` when creating
    pub editing: Option<String>,
    pub title: String,
    pub url: String,
    pub loop_enabled: bool,
    pub field: FormField,
    pub error: Option<String>,
}

impl VideoForm {
    pub fn create() -> Self {
        Self {
            editing: None,
            title: String::new(),
            url: String::new(),
            loop_enabled: true,
            field: FormField::Title,
            error: None,
        }
    }

    pub fn edit(record: &VideoRecord) -> Self {
        Self {
            editing: Some(record.id.clone()),
            title: record.title.clone(),
            url: record.url.clone(),
            loop_enabled: record.loop_enabled,
            field: FormField::Title,
            error: None,
        }
    }

    fn draft(&self) -> VideoDraft {
        VideoDraft {
            title: self.title.clone(),
            url: self.url.clone(),
            loop_enabled: self.loop_enabled,
        }
    }
}

/// Which login field has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Email,
    Password,
}

#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub field: LoginField,
    pub error: Option<String>,
}

/// Admin surface state
#[derive(Debug, Clone)]
pub struct AdminState {
    /// Records as last fetched from the store
    pub records: Vec<VideoRecord>,
    pub selected: usize,
    pub form: Option<VideoForm>,
    /// Record marked for deletion, waiting for confirmation
    pub confirm_delete: Option<String>,
    /// Record whose deletion is in flight
    pub processing: Option<String>,
    /// A save is in flight
    pub saving: bool,
    pub login: LoginForm,
}

/// Store work queued by an input handler and run on the next update, so
/// the UI gets a chance to draw its processing state first.
#[derive(Debug, Clone)]
pub enum PendingOp {
    Refresh,
    Login { email: String, password: String },
    SaveVideo(VideoDraft, Option<String>),
    Delete(String),
    SaveSettings(Settings),
}

// App state
pub struct App {
    pub config: SignageConfig,
    pub store: Box<dyn VideoStore>,
    pub resolver: Resolver,
    pub playback: PlaybackSession<Box<dyn PlaybackBackend>>,
    /// Current application view
    pub view: AppView,
    /// Channels shown on the main menu
    pub channels: Vec<VideoRecord>,
    /// Focused channel; index 0 is the primary action
    pub selected: usize,
    /// Channel being played
    pub active: Option<VideoRecord>,
    /// Channel list is being fetched
    pub loading: bool,
    pub settings_form: SettingsForm,
    pub admin: AdminState,
    pub pending: Option<PendingOp>,
    /// Status message to display
    pub status_message: Option<(String, Instant, Color)>,
    /// Whether the app should exit
    pub should_quit: bool,
    /// Help dialog visibility
    pub show_help: bool,
    /// Whether command mode is active
    pub command_mode: bool,
    /// Command buffer for command mode
    pub command_buffer: String,
    /// Drives spinner animation
    pub started_at: Instant,
}

impl App {
    /// Create a new application
    pub fn new(
        config: SignageConfig,
        store: Box<dyn VideoStore>,
        backend: Box<dyn PlaybackBackend>,
    ) -> Self {
        let resolver = Resolver::new(config.origin.clone());
        Self {
            config,
            store,
            resolver,
            playback: PlaybackSession::new(backend),
            view: AppView::MainMenu,
            channels: Vec::new(),
            selected: 0,
            active: None,
            loading: true,
            settings_form: SettingsForm {
                url: String::new(),
                loop_enabled: true,
                field: SettingsField::Url,
                error: None,
            },
            admin: AdminState {
                records: Vec::new(),
                selected: 0,
                form: None,
                confirm_delete: None,
                processing: None,
                saving: false,
                login: LoginForm {
                    email: String::new(),
                    password: String::new(),
                    field: LoginField::Email,
                    error: None,
                },
            },
            pending: Some(PendingOp::Refresh),
            status_message: None,
            should_quit: false,
            show_help: false,
            command_mode: false,
            command_buffer: String::new(),
            started_at: Instant::now(),
        }
    }

    /// Set a status message with a color
    pub fn set_status(&mut self, message: impl Into<String>, color: Color) {
        let message_string = message.into();
        log::debug!("Status message: {} ({})", message_string, color);
        self.status_message = Some((message_string, Instant::now(), color));
    }

    fn report_store_error(&mut self, action: &str, e: &Error) {
        error!("{} failed: {}", action, e);
        self.set_status(format!("{action} failed: {e}"), Color::Red);
    }

    /// Queue a refetch of the channel list
    pub fn request_refresh(&mut self) {
        self.loading = true;
        self.pending = Some(PendingOp::Refresh);
    }

    /// Refetch channels from the store. Failure keeps the previous list.
    pub fn refresh_channels(&mut self) {
        let result = self
            .store
            .list()
            .and_then(|records| Ok((records, self.store.settings()?)));
        self.loading = false;

        match result {
            Ok((records, settings)) => {
                self.admin.records = records.clone();
                self.admin.selected = self.admin.selected.min(records.len().saturating_sub(1));
                self.channels = merge_channels(records, &settings);
                self.selected = self.selected.min(self.channels.len().saturating_sub(1));
                self.settings_form.url = settings.video_url;
                self.settings_form.loop_enabled = settings.loop_enabled;
                debug!("Loaded {} channels", self.channels.len());
            }
            Err(e) => self.report_store_error("Loading channels", &e),
        }
    }

    /// Play the channel at `index`
    pub fn play_channel(&mut self, index: usize) {
        let Some(record) = self.channels.get(index).cloned() else {
            self.set_status("No channel to play. Configure one in settings.", Color::Yellow);
            return;
        };
        self.selected = index;
        self.start_playback(record);
    }

    fn start_playback(&mut self, record: VideoRecord) {
        // Switching channels: release the current source before mounting
        if self.playback.state().is_active() {
            self.playback.stop();
            self.playback.take_focus_request();
        }
        let source = self.resolver.resolve(&record.url, record.loop_enabled);
        info!("Starting playback of '{}'", record.title);
        self.active = Some(record);
        self.view = AppView::Player;
        self.playback.play(source);
    }

    /// Stop playback and go back to the channel list
    pub fn stop_playback(&mut self) {
        self.playback.stop();
        self.leave_player();
    }

    fn leave_player(&mut self) {
        self.active = None;
        if self.view == AppView::Player {
            self.view = AppView::MainMenu;
        }
    }

    /// Open the settings form, optionally prefilled with a link
    pub fn open_settings(&mut self, url: Option<String>) {
        if let Some(url) = url {
            self.settings_form.url = url;
        }
        self.settings_form.field = SettingsField::Url;
        self.settings_form.error = None;
        self.view = AppView::Settings;
    }

    pub fn open_admin(&mut self) {
        self.admin.form = None;
        self.admin.confirm_delete = None;
        self.admin.login.error = None;
        self.view = AppView::Admin;
    }

    /// Validate the settings form and queue the save. Invalid input never
    /// reaches the store and shows next to the field.
    pub fn submit_settings(&mut self) {
        let settings = Settings {
            video_url: self.settings_form.url.clone(),
            loop_enabled: self.settings_form.loop_enabled,
        };
        match settings.validated() {
            Ok(valid) => {
                self.settings_form.error = None;
                self.pending = Some(PendingOp::SaveSettings(valid));
            }
            Err(e) => self.settings_form.error = Some(field_message(&e)),
        }
    }

    /// Validate the channel form and queue the save
    pub fn submit_video_form(&mut self) {
        let Some(form) = self.admin.form.as_mut() else {
            return;
        };
        match form.draft().validated() {
            Ok(draft) => {
                form.error = None;
                self.admin.saving = true;
                self.pending = Some(PendingOp::SaveVideo(draft, form.editing.clone()));
            }
            Err(e) => form.error = Some(field_message(&e)),
        }
    }

    /// Second step of the two-step delete
    pub fn confirm_delete(&mut self) {
        if let Some(id) = self.admin.confirm_delete.take() {
            self.admin.processing = Some(id.clone());
            self.pending = Some(PendingOp::Delete(id));
        }
    }

    pub fn submit_login(&mut self) {
        let login = &self.admin.login;
        self.pending = Some(PendingOp::Login {
            email: login.email.clone(),
            password: login.password.clone(),
        });
    }

    pub fn sign_out(&mut self) {
        if let Err(e) = self.store.sign_out() {
            self.report_store_error("Sign out", &e);
            return;
        }
        self.admin.login.password.clear();
        self.admin.form = None;
        self.admin.confirm_delete = None;
        self.set_status("Signed out", Color::Blue);
    }

    /// Whether the admin surface has to show the login form
    pub fn needs_login(&self) -> bool {
        self.store.requires_auth() && !self.store.is_authenticated()
    }

    fn run_pending(&mut self, op: PendingOp) {
        match op {
            PendingOp::Refresh => self.refresh_channels(),
            PendingOp::Login { email, password } => {
                match self.store.authenticate(&email, &password) {
                    Ok(()) => {
                        self.admin.login.error = None;
                        self.admin.login.password.clear();
                        self.set_status("Signed in", Color::Green);
                        self.refresh_channels();
                    }
                    Err(e) => {
                        error!("Login failed: {}", e);
                        self.admin.login.error = Some(format!("Login failed: {e}"));
                    }
                }
            }
            PendingOp::SaveVideo(draft, editing) => {
                let result = match &editing {
                    Some(id) => self.store.update(id, &draft),
                    None => self.store.create(&draft).map(|_| ()),
                };
                self.admin.saving = false;
                match result {
                    Ok(()) => {
                        let message = if editing.is_some() { "Video updated" } else { "Video added" };
                        self.set_status(message, Color::Green);
                        self.admin.form = None;
                        self.refresh_channels();
                    }
                    Err(e) => self.report_store_error("Saving video", &e),
                }
            }
            PendingOp::Delete(id) => {
                match self.store.delete(&id) {
                    Ok(()) => {
                        self.admin.records.retain(|r| r.id != id);
                        self.admin.selected = self
                            .admin
                            .selected
                            .min(self.admin.records.len().saturating_sub(1));
                        self.set_status("Video deleted", Color::Green);
                        self.refresh_channels();
                    }
                    Err(e) => self.report_store_error("Deleting video", &e),
                }
                self.admin.processing = None;
            }
            PendingOp::SaveSettings(settings) => match self.store.save_settings(&settings) {
                Ok(()) => {
                    self.set_status("Settings saved", Color::Green);
                    if self.view == AppView::Settings {
                        self.view = AppView::MainMenu;
                    }
                    self.refresh_channels();
                }
                Err(e) => self.report_store_error("Saving settings", &e),
            },
        }
    }

    /// Periodic work: queued store calls, renderer signals and status expiry
    pub fn update(&mut self) -> Result<()> {
        if let Some(op) = self.pending.take() {
            self.run_pending(op);
        }

        self.playback.poll();
        if self.view == AppView::Player && *self.playback.state() == PlaybackState::Idle {
            self.leave_player();
        }
        if self.playback.take_focus_request() {
            self.selected = 0;
        }

        if let Some((_, time, _)) = &self.status_message {
            if time.elapsed() > self.config.status_ttl() {
                self.status_message = None;
            }
        }
        Ok(())
    }

    /// Handle key event
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        // Check if we're in command mode
        if self.is_command_mode() {
            match key.code {
                KeyCode::Char(c) => self.add_to_command_buffer(c),
                KeyCode::Backspace => self.remove_from_command_buffer(),
                KeyCode::Esc => self.exit_command_mode(),
                _ => {}
            }
            return Ok(());
        }

        if key.code == KeyCode::F(1) {
            self.show_help = !self.show_help;
            return Ok(());
        }
        if self.show_help && key.code == KeyCode::Esc {
            self.show_help = false;
            return Ok(());
        }

        // Handle view-specific keys
        match self.view {
            AppView::MainMenu => self.handle_main_menu_key(key),
            AppView::Player => self.handle_player_key(key),
            AppView::Settings => self.handle_settings_key(key),
            AppView::Admin => self.handle_admin_key(key),
        }
        Ok(())
    }

    /// Bracketed paste, used for long embed snippets
    pub fn handle_paste(&mut self, text: &str) {
        let text = text.replace(['\r', '\n'], " ");
        if let Some(target) = self.focused_text_field() {
            target.push_str(&text);
        }
    }

    /// Text field that receives typed characters in the current view
    fn focused_text_field(&mut self) -> Option<&mut String> {
        match self.view {
            AppView::Settings if self.settings_form.field == SettingsField::Url => {
                self.settings_form.error = None;
                Some(&mut self.settings_form.url)
            }
            AppView::Admin if self.needs_login() => {
                let login = &mut self.admin.login;
                Some(match login.field {
                    LoginField::Email => &mut login.email,
                    LoginField::Password => &mut login.password,
                })
            }
            AppView::Admin => {
                let form = self.admin.form.as_mut()?;
                form.error = None;
                match form.field {
                    FormField::Title => Some(&mut form.title),
                    FormField::Url => Some(&mut form.url),
                    FormField::Loop => None,
                }
            }
            _ => None,
        }
    }

    fn handle_main_menu_key(&mut self, key: KeyEvent) {
        let count = self.channels.len();
        match key.code {
            KeyCode::Up | KeyCode::Left => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Right => {
                if count > 0 {
                    self.selected = (self.selected + 1).min(count - 1);
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if count == 0 {
                    self.open_settings(None);
                } else {
                    self.play_channel(self.selected);
                }
            }
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                if index < count {
                    self.play_channel(index);
                }
            }
            KeyCode::Char('s') => self.open_settings(None),
            KeyCode::Char('a') => self.open_admin(),
            KeyCode::Char('r') => self.request_refresh(),
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_player_key(&mut self, key: KeyEvent) {
        if matches!(self.playback.state(), PlaybackState::Error(_)) {
            match key.code {
                KeyCode::Char('r') | KeyCode::Enter => {
                    self.playback.retry();
                    if let Some(record) = self.active.clone() {
                        self.start_playback(record);
                    }
                }
                KeyCode::Char('s') => {
                    let url = self.active.as_ref().map(|r| r.url.clone());
                    self.playback.retry();
                    self.active = None;
                    self.open_settings(url);
                }
                KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('x') | KeyCode::Char('q') => {
                    self.stop_playback()
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('x') | KeyCode::Char('q') => {
                self.stop_playback();
                self.set_status("Playback stopped", Color::Blue);
            }
            _ => {}
        }
    }

    fn handle_settings_key(&mut self, key: KeyEvent) {
        let form = &mut self.settings_form;
        match key.code {
            KeyCode::Esc => {
                self.view = AppView::MainMenu;
                self.request_refresh();
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                form.field = match form.field {
                    SettingsField::Url => SettingsField::Loop,
                    SettingsField::Loop => SettingsField::Url,
                };
            }
            KeyCode::Enter => self.submit_settings(),
            KeyCode::Char(' ') if form.field == SettingsField::Loop => {
                form.loop_enabled = !form.loop_enabled;
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                form.url.clear();
                form.error = None;
            }
            KeyCode::Char(c) if form.field == SettingsField::Url => {
                form.url.push(c);
                form.error = None;
            }
            KeyCode::Backspace if form.field == SettingsField::Url => {
                form.url.pop();
                form.error = None;
            }
            _ => {}
        }
    }

    fn handle_admin_key(&mut self, key: KeyEvent) {
        if self.needs_login() {
            self.handle_login_key(key);
        } else if self.admin.confirm_delete.is_some() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => self.confirm_delete(),
                KeyCode::Char('n') | KeyCode::Esc => self.admin.confirm_delete = None,
                _ => {}
            }
        } else if self.admin.form.is_some() {
            self.handle_form_key(key);
        } else {
            self.handle_admin_list_key(key);
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) {
        let login = &mut self.admin.login;
        match key.code {
            KeyCode::Esc => {
                self.view = AppView::MainMenu;
                return;
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                login.field = match login.field {
                    LoginField::Email => LoginField::Password,
                    LoginField::Password => LoginField::Email,
                };
            }
            KeyCode::Enter => {
                self.submit_login();
                return;
            }
            KeyCode::Backspace => {
                match login.field {
                    LoginField::Email => login.email.pop(),
                    LoginField::Password => login.password.pop(),
                };
            }
            KeyCode::Char(c) => match login.field {
                LoginField::Email => login.email.push(c),
                LoginField::Password => login.password.push(c),
            },
            _ => {}
        }
        login.error = None;
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        if self.admin.saving {
            return;
        }
        let Some(form) = self.admin.form.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.admin.form = None,
            KeyCode::Tab | KeyCode::Down => form.field = form.field.next(),
            KeyCode::BackTab | KeyCode::Up => form.field = form.field.next().next(),
            KeyCode::Enter => self.submit_video_form(),
            KeyCode::Char(' ') if form.field == FormField::Loop => {
                form.loop_enabled = !form.loop_enabled;
            }
            KeyCode::Char(c) => {
                if let Some(field) = self.focused_text_field() {
                    field.push(c);
                }
            }
            KeyCode::Backspace => {
                if let Some(field) = self.focused_text_field() {
                    field.pop();
                }
            }
            _ => {}
        }
    }

    fn handle_admin_list_key(&mut self, key: KeyEvent) {
        let count = self.admin.records.len();
        match key.code {
            KeyCode::Esc => {
                self.view = AppView::MainMenu;
                self.request_refresh();
            }
            KeyCode::Up => self.admin.selected = self.admin.selected.saturating_sub(1),
            KeyCode::Down => {
                if count > 0 {
                    self.admin.selected = (self.admin.selected + 1).min(count - 1);
                }
            }
            KeyCode::Char('n') => self.admin.form = Some(VideoForm::create()),
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(record) = self.admin.records.get(self.admin.selected) {
                    self.admin.form = Some(VideoForm::edit(record));
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(record) = self.admin.records.get(self.admin.selected) {
                    if self.admin.processing.as_deref() != Some(record.id.as_str()) {
                        self.admin.confirm_delete = Some(record.id.clone());
                    }
                }
            }
            KeyCode::Char('r') => self.request_refresh(),
            KeyCode::Char('l') if self.store.requires_auth() => self.sign_out(),
            _ => {}
        }
    }

    /// Enter command mode
    pub fn enter_command_mode(&mut self) {
        self.command_mode = true;
        self.command_buffer.clear();
    }

    /// Exit command mode
    pub fn exit_command_mode(&mut self) {
        self.command_mode = false;
        self.command_buffer.clear();
    }

    pub fn is_command_mode(&self) -> bool {
        self.command_mode
    }

    pub fn get_command_buffer(&self) -> &str {
        &self.command_buffer
    }

    pub fn add_to_command_buffer(&mut self, c: char) {
        self.command_buffer.push(c);
    }

    pub fn remove_from_command_buffer(&mut self) {
        self.command_buffer.pop();
    }

    /// Whether typing ':' should open the command prompt instead of
    /// landing in a text field
    pub fn accepts_command_key(&self) -> bool {
        if self.command_mode {
            return false;
        }
        match self.view {
            AppView::MainMenu | AppView::Player => true,
            AppView::Settings => self.settings_form.field == SettingsField::Loop,
            AppView::Admin => {
                !self.needs_login()
                    && self.admin.confirm_delete.is_none()
                    && self.admin.form.is_none()
            }
        }
    }
}

/// Channels for the main menu: the single-source settings link first
/// (unless it is already one of the records), then the records.
pub fn merge_channels(records: Vec<VideoRecord>, settings: &Settings) -> Vec<VideoRecord> {
    let url = settings.video_url.trim();
    if url.is_empty() || records.iter().any(|r| r.url.trim() == url) {
        return records;
    }
    let mut channels = Vec::with_capacity(records.len() + 1);
    channels.push(VideoRecord {
        id: SETTINGS_CHANNEL_ID.to_string(),
        title: "Now showing".to_string(),
        url: url.to_string(),
        loop_enabled: settings.loop_enabled,
        created_at: None,
    });
    channels.extend(records);
    channels
}

/// Inline message for a form field
pub fn field_message(e: &Error) -> String {
    match e {
        Error::InvalidLink => {
            "Unsupported format. Use a YouTube, Cloudinary or direct video link.".to_string()
        }
        Error::MissingField("video link") => "Enter a YouTube or Cloudinary video link".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signage_core::{Fullscreen, LocalStore, PlayableSource, RenderSurface, SurfaceSignal};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        signals: VecDeque<SurfaceSignal>,
        mounted: Vec<String>,
        fullscreen: bool,
    }

    struct FakePlayer(Rc<RefCell<Recorder>>);

    impl RenderSurface for FakePlayer {
        fn mount(&mut self, source: &PlayableSource) -> signage_core::Result<()> {
            self.0.borrow_mut().mounted.push(source.url.clone());
            Ok(())
        }

        fn poll(&mut self) -> SurfaceSignal {
            self.0.borrow_mut().signals.pop_front().unwrap_or(SurfaceSignal::Pending)
        }

        fn unmount(&mut self) {}
    }

    impl Fullscreen for FakePlayer {
        fn request_fullscreen(&mut self) -> signage_core::Result<()> {
            self.0.borrow_mut().fullscreen = true;
            Ok(())
        }

        fn exit_fullscreen(&mut self) -> signage_core::Result<()> {
            self.0.borrow_mut().fullscreen = false;
            Ok(())
        }

        fn is_fullscreen(&self) -> bool {
            self.0.borrow().fullscreen
        }
    }

    fn app() -> (tempfile::TempDir, Rc<RefCell<Recorder>>, App) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("store.json")).unwrap();
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let mut app = App::new(
            SignageConfig::default(),
            Box::new(store),
            Box::new(FakePlayer(recorder.clone())),
        );
        app.update().unwrap();
        (dir, recorder, app)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key_event(key(KeyCode::Char(c))).unwrap();
        }
    }

    fn add_channel(app: &mut App, title: &str, url: &str) {
        app.store.create(&VideoDraft::new(title, url)).unwrap();
        app.refresh_channels();
    }

    #[test]
    fn test_settings_form_rejects_not_a_link() {
        let (_dir, _recorder, mut app) = app();
        app.open_settings(None);
        type_text(&mut app, "not a link");
        app.handle_key_event(key(KeyCode::Enter)).unwrap();
        app.update().unwrap();

        assert_eq!(app.view, AppView::Settings);
        assert!(app.settings_form.error.as_deref().unwrap().contains("Unsupported"));
        assert!(app.store.settings().unwrap().video_url.is_empty());
    }

    #[test]
    fn test_settings_save_adds_channel() {
        let (_dir, _recorder, mut app) = app();
        app.open_settings(None);
        app.handle_paste("https://res.cloudinary.com/demo/video/upload/sample.mp4");
        app.handle_key_event(key(KeyCode::Enter)).unwrap();
        app.update().unwrap();

        assert_eq!(app.view, AppView::MainMenu);
        assert_eq!(app.channels.len(), 1);
        assert_eq!(app.channels[0].id, SETTINGS_CHANNEL_ID);
    }

    #[test]
    fn test_play_ready_and_stop_returns_focus() {
        let (_dir, recorder, mut app) = app();
        add_channel(&mut app, "One", "https://youtu.be/dQw4w9WgXcQ");
        add_channel(&mut app, "Two", "https://cdn.example.com/two.mp4");

        app.handle_key_event(key(KeyCode::Down)).unwrap();
        app.handle_key_event(key(KeyCode::Enter)).unwrap();
        assert_eq!(app.view, AppView::Player);
        assert_eq!(app.playback.state(), &PlaybackState::Loading);
        assert_eq!(recorder.borrow().mounted, ["https://cdn.example.com/two.mp4"]);

        recorder.borrow_mut().signals.push_back(SurfaceSignal::Ready);
        app.update().unwrap();
        assert_eq!(app.playback.state(), &PlaybackState::Playing);

        app.handle_key_event(key(KeyCode::Esc)).unwrap();
        app.update().unwrap();
        assert_eq!(app.view, AppView::MainMenu);
        assert_eq!(app.selected, 0);
        assert!(!recorder.borrow().fullscreen);
    }

    #[test]
    fn test_switching_channels_remounts() {
        let (_dir, recorder, mut app) = app();
        add_channel(&mut app, "One", "https://youtu.be/dQw4w9WgXcQ");
        add_channel(&mut app, "Two", "https://cdn.example.com/two.mp4");
        app.play_channel(0);
        recorder.borrow_mut().signals.push_back(SurfaceSignal::Ready);
        app.update().unwrap();
        assert_eq!(app.playback.state(), &PlaybackState::Playing);

        crate::commands::handle_command(&mut app, "play 2").unwrap();
        assert_eq!(app.playback.state(), &PlaybackState::Loading);
        assert_eq!(app.active.as_ref().map(|r| r.title.as_str()), Some("Two"));
        assert_eq!(
            app.playback.source().map(|s| s.url.as_str()),
            Some("https://cdn.example.com/two.mp4")
        );
        let mounted = recorder.borrow().mounted.clone();
        assert_eq!(mounted.len(), 2);
        assert_eq!(mounted[1], "https://cdn.example.com/two.mp4");

        app.update().unwrap();
        assert_eq!(app.view, AppView::Player);
        assert_eq!(app.selected, 1);
    }

    #[test]
    fn test_quit_key_leaves_error_state() {
        let (_dir, _recorder, mut app) = app();
        app.channels = vec![VideoRecord {
            id: "vid_1".into(),
            title: "Broken".into(),
            url: "https://www.youtube.com/".into(),
            loop_enabled: true,
            created_at: None,
        }];
        app.play_channel(0);
        assert!(matches!(app.playback.state(), PlaybackState::Error(_)));

        app.handle_key_event(key(KeyCode::Char('q'))).unwrap();
        assert_eq!(app.view, AppView::MainMenu);
        assert_eq!(app.playback.state(), &PlaybackState::Idle);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_external_close_folds_back_to_menu() {
        let (_dir, recorder, mut app) = app();
        add_channel(&mut app, "One", "https://youtu.be/dQw4w9WgXcQ");
        app.play_channel(0);
        recorder.borrow_mut().signals.extend([SurfaceSignal::Ready, SurfaceSignal::Closed]);
        app.update().unwrap();
        app.update().unwrap();

        assert_eq!(app.view, AppView::MainMenu);
        assert!(app.active.is_none());
        assert_eq!(recorder.borrow().mounted.len(), 1);
    }

    #[test]
    fn test_unresolvable_channel_shows_error_with_recovery() {
        let (_dir, _recorder, mut app) = app();
        app.channels = vec![VideoRecord {
            id: "vid_1".into(),
            title: "Broken".into(),
            url: "https://www.youtube.com/".into(),
            loop_enabled: true,
            created_at: None,
        }];
        app.play_channel(0);
        assert!(matches!(app.playback.state(), PlaybackState::Error(_)));
        assert_eq!(app.view, AppView::Player);

        app.handle_key_event(key(KeyCode::Char('s'))).unwrap();
        assert_eq!(app.view, AppView::Settings);
        assert_eq!(app.settings_form.url, "https://www.youtube.com/");
        assert_eq!(app.playback.state(), &PlaybackState::Idle);
    }

    #[test]
    fn test_two_step_delete() {
        let (_dir, _recorder, mut app) = app();
        add_channel(&mut app, "One", "https://youtu.be/dQw4w9WgXcQ");
        app.open_admin();

        app.handle_key_event(key(KeyCode::Char('d'))).unwrap();
        assert!(app.admin.confirm_delete.is_some());
        app.handle_key_event(key(KeyCode::Esc)).unwrap();
        assert!(app.admin.confirm_delete.is_none());
        assert_eq!(app.store.list().unwrap().len(), 1);

        app.handle_key_event(key(KeyCode::Char('d'))).unwrap();
        app.handle_key_event(key(KeyCode::Char('y'))).unwrap();
        assert!(app.admin.processing.is_some());
        app.update().unwrap();

        assert!(app.admin.processing.is_none());
        assert!(app.admin.records.is_empty());
        assert!(app.store.list().unwrap().is_empty());
    }

    #[test]
    fn test_admin_form_validates_before_saving() {
        let (_dir, _recorder, mut app) = app();
        app.open_admin();
        app.handle_key_event(key(KeyCode::Char('n'))).unwrap();
        type_text(&mut app, "Lobby");
        app.handle_key_event(key(KeyCode::Tab)).unwrap();
        type_text(&mut app, "nope");
        app.handle_key_event(key(KeyCode::Enter)).unwrap();
        assert!(app.admin.form.as_ref().unwrap().error.is_some());
        assert!(app.pending.is_none());

        for _ in 0..4 {
            app.handle_key_event(key(KeyCode::Backspace)).unwrap();
        }
        app.handle_paste("<iframe src=\"https://www.youtube.com/embed/abc12345678\"></iframe>");
        app.handle_key_event(key(KeyCode::Enter)).unwrap();
        app.update().unwrap();

        assert!(app.admin.form.is_none());
        assert_eq!(app.admin.records.len(), 1);
        assert_eq!(app.admin.records[0].title, "Lobby");
    }

    #[test]
    fn test_merge_channels_skips_duplicate_settings_link() {
        let record = VideoRecord {
            id: "vid_1".into(),
            title: "One".into(),
            url: "https://youtu.be/dQw4w9WgXcQ".into(),
            loop_enabled: true,
            created_at: None,
        };
        let settings = Settings {
            video_url: "https://youtu.be/dQw4w9WgXcQ".into(),
            loop_enabled: true,
        };
        assert_eq!(merge_channels(vec![record.clone()], &settings), vec![record]);
        assert!(merge_channels(Vec::new(), &Settings::default()).is_empty());
    }
}
