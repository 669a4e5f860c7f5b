//! Application state and the reducer that owns every change to it.
//!
//! Input handlers and background work never touch [`AppState`] directly: they produce a
//! [`Msg`], and [`AppState::update`] applies it, possibly asking for a side effect in the
//! form of a [`Command`]. The result of that effect comes back as another `Msg`.

use crate::api::ApiError;
use crate::priority;
use crate::speech::{self, ParsedTask};
use crate::task::{FormField, Task, TaskFields, TaskForm, TaskId, TaskStatus, User, UserId};
use crate::voice::{VoiceEvent, VoiceMachine};
use chrono::NaiveDate;
use tracing::info;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Auth,
    Tasks,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AuthTab {
    #[default]
    Login,
    Register,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    #[default]
    Email,
    Password,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AuthForm {
    pub tab: AuthTab,
    pub email: String,
    pub password: String,
    pub focus: AuthField,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(TaskStatus),
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 4] = [
        StatusFilter::All,
        StatusFilter::Only(TaskStatus::Pendente),
        StatusFilter::Only(TaskStatus::EmAndamento),
        StatusFilter::Only(TaskStatus::Concluida),
    ];

    pub fn status(self) -> Option<TaskStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Only(status) => Some(status),
        }
    }

    pub fn matches(self, task: &Task) -> bool {
        self.status().map_or(true, |status| task.status == status)
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Only(status) => status.label(),
        }
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Most recently created first.
    #[default]
    Newest,
    Priority,
    DueDate,
}

impl SortKey {
    pub fn label(self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::Priority => "priority",
            SortKey::DueDate => "due date",
        }
    }

    pub fn next(self) -> Self {
        match self {
            SortKey::Newest => SortKey::Priority,
            SortKey::Priority => SortKey::DueDate,
            SortKey::DueDate => SortKey::Newest,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    List,
    Matrix,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Tasks,
    NewTask(FormField),
    Draft(FormField),
    Transcript,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// The one task being edited in place, and its unsaved draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub task_id: TaskId,
    pub draft: TaskForm,
}

#[derive(Debug)]
pub enum Msg {
    Tick(NaiveDate),
    Quit,

    SwitchAuthTab,
    AuthFocusNext,
    AuthInput(char),
    AuthBackspace,
    SubmitAuth,
    Registered(Result<User, ApiError>),
    LoggedIn(Result<User, ApiError>),
    Logout,

    Reload,
    TasksLoaded(Result<Vec<Task>, ApiError>),
    CycleFilter,
    SetFilter(StatusFilter),
    CycleSort,
    ToggleView,
    SelectNext,
    SelectPrev,

    FocusNewTask,
    OpenTranscript,
    FocusNext,
    FocusPrev,
    Input(char),
    Backspace,
    CycleStatus { forward: bool },
    Submit,
    Escape,
    TaskCreated(Result<Task, ApiError>),

    StartEdit,
    TaskUpdated(Result<Task, ApiError>),

    RequestDelete,
    ConfirmDelete,
    CancelDelete,
    TaskDeleted(Result<(), ApiError>),

    ToggleVoice,
    CancelVoice,
    Voice(VoiceEvent),
}

/// Side effects requested by the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register { email: String, password: String },
    Login { email: String, password: String },
    LoadTasks { user_id: UserId, status: Option<TaskStatus> },
    CreateTask { user_id: UserId, fields: TaskFields },
    UpdateTask { task_id: TaskId, fields: TaskFields },
    DeleteTask { task_id: TaskId },
    StartVoice,
    StopVoice,
}

pub const VOICE_PROMPT: &str =
    "Listening... say: title; description; start date; due date; status.";

#[derive(Debug)]
pub struct AppState {
    pub screen: Screen,
    pub auth: AuthForm,
    pub session: Option<User>,
    /// Last task list fetched from the server.
    pub tasks: Vec<Task>,
    pub filter: StatusFilter,
    pub sort: SortKey,
    pub view: ViewMode,
    pub selected: usize,
    pub focus: Focus,
    pub new_task: TaskForm,
    pub editing: Option<EditSession>,
    pub pending_delete: Option<TaskId>,
    pub transcript: String,
    pub voice: VoiceMachine,
    pub voice_supported: bool,
    pub notice: Option<Notice>,
    pub today: NaiveDate,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(today: NaiveDate, voice_supported: bool) -> Self {
        Self {
            screen: Screen::Auth,
            auth: AuthForm::default(),
            session: None,
            tasks: Vec::new(),
            filter: StatusFilter::All,
            sort: SortKey::Newest,
            view: ViewMode::List,
            selected: 0,
            focus: Focus::Tasks,
            new_task: TaskForm::default(),
            editing: None,
            pending_delete: None,
            transcript: String::new(),
            voice: VoiceMachine::default(),
            voice_supported,
            notice: None,
            today,
            should_quit: false,
        }
    }

    /// Tasks matching the filter, in the current sort order.
    pub fn visible_tasks(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().filter(|t| self.filter.matches(t)).collect();
        match self.sort {
            SortKey::Newest => tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortKey::Priority => {
                tasks.sort_by(|a, b| priority::compare_by_priority(a, b, self.today))
            }
            SortKey::DueDate => tasks.sort_by(|a, b| priority::compare_by_schedule(a, b)),
        }
        tasks
    }

    /// Visible tasks in the order the current view shows them; `selected` indexes this.
    pub fn navigation_order(&self) -> Vec<&Task> {
        let visible = self.visible_tasks();
        match self.view {
            ViewMode::List => visible,
            ViewMode::Matrix => priority::Matrix::group(visible, self.today).in_order(),
        }
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.navigation_order().get(self.selected).copied()
    }

    fn clamp_selection(&mut self) {
        let count = self.navigation_order().len();
        self.selected = self.selected.min(count.saturating_sub(1));
    }

    fn load_tasks(&self) -> Option<Command> {
        self.session.as_ref().map(|user| Command::LoadTasks {
            user_id: user.id,
            status: self.filter.status(),
        })
    }

    pub fn update(&mut self, msg: Msg) -> Option<Command> {
        match msg {
            Msg::Tick(today) => {
                self.today = today;
                None
            }
            Msg::Quit => {
                self.should_quit = true;
                self.voice.is_listening().then(|| {
                    self.voice.cancel();
                    Command::StopVoice
                })
            }

            Msg::SwitchAuthTab => {
                self.auth.tab = match self.auth.tab {
                    AuthTab::Login => AuthTab::Register,
                    AuthTab::Register => AuthTab::Login,
                };
                self.notice = None;
                None
            }
            Msg::AuthFocusNext => {
                self.auth.focus = match self.auth.focus {
                    AuthField::Email => AuthField::Password,
                    AuthField::Password => AuthField::Email,
                };
                None
            }
            Msg::AuthInput(c) => {
                self.auth_field_mut().push(c);
                None
            }
            Msg::AuthBackspace => {
                self.auth_field_mut().pop();
                None
            }
            Msg::SubmitAuth => self.submit_auth(),
            Msg::Registered(result) => {
                match result {
                    Ok(user) => {
                        info!(email = %user.email, "registered");
                        self.auth.tab = AuthTab::Login;
                        self.auth.password.clear();
                        self.auth.focus = AuthField::Password;
                        self.notice =
                            Some(Notice::success("Account created! You can sign in now."));
                    }
                    Err(err) => self.notice = Some(Notice::error(err.to_string())),
                }
                None
            }
            Msg::LoggedIn(result) => match result {
                Ok(user) => {
                    info!(email = %user.email, "signed in");
                    self.session = Some(user);
                    self.screen = Screen::Tasks;
                    self.auth.password.clear();
                    self.focus = Focus::Tasks;
                    self.selected = 0;
                    self.notice = None;
                    self.load_tasks()
                }
                Err(err) => {
                    self.notice = Some(Notice::error(err.to_string()));
                    None
                }
            },
            Msg::Logout => {
                info!("signed out");
                let stop = self.voice.is_listening().then(|| {
                    self.voice.cancel();
                    Command::StopVoice
                });
                self.session = None;
                self.tasks.clear();
                self.editing = None;
                self.pending_delete = None;
                self.selected = 0;
                self.focus = Focus::Tasks;
                self.screen = Screen::Auth;
                self.auth = AuthForm::default();
                self.notice = None;
                stop
            }

            Msg::Reload => {
                if self.session.is_none() {
                    self.tasks.clear();
                }
                self.notice = None;
                self.load_tasks()
            }
            Msg::TasksLoaded(result) => {
                match result {
                    Ok(tasks) => {
                        self.tasks = tasks;
                        if let Some(edit) = &self.editing {
                            if !self.tasks.iter().any(|t| t.id == edit.task_id) {
                                self.editing = None;
                                self.focus = Focus::Tasks;
                            }
                        }
                        self.clamp_selection();
                    }
                    Err(err) => {
                        self.notice = Some(Notice::error(format!("Error loading tasks: {err}")))
                    }
                }
                None
            }
            Msg::CycleFilter => self.update(Msg::SetFilter(self.filter.next())),
            Msg::SetFilter(filter) => {
                self.filter = filter;
                self.selected = 0;
                self.load_tasks()
            }
            Msg::CycleSort => {
                self.sort = self.sort.next();
                None
            }
            Msg::ToggleView => {
                let current = self.selected_task().map(|t| t.id);
                self.view = match self.view {
                    ViewMode::List => ViewMode::Matrix,
                    ViewMode::Matrix => ViewMode::List,
                };
                self.selected = self
                    .navigation_order()
                    .iter()
                    .position(|t| Some(t.id) == current)
                    .unwrap_or(0);
                None
            }
            Msg::SelectNext => {
                self.selected = self.selected.saturating_add(1);
                self.clamp_selection();
                None
            }
            Msg::SelectPrev => {
                self.selected = self.selected.saturating_sub(1);
                None
            }

            Msg::FocusNewTask => {
                self.focus = Focus::NewTask(FormField::Title);
                None
            }
            Msg::OpenTranscript => {
                self.transcript.clear();
                self.focus = Focus::Transcript;
                None
            }
            Msg::FocusNext | Msg::FocusPrev => {
                let forward = matches!(msg, Msg::FocusNext);
                let step = |field: FormField| if forward { field.next() } else { field.prev() };
                self.focus = match self.focus {
                    Focus::NewTask(field) => Focus::NewTask(step(field)),
                    Focus::Draft(field) => Focus::Draft(step(field)),
                    other => other,
                };
                None
            }
            Msg::Input(c) => {
                if let Some(text) = self.focused_text_mut() {
                    text.push(c);
                }
                None
            }
            Msg::Backspace => {
                if let Some(text) = self.focused_text_mut() {
                    text.pop();
                }
                None
            }
            Msg::CycleStatus { forward } => {
                let cycle = |s: TaskStatus| if forward { s.next() } else { s.prev() };
                match self.focus {
                    Focus::NewTask(FormField::Status) => {
                        self.new_task.status = cycle(self.new_task.status)
                    }
                    Focus::Draft(FormField::Status) => {
                        if let Some(edit) = self.editing.as_mut() {
                            edit.draft.status = cycle(edit.draft.status);
                        }
                    }
                    _ => {}
                }
                None
            }
            Msg::Submit => match self.focus {
                Focus::NewTask(_) => self.submit_new_task(),
                Focus::Draft(_) => self.save_draft(),
                Focus::Transcript => {
                    let transcript = std::mem::take(&mut self.transcript);
                    self.focus = Focus::Tasks;
                    let parsed = speech::parse_transcript(&transcript, self.today);
                    self.apply_parsed(
                        parsed,
                        "Filled in from the transcript. Review and press Enter to add.",
                    );
                    None
                }
                Focus::Tasks => self.update(Msg::StartEdit),
            },
            Msg::Escape => {
                match self.focus {
                    Focus::Draft(_) => {
                        self.editing = None;
                    }
                    Focus::Transcript => self.transcript.clear(),
                    Focus::NewTask(_) | Focus::Tasks => {}
                }
                self.focus = Focus::Tasks;
                None
            }
            Msg::TaskCreated(result) => match result {
                Ok(task) => {
                    info!(task_id = task.id, "task created");
                    self.new_task = TaskForm::default();
                    self.focus = Focus::Tasks;
                    self.notice = Some(Notice::success("Task added!"));
                    self.load_tasks()
                }
                Err(err) => {
                    self.notice = Some(Notice::error(err.to_string()));
                    None
                }
            },

            Msg::StartEdit => {
                let Some(task) = self.selected_task() else {
                    return None;
                };
                self.editing = Some(EditSession {
                    task_id: task.id,
                    draft: TaskForm::from_task(task),
                });
                self.focus = Focus::Draft(FormField::Title);
                self.notice = None;
                None
            }
            Msg::TaskUpdated(result) => match result {
                Ok(task) => {
                    info!(task_id = task.id, "task updated");
                    self.editing = None;
                    self.focus = Focus::Tasks;
                    self.notice = Some(Notice::success("Task updated."));
                    self.load_tasks()
                }
                Err(err) => {
                    self.notice = Some(Notice::error(format!("Error updating task: {err}")));
                    None
                }
            },

            Msg::RequestDelete => {
                self.pending_delete = self.selected_task().map(|t| t.id);
                None
            }
            Msg::ConfirmDelete => {
                let task_id = self.pending_delete.take()?;
                self.notice = None;
                Some(Command::DeleteTask { task_id })
            }
            Msg::CancelDelete => {
                self.pending_delete = None;
                None
            }
            Msg::TaskDeleted(result) => match result {
                Ok(()) => {
                    self.notice = Some(Notice::success("Task deleted."));
                    self.load_tasks()
                }
                Err(err) => {
                    self.notice = Some(Notice::error(format!("Error deleting task: {err}")));
                    None
                }
            },

            Msg::ToggleVoice => {
                if !self.voice_supported {
                    self.notice = Some(Notice::error(
                        "Voice capture is not available: configure a recognizer command.",
                    ));
                    return None;
                }
                if self.voice.is_listening() {
                    return Some(Command::StopVoice);
                }
                self.voice.start();
                self.notice = Some(Notice::info(VOICE_PROMPT));
                Some(Command::StartVoice)
            }
            Msg::CancelVoice => self.voice.is_listening().then(|| {
                self.voice.cancel();
                self.notice = None;
                Command::StopVoice
            }),
            Msg::Voice(event) => {
                self.voice.handle(event, self.today);
                match self.voice.take_outcome() {
                    Some(Ok(parsed)) => self.apply_parsed(
                        parsed,
                        "Filled in by voice. Review and press Enter to add.",
                    ),
                    Some(Err(err)) => self.notice = Some(Notice::error(err.to_string())),
                    None => {}
                }
                None
            }
        }
    }

    fn auth_field_mut(&mut self) -> &mut String {
        match self.auth.focus {
            AuthField::Email => &mut self.auth.email,
            AuthField::Password => &mut self.auth.password,
        }
    }

    fn focused_text_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            Focus::NewTask(field) => self.new_task.text_mut(field),
            Focus::Draft(field) => self.editing.as_mut()?.draft.text_mut(field),
            Focus::Transcript => Some(&mut self.transcript),
            Focus::Tasks => None,
        }
    }

    fn submit_auth(&mut self) -> Option<Command> {
        let email = self.auth.email.trim().to_string();
        let password = self.auth.password.trim().to_string();
        if email.is_empty() || password.is_empty() {
            self.notice = Some(Notice::error("Fill in email and password."));
            return None;
        }
        self.notice = None;
        Some(match self.auth.tab {
            AuthTab::Login => Command::Login { email, password },
            AuthTab::Register => Command::Register { email, password },
        })
    }

    fn submit_new_task(&mut self) -> Option<Command> {
        let fields = match self.new_task.to_fields(self.today) {
            Ok(fields) => fields,
            Err(err) => {
                self.notice = Some(Notice::error(err.to_string()));
                return None;
            }
        };
        let Some(user) = &self.session else {
            self.notice = Some(Notice::error("You need to be signed in to create tasks."));
            return None;
        };
        self.notice = None;
        Some(Command::CreateTask {
            user_id: user.id,
            fields,
        })
    }

    fn save_draft(&mut self) -> Option<Command> {
        let edit = self.editing.as_ref()?;
        match edit.draft.to_fields(self.today) {
            Ok(fields) => {
                let original = self.tasks.iter().find(|t| t.id == edit.task_id);
                if original.is_some_and(|task| task.fields() == fields) {
                    self.editing = None;
                    self.focus = Focus::Tasks;
                    self.notice = Some(Notice::info("No changes to save."));
                    return None;
                }
                self.notice = None;
                Some(Command::UpdateTask {
                    task_id: edit.task_id,
                    fields,
                })
            }
            Err(err) => {
                self.notice = Some(Notice::error(err.to_string()));
                None
            }
        }
    }

    /// Copies the non-empty parts of a parsed transcript into the new-task form.
    fn apply_parsed(&mut self, parsed: ParsedTask, message: &str) {
        if parsed.is_empty() {
            self.notice = Some(Notice::error("Could not find anything to fill in."));
            return;
        }
        let form = &mut self.new_task;
        if !parsed.title.is_empty() {
            form.title = parsed.title;
        }
        if !parsed.description.is_empty() {
            form.description = parsed.description;
        }
        if let Some(date) = parsed.data_inicial {
            form.data_inicial = date.to_string();
        }
        if let Some(date) = parsed.data_limite {
            form.data_limite = date.to_string();
        }
        if let Some(status) = parsed.status {
            form.status = status;
        }
        self.focus = Focus::NewTask(FormField::Title);
        self.notice = Some(Notice::success(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::VoiceError;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
    }

    fn user() -> User {
        User {
            id: 7,
            email: "ana@example.com".to_string(),
        }
    }

    fn task(id: TaskId, title: &str, status: TaskStatus, hours_ago: i64) -> Task {
        Task {
            id,
            user_id: Some(7),
            title: title.to_string(),
            description: String::new(),
            data_inicial: None,
            data_limite: None,
            status,
            created_at: today().and_hms_opt(12, 0, 0).unwrap() - Duration::hours(hours_ago),
        }
    }

    fn signed_in(tasks: Vec<Task>) -> AppState {
        let mut state = AppState::new(today(), true);
        state.update(Msg::LoggedIn(Ok(user())));
        state.update(Msg::TasksLoaded(Ok(tasks)));
        state
    }

    fn server_error(message: &str) -> ApiError {
        ApiError::Server {
            status: 400,
            message: message.to_string(),
        }
    }

    fn type_text(state: &mut AppState, text: &str) {
        for c in text.chars() {
            state.update(Msg::Input(c));
        }
    }

    #[test]
    fn login_requires_email_and_password() {
        let mut state = AppState::new(today(), false);

        let command = state.update(Msg::SubmitAuth);

        assert_eq!(command, None);
        assert_eq!(state.notice.unwrap().text, "Fill in email and password.");
    }

    #[test]
    fn login_success_loads_tasks() {
        // Arrange
        let mut state = AppState::new(today(), false);
        for c in "ana@example.com".chars() {
            state.update(Msg::AuthInput(c));
        }
        state.update(Msg::AuthFocusNext);
        for c in "segredo".chars() {
            state.update(Msg::AuthInput(c));
        }

        // Act
        let login = state.update(Msg::SubmitAuth);
        let load = state.update(Msg::LoggedIn(Ok(user())));

        // Assert
        assert_eq!(
            login,
            Some(Command::Login {
                email: "ana@example.com".to_string(),
                password: "segredo".to_string()
            })
        );
        assert_eq!(
            load,
            Some(Command::LoadTasks {
                user_id: 7,
                status: None
            })
        );
        assert_eq!(state.screen, Screen::Tasks);
        assert!(state.auth.password.is_empty());
    }

    #[test]
    fn failed_login_shows_server_message() {
        let mut state = AppState::new(today(), false);

        state.update(Msg::LoggedIn(Err(server_error("E-mail ou senha inválidos."))));

        assert_eq!(state.screen, Screen::Auth);
        let notice = state.notice.unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.text, "E-mail ou senha inválidos.");
    }

    #[test]
    fn registration_switches_to_login() {
        let mut state = AppState::new(today(), false);
        state.update(Msg::SwitchAuthTab);
        state.auth.email = "ana@example.com".into();
        state.auth.password = "segredo".into();

        let command = state.update(Msg::SubmitAuth);
        state.update(Msg::Registered(Ok(user())));

        assert!(matches!(command, Some(Command::Register { .. })));
        assert_eq!(state.auth.tab, AuthTab::Login);
        assert_eq!(state.auth.email, "ana@example.com");
        assert_eq!(state.notice.unwrap().kind, NoticeKind::Success);
    }

    #[test]
    fn failed_reload_keeps_previous_tasks() {
        let mut state = signed_in(vec![task(1, "a", TaskStatus::Pendente, 1)]);

        state.update(Msg::TasksLoaded(Err(server_error("boom"))));

        assert_eq!(state.tasks.len(), 1);
        assert_eq!(state.notice.unwrap().text, "Error loading tasks: boom");
    }

    #[test]
    fn changing_filter_reloads_with_status() {
        let mut state = signed_in(vec![]);

        let command = state.update(Msg::CycleFilter);

        assert_eq!(state.filter, StatusFilter::Only(TaskStatus::Pendente));
        assert_eq!(
            command,
            Some(Command::LoadTasks {
                user_id: 7,
                status: Some(TaskStatus::Pendente)
            })
        );
    }

    #[test]
    fn visible_tasks_apply_filter_and_newest_first() {
        let mut state = signed_in(vec![
            task(1, "old", TaskStatus::Pendente, 10),
            task(2, "new", TaskStatus::Pendente, 1),
            task(3, "done", TaskStatus::Concluida, 5),
        ]);

        let all: Vec<TaskId> = state.visible_tasks().iter().map(|t| t.id).collect();
        state.filter = StatusFilter::Only(TaskStatus::Pendente);
        let pending: Vec<TaskId> = state.visible_tasks().iter().map(|t| t.id).collect();

        assert_eq!(all, vec![2, 3, 1]);
        assert_eq!(pending, vec![2, 1]);
    }

    #[test]
    fn matrix_navigation_follows_zones_on_screen() {
        // Arrange
        let mut undated = task(1, "sem prazo", TaskStatus::Pendente, 0);
        undated.data_limite = None;
        let mut tomorrow = task(2, "amanha", TaskStatus::Pendente, 5);
        tomorrow.data_limite = today().succ_opt();
        let mut later = task(3, "depois", TaskStatus::Pendente, 10);
        later.data_limite = Some(today() + Duration::days(30));
        let mut state = signed_in(vec![undated, tomorrow, later]);

        // Act
        state.update(Msg::ToggleView);
        let kept = state.selected_task().map(|t| t.id);
        state.update(Msg::SelectPrev);
        let mut visited = vec![state.selected_task().map(|t| t.id)];
        for _ in 0..3 {
            state.update(Msg::SelectNext);
            visited.push(state.selected_task().map(|t| t.id));
        }
        state.update(Msg::RequestDelete);

        // Assert
        assert_eq!(kept, Some(1));
        assert_eq!(visited, vec![Some(2), Some(1), Some(3), Some(3)]);
        assert_eq!(state.pending_delete, Some(3));
    }

    #[test]
    fn new_task_requires_title() {
        let mut state = signed_in(vec![]);
        state.update(Msg::FocusNewTask);

        let command = state.update(Msg::Submit);

        assert_eq!(command, None);
        assert_eq!(state.notice.unwrap().text, "Task title is required.");
    }

    #[test]
    fn new_task_requires_session() {
        let mut state = AppState::new(today(), false);
        state.update(Msg::FocusNewTask);
        type_text(&mut state, "Comprar leite");

        let command = state.update(Msg::Submit);

        assert_eq!(command, None);
        assert_eq!(
            state.notice.unwrap().text,
            "You need to be signed in to create tasks."
        );
    }

    #[test]
    fn new_task_submits_typed_fields_and_resets_on_success() {
        // Arrange
        let mut state = signed_in(vec![]);
        state.update(Msg::FocusNewTask);
        type_text(&mut state, "Comprar leite");
        state.update(Msg::FocusNext);
        type_text(&mut state, "integral");
        state.update(Msg::FocusNext);
        state.update(Msg::FocusNext);
        type_text(&mut state, "amanhã");
        state.update(Msg::FocusNext);
        state.update(Msg::CycleStatus { forward: true });

        // Act
        let command = state.update(Msg::Submit);
        let created = task(9, "Comprar leite", TaskStatus::EmAndamento, 0);
        let reload = state.update(Msg::TaskCreated(Ok(created)));

        // Assert
        assert_eq!(
            command,
            Some(Command::CreateTask {
                user_id: 7,
                fields: TaskFields {
                    title: "Comprar leite".into(),
                    description: "integral".into(),
                    data_inicial: None,
                    data_limite: Some(today() + Duration::days(1)),
                    status: TaskStatus::EmAndamento,
                }
            })
        );
        assert!(matches!(reload, Some(Command::LoadTasks { .. })));
        assert_eq!(state.new_task, TaskForm::default());
        assert_eq!(state.notice.unwrap().text, "Task added!");
    }

    #[test]
    fn edit_draft_is_saved_only_on_submit() {
        // Arrange
        let mut state = signed_in(vec![task(4, "Ler livro", TaskStatus::Pendente, 1)]);
        state.update(Msg::StartEdit);
        type_text(&mut state, " hoje");

        // Act
        let command = state.update(Msg::Submit);

        // Assert
        assert_eq!(state.tasks[0].title, "Ler livro");
        match command {
            Some(Command::UpdateTask { task_id, fields }) => {
                assert_eq!(task_id, 4);
                assert_eq!(fields.title, "Ler livro hoje");
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(state.editing.is_some());

        let updated = task(4, "Ler livro hoje", TaskStatus::Pendente, 1);
        let reload = state.update(Msg::TaskUpdated(Ok(updated)));
        assert!(matches!(reload, Some(Command::LoadTasks { .. })));
        assert!(state.editing.is_none());
    }

    #[test]
    fn unchanged_draft_closes_without_request() {
        // Arrange
        let mut state = signed_in(vec![task(4, "Ler livro", TaskStatus::Pendente, 1)]);
        state.update(Msg::StartEdit);
        type_text(&mut state, "!");
        state.update(Msg::Backspace);

        // Act
        let command = state.update(Msg::Submit);

        // Assert
        assert_eq!(command, None);
        assert!(state.editing.is_none());
        assert_eq!(state.focus, Focus::Tasks);
        assert_eq!(state.notice.unwrap().text, "No changes to save.");
    }

    #[test]
    fn cancel_discards_draft() {
        let mut state = signed_in(vec![task(4, "Ler livro", TaskStatus::Pendente, 1)]);
        state.update(Msg::StartEdit);
        type_text(&mut state, "!!!");

        state.update(Msg::Escape);

        assert!(state.editing.is_none());
        assert_eq!(state.focus, Focus::Tasks);
    }

    #[test]
    fn failed_update_keeps_draft() {
        let mut state = signed_in(vec![task(4, "Ler livro", TaskStatus::Pendente, 1)]);
        state.update(Msg::StartEdit);

        state.update(Msg::TaskUpdated(Err(server_error("Tarefa não encontrada"))));

        assert!(state.editing.is_some());
        assert_eq!(
            state.notice.unwrap().text,
            "Error updating task: Tarefa não encontrada"
        );
    }

    #[test]
    fn delete_needs_confirmation() {
        let mut state = signed_in(vec![task(4, "Ler livro", TaskStatus::Pendente, 1)]);

        assert_eq!(state.update(Msg::RequestDelete), None);
        assert_eq!(state.pending_delete, Some(4));
        state.update(Msg::CancelDelete);
        assert_eq!(state.update(Msg::ConfirmDelete), None);

        state.update(Msg::RequestDelete);
        assert_eq!(
            state.update(Msg::ConfirmDelete),
            Some(Command::DeleteTask { task_id: 4 })
        );
        assert_eq!(state.pending_delete, None);
    }

    #[test]
    fn logout_clears_session_state() {
        let mut state = signed_in(vec![task(4, "Ler livro", TaskStatus::Pendente, 1)]);
        state.update(Msg::StartEdit);

        state.update(Msg::Logout);

        assert_eq!(state.screen, Screen::Auth);
        assert!(state.session.is_none());
        assert!(state.tasks.is_empty());
        assert!(state.editing.is_none());
    }

    #[test]
    fn voice_unsupported_explains_itself() {
        let mut state = AppState::new(today(), false);

        let command = state.update(Msg::ToggleVoice);

        assert_eq!(command, None);
        assert_eq!(state.notice.unwrap().kind, NoticeKind::Error);
    }

    #[test]
    fn voice_session_fills_the_form() {
        // Arrange
        let mut state = signed_in(vec![]);

        // Act
        let start = state.update(Msg::ToggleVoice);
        let stop = state.update(Msg::ToggleVoice);
        state.update(Msg::Voice(VoiceEvent::Transcript(
            "titulo: Comprar leite; prazo: amanhã; status: em andamento".into(),
        )));
        state.update(Msg::Voice(VoiceEvent::Ended));

        // Assert
        assert_eq!(start, Some(Command::StartVoice));
        assert_eq!(stop, Some(Command::StopVoice));
        assert_eq!(state.new_task.title, "Comprar leite");
        assert_eq!(state.new_task.data_limite, "2025-03-13");
        assert_eq!(state.new_task.status, TaskStatus::EmAndamento);
        assert_eq!(state.focus, Focus::NewTask(FormField::Title));
        assert!(!state.voice.is_listening());
    }

    #[test]
    fn voice_error_becomes_hint() {
        let mut state = signed_in(vec![]);
        state.update(Msg::ToggleVoice);

        state.update(Msg::Voice(VoiceEvent::Error(VoiceError::AudioCapture)));

        assert_eq!(state.notice.unwrap().text, "No microphone was found.");
        assert!(!state.voice.is_listening());
    }

    #[test]
    fn typed_transcript_fills_the_form() {
        let mut state = signed_in(vec![]);
        state.update(Msg::OpenTranscript);
        type_text(&mut state, "Pagar luz; conta de março; concluida");

        state.update(Msg::Submit);

        assert_eq!(state.new_task.title, "Pagar luz");
        assert_eq!(state.new_task.description, "conta de março");
        assert_eq!(state.new_task.status, TaskStatus::Concluida);
        assert!(state.transcript.is_empty());
    }
}
