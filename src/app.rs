use crate::api::TaskApi;
use crate::state::{AppState, Command, Msg};
use crate::voice::{SpeechRecognizer, VoiceEvent};
use chrono::NaiveDate;
use std::sync::mpsc::{self, Receiver, Sender};

/// Feeds messages to the reducer and carries out the commands it returns.
///
/// API calls run inline, so each user action is finished before the next key is read.
/// Voice events arrive from the recognizer's thread and are drained by [`App::pump_voice`].
pub struct App<A: TaskApi> {
    pub state: AppState,
    api: A,
    recognizer: Box<dyn SpeechRecognizer>,
    voice_tx: Sender<VoiceEvent>,
    voice_rx: Receiver<VoiceEvent>,
}

impl<A: TaskApi> App<A> {
    pub fn new(api: A, recognizer: Box<dyn SpeechRecognizer>, today: NaiveDate) -> Self {
        let (voice_tx, voice_rx) = mpsc::channel();
        Self {
            state: AppState::new(today, recognizer.is_supported()),
            api,
            recognizer,
            voice_tx,
            voice_rx,
        }
    }

    pub fn dispatch(&mut self, msg: Msg) {
        let mut next = Some(msg);
        while let Some(msg) = next.take() {
            next = self.state.update(msg).and_then(|command| self.run(command));
        }
    }

    pub fn pump_voice(&mut self) {
        while let Ok(event) = self.voice_rx.try_recv() {
            self.dispatch(Msg::Voice(event));
        }
    }

    fn run(&mut self, command: Command) -> Option<Msg> {
        match command {
            Command::Register { email, password } => {
                Some(Msg::Registered(self.api.register(&email, &password)))
            }
            Command::Login { email, password } => {
                Some(Msg::LoggedIn(self.api.login(&email, &password)))
            }
            Command::LoadTasks { user_id, status } => {
                Some(Msg::TasksLoaded(self.api.list_tasks(user_id, status)))
            }
            Command::CreateTask { user_id, fields } => {
                Some(Msg::TaskCreated(self.api.create_task(user_id, &fields)))
            }
            Command::UpdateTask { task_id, fields } => {
                Some(Msg::TaskUpdated(self.api.update_task(task_id, &fields)))
            }
            Command::DeleteTask { task_id } => {
                Some(Msg::TaskDeleted(self.api.delete_task(task_id)))
            }
            Command::StartVoice => match self.recognizer.start(self.voice_tx.clone()) {
                Ok(()) => None,
                Err(err) => Some(Msg::Voice(VoiceEvent::Error(err))),
            },
            Command::StopVoice => {
                self.recognizer.stop();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, MockTaskApi};
    use crate::state::{NoticeKind, Screen};
    use crate::task::{FormField, Task, TaskFields, TaskId, TaskStatus, User, UserId};
    use crate::voice::{UnsupportedRecognizer, VoiceError};
    use mockall::predicate::eq;
    use std::cell::RefCell;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()
    }

    fn user() -> User {
        User {
            id: 7,
            email: "ana@example.com".to_string(),
        }
    }

    fn login(app: &mut App<impl TaskApi>) {
        app.state.auth.email = "ana@example.com".into();
        app.state.auth.password = "segredo".into();
        app.dispatch(Msg::SubmitAuth);
    }

    #[test]
    fn login_fetches_tasks_for_the_user() {
        // Arrange
        let mut api = MockTaskApi::new();
        api.expect_login().times(1).returning(|email, password| {
            assert_eq!(email, "ana@example.com");
            assert_eq!(password, "segredo");
            Ok(user())
        });
        api.expect_list_tasks()
            .with(eq(7), eq(None))
            .times(1)
            .returning(|_, _| Ok(vec![]));
        let mut app = App::new(api, Box::new(UnsupportedRecognizer), today());

        // Act
        login(&mut app);

        // Assert
        assert_eq!(app.state.screen, Screen::Tasks);
        assert_eq!(app.state.session, Some(user()));
        assert!(!app.state.voice_supported);
    }

    #[test]
    fn failed_delete_surfaces_without_retry() {
        // Arrange
        let mut api = MockTaskApi::new();
        api.expect_login().returning(|_, _| Ok(user()));
        api.expect_list_tasks().times(1).returning(|_, _| {
            Ok(vec![Task {
                id: 3,
                user_id: Some(7),
                title: "Ler".into(),
                description: String::new(),
                data_inicial: None,
                data_limite: None,
                status: TaskStatus::Pendente,
                created_at: today().and_hms_opt(8, 0, 0).unwrap(),
            }])
        });
        api.expect_delete_task().with(eq(3)).times(1).returning(|_| {
            Err(ApiError::Server {
                status: 500,
                message: "Request failed (HTTP 500)".into(),
            })
        });
        let mut app = App::new(api, Box::new(UnsupportedRecognizer), today());
        login(&mut app);

        // Act
        app.dispatch(Msg::RequestDelete);
        app.dispatch(Msg::ConfirmDelete);

        // Assert
        let notice = app.state.notice.clone().unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.text, "Error deleting task: Request failed (HTTP 500)");
        assert_eq!(app.state.tasks.len(), 1);
    }

    /// A tiny stand-in for the task server.
    #[derive(Default)]
    struct InMemoryApi {
        tasks: RefCell<Vec<Task>>,
    }

    impl TaskApi for InMemoryApi {
        fn register(&self, email: &str, _password: &str) -> Result<User, ApiError> {
            Ok(User {
                id: 7,
                email: email.to_string(),
            })
        }

        fn login(&self, email: &str, _password: &str) -> Result<User, ApiError> {
            Ok(User {
                id: 7,
                email: email.to_string(),
            })
        }

        fn list_tasks(
            &self,
            user_id: UserId,
            status: Option<TaskStatus>,
        ) -> Result<Vec<Task>, ApiError> {
            Ok(self
                .tasks
                .borrow()
                .iter()
                .filter(|t| t.user_id == Some(user_id))
                .filter(|t| status.map_or(true, |s| t.status == s))
                .cloned()
                .collect())
        }

        fn create_task(&self, user_id: UserId, fields: &TaskFields) -> Result<Task, ApiError> {
            let mut tasks = self.tasks.borrow_mut();
            let task = Task {
                id: tasks.len() as TaskId + 1,
                user_id: Some(user_id),
                title: fields.title.clone(),
                description: fields.description.clone(),
                data_inicial: fields.data_inicial,
                data_limite: fields.data_limite,
                status: fields.status,
                created_at: today().and_hms_opt(10, 0, 0).unwrap(),
            };
            tasks.push(task.clone());
            Ok(task)
        }

        fn update_task(&self, task_id: TaskId, fields: &TaskFields) -> Result<Task, ApiError> {
            let mut tasks = self.tasks.borrow_mut();
            let task = tasks
                .iter_mut()
                .find(|t| t.id == task_id)
                .ok_or_else(|| ApiError::Server {
                    status: 404,
                    message: "not found".into(),
                })?;
            task.title = fields.title.clone();
            task.description = fields.description.clone();
            task.data_inicial = fields.data_inicial;
            task.data_limite = fields.data_limite;
            task.status = fields.status;
            Ok(task.clone())
        }

        fn delete_task(&self, task_id: TaskId) -> Result<(), ApiError> {
            self.tasks.borrow_mut().retain(|t| t.id != task_id);
            Ok(())
        }
    }

    #[test]
    fn created_task_comes_back_from_listing_unchanged() {
        // Arrange
        let mut app = App::new(InMemoryApi::default(), Box::new(UnsupportedRecognizer), today());
        login(&mut app);
        app.state.new_task.title = "Comprar leite".into();
        app.state.new_task.description = "integral".into();
        app.state.new_task.data_inicial = "12/03/2025".into();
        app.state.new_task.data_limite = "2025-03-20".into();
        app.state.new_task.status = TaskStatus::EmAndamento;
        let expected = app.state.new_task.to_fields(today()).unwrap();
        app.dispatch(Msg::FocusNewTask);

        // Act
        app.dispatch(Msg::Submit);

        // Assert
        assert_eq!(app.state.tasks.len(), 1);
        assert_eq!(app.state.tasks[0].fields(), expected);
        assert_eq!(app.state.notice.clone().unwrap().text, "Task added!");
    }

    #[test]
    fn edit_then_delete_round_trip() {
        let mut app = App::new(InMemoryApi::default(), Box::new(UnsupportedRecognizer), today());
        login(&mut app);
        app.state.new_task.title = "Ler".into();
        app.dispatch(Msg::FocusNewTask);
        app.dispatch(Msg::Submit);

        app.dispatch(Msg::StartEdit);
        app.dispatch(Msg::FocusNext);
        for c in "capítulo 3".chars() {
            app.dispatch(Msg::Input(c));
        }
        app.state.focus = crate::state::Focus::Draft(FormField::Status);
        app.dispatch(Msg::CycleStatus { forward: false });
        app.dispatch(Msg::Submit);

        assert_eq!(app.state.tasks[0].description, "capítulo 3");
        assert_eq!(app.state.tasks[0].status, TaskStatus::Concluida);
        assert!(app.state.editing.is_none());

        app.dispatch(Msg::RequestDelete);
        app.dispatch(Msg::ConfirmDelete);

        assert!(app.state.tasks.is_empty());
    }

    struct FailingRecognizer;

    impl SpeechRecognizer for FailingRecognizer {
        fn is_supported(&self) -> bool {
            true
        }

        fn start(&mut self, _events: Sender<VoiceEvent>) -> Result<(), VoiceError> {
            Err(VoiceError::AudioCapture)
        }

        fn stop(&mut self) {}
    }

    #[test]
    fn recognizer_start_failure_returns_to_idle() {
        let mut app = App::new(InMemoryApi::default(), Box::new(FailingRecognizer), today());
        login(&mut app);

        app.dispatch(Msg::ToggleVoice);

        assert!(!app.state.voice.is_listening());
        assert_eq!(app.state.notice.clone().unwrap().text, "No microphone was found.");
    }

    struct ScriptedRecognizer {
        transcript: &'static str,
    }

    impl SpeechRecognizer for ScriptedRecognizer {
        fn is_supported(&self) -> bool {
            true
        }

        fn start(&mut self, events: Sender<VoiceEvent>) -> Result<(), VoiceError> {
            let _ = events.send(VoiceEvent::Transcript(self.transcript.to_string()));
            let _ = events.send(VoiceEvent::Ended);
            Ok(())
        }

        fn stop(&mut self) {}
    }

    #[test]
    fn voice_events_are_drained_into_the_form() {
        let recognizer = ScriptedRecognizer {
            transcript: "titulo: Regar plantas; prazo: hoje",
        };
        let mut app = App::new(InMemoryApi::default(), Box::new(recognizer), today());
        login(&mut app);

        app.dispatch(Msg::ToggleVoice);
        app.pump_voice();

        assert_eq!(app.state.new_task.title, "Regar plantas");
        assert_eq!(app.state.new_task.data_limite, "2025-03-12");
    }
}
