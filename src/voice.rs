//! Voice dictation: the session state machine and the recognizer backends.
//!
//! A session moves `Idle → Listening → Parsed | Failed → Idle`. The recognizer runs on a
//! worker thread and reports [`VoiceEvent`]s over a channel; the machine only ever sees
//! those events, so it stays a plain value that the reducer owns.

use crate::speech::{self, ParsedTask};
use chrono::NaiveDate;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const EXIT_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoiceError {
    #[error("No speech was detected. Try again.")]
    NoSpeech,
    #[error("No microphone was found.")]
    AudioCapture,
    #[error("Microphone permission was denied.")]
    NotAllowed,
    #[error("Network issue during speech recognition.")]
    Network,
    #[error("Voice capture was aborted.")]
    Aborted,
    #[error("Could not capture audio: {0}")]
    Other(String),
}

impl VoiceError {
    /// Maps a Web-Speech-style error code to its error.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "no-speech" => VoiceError::NoSpeech,
            "audio-capture" => VoiceError::AudioCapture,
            "not-allowed" | "service-not-allowed" => VoiceError::NotAllowed,
            "network" => VoiceError::Network,
            "aborted" => VoiceError::Aborted,
            "" => VoiceError::Other("unknown error".to_string()),
            other => VoiceError::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    /// A piece of transcript; pieces are concatenated.
    Transcript(String),
    Error(VoiceError),
    /// The recognizer has finished, successfully or not.
    Ended,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VoiceState {
    #[default]
    Idle,
    Listening {
        transcript: String,
        parse_on_stop: bool,
    },
    Parsed(ParsedTask),
    Failed(VoiceError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceMachine {
    state: VoiceState,
}

impl VoiceMachine {
    pub fn state(&self) -> &VoiceState {
        &self.state
    }

    pub fn is_listening(&self) -> bool {
        matches!(self.state, VoiceState::Listening { .. })
    }

    /// Starts a session. Returns `false` if one is already running.
    pub fn start(&mut self) -> bool {
        if self.is_listening() {
            return false;
        }
        self.state = VoiceState::Listening {
            transcript: String::new(),
            parse_on_stop: true,
        };
        true
    }

    /// Discards the session: whatever arrives before the recognizer ends is dropped.
    pub fn cancel(&mut self) {
        if let VoiceState::Listening { parse_on_stop, .. } = &mut self.state {
            *parse_on_stop = false;
        }
    }

    pub fn handle(&mut self, event: VoiceEvent, today: NaiveDate) {
        let VoiceState::Listening {
            transcript,
            parse_on_stop,
        } = &mut self.state
        else {
            return;
        };
        match event {
            VoiceEvent::Transcript(piece) => {
                if !transcript.is_empty() {
                    transcript.push(' ');
                }
                transcript.push_str(piece.trim());
            }
            VoiceEvent::Error(_) if !*parse_on_stop => self.state = VoiceState::Idle,
            VoiceEvent::Error(err) => self.state = VoiceState::Failed(err),
            VoiceEvent::Ended if !*parse_on_stop => self.state = VoiceState::Idle,
            VoiceEvent::Ended if transcript.trim().is_empty() => {
                self.state = VoiceState::Failed(VoiceError::NoSpeech)
            }
            VoiceEvent::Ended => {
                let parsed = speech::parse_transcript(transcript, today);
                self.state = VoiceState::Parsed(parsed);
            }
        }
    }

    /// Takes a finished session's outcome and returns to idle.
    pub fn take_outcome(&mut self) -> Option<Result<ParsedTask, VoiceError>> {
        match std::mem::take(&mut self.state) {
            VoiceState::Parsed(parsed) => Some(Ok(parsed)),
            VoiceState::Failed(err) => Some(Err(err)),
            other => {
                self.state = other;
                None
            }
        }
    }
}

/// A speech-to-text backend.
pub trait SpeechRecognizer {
    /// Whether voice capture can be offered at all.
    fn is_supported(&self) -> bool;

    /// Begins capturing; events are delivered on `events` until [`VoiceEvent::Ended`].
    fn start(&mut self, events: Sender<VoiceEvent>) -> Result<(), VoiceError>;

    fn stop(&mut self);
}

/// Used when no recognizer is configured.
pub struct UnsupportedRecognizer;

impl SpeechRecognizer for UnsupportedRecognizer {
    fn is_supported(&self) -> bool {
        false
    }

    fn start(&mut self, _events: Sender<VoiceEvent>) -> Result<(), VoiceError> {
        Err(VoiceError::Other("voice capture is not configured".to_string()))
    }

    fn stop(&mut self) {}
}

/// Runs an external speech-to-text program that prints the transcript on stdout.
///
/// A failing program should exit non-zero with an error code such as `no-speech` or
/// `not-allowed` on the first line of stderr.
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
    language: String,
    session: Option<Session>,
}

/// The running program of one capture session.
struct Session {
    child: Arc<Mutex<Child>>,
    stopped: Arc<AtomicBool>,
    events: Sender<VoiceEvent>,
}

impl CommandRecognizer {
    /// Splits `command_line` on whitespace into program and arguments.
    pub fn from_command_line(command_line: &str, language: impl Into<String>) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            language: language.into(),
            session: None,
        })
    }
}

/// Waits for the program to exit without holding the lock, so `stop` can still kill it.
fn wait_for_exit(child: &Mutex<Child>) -> bool {
    loop {
        match child.lock() {
            Ok(mut child) => match child.try_wait() {
                Ok(Some(status)) => return status.success(),
                Ok(None) => {}
                Err(_) => return false,
            },
            Err(_) => return false,
        }
        thread::sleep(EXIT_POLL);
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    // the program leads its own group; wrapper scripts leave their children in it
    let _ = Command::new("kill")
        .args(["-TERM", "--", &format!("-{pid}")])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

impl SpeechRecognizer for CommandRecognizer {
    fn is_supported(&self) -> bool {
        true
    }

    fn start(&mut self, events: Sender<VoiceEvent>) -> Result<(), VoiceError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env("TODO_VOICE_LANG", &self.language)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let mut child = command.spawn().map_err(|err| {
            warn!(program = %self.program, error = %err, "could not start recognizer");
            VoiceError::Other(format!("could not start `{}`: {err}", self.program))
        })?;
        info!(program = %self.program, pid = child.id(), "voice capture started");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let child = Arc::new(Mutex::new(child));
        let stopped = Arc::new(AtomicBool::new(false));
        self.session = Some(Session {
            child: Arc::clone(&child),
            stopped: Arc::clone(&stopped),
            events: events.clone(),
        });

        thread::spawn(move || {
            let mut transcript = String::new();
            if let Some(mut stdout) = stdout {
                let _ = stdout.read_to_string(&mut transcript);
            }
            let mut error_output = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut error_output);
            }
            let success = wait_for_exit(&child);

            // a stopped session has already reported its end
            if stopped.load(Ordering::SeqCst) {
                return;
            }
            if !transcript.trim().is_empty() {
                let _ = events.send(VoiceEvent::Transcript(transcript));
            }
            if !success {
                let code = error_output.lines().next().unwrap_or_default();
                let _ = events.send(VoiceEvent::Error(VoiceError::from_code(code)));
            }
            info!("voice capture ended");
            let _ = events.send(VoiceEvent::Ended);
        });
        Ok(())
    }

    /// Kills the program and ends the session at once. Output still in flight is dropped.
    fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if session.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut child) = session.child.lock() {
            if matches!(child.try_wait(), Ok(None)) {
                kill_process_group(child.id());
                let _ = child.kill();
            }
        }
        info!("voice capture stopped");
        let _ = session.events.send(VoiceEvent::Ended);
    }
}
