mod api;
mod app;
mod config;
mod dates;
mod input;
mod priority;
mod speech;
mod state;
mod task;
mod telemetry;
mod text;
mod ui;
mod voice;

use anyhow::Context;
use api::{HttpTaskApi, TaskApi};
use app::App;
use chrono::Local;
use clap::{Parser, Subcommand};
use config::{Overrides, Settings};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use state::Msg;
use std::{io, path::PathBuf, time::Duration};
use tracing::{error, info};
use voice::{CommandRecognizer, SpeechRecognizer, UnsupportedRecognizer};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "taskers-client", version, about = "Terminal client for the to-do service")]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, default_value = config::CONFIG_FILE)]
    config: PathBuf,

    /// Base URL of the task API
    #[arg(long, env = "TODO_API_URL")]
    api_url: Option<String>,

    /// Speech-to-text command used for voice input
    #[arg(long, env = "TODO_VOICE_COMMAND")]
    voice_command: Option<String>,

    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Parse a dictated transcript and print the extracted fields as JSON
    Parse { transcript: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { dir }) => {
            if config::init(&dir)? {
                println!("Config written to {}", dir.join(config::CONFIG_FILE).display());
            } else {
                println!("Already initialized in {}", dir.display());
            }
            Ok(())
        }
        Some(Commands::Parse { transcript }) => {
            let parsed = speech::parse_transcript(&transcript, Local::now().date_naive());
            println!("{}", serde_json::to_string_pretty(&parsed)?);
            Ok(())
        }
        None => {
            let settings = Settings::load(&cli.config)?.apply(Overrides {
                api_url: cli.api_url,
                voice_command: cli.voice_command,
                log_file: cli.log_file,
            });
            run(settings)
        }
    }
}

fn recognizer(settings: &Settings) -> Box<dyn SpeechRecognizer> {
    let language = settings.voice_language.as_str();
    let command = settings
        .voice_command
        .as_deref()
        .and_then(|command| CommandRecognizer::from_command_line(command, language));
    match command {
        Some(recognizer) => Box::new(recognizer),
        None => Box::new(UnsupportedRecognizer),
    }
}

fn run(settings: Settings) -> anyhow::Result<()> {
    telemetry::init(&settings.log_file)?;
    info!(api_url = %settings.api_url, voice = settings.voice_command.is_some(), "starting");

    let mut app = App::new(
        HttpTaskApi::new(settings.api_url.as_str()),
        recognizer(&settings),
        Local::now().date_naive(),
    );

    // Terminal setup
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        error!(error = %err, "event loop failed");
    }
    info!("bye");
    result
}

fn run_app<B: Backend, A: TaskApi>(
    terminal: &mut Terminal<B>,
    app: &mut App<A>,
) -> anyhow::Result<()> {
    while !app.state.should_quit {
        terminal.draw(|f| ui::draw(f, &app.state))?;

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if let Some(msg) = input::key_to_msg(&app.state, key) {
                    app.dispatch(msg);
                }
            }
        }
        app.pump_voice();

        let today = Local::now().date_naive();
        if today != app.state.today {
            app.dispatch(Msg::Tick(today));
        }
    }
    Ok(())
}
