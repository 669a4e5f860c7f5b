use crate::state::{AppState, Focus, Msg, Screen};
use crate::task::FormField;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Translates a key press into a message for the current screen and focus.
pub fn key_to_msg(state: &AppState, key: KeyEvent) -> Option<Msg> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Msg::Quit);
    }
    match state.screen {
        Screen::Auth => auth_key(key),
        Screen::Tasks if state.pending_delete.is_some() => confirm_key(key),
        Screen::Tasks => match state.focus {
            Focus::Tasks => list_key(state, key),
            Focus::NewTask(field) | Focus::Draft(field) => form_key(field, key),
            Focus::Transcript => transcript_key(key),
        },
    }
}

fn auth_key(key: KeyEvent) -> Option<Msg> {
    match key.code {
        KeyCode::Esc => Some(Msg::Quit),
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => Some(Msg::AuthFocusNext),
        KeyCode::Left | KeyCode::Right => Some(Msg::SwitchAuthTab),
        KeyCode::Enter => Some(Msg::SubmitAuth),
        KeyCode::Backspace => Some(Msg::AuthBackspace),
        KeyCode::Char(c) => Some(Msg::AuthInput(c)),
        _ => None,
    }
}

fn confirm_key(key: KeyEvent) -> Option<Msg> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Some(Msg::ConfirmDelete),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(Msg::CancelDelete),
        _ => None,
    }
}

fn list_key(state: &AppState, key: KeyEvent) -> Option<Msg> {
    match key.code {
        KeyCode::Char('q') => Some(Msg::Quit),
        KeyCode::Down | KeyCode::Char('j') => Some(Msg::SelectNext),
        KeyCode::Up | KeyCode::Char('k') => Some(Msg::SelectPrev),
        KeyCode::Char('a') | KeyCode::Char('n') => Some(Msg::FocusNewTask),
        KeyCode::Enter | KeyCode::Char('e') => Some(Msg::StartEdit),
        KeyCode::Delete | KeyCode::Char('d') => Some(Msg::RequestDelete),
        KeyCode::Char('f') => Some(Msg::CycleFilter),
        KeyCode::Char('s') => Some(Msg::CycleSort),
        KeyCode::Char('m') => Some(Msg::ToggleView),
        KeyCode::Char('r') => Some(Msg::Reload),
        KeyCode::Char('v') | KeyCode::F(2) => Some(Msg::ToggleVoice),
        KeyCode::Char('t') => Some(Msg::OpenTranscript),
        KeyCode::Char('L') => Some(Msg::Logout),
        KeyCode::Esc if state.voice.is_listening() => Some(Msg::CancelVoice),
        _ => None,
    }
}

fn form_key(field: FormField, key: KeyEvent) -> Option<Msg> {
    match key.code {
        KeyCode::F(2) => Some(Msg::ToggleVoice),
        KeyCode::Esc => Some(Msg::Escape),
        KeyCode::Enter => Some(Msg::Submit),
        KeyCode::Tab | KeyCode::Down => Some(Msg::FocusNext),
        KeyCode::BackTab | KeyCode::Up => Some(Msg::FocusPrev),
        KeyCode::Right | KeyCode::Char(' ') if field == FormField::Status => {
            Some(Msg::CycleStatus { forward: true })
        }
        KeyCode::Left if field == FormField::Status => Some(Msg::CycleStatus { forward: false }),
        KeyCode::Backspace => Some(Msg::Backspace),
        KeyCode::Char(_) if field == FormField::Status => None,
        KeyCode::Char(c) => Some(Msg::Input(c)),
        _ => None,
    }
}

fn transcript_key(key: KeyEvent) -> Option<Msg> {
    match key.code {
        KeyCode::Esc => Some(Msg::Escape),
        KeyCode::Enter => Some(Msg::Submit),
        KeyCode::Backspace => Some(Msg::Backspace),
        KeyCode::Char(c) => Some(Msg::Input(c)),
        _ => None,
    }
}
