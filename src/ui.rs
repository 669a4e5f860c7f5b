//! Rendering. Every function here is a pure projection of [`AppState`] onto the frame.

use crate::dates::{format_date, format_timestamp};
use crate::priority::{Bucket, Matrix};
use crate::state::{
    AppState, AuthField, AuthTab, Focus, NoticeKind, Screen, StatusFilter, ViewMode, VOICE_PROMPT,
};
use crate::task::{FormField, Task, TaskForm, TaskStatus};
use crate::voice::VoiceState;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame,
};

const FORM_FIELDS: [(FormField, &str); 5] = [
    (FormField::Title, "Title"),
    (FormField::Description, "Description"),
    (FormField::StartDate, "Start date"),
    (FormField::DueDate, "Due date"),
    (FormField::Status, "Status"),
];

pub fn draw(frame: &mut Frame, state: &AppState) {
    match state.screen {
        Screen::Auth => draw_auth(frame, state),
        Screen::Tasks => draw_tasks(frame, state),
    }
}

fn focused_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Pendente => Color::Yellow,
        TaskStatus::EmAndamento => Color::Blue,
        TaskStatus::Concluida => Color::Green,
    }
}

fn status_badge(status: TaskStatus) -> Span<'static> {
    Span::styled(
        format!("[{}]", status.label()),
        Style::default().fg(status_color(status)).add_modifier(Modifier::BOLD),
    )
}

fn notice_line(state: &AppState) -> Line<'_> {
    match &state.notice {
        Some(notice) => {
            let color = match notice.kind {
                NoticeKind::Info => Color::Gray,
                NoticeKind::Success => Color::Green,
                NoticeKind::Error => Color::Red,
            };
            Line::from(Span::styled(notice.text.as_str(), Style::default().fg(color)))
        }
        None => Line::default(),
    }
}

/// A rectangle of `width` x `height` cells centered in `area`, clipped to it.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_auth(frame: &mut Frame, state: &AppState) {
    let area = centered_rect(60, 12, frame.area());
    frame.render_widget(Clear, area);
    let title = match state.auth.tab {
        AuthTab::Login => " Sign in ",
        AuthTab::Register => " Create account ",
    };
    let block = Block::default().title(title).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    let selected = match state.auth.tab {
        AuthTab::Login => 0,
        AuthTab::Register => 1,
    };
    let tabs = Tabs::new(vec!["Sign in", "Register"])
        .select(selected)
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, rows[0]);

    let email = Paragraph::new(state.auth.email.as_str()).block(
        Block::default()
            .title("Email")
            .borders(Borders::ALL)
            .border_style(focused_style(state.auth.focus == AuthField::Email)),
    );
    frame.render_widget(email, rows[1]);

    let masked = "•".repeat(state.auth.password.chars().count());
    let password = Paragraph::new(masked).block(
        Block::default()
            .title("Password")
            .borders(Borders::ALL)
            .border_style(focused_style(state.auth.focus == AuthField::Password)),
    );
    frame.render_widget(password, rows[2]);

    frame.render_widget(Paragraph::new(notice_line(state)), rows[3]);
    let help = Paragraph::new("Tab: next field  ←/→: switch tab  Enter: submit  Esc: quit")
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true });
    frame.render_widget(help, rows[4]);
}

fn draw_tasks(frame: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3),
            Constraint::Length(8),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_header(frame, state, chunks[0]);
    draw_new_task(frame, state, chunks[1]);
    frame.render_widget(Paragraph::new(notice_line(state)), chunks[2]);
    frame.render_widget(
        Paragraph::new(summary(state)).style(Style::default().fg(Color::Gray)),
        chunks[3],
    );
    match state.view {
        ViewMode::List => draw_list(frame, state, chunks[4]),
        ViewMode::Matrix => draw_matrix(frame, state, chunks[4]),
    }
    frame.render_widget(
        Paragraph::new(help_text(state)).style(Style::default().fg(Color::DarkGray)),
        chunks[5],
    );

    if let Some(edit) = &state.editing {
        let focus = match state.focus {
            Focus::Draft(field) => Some(field),
            _ => None,
        };
        let area = centered_rect(70, 9, frame.area());
        frame.render_widget(Clear, area);
        let block = Block::default()
            .title(format!(" Edit task #{} ", edit.task_id))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Paragraph::new(form_lines(&edit.draft, focus)), inner);
    }
    if state.focus == Focus::Transcript {
        draw_transcript(frame, state);
    }
    if state.pending_delete.is_some() {
        let area = centered_rect(40, 3, frame.area());
        frame.render_widget(Clear, area);
        let confirm = Paragraph::new("Delete this task? (y/n)").block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        );
        frame.render_widget(confirm, area);
    }
}

fn draw_header(frame: &mut Frame, state: &AppState, area: Rect) {
    let email = state.session.as_ref().map_or("", |user| user.email.as_str());
    let mut spans = vec![
        Span::styled(email, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(
            format!(" {} tasks ", state.tasks.len()),
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ),
        Span::raw("  "),
    ];
    for filter in StatusFilter::ALL {
        let style = if filter == state.filter {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!(" {} ", filter.label()), style));
        spans.push(Span::raw(" "));
    }
    let view = match state.view {
        ViewMode::List => "list",
        ViewMode::Matrix => "matrix",
    };
    spans.push(Span::raw(format!(" view: {view}  sort: {}", state.sort.label())));

    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().title(" My tasks ").borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn form_lines(form: &TaskForm, focus: Option<FormField>) -> Vec<Line<'_>> {
    FORM_FIELDS
        .iter()
        .map(|(field, label)| {
            let focused = focus == Some(*field);
            let marker = if focused { "> " } else { "  " };
            let value = match field {
                FormField::Title => Span::raw(form.title.as_str()),
                FormField::Description => Span::raw(form.description.as_str()),
                FormField::StartDate => Span::raw(form.data_inicial.as_str()),
                FormField::DueDate => Span::raw(form.data_limite.as_str()),
                FormField::Status => status_badge(form.status),
            };
            Line::from(vec![
                Span::styled(marker, focused_style(focused)),
                Span::styled(format!("{label:<12}"), focused_style(focused)),
                value,
            ])
        })
        .collect()
}

fn voice_line(state: &AppState) -> Line<'_> {
    match state.voice.state() {
        VoiceState::Listening { transcript, .. } => {
            let mut spans = vec![Span::styled(
                format!("● {VOICE_PROMPT}"),
                Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
            )];
            if !transcript.is_empty() {
                spans.push(Span::raw(format!("  \"{transcript}\"")));
            }
            Line::from(spans)
        }
        _ if !state.voice_supported => Line::from(Span::styled(
            "Voice input unavailable",
            Style::default().fg(Color::DarkGray),
        )),
        _ => Line::from(Span::styled(
            "F2: fill in by voice  t: paste a transcript",
            Style::default().fg(Color::DarkGray),
        )),
    }
}

fn draw_new_task(frame: &mut Frame, state: &AppState, area: Rect) {
    let focus = match state.focus {
        Focus::NewTask(field) => Some(field),
        _ => None,
    };
    let block = Block::default()
        .title(" New task ")
        .borders(Borders::ALL)
        .border_style(focused_style(focus.is_some()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = form_lines(&state.new_task, focus);
    lines.push(voice_line(state));
    frame.render_widget(Paragraph::new(lines), inner);
}

fn summary(state: &AppState) -> String {
    let count = state.visible_tasks().len();
    let scope = match state.filter {
        StatusFilter::All => "any status".to_string(),
        StatusFilter::Only(status) => format!("status \"{}\"", status.label()),
    };
    if count == 0 {
        format!("No tasks found for {scope}.")
    } else {
        let noun = if count == 1 { "task" } else { "tasks" };
        format!("Showing {count} {noun} with {scope}.")
    }
}

fn help_text(state: &AppState) -> &'static str {
    match state.focus {
        Focus::Tasks => {
            "a: add  e: edit  d: delete  f: filter  s: sort  m: view  r: reload  v: voice  L: logout  q: quit"
        }
        Focus::NewTask(_) | Focus::Draft(_) => {
            "Tab: next field  ←/→: status  Enter: save  F2: voice  Esc: back"
        }
        Focus::Transcript => "Enter: fill in the form  Esc: cancel",
    }
}

fn date_or_dash(date: Option<chrono::NaiveDate>) -> String {
    date.map_or_else(|| "-".to_string(), format_date)
}

fn task_card(task: &Task) -> ListItem<'_> {
    let mut lines = vec![
        Line::from(vec![
            Span::styled(task.title.as_str(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" "),
            status_badge(task.status),
        ]),
        Line::from(Span::styled(
            format!("Created {}", format_timestamp(task.created_at)),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    if !task.description.is_empty() {
        lines.push(Line::from(task.description.as_str()));
    }
    lines.push(Line::from(format!(
        "Start: {} • Due: {}",
        date_or_dash(task.data_inicial),
        date_or_dash(task.data_limite)
    )));
    lines.push(Line::default());
    ListItem::new(lines)
}

fn draw_list(frame: &mut Frame, state: &AppState, area: Rect) {
    let tasks = state.visible_tasks();
    let block = Block::default()
        .title(" Tasks ")
        .borders(Borders::ALL)
        .border_style(focused_style(state.focus == Focus::Tasks));

    if tasks.is_empty() {
        let empty = Paragraph::new("No tasks yet. Press 'a' to add one.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = tasks.iter().map(|t| task_card(t)).collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol("▌");
    let mut list_state = ListState::default().with_selected(Some(state.selected));
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn draw_matrix(frame: &mut Frame, state: &AppState, area: Rect) {
    let visible = state.visible_tasks();
    let matrix = Matrix::group(visible.iter().copied(), state.today);
    let selected = state.selected_task().map(|t| t.id);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let cells: Vec<Rect> = rows
        .iter()
        .flat_map(|row| {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(*row)
                .to_vec()
        })
        .collect();

    for (bucket, cell) in Bucket::ALL.into_iter().zip(cells) {
        let tasks = matrix.zone(bucket);
        let border = match bucket {
            Bucket::ImportantUrgent => Color::Red,
            Bucket::ImportantNotUrgent => Color::Yellow,
            Bucket::NotImportantUrgent => Color::Blue,
            Bucket::NotImportantNotUrgent => Color::DarkGray,
        };
        let block = Block::default()
            .title(format!(" {} ({}) ", bucket.title(), tasks.len()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border));

        if tasks.is_empty() {
            let empty = Paragraph::new("No tasks here.")
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            frame.render_widget(empty, cell);
            continue;
        }

        let items: Vec<ListItem> = tasks
            .iter()
            .map(|t| {
                let style = if Some(t.id) == selected {
                    Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED)
                } else {
                    Style::default().add_modifier(Modifier::BOLD)
                };
                ListItem::new(vec![
                    Line::from(Span::styled(t.title.as_str(), style)),
                    Line::from(vec![
                        Span::styled(
                            format!("Due: {} • ", date_or_dash(t.data_limite)),
                            Style::default().fg(Color::Gray),
                        ),
                        Span::styled(t.status.label(), Style::default().fg(status_color(t.status))),
                    ]),
                ])
            })
            .collect();
        frame.render_widget(List::new(items).block(block), cell);
    }
}

fn draw_transcript(frame: &mut Frame, state: &AppState) {
    let area = centered_rect(70, 5, frame.area());
    frame.render_widget(Clear, area);
    let input = Paragraph::new(state.transcript.as_str())
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(" Transcript (title; description; start; due; status) ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );
    frame.render_widget(input, area);
}
