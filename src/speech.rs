//! Turns a dictated transcript into a partial task.
//!
//! The transcript is split into segments on `;`, `,` and newlines. A segment that opens with
//! a label (`titulo:`, `prazo`, `status -` ...) assigns the rest of the segment to that field.
//! Date and status labels may also appear mid-segment, as long as the text that follows
//! them actually reads as a date or a status. Whatever is left unlabeled fills the title and
//! then the description, in order.

use crate::dates;
use crate::task::TaskStatus;
use crate::text;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedTask {
    pub title: String,
    pub description: String,
    pub data_inicial: Option<NaiveDate>,
    pub data_limite: Option<NaiveDate>,
    pub status: Option<TaskStatus>,
}

impl ParsedTask {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.description.is_empty()
            && self.data_inicial.is_none()
            && self.data_limite.is_none()
            && self.status.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Description,
    StartDate,
    DueDate,
    Status,
}

impl Field {
    /// Only fields whose values can be validated may split a segment mid-way.
    fn splits_inline(self) -> bool {
        matches!(self, Field::StartDate | Field::DueDate | Field::Status)
    }
}

const LABELS: &[(&str, Field)] = &[
    ("titulo", Field::Title),
    ("nome", Field::Title),
    ("title", Field::Title),
    ("descricao", Field::Description),
    ("detalhes", Field::Description),
    ("description", Field::Description),
    ("data inicial", Field::StartDate),
    ("data de inicio", Field::StartDate),
    ("inicio", Field::StartDate),
    ("comeco", Field::StartDate),
    ("start date", Field::StartDate),
    ("start", Field::StartDate),
    ("data limite", Field::DueDate),
    ("data final", Field::DueDate),
    ("prazo", Field::DueDate),
    ("vencimento", Field::DueDate),
    ("deadline", Field::DueDate),
    ("due date", Field::DueDate),
    ("due", Field::DueDate),
    ("status", Field::Status),
    ("situacao", Field::Status),
];

// Longer phrases first so "em andamento" wins over a bare "andamento" elsewhere.
const STATUS_SYNONYMS: &[(&str, TaskStatus)] = &[
    ("em andamento", TaskStatus::EmAndamento),
    ("em progresso", TaskStatus::EmAndamento),
    ("in progress", TaskStatus::EmAndamento),
    ("andamento", TaskStatus::EmAndamento),
    ("fazendo", TaskStatus::EmAndamento),
    ("doing", TaskStatus::EmAndamento),
    ("nao iniciado", TaskStatus::Pendente),
    ("nao iniciada", TaskStatus::Pendente),
    ("a fazer", TaskStatus::Pendente),
    ("pendentes", TaskStatus::Pendente),
    ("pendente", TaskStatus::Pendente),
    ("pending", TaskStatus::Pendente),
    ("todo", TaskStatus::Pendente),
    ("concluidas", TaskStatus::Concluida),
    ("concluida", TaskStatus::Concluida),
    ("concluido", TaskStatus::Concluida),
    ("finalizada", TaskStatus::Concluida),
    ("finalizado", TaskStatus::Concluida),
    ("feita", TaskStatus::Concluida),
    ("feito", TaskStatus::Concluida),
    ("completed", TaskStatus::Concluida),
    ("done", TaskStatus::Concluida),
];

/// Finds a status synonym anywhere in `value`.
pub fn match_status(value: &str) -> Option<TaskStatus> {
    STATUS_SYNONYMS
        .iter()
        .find(|(phrase, _)| text::contains_phrase(value, phrase))
        .map(|(_, status)| *status)
}

fn exact_status(value: &str) -> Option<TaskStatus> {
    let folded = text::fold(value.trim());
    STATUS_SYNONYMS
        .iter()
        .find(|(phrase, _)| *phrase == folded)
        .map(|(_, status)| *status)
}

/// A label occurrence inside a segment, in char positions.
#[derive(Debug, Clone, Copy)]
struct Hit {
    field: Field,
    start: usize,
    value_start: usize,
}

/// Matches a label at `pos` if it is followed by `:`, `-`, whitespace or the end.
fn label_at(folded: &[char], pos: usize) -> Option<Hit> {
    LABELS
        .iter()
        .filter(|(label, _)| {
            let label: Vec<char> = label.chars().collect();
            text::matches_word_at(folded, &label, pos)
        })
        .max_by_key(|(label, _)| label.chars().count())
        .and_then(|(label, field)| {
            let end = pos + label.chars().count();
            let value_start = skip_separators(folded, end);
            let separated = end == folded.len() || value_start > end;
            separated.then_some(Hit {
                field: *field,
                start: pos,
                value_start,
            })
        })
}

fn skip_separators(folded: &[char], mut pos: usize) -> usize {
    while pos < folded.len() && (folded[pos].is_whitespace() || matches!(folded[pos], ':' | '-')) {
        pos += 1;
    }
    pos
}

fn slice(chars: &[char], start: usize, end: usize) -> String {
    chars[start..end].iter().collect::<String>().trim().to_string()
}

#[derive(Default)]
struct Collector {
    parsed: ParsedTask,
    title_set: bool,
    description_set: bool,
    unlabeled: Vec<String>,
}

impl Collector {
    fn assign(&mut self, field: Field, value: &str, today: NaiveDate) {
        let value = value.trim();
        match field {
            Field::Title if !value.is_empty() => {
                self.parsed.title = value.to_string();
                self.title_set = true;
            }
            Field::Description if !value.is_empty() => {
                self.parsed.description = value.to_string();
                self.description_set = true;
            }
            Field::StartDate => {
                self.parsed.data_inicial = dates::parse_spoken_date(value, today);
            }
            Field::DueDate => {
                self.parsed.data_limite = dates::parse_spoken_date(value, today);
            }
            Field::Status => {
                if let Some(status) = match_status(value) {
                    self.parsed.status = Some(status);
                }
            }
            _ => {}
        }
    }

    fn unlabeled(&mut self, value: String) {
        if value.is_empty() {
            return;
        }
        match exact_status(&value) {
            Some(status) => self.parsed.status = Some(status),
            None => self.unlabeled.push(value),
        }
    }

    fn finish(mut self) -> ParsedTask {
        let mut leftovers = self.unlabeled.into_iter();
        if !self.title_set {
            if let Some(title) = leftovers.next() {
                self.parsed.title = title;
            }
        }
        if !self.description_set {
            if let Some(description) = leftovers.next() {
                self.parsed.description = description;
            }
        }
        self.parsed
    }
}

fn validates(field: Field, value: &str, today: NaiveDate) -> bool {
    match field {
        Field::StartDate | Field::DueDate => dates::parse_spoken_date(value, today).is_some(),
        Field::Status => match_status(value).is_some(),
        Field::Title | Field::Description => false,
    }
}

/// Inline hits in `folded[from..]` that survive validation, left to right.
///
/// Candidates are checked right to left: whether a later label is accepted decides where
/// the value of an earlier one ends.
fn inline_hits(original: &[char], folded: &[char], from: usize, today: NaiveDate) -> Vec<Hit> {
    let candidates: Vec<Hit> = (from..folded.len())
        .filter_map(|pos| label_at(folded, pos))
        .filter(|hit| hit.field.splits_inline())
        .collect();

    let mut accepted: Vec<Hit> = Vec::new();
    let mut end = folded.len();
    for hit in candidates.into_iter().rev() {
        if hit.value_start > end {
            continue;
        }
        let value = slice(original, hit.value_start, end);
        if validates(hit.field, &value, today) {
            end = hit.start;
            accepted.push(hit);
        }
    }
    accepted.reverse();
    accepted
}

fn parse_segment(segment: &str, today: NaiveDate, out: &mut Collector) {
    let original: Vec<char> = segment.chars().collect();
    let folded: Vec<char> = text::fold(segment).chars().collect();

    let mut leading = label_at(&folded, 0);
    let mut body_start = leading.map_or(0, |hit| hit.value_start);
    let mut hits = inline_hits(&original, &folded, body_start, today);
    let mut head_end = hits.first().map_or(original.len(), |hit| hit.start);
    let mut head = slice(&original, body_start.min(head_end), head_end);

    // "Inicio da reforma" opens with a date label but is plain text
    if let Some(hit) = leading {
        if hit.field.splits_inline() && !head.is_empty() && !validates(hit.field, &head, today) {
            leading = None;
            body_start = 0;
            hits = inline_hits(&original, &folded, body_start, today);
            head_end = hits.first().map_or(original.len(), |hit| hit.start);
            head = slice(&original, body_start, head_end);
        }
    }
    match leading {
        Some(hit) => out.assign(hit.field, &head, today),
        None => out.unlabeled(head),
    }

    for (i, hit) in hits.iter().enumerate() {
        let end = hits.get(i + 1).map_or(original.len(), |next| next.start);
        let value = slice(&original, hit.value_start, end);
        out.assign(hit.field, &value, today);
    }
}

/// Parses a transcript relative to `today`. Never fails; missing pieces stay empty.
pub fn parse_transcript(transcript: &str, today: NaiveDate) -> ParsedTask {
    let mut collector = Collector::default();
    transcript
        .split([';', ',', '\n'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .for_each(|segment| parse_segment(segment, today, &mut collector));
    let parsed = collector.finish();
    debug!(?parsed, "parsed transcript");
    parsed
}
