//! Importance/urgency classification used by the matrix view and the priority sort.

use crate::task::{Task, TaskStatus};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::cmp::Ordering;

/// A task due within this many days is urgent.
pub const URGENT_WITHIN_DAYS: i64 = 2;
/// A task due within this many days is important.
pub const IMPORTANT_WITHIN_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    ImportantUrgent,
    ImportantNotUrgent,
    NotImportantUrgent,
    NotImportantNotUrgent,
}

impl Bucket {
    /// In display and sort order.
    pub const ALL: [Bucket; 4] = [
        Bucket::ImportantUrgent,
        Bucket::ImportantNotUrgent,
        Bucket::NotImportantUrgent,
        Bucket::NotImportantNotUrgent,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Bucket::ImportantUrgent => "Important & urgent",
            Bucket::ImportantNotUrgent => "Important, not urgent",
            Bucket::NotImportantUrgent => "Urgent, not important",
            Bucket::NotImportantNotUrgent => "Neither",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Calendar days from `today` to the due date; negative when overdue.
pub fn days_until_due(task: &Task, today: NaiveDate) -> Option<i64> {
    task.data_limite.map(|due| (due - today).num_days())
}

pub fn classify(task: &Task, today: NaiveDate) -> Bucket {
    if task.status == TaskStatus::Concluida {
        return Bucket::NotImportantNotUrgent;
    }
    let days = days_until_due(task, today);
    let urgent = days.is_some_and(|d| d <= URGENT_WITHIN_DAYS);
    let important =
        task.status == TaskStatus::EmAndamento || days.is_some_and(|d| d <= IMPORTANT_WITHIN_DAYS);
    match (important, urgent) {
        (true, true) => Bucket::ImportantUrgent,
        (true, false) => Bucket::ImportantNotUrgent,
        (false, true) => Bucket::NotImportantUrgent,
        (false, false) => Bucket::NotImportantNotUrgent,
    }
}

/// Due date at midnight, or the creation time for tasks without one.
pub fn schedule_key(task: &Task) -> NaiveDateTime {
    task.data_limite
        .map(|due| due.and_time(NaiveTime::MIN))
        .unwrap_or(task.created_at)
}

pub fn compare_by_schedule(a: &Task, b: &Task) -> Ordering {
    schedule_key(a).cmp(&schedule_key(b))
}

pub fn compare_by_priority(a: &Task, b: &Task, today: NaiveDate) -> Ordering {
    classify(a, today)
        .cmp(&classify(b, today))
        .then_with(|| compare_by_schedule(a, b))
}

/// Tasks grouped into the four quadrants, each ordered by [`schedule_key`].
#[derive(Debug, Default)]
pub struct Matrix<'a> {
    zones: [Vec<&'a Task>; 4],
}

impl<'a> Matrix<'a> {
    pub fn group(tasks: impl IntoIterator<Item = &'a Task>, today: NaiveDate) -> Self {
        let mut matrix = Matrix::default();
        for task in tasks {
            matrix.zones[classify(task, today).index()].push(task);
        }
        for zone in matrix.zones.iter_mut() {
            zone.sort_by(|a, b| compare_by_schedule(a, b));
        }
        matrix
    }

    pub fn zone(&self, bucket: Bucket) -> &[&'a Task] {
        &self.zones[bucket.index()]
    }

    /// All tasks, zone by zone in [`Bucket::ALL`] order.
    pub fn in_order(&self) -> Vec<&'a Task> {
        self.zones.iter().flatten().copied().collect()
    }
}
