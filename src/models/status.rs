use chrono::NaiveDateTime;

/// Time-derived state shown as a badge on assignments, exams and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Overdue,
    Pending,
    Finished,
    InProgress,
    Upcoming,
}

impl Status {
    /// i18n key of the label.
    pub fn key(&self) -> &'static str {
        match self {
            Status::Overdue => "overdue",
            Status::Pending => "pending",
            Status::Finished => "finished",
            Status::InProgress => "in_progress",
            Status::Upcoming => "upcoming",
        }
    }

    /// CSS modifier of the badge.
    pub fn badge(&self) -> &'static str {
        match self {
            Status::Overdue => "badge-danger",
            Status::Pending => "badge-warning",
            Status::Finished => "badge-muted",
            Status::InProgress => "badge-success",
            Status::Upcoming => "badge-info",
        }
    }
}

/// An assignment is overdue once its due date has passed.
pub fn assignment_status(due: NaiveDateTime, now: NaiveDateTime) -> Status {
    if due < now { Status::Overdue } else { Status::Pending }
}

/// Status of something running from `start` to `end`.
pub fn period_status(start: NaiveDateTime, end: NaiveDateTime, now: NaiveDateTime) -> Status {
    if now >= end {
        Status::Finished
    } else if now >= start {
        Status::InProgress
    } else {
        Status::Upcoming
    }
}
