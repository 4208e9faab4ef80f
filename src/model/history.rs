use crate::model::OrderStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Display;

/// What a history entry records: an observed status or a free-form label for a user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HistoryLabel {
    Status(OrderStatus),
    Note(String),
}

impl Display for HistoryLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(status) => f.write_str(status.label()),
            Self::Note(note) => f.write_str(note),
        }
    }
}

/// One line of the user-visible status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusHistoryEntry {
    pub label: HistoryLabel,
    pub at: DateTime<Utc>,
}

impl StatusHistoryEntry {
    pub fn status(status: OrderStatus, at: DateTime<Utc>) -> Self {
        Self {
            label: HistoryLabel::Status(status),
            at,
        }
    }

    pub fn note(note: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            label: HistoryLabel::Note(note.into()),
            at,
        }
    }

    /// The status carried by this entry, if it records one.
    pub fn as_status(&self) -> Option<OrderStatus> {
        match self.label {
            HistoryLabel::Status(status) => Some(status),
            HistoryLabel::Note(_) => None,
        }
    }
}
