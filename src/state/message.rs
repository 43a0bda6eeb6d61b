//! Conversation messages and their date-grouped projection.

#[cfg(test)]
#[path = "message_test.rs"]
mod message_test;

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::net::types::Chart;

pub const TODAY_LABEL: &str = "Today";
/// Label for leading messages that carry no timestamp.
pub const UNDATED_LABEL: &str = "Earlier";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single conversation message. Never mutated after it is appended to a thread.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: Option<OffsetDateTime>,
    /// Charts attached to a chart-thread reply; `None` on analysis messages.
    pub charts: Option<Vec<Chart>>,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>, timestamp: Option<OffsetDateTime>) -> Self {
        Self::new(Role::User, content.into(), timestamp)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>, timestamp: Option<OffsetDateTime>) -> Self {
        Self::new(Role::Assistant, content.into(), timestamp)
    }

    #[must_use]
    pub fn with_charts(mut self, charts: Vec<Chart>) -> Self {
        self.charts = Some(charts);
        self
    }

    fn new(role: Role, content: String, timestamp: Option<OffsetDateTime>) -> Self {
        Self { id: uuid::Uuid::new_v4().to_string(), role, content, timestamp, charts: None }
    }
}

// =============================================================================
// TIMESTAMPS
// =============================================================================

/// The machine's UTC offset, or UTC when it cannot be determined.
///
/// The offset can only be read soundly while the process is single-threaded,
/// so call this before any runtime worker threads exist.
#[must_use]
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// Parse a backend timestamp into the display offset.
///
/// Accepts RFC 3339 and the offset-less ISO form the backend emits
/// (`2024-12-06T10:11:12.123456`). The backend stamps with its local wall
/// clock, so offset-less values are read in `offset`, the same clock client
/// messages are stamped with. A bare date is read as midnight.
#[must_use]
pub fn parse_timestamp(raw: &str, offset: UtcOffset) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts.to_offset(offset));
    }
    let naive = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let whole_seconds = raw.split('.').next().unwrap_or(raw).replacen(' ', "T", 1);
    if let Ok(ts) = PrimitiveDateTime::parse(&whole_seconds, naive) {
        return Some(ts.assume_offset(offset));
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_offset(offset))
}

/// Divider label for a message date: `Today`, otherwise `DD/MM/YYYY`.
#[must_use]
pub fn date_label(date: Date, today: Date) -> String {
    if date == today {
        return TODAY_LABEL.to_owned();
    }
    date.format(format_description!("[day]/[month]/[year]"))
        .unwrap_or_else(|_| date.to_string())
}

// =============================================================================
// GROUPING
// =============================================================================

/// A run of consecutive messages sharing one date label.
#[derive(Debug, PartialEq)]
pub struct DateGroup<'a> {
    pub label: String,
    pub messages: Vec<&'a Message>,
}

/// Partition messages into date-labeled groups for display.
///
/// A new group starts whenever a message's label differs from the previous
/// message's. Undated messages stay in the current group.
#[must_use]
pub fn group_by_date(messages: &[Message], today: Date) -> Vec<DateGroup<'_>> {
    let mut groups: Vec<DateGroup<'_>> = Vec::new();
    for message in messages {
        let label = match message.timestamp {
            Some(ts) => date_label(ts.date(), today),
            None => match groups.last() {
                Some(group) => group.label.clone(),
                None => UNDATED_LABEL.to_owned(),
            },
        };
        match groups.last_mut() {
            Some(group) if group.label == label => group.messages.push(message),
            _ => groups.push(DateGroup { label, messages: vec![message] }),
        }
    }
    groups
}
