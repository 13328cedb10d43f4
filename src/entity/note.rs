// src/entity/note.rs
use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_SUBJECT: &str = "General";
pub const DEFAULT_PRIORITY: &str = "normal";

/// A single study reminder.
///
/// Serialized with the field names the device firmware and previously saved
/// blobs use (`dueDate`, `createdAt`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub subject: String,
    pub priority: String,
    pub due_date: Option<String>,
    pub due_time: Option<String>,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// User-entered fields for a new note.
#[derive(Debug, Clone, Default)]
pub struct NoteFields {
    pub text: String,
    pub subject: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub due_time: Option<String>,
}

impl NoteFields {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn due(mut self, date: Option<String>, time: Option<String>) -> Self {
        self.due_date = date;
        self.due_time = time;
        self
    }
}

impl Note {
    /// Build a note from validated fields. Returns `None` when the text is
    /// empty after trimming.
    pub fn from_fields(fields: NoteFields, created_at: i64) -> Option<Self> {
        let text = fields.text.trim();
        if text.is_empty() {
            return None;
        }

        Some(Self {
            id: Uuid::new_v4().to_string(),
            subject: non_blank(fields.subject).unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            priority: non_blank(fields.priority).unwrap_or_else(|| DEFAULT_PRIORITY.to_string()),
            due_date: non_blank(fields.due_date),
            due_time: non_blank(fields.due_time),
            text: text.to_string(),
            created_at,
        })
    }

    /// Short id prefix for terminal output.
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.id.len());
        &self.id[..end]
    }

    /// `Due: <date> <time>` or `Due: not set`.
    pub fn due_label(&self) -> String {
        if self.due_date.is_none() && self.due_time.is_none() {
            return "Due: not set".to_string();
        }
        format!(
            "Due: {} {}",
            self.due_date.as_deref().unwrap_or(""),
            self.due_time.as_deref().unwrap_or("")
        )
    }

    /// Creation time in local time, `dd/mm hh:mm`.
    pub fn created_label(&self) -> String {
        let created: Option<DateTime<Local>> =
            Local.timestamp_millis_opt(self.created_at).single();
        match created {
            Some(dt) => format!("Created: {}", dt.format("%d/%m %H:%M")),
            None => "Created: unknown".to_string(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
