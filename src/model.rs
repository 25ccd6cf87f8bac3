use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use crate::error::TodoError;

// Self documenting alias
pub type TimeStamp = OffsetDateTime;

/// Category given to tasks created without one.
pub const DEFAULT_CATEGORY: &str = "general";

/// Categories offered to the user. Never enforced; any text is a valid category.
pub const SUGGESTED_CATEGORIES: [&str; 5] = ["general", "work", "personal", "shopping", "health"];

// --- Task Priority ---
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

// Unknown or null priorities load as medium instead of failing the record.
impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(match raw {
            Some(s) => s.parse::<Priority>().unwrap_or_else(|_| {
                tracing::warn!(priority = %s, "unknown priority, using medium");
                Self::default()
            }),
            None => Self::default(),
        })
    }
}

impl FromStr for Priority {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(TodoError::validation(format!(
                "invalid priority '{s}': must be high, medium, or low"
            ))),
        }
    }
}

// --- Task Object ---
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Task {
    /** Assigned as record count + 1 on insert */
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u64,

    /** Required description, stored trimmed */
    #[serde(rename = "task", default, deserialize_with = "null_as_default")]
    pub text: String,

    #[serde(default)]
    pub priority: Priority,

    /** Free-form label used for filtering */
    #[serde(default = "default_category", deserialize_with = "category_or_default")]
    pub category: String,

    /** Creation time (immutable once set) */
    #[serde(
        default = "unix_epoch",
        serialize_with = "timestamp::serialize",
        deserialize_with = "timestamp::deserialize_or_epoch"
    )]
    pub created_at: TimeStamp,

    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,

    /** When the task was first marked completed */
    #[serde(default, with = "timestamp::option")]
    pub completed_at: Option<TimeStamp>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn unix_epoch() -> TimeStamp {
    OffsetDateTime::UNIX_EPOCH
}

// `null` on disk reads the same as a missing field.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

fn category_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_else(default_category))
}

/// Partial update applied by `TodoList::edit`. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    pub text: Option<String>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub completed: Option<bool>,
}

// --- Zero size markers for the "typed-state" builder ---
pub struct MissingText;
pub struct HasText;

// --- Generic Builder struct ---
pub struct TaskBuilder<TextState> {
    text: Option<String>,
    priority: Priority,
    category: String,

    // zero-cost phantom marker to record builder state in type system
    _state: std::marker::PhantomData<TextState>,
}

impl Task {
    /// Creates a new builder chain (*without* a description).
    pub fn builder() -> TaskBuilder<MissingText> {
        TaskBuilder {
            text: None,
            priority: Priority::default(),
            category: default_category(),
            _state: std::marker::PhantomData,
        }
    }

    /// Mark task as done. Returns `false` if it already was.
    pub fn mark_done(&mut self) -> bool {
        if self.completed {
            return false;
        }
        self.completed = true;
        self.completed_at = Some(TimeStamp::now_utc());
        true
    }

    /// Apply a partial update. A completed task without a completion time
    /// gets one; un-completing keeps the old `completed_at`.
    pub fn apply(&mut self, edit: TaskEdit) {
        if let Some(text) = edit.text {
            self.text = text.trim().to_string();
        }
        if let Some(priority) = edit.priority {
            self.priority = priority;
        }
        if let Some(category) = edit.category {
            self.category = normalize_category(&category);
        }
        if let Some(completed) = edit.completed {
            self.completed = completed;
        }
        if self.completed && self.completed_at.is_none() {
            self.completed_at = Some(TimeStamp::now_utc());
        }
    }
}

/// Blank categories fall back to [`DEFAULT_CATEGORY`]; anything else is kept
/// exactly as given, since filters match it verbatim.
pub fn normalize_category(category: &str) -> String {
    if category.trim().is_empty() {
        default_category()
    } else {
        category.to_string()
    }
}

// --- Stage-1: methods available *before* the description exists ---
impl TaskBuilder<MissingText> {
    pub fn text<S: Into<String>>(self, t: S) -> TaskBuilder<HasText> {
        TaskBuilder {
            text: Some(t.into()),
            priority: self.priority,
            category: self.category,
            _state: std::marker::PhantomData, // Flips to HasText marker
        }
    }
}

// --- Stage-2: setters available in *either* state ---
impl<TextState> TaskBuilder<TextState> {
    pub fn priority(mut self, p: Priority) -> Self {
        self.priority = p;
        self
    }

    pub fn category(mut self, c: &str) -> Self {
        self.category = normalize_category(c);
        self
    }
}

// --- Final-Stage: .build() only once a description is supplied ---
impl TaskBuilder<HasText> {
    /// Consume builder and return a pending [`Task`] with the given id.
    pub fn build(self, id: u64) -> Task {
        Task {
            id,
            text: self.text.unwrap_or_default().trim().to_string(),
            priority: self.priority,
            category: self.category,
            created_at: TimeStamp::now_utc(),
            completed: false,
            completed_at: None,
        }
    }
}

/// ISO-8601 timestamps on disk. Written as RFC 3339 (UTC); naive local
/// timestamps without an offset are accepted and read as UTC.
pub mod timestamp {
    use serde::{Deserialize, Deserializer, Serializer, de, ser};
    use time::{
        OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339,
        macros::format_description,
    };

    pub fn parse(s: &str) -> Result<OffsetDateTime, time::error::Parse> {
        if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
            return Ok(ts);
        }
        let naive = PrimitiveDateTime::parse(
            s,
            format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
            ),
        )?;
        Ok(naive.assume_utc())
    }

    pub fn serialize<S: Serializer>(ts: &OffsetDateTime, s: S) -> Result<S::Ok, S::Error> {
        let text = ts.format(&Rfc3339).map_err(ser::Error::custom)?;
        s.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<OffsetDateTime, D::Error> {
        let text = String::deserialize(d)?;
        parse(&text).map_err(de::Error::custom)
    }

    /// Like [`deserialize`], with `null` read as the Unix epoch.
    pub fn deserialize_or_epoch<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<OffsetDateTime, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(text) => parse(&text).map_err(de::Error::custom),
            None => Ok(OffsetDateTime::UNIX_EPOCH),
        }
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            ts: &Option<OffsetDateTime>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => super::serialize(ts, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<OffsetDateTime>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(text) => super::parse(&text).map(Some).map_err(de::Error::custom),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_trims_text_and_starts_pending() {
        let task = Task::builder()
            .text("  Buy milk  ")
            .priority(Priority::High)
            .category("shopping")
            .build(3);
        assert_eq!(task.id, 3);
        assert_eq!(task.text, "Buy milk");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.category, "shopping");
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn blank_category_becomes_general() {
        let task = Task::builder().text("x").category("   ").build(1);
        assert_eq!(task.category, "general");
    }

    #[test]
    fn mark_done_only_stamps_once() {
        let mut task = Task::builder().text("x").build(1);
        assert!(task.mark_done());
        let first = task.completed_at;
        assert!(first.is_some());
        assert!(!task.mark_done());
        assert_eq!(task.completed_at, first);
    }

    #[test]
    fn uncompleting_keeps_stale_timestamp() {
        let mut task = Task::builder().text("x").build(1);
        task.apply(TaskEdit {
            completed: Some(true),
            ..Default::default()
        });
        assert!(task.completed_at.is_some());
        task.apply(TaskEdit {
            completed: Some(false),
            ..Default::default()
        });
        assert!(!task.completed);
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" low ".parse::<Priority>().unwrap(), Priority::Low);
        assert!(matches!(
            "urgent".parse::<Priority>(),
            Err(TodoError::Validation(_))
        ));
    }

    #[test]
    fn reads_naive_timestamps() {
        let json = r#"{
            "id": 1,
            "task": "Buy milk",
            "priority": "medium",
            "category": "general",
            "created_at": "2024-03-05T14:07:09.123456",
            "completed": true,
            "completed_at": "2024-03-06T08:00:00"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.created_at.year(), 2024);
        assert_eq!(task.created_at.microsecond(), 123_456);
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let task: Task = serde_json::from_str(r#"{"id": 4, "task": "x", "extra": 1}"#).unwrap();
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.category, "general");
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
        assert_eq!(task.created_at, OffsetDateTime::UNIX_EPOCH);
    }

    #[test]
    fn category_is_kept_verbatim_unless_blank() {
        let task = Task::builder().text("x").category(" Work ").build(1);
        assert_eq!(task.category, " Work ");
    }

    #[test]
    fn null_fields_take_defaults() {
        let json = r#"{
            "id": null,
            "task": null,
            "priority": null,
            "category": null,
            "created_at": null,
            "completed": null,
            "completed_at": null
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id, 0);
        assert_eq!(task.text, "");
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.category, "general");
        assert_eq!(task.created_at, OffsetDateTime::UNIX_EPOCH);
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn unknown_priority_loads_as_medium() {
        let task: Task =
            serde_json::from_str(r#"{"id": 2, "task": "x", "priority": "urgent"}"#).unwrap();
        assert_eq!(task.priority, Priority::Medium);
        let task: Task =
            serde_json::from_str(r#"{"id": 3, "task": "y", "priority": "High"}"#).unwrap();
        assert_eq!(task.priority, Priority::High);
    }

    #[test]
    fn writes_field_names_of_the_document_format() {
        let task = Task::builder().text("x").build(1);
        let value = serde_json::to_value(&task).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "id",
            "task",
            "priority",
            "category",
            "created_at",
            "completed",
            "completed_at",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert!(obj["completed_at"].is_null());
        assert_eq!(obj["priority"], "medium");
    }
}
