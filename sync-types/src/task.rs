//! Tasks, categories and the field rules they must satisfy.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

use crate::{CategoryId, TaskId};

/// Maximum task name length, in characters.
pub const MAX_TASK_NAME_LEN: usize = 30;

/// Maximum task description length, in characters.
pub const MAX_TASK_DESCRIPTION_LEN: usize = 200;

/// Maximum category name length, in characters.
pub const MAX_CATEGORY_NAME_LEN: usize = 20;

/// Timestamps are UTC and serialize as RFC 3339 strings.
pub type Timestamp = DateTime<Utc>;

/// A field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Name is empty or whitespace.
    #[error("{entity} name must not be empty")]
    EmptyName {
        /// "task" or "category".
        entity: &'static str,
    },

    /// Name exceeds its limit.
    #[error("{entity} name is {len} characters, maximum is {max}")]
    NameTooLong {
        /// "task" or "category".
        entity: &'static str,
        /// Actual length in characters.
        len: usize,
        /// Allowed maximum.
        max: usize,
    },

    /// Description exceeds its limit.
    #[error("task description is {len} characters, maximum is {max}")]
    DescriptionTooLong {
        /// Actual length in characters.
        len: usize,
        /// Allowed maximum.
        max: usize,
    },

    /// Color is not `#RRGGBB`.
    #[error("{field} color {value:?} is not a 6-digit hex color")]
    InvalidColor {
        /// Which color failed, e.g. "task" or "category \"Work\"".
        field: String,
        /// The rejected value.
        value: String,
    },
}

/// Error returned when a string is not a `#RRGGBB` color.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color {0:?}: expected #RRGGBB")]
pub struct InvalidColor(pub String);

fn hex_color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid color regex"))
}

/// A 6-digit hex color such as `#248eff`.
///
/// Construction always validates, so a `Color` in hand is well formed.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

impl Color {
    /// Validate and wrap a color string.
    pub fn parse(value: &str) -> Result<Self, InvalidColor> {
        if hex_color_regex().is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(InvalidColor(value.to_string()))
        }
    }

    /// Check a raw string without allocating a `Color`.
    pub fn is_valid(value: &str) -> bool {
        hex_color_regex().is_match(value)
    }

    /// The color as written, e.g. `#248eff`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Self("#b624ff".to_string())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Color({})", self.0)
    }
}

impl FromStr for Color {
    type Err = InvalidColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Color {
    type Error = InvalidColor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if hex_color_regex().is_match(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidColor(value))
        }
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.0
    }
}

/// A category definition.
///
/// Tasks embed copies of categories, not references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Unique identifier.
    pub id: CategoryId,
    /// Display name (at most [`MAX_CATEGORY_NAME_LEN`] characters).
    pub name: String,
    /// Optional emoji identifier (unified codepoint sequence).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    /// Display color.
    pub color: Color,
    /// Last edit time, used for last-write-wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_save: Option<Timestamp>,
}

impl Category {
    /// Create a new category with a fresh ID.
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            id: CategoryId::new(),
            name: name.into(),
            emoji: None,
            color,
            last_save: None,
        }
    }

    /// Set the emoji.
    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    /// Check field limits.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("category", &self.name, MAX_CATEGORY_NAME_LEN)
    }
}

/// A to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier.
    pub id: TaskId,
    /// Completed?
    #[serde(default)]
    pub done: bool,
    /// Pinned to the top of the list?
    #[serde(default)]
    pub pinned: bool,
    /// Task name (at most [`MAX_TASK_NAME_LEN`] characters).
    pub name: String,
    /// Optional description (at most [`MAX_TASK_DESCRIPTION_LEN`] characters).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional emoji identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    /// Display color.
    pub color: Color,
    /// Creation time.
    pub date: Timestamp,
    /// Optional due date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Timestamp>,
    /// Category snapshots attached at creation/edit time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Vec<Category>>,
    /// Last edit time, used for last-write-wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_save: Option<Timestamp>,
    /// Name of the user who shared this task, if it arrived via a share link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_by: Option<String>,
}

impl Task {
    /// Create a new task created now, with a fresh ID.
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            id: TaskId::new(),
            done: false,
            pinned: false,
            name: name.into(),
            description: None,
            emoji: None,
            color,
            date: Utc::now(),
            deadline: None,
            category: None,
            last_save: None,
            shared_by: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the emoji.
    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    /// Set the deadline.
    pub fn with_deadline(mut self, deadline: Timestamp) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attach category snapshots.
    pub fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.category = if categories.is_empty() {
            None
        } else {
            Some(categories)
        };
        self
    }

    /// Check field limits, including embedded categories.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("task", &self.name, MAX_TASK_NAME_LEN)?;
        if let Some(description) = &self.description {
            let len = description.chars().count();
            if len > MAX_TASK_DESCRIPTION_LEN {
                return Err(ValidationError::DescriptionTooLong {
                    len,
                    max: MAX_TASK_DESCRIPTION_LEN,
                });
            }
        }
        for category in self.category.iter().flatten() {
            category.validate()?;
        }
        Ok(())
    }

    /// Whether this task embeds the given category.
    pub fn has_category(&self, id: CategoryId) -> bool {
        self.category.iter().flatten().any(|c| c.id == id)
    }
}

fn validate_name(entity: &'static str, name: &str, max: usize) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName { entity });
    }
    let len = name.chars().count();
    if len > max {
        return Err(ValidationError::NameTooLong { entity, len, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color(value: &str) -> Color {
        Color::parse(value).unwrap()
    }

    #[test]
    fn color_accepts_hex() {
        assert!(Color::parse("#248eff").is_ok());
        assert!(Color::parse("#ABCDEF").is_ok());
    }

    #[test]
    fn color_rejects_malformed() {
        for bad in ["248eff", "#248ef", "#248effa", "#24 8ef", "#gggggg", "", "red"] {
            assert!(Color::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn color_deserialization_validates() {
        let ok: Color = serde_json::from_str("\"#000000\"").unwrap();
        assert_eq!(ok.as_str(), "#000000");
        assert!(serde_json::from_str::<Color>("\"javascript:alert(1)\"").is_err());
    }

    #[test]
    fn task_serializes_camel_case() {
        let mut task = Task::new("Buy milk", color("#248eff"));
        task.last_save = Some(Utc::now());
        task.shared_by = Some("Ana".into());
        let json = serde_json::to_value(&task).unwrap();
        assert!(json.get("lastSave").is_some());
        assert!(json.get("sharedBy").is_some());
        assert!(json.get("description").is_none());
    }

    #[test]
    fn task_decodes_minimal_browser_shape() {
        let json = r##"{
            "id": "6f1c1f3e-52b8-4a55-9b2f-6a3f7c1f0b11",
            "name": "Walk",
            "color": "#00ff00",
            "date": "2024-03-01T10:00:00.000Z"
        }"##;
        let task: Task = serde_json::from_str(json).unwrap();
        assert!(!task.done);
        assert!(task.last_save.is_none());
        assert!(task.category.is_none());
    }

    #[test]
    fn task_name_limit() {
        let task = Task::new("x".repeat(MAX_TASK_NAME_LEN), color("#000000"));
        assert!(task.validate().is_ok());

        let task = Task::new("x".repeat(MAX_TASK_NAME_LEN + 1), color("#000000"));
        assert_eq!(
            task.validate(),
            Err(ValidationError::NameTooLong {
                entity: "task",
                len: 31,
                max: 30
            })
        );
    }

    #[test]
    fn task_name_counts_characters_not_bytes() {
        let task = Task::new("é".repeat(MAX_TASK_NAME_LEN), color("#000000"));
        assert!(task.validate().is_ok());
    }

    #[test]
    fn description_limit() {
        let task = Task::new("ok", color("#000000"))
            .with_description("d".repeat(MAX_TASK_DESCRIPTION_LEN + 1));
        assert!(matches!(
            task.validate(),
            Err(ValidationError::DescriptionTooLong { .. })
        ));
    }

    #[test]
    fn embedded_category_is_validated() {
        let category = Category::new("a very long category name", color("#000000"));
        let task = Task::new("ok", color("#000000")).with_categories(vec![category]);
        assert!(matches!(
            task.validate(),
            Err(ValidationError::NameTooLong {
                entity: "category",
                ..
            })
        ));
    }

    #[test]
    fn empty_name_rejected() {
        let task = Task::new("   ", color("#000000"));
        assert_eq!(
            task.validate(),
            Err(ValidationError::EmptyName { entity: "task" })
        );
    }
}
