//! Share links for single tasks.
//!
//! A task is shared as a URL carrying two query parameters:
//! `?task=<url-encoded JSON>&userName=<url-encoded name>`.
//!
//! The receiving side never trusts the payload: every color is checked
//! against `#RRGGBB`, field lengths are enforced, and the task gets a fresh
//! ID so it cannot collide with (or overwrite) a local entity.

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use todo_sync_types::{
    Category, CategoryId, Color, Task, TaskId, Timestamp, ValidationError,
};
use url::Url;

/// Query parameter holding the task JSON.
pub const TASK_PARAM: &str = "task";

/// Query parameter holding the sender's name.
pub const USER_NAME_PARAM: &str = "userName";

/// Placeholder base used when a bare query string is pasted.
const RELATIVE_BASE: &str = "https://localhost/";

/// Errors from building or reading a share link.
#[derive(Debug, Error)]
pub enum ShareError {
    /// The link is not a URL.
    #[error("invalid share link: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// No `task` parameter.
    #[error("share link has no task")]
    MissingTask,

    /// No `userName` parameter, or it is blank.
    #[error("share link has no sender name")]
    MissingUserName,

    /// The `task` parameter is not a task.
    #[error("shared task is malformed: {0}")]
    InvalidTask(#[source] serde_json::Error),

    /// A field broke a rule.
    #[error("shared task rejected: {0}")]
    Invalid(#[from] ValidationError),

    /// Serializing the outgoing task failed.
    #[error("failed to encode task: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A task accepted from a share link, ready to add locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedTask {
    /// The task, with a fresh ID and `shared_by` set.
    pub task: Task,
    /// The sender's name.
    pub user_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskPayload {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    pinned: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    emoji: Option<String>,
    color: String,
    #[serde(default)]
    date: Option<Timestamp>,
    #[serde(default)]
    deadline: Option<Timestamp>,
    #[serde(default)]
    category: Option<Vec<CategoryPayload>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryPayload {
    id: CategoryId,
    name: String,
    #[serde(default)]
    emoji: Option<String>,
    color: String,
    #[serde(default)]
    last_save: Option<Timestamp>,
}

/// Build a share link for a task on top of `base_url`.
pub fn create_share_link(base_url: &str, task: &Task, user_name: &str) -> Result<String, ShareError> {
    let mut url = Url::parse(base_url)?;
    let json = serde_json::to_string(task).map_err(ShareError::Encode)?;
    url.query_pairs_mut()
        .clear()
        .append_pair(TASK_PARAM, &json)
        .append_pair(USER_NAME_PARAM, user_name);
    Ok(url.into())
}

/// Read and validate a share link.
///
/// Accepts a full URL or just its query string (`?task=...&userName=...`).
pub fn parse_share_link(link: &str) -> Result<SharedTask, ShareError> {
    let link = link.trim();
    let url = match Url::parse(link) {
        Ok(url) => url,
        Err(_) => Url::parse(RELATIVE_BASE)?.join(link)?,
    };

    let mut task_json = None;
    let mut user_name = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            TASK_PARAM => task_json = Some(value.into_owned()),
            USER_NAME_PARAM => user_name = Some(value.into_owned()),
            _ => {}
        }
    }

    let task_json = task_json.ok_or(ShareError::MissingTask)?;
    let user_name = user_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or(ShareError::MissingUserName)?;

    let payload: TaskPayload =
        serde_json::from_str(&task_json).map_err(ShareError::InvalidTask)?;
    let task = accept_payload(payload, &user_name)?;

    Ok(SharedTask { task, user_name })
}

fn accept_payload(payload: TaskPayload, user_name: &str) -> Result<Task, ValidationError> {
    let color = parse_color("task", &payload.color)?;

    let category = match payload.category {
        Some(list) => Some(
            list.into_iter()
                .map(|c| {
                    let color = parse_color(&format!("category {:?}", c.name), &c.color)?;
                    Ok(Category {
                        id: c.id,
                        name: c.name,
                        emoji: c.emoji,
                        color,
                        last_save: c.last_save,
                    })
                })
                .collect::<Result<Vec<_>, ValidationError>>()?,
        ),
        None => None,
    };

    let task = Task {
        id: TaskId::new(),
        done: payload.done,
        pinned: payload.pinned,
        name: payload.name,
        description: payload.description.filter(|d| !d.is_empty()),
        emoji: payload.emoji,
        color,
        date: payload.date.unwrap_or_else(Utc::now),
        deadline: payload.deadline,
        category: category.filter(|list| !list.is_empty()),
        last_save: None,
        shared_by: Some(user_name.to_string()),
    };
    task.validate()?;
    Ok(task)
}

fn parse_color(field: &str, value: &str) -> Result<Color, ValidationError> {
    Color::parse(value).map_err(|_| ValidationError::InvalidColor {
        field: field.to_string(),
        value: value.to_string(),
    })
}
