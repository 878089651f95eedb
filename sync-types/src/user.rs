//! The user state object: tasks, categories, tombstones and settings.
//!
//! Every local mutation keeps tombstones and `last_save` stamps consistent,
//! which is what the merge engine relies on.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{Category, CategoryId, OtherData, Task, TaskId, Timestamp, ValidationError};

/// Reference stored in `profile_picture` when the image lives in the local blob store.
pub const LOCAL_PROFILE_PICTURE: &str = "LOCAL_FILE";

/// Blob store key for the local profile picture.
pub const PROFILE_PICTURE_KEY: &str = "profilePicture";

/// Light/dark preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DarkMode {
    /// Always light.
    Light,
    /// Always dark.
    Dark,
    /// Follow the operating system.
    #[default]
    System,
    /// Pick based on the theme background.
    Auto,
}

/// Application preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Show category controls.
    pub enable_categories: bool,
    /// Sort completed tasks after open ones.
    pub done_to_bottom: bool,
    /// Glow effect around task cards.
    pub enable_glow: bool,
    /// Use the compact emoji picker.
    pub simple_emoji_picker: bool,
    /// Show the open-task count as an app badge.
    pub app_badge: bool,
    /// Show the completion progress bar.
    pub show_progress_bar: bool,
    /// Theme name.
    pub theme: String,
    /// Light/dark preference.
    pub dark_mode: DarkMode,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            enable_categories: true,
            done_to_bottom: false,
            enable_glow: true,
            simple_emoji_picker: false,
            app_badge: false,
            show_progress_bar: true,
            theme: "system".to_string(),
            dark_mode: DarkMode::default(),
        }
    }
}

/// All persisted state of one user on one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Profile picture URL, or [`LOCAL_PROFILE_PICTURE`].
    #[serde(default)]
    pub profile_picture: Option<String>,
    /// When this profile was created.
    pub created_at: Timestamp,
    /// Live tasks.
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Live categories.
    #[serde(default)]
    pub categories: Vec<Category>,
    /// Tasks deleted since the last successful sync.
    #[serde(default)]
    pub deleted_tasks: Vec<TaskId>,
    /// Categories deleted since the last successful sync.
    #[serde(default)]
    pub deleted_categories: Vec<CategoryId>,
    /// Favorite category IDs.
    #[serde(default)]
    pub favorite_categories: Vec<CategoryId>,
    /// Completion time of the last successful merge.
    #[serde(default)]
    pub last_synced_at: Option<Timestamp>,
    /// Preferences.
    #[serde(default)]
    pub settings: AppSettings,
}

impl Default for User {
    fn default() -> Self {
        Self {
            name: None,
            profile_picture: None,
            created_at: Utc::now(),
            tasks: Vec::new(),
            categories: Vec::new(),
            deleted_tasks: Vec::new(),
            deleted_categories: Vec::new(),
            favorite_categories: Vec::new(),
            last_synced_at: None,
            settings: AppSettings::default(),
        }
    }
}

impl User {
    /// Create an empty profile with a display name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Find a task by ID.
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Find a category by ID.
    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Add a new task.
    pub fn add_task(&mut self, task: Task) -> Result<(), ValidationError> {
        task.validate()?;
        self.tasks.push(task);
        Ok(())
    }

    /// Replace a task by ID, stamping `last_save`. Returns false if absent.
    pub fn edit_task(&mut self, mut task: Task) -> Result<bool, ValidationError> {
        task.validate()?;
        let Some(slot) = self.tasks.iter_mut().find(|t| t.id == task.id) else {
            return Ok(false);
        };
        task.last_save = Some(Utc::now());
        *slot = task;
        Ok(true)
    }

    /// Flip the done flag of a task. Returns false if absent.
    pub fn toggle_done(&mut self, id: TaskId) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.done = !task.done;
                task.last_save = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    /// Delete a task and record its tombstone. Returns false if absent.
    pub fn delete_task(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return false;
        }
        if !self.deleted_tasks.contains(&id) {
            self.deleted_tasks.push(id);
        }
        true
    }

    /// Add a new category.
    pub fn add_category(&mut self, category: Category) -> Result<(), ValidationError> {
        category.validate()?;
        self.categories.push(category);
        Ok(())
    }

    /// Replace a category definition and refresh every task that embeds it.
    ///
    /// Returns false if the category is absent.
    pub fn update_category(&mut self, mut category: Category) -> Result<bool, ValidationError> {
        category.validate()?;
        let now = Utc::now();
        category.last_save = Some(now);

        let Some(slot) = self.categories.iter_mut().find(|c| c.id == category.id) else {
            return Ok(false);
        };
        *slot = category.clone();

        for task in &mut self.tasks {
            let mut touched = false;
            for embedded in task.category.iter_mut().flatten() {
                if embedded.id == category.id {
                    *embedded = category.clone();
                    touched = true;
                }
            }
            if touched {
                task.last_save = Some(now);
            }
        }
        Ok(true)
    }

    /// Delete a category, detach it from tasks and favorites, record its tombstone.
    pub fn delete_category(&mut self, id: CategoryId) -> bool {
        let before = self.categories.len();
        self.categories.retain(|c| c.id != id);
        if self.categories.len() == before {
            return false;
        }
        if !self.deleted_categories.contains(&id) {
            self.deleted_categories.push(id);
        }
        self.favorite_categories.retain(|f| *f != id);

        let now = Utc::now();
        for task in &mut self.tasks {
            if let Some(list) = &mut task.category {
                let len = list.len();
                list.retain(|c| c.id != id);
                if list.len() != len {
                    task.last_save = Some(now);
                }
                if list.is_empty() {
                    task.category = None;
                }
            }
        }
        true
    }

    /// Toggle a category in the favorites list. Returns the new state.
    pub fn toggle_favorite(&mut self, id: CategoryId) -> bool {
        if let Some(pos) = self.favorite_categories.iter().position(|f| *f == id) {
            self.favorite_categories.remove(pos);
            false
        } else {
            self.favorite_categories.push(id);
            true
        }
    }

    /// Forget deletions after both peers have observed them.
    pub fn clear_tombstones(&mut self) {
        self.deleted_tasks.clear();
        self.deleted_categories.clear();
    }

    /// Snapshot of the miscellaneous fields, without blob payloads.
    pub fn other_data(&self) -> OtherData {
        OtherData {
            name: self.name.clone(),
            profile_picture: self.profile_picture.clone(),
            profile_picture_data: None,
            settings: self.settings.clone(),
        }
    }

    /// Adopt name and settings from another device.
    ///
    /// The profile picture is not touched here: it may need blob store work first.
    pub fn apply_other_data(&mut self, other: &OtherData) {
        self.name = other.name.clone();
        self.settings = other.settings.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    fn color() -> Color {
        Color::parse("#123456").unwrap()
    }

    #[test]
    fn delete_task_records_tombstone_once() {
        let mut user = User::default();
        let task = Task::new("a", color());
        let id = task.id;
        user.add_task(task).unwrap();

        assert!(user.delete_task(id));
        assert!(!user.delete_task(id));
        assert_eq!(user.deleted_tasks, vec![id]);
        assert!(user.tasks.is_empty());
    }

    #[test]
    fn edit_task_stamps_last_save() {
        let mut user = User::default();
        let task = Task::new("a", color());
        user.add_task(task.clone()).unwrap();

        let mut edited = task.clone();
        edited.name = "b".into();
        assert!(user.edit_task(edited).unwrap());

        let stored = user.task(task.id).unwrap();
        assert_eq!(stored.name, "b");
        assert!(stored.last_save.is_some());
    }

    #[test]
    fn add_task_rejects_invalid() {
        let mut user = User::default();
        let result = user.add_task(Task::new("x".repeat(31), color()));
        assert!(result.is_err());
        assert!(user.tasks.is_empty());
    }

    #[test]
    fn update_category_fans_out_to_tasks() {
        let mut user = User::default();
        let category = Category::new("Work", color());
        user.add_category(category.clone()).unwrap();
        let task = Task::new("report", color()).with_categories(vec![category.clone()]);
        let untouched = Task::new("walk", color());
        user.add_task(task.clone()).unwrap();
        user.add_task(untouched.clone()).unwrap();

        let mut renamed = category.clone();
        renamed.name = "Work/Life".into();
        assert!(user.update_category(renamed).unwrap());

        let embedded = &user.task(task.id).unwrap().category.as_ref().unwrap()[0];
        assert_eq!(embedded.name, "Work/Life");
        assert!(user.task(task.id).unwrap().last_save.is_some());
        assert!(user.task(untouched.id).unwrap().last_save.is_none());
        assert!(user.category(category.id).unwrap().last_save.is_some());
    }

    #[test]
    fn delete_category_detaches_everywhere() {
        let mut user = User::default();
        let category = Category::new("Home", color());
        user.add_category(category.clone()).unwrap();
        user.toggle_favorite(category.id);
        let task = Task::new("dishes", color()).with_categories(vec![category.clone()]);
        user.add_task(task.clone()).unwrap();

        assert!(user.delete_category(category.id));
        assert!(user.favorite_categories.is_empty());
        assert_eq!(user.deleted_categories, vec![category.id]);
        assert!(user.task(task.id).unwrap().category.is_none());
    }

    #[test]
    fn toggle_favorite_flips() {
        let mut user = User::default();
        let id = CategoryId::new();
        assert!(user.toggle_favorite(id));
        assert!(!user.toggle_favorite(id));
        assert!(user.favorite_categories.is_empty());
    }

    #[test]
    fn user_decodes_with_missing_optional_fields() {
        let json = r#"{ "createdAt": "2024-01-01T00:00:00Z" }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert!(user.tasks.is_empty());
        assert_eq!(user.settings, AppSettings::default());
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let settings: AppSettings = serde_json::from_str(r#"{ "darkMode": "dark" }"#).unwrap();
        assert_eq!(settings.dark_mode, DarkMode::Dark);
        assert!(settings.enable_categories);
    }
}
