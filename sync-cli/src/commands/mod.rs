//! CLI command implementations.

pub mod category;
pub mod init;
pub mod share;
pub mod status;
pub mod sync;
pub mod task;
pub mod transfer;

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use todo_sync_client::{FileBlobStore, JsonFileStore, StateStore};
use todo_sync_types::{Category, CategoryId, Task, TaskId, User};

/// File holding the user's state.
pub const USER_FILE: &str = "user.json";

/// Directory holding blobs (the profile picture).
pub const BLOB_DIR: &str = "blobs";

/// The JSON store in `data_dir`.
pub fn user_store(data_dir: &Path) -> JsonFileStore {
    JsonFileStore::new(data_dir.join(USER_FILE))
}

/// The blob store in `data_dir`.
pub fn blob_store(data_dir: &Path) -> FileBlobStore {
    FileBlobStore::new(data_dir.join(BLOB_DIR))
}

/// Path of the user file.
pub fn user_path(data_dir: &Path) -> PathBuf {
    data_dir.join(USER_FILE)
}

/// Load the user, failing if `init` has not been run.
pub async fn load_user(store: &JsonFileStore) -> Result<User> {
    if !store.exists().await {
        bail!("Not initialized. Run 'todo-sync init --name <name>' first.");
    }
    store
        .load()
        .await
        .with_context(|| format!("Failed to load {}", store.path().display()))
}

/// Save the user with a uniform error message.
pub async fn save_user(store: &JsonFileStore, user: &User) -> Result<()> {
    store
        .save(user)
        .await
        .with_context(|| format!("Failed to save {}", store.path().display()))
}

/// Resolve a full task ID or a unique prefix of one.
pub fn resolve_task(user: &User, input: &str) -> Result<TaskId> {
    let matches: Vec<&Task> = user
        .tasks
        .iter()
        .filter(|t| t.id.to_string().starts_with(input.trim()))
        .collect();
    match matches.as_slice() {
        [task] => Ok(task.id),
        [] => bail!("No task matches '{input}'"),
        _ => bail!("'{input}' matches {} tasks; use a longer prefix", matches.len()),
    }
}

/// Resolve a category by ID prefix or case-insensitive name.
pub fn resolve_category(user: &User, input: &str) -> Result<CategoryId> {
    let input = input.trim();
    if let Some(category) = user
        .categories
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(input))
    {
        return Ok(category.id);
    }
    let matches: Vec<&Category> = user
        .categories
        .iter()
        .filter(|c| c.id.to_string().starts_with(input))
        .collect();
    match matches.as_slice() {
        [category] => Ok(category.id),
        [] => bail!("No category matches '{input}'"),
        _ => bail!("'{input}' matches {} categories; use a longer prefix", matches.len()),
    }
}

/// First eight characters of an ID, enough to pass back as a prefix.
pub fn short_id(id: &impl ToString) -> String {
    id.to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use todo_sync_types::Color;

    fn user() -> User {
        let mut user = User::named("Ana");
        user.add_task(Task::new("One", Color::default())).unwrap();
        user.add_task(Task::new("Two", Color::default())).unwrap();
        user.add_category(Category::new("Work", Color::default()))
            .unwrap();
        user
    }

    #[test]
    fn resolves_full_and_prefix_ids() {
        let user = user();
        let id = user.tasks[0].id;
        assert_eq!(resolve_task(&user, &id.to_string()).unwrap(), id);
        assert_eq!(resolve_task(&user, &short_id(&id)).unwrap(), id);
    }

    #[test]
    fn empty_prefix_is_ambiguous() {
        let err = resolve_task(&user(), "").unwrap_err();
        assert!(err.to_string().contains("matches 2 tasks"));
    }

    #[test]
    fn unknown_task() {
        assert!(resolve_task(&user(), "zzzz").is_err());
    }

    #[test]
    fn category_by_name_or_prefix() {
        let user = user();
        let id = user.categories[0].id;
        assert_eq!(resolve_category(&user, "work").unwrap(), id);
        assert_eq!(resolve_category(&user, &short_id(&id)).unwrap(), id);
        assert!(resolve_category(&user, "Home").is_err());
    }
}
