//! Initialize the local profile.

use anyhow::{bail, Result};
use std::path::Path;
use todo_sync_types::User;

use super::{save_user, user_store};
use crate::config::AppConfig;

/// Run the init command.
pub async fn run(data_dir: &Path, name: &str) -> Result<()> {
    let store = user_store(data_dir);
    if store.exists().await {
        bail!(
            "Already initialized. Delete {} to reinitialize.",
            store.path().display()
        );
    }
    let name = name.trim();
    if name.is_empty() {
        bail!("Name must not be empty");
    }

    let user = User::named(name);
    save_user(&store, &user).await?;

    let mut config = AppConfig::load(data_dir).await?;
    config.user.name = Some(name.to_string());
    config.save(data_dir).await?;

    println!("Profile initialized successfully!");
    println!();
    println!("  Name:      {name}");
    println!("  Data dir:  {}", data_dir.display());
    println!();
    println!("Next steps:");
    println!("  1. Add a task: todo-sync add \"Buy milk\"");
    println!("  2. Sync with another device: todo-sync host  /  todo-sync join <id>");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{load_user, user_path};
    use tempfile::tempdir;

    #[tokio::test]
    async fn init_creates_profile_and_config() {
        let dir = tempdir().unwrap();
        run(dir.path(), "Test User").await.unwrap();

        assert!(user_path(dir.path()).exists());
        let user = load_user(&user_store(dir.path())).await.unwrap();
        assert_eq!(user.name.as_deref(), Some("Test User"));

        let config = AppConfig::load(dir.path()).await.unwrap();
        assert_eq!(config.user.name.as_deref(), Some("Test User"));
    }

    #[tokio::test]
    async fn init_fails_if_already_initialized() {
        let dir = tempdir().unwrap();
        run(dir.path(), "First").await.unwrap();
        assert!(run(dir.path(), "Second").await.is_err());
    }

    #[tokio::test]
    async fn init_rejects_blank_name() {
        let dir = tempdir().unwrap();
        assert!(run(dir.path(), "   ").await.is_err());
    }
}
