//! Export the profile to JSON, or fold an exported profile into this one.

use anyhow::{Context, Result};
use std::path::Path;
use todo_sync_core::{merge_sync_data, LocalState, SyncOption};
use todo_sync_types::User;

use super::{load_user, save_user, user_store};

/// Run the export command. Writes to `out` or stdout.
pub async fn export(data_dir: &Path, out: Option<&Path>) -> Result<()> {
    let user = load_user(&user_store(data_dir)).await?;
    let json = serde_json::to_string_pretty(&user).context("Failed to serialize profile")?;
    match out {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Exported {} tasks and {} categories to {}",
                user.tasks.len(),
                user.categories.len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Run the import command.
///
/// The file is merged like a payload from another device: tasks and
/// categories are reconciled, tombstones honored, and the local name,
/// picture and settings are left alone.
pub async fn import(data_dir: &Path, file: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let imported: User = serde_json::from_str(&content)
        .with_context(|| format!("{} is not an exported profile", file.display()))?;

    let store = user_store(data_dir);
    let mut user = load_user(&store).await?;
    let before = user.tasks.len();

    let remote = LocalState::from_user(&imported, None).to_sync_data();
    let result = merge_sync_data(
        &LocalState::from_user(&user, None),
        &remote,
        SyncOption::NoSync,
    );
    result.apply(&mut user);
    save_user(&store, &user).await?;

    println!(
        "Imported {}: {} tasks ({} new), {} categories",
        file.display(),
        user.tasks.len(),
        user.tasks.len().saturating_sub(before),
        user.categories.len()
    );
    Ok(())
}
