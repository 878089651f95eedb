//! Show profile and sync status.

use anyhow::Result;
use chrono::Utc;
use std::path::Path;
use todo_sync_types::{Timestamp, LOCAL_PROFILE_PICTURE};

use super::{user_store, USER_FILE};
use crate::config::AppConfig;

/// Run the status command.
pub async fn run(data_dir: &Path, config: &AppConfig) -> Result<()> {
    println!("=== todo-sync status ===");
    println!();

    let store = user_store(data_dir);
    if !store.exists().await {
        println!("Profile: NOT INITIALIZED");
        println!();
        println!("Run 'todo-sync init --name <name>' to initialize.");
        return Ok(());
    }
    let user = super::load_user(&store).await?;

    println!("Profile:");
    println!("  Name:    {}", user.name.as_deref().unwrap_or("(none)"));
    let picture = match user.profile_picture.as_deref() {
        None => "(none)",
        Some(LOCAL_PROFILE_PICTURE) => "stored locally",
        Some(url) => url,
    };
    println!("  Picture: {picture}");
    println!("  Created: {}", format_timestamp(user.created_at));
    println!("  File:    {}", data_dir.join(USER_FILE).display());
    println!();

    let done = user.tasks.iter().filter(|t| t.done).count();
    println!("Data:");
    println!("  Tasks:      {} ({} done)", user.tasks.len(), done);
    println!(
        "  Categories: {} ({} favorite)",
        user.categories.len(),
        user.favorite_categories.len()
    );
    println!(
        "  Pending deletions: {} tasks, {} categories",
        user.deleted_tasks.len(),
        user.deleted_categories.len()
    );
    println!();

    println!("Sync:");
    match user.last_synced_at {
        Some(at) => println!("  Last sync: {}", format_timestamp(at)),
        None => println!("  Last sync: never"),
    }
    println!("  Option:    {}", config.sync.option);
    println!("  Listen:    {}", config.sync.listen_address);

    Ok(())
}

/// Format a timestamp relative to now.
fn format_timestamp(ts: Timestamp) -> String {
    let diff = (Utc::now() - ts).num_seconds().max(0);

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        format!("{} minutes ago", diff / 60)
    } else if diff < 86400 {
        format!("{} hours ago", diff / 3600)
    } else {
        format!("{} days ago", diff / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    #[test]
    fn relative_timestamps() {
        let now = Utc::now();
        assert_eq!(format_timestamp(now), "just now");
        assert_eq!(format_timestamp(now - Duration::minutes(5)), "5 minutes ago");
        assert_eq!(format_timestamp(now - Duration::hours(3)), "3 hours ago");
        assert_eq!(format_timestamp(now - Duration::days(2)), "2 days ago");
    }

    #[tokio::test]
    async fn status_without_profile_succeeds() {
        let dir = tempdir().unwrap();
        run(dir.path(), &AppConfig::default()).await.unwrap();
    }
}
