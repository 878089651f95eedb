//! Share links: create one for a task, or accept one from someone else.

use anyhow::{Context, Result};
use std::path::Path;
use todo_sync_core::{create_share_link, parse_share_link};

use super::{load_user, resolve_task, save_user, short_id, user_store};
use crate::config::AppConfig;

/// Run the share command: print a link for one task.
pub async fn share(data_dir: &Path, config: &AppConfig, id: &str) -> Result<String> {
    let user = load_user(&user_store(data_dir)).await?;
    let id = resolve_task(&user, id)?;
    let task = user.task(id).context("Task vanished")?;
    let name = user
        .name
        .as_deref()
        .or(config.user.name.as_deref())
        .context("No user name set. Run 'todo-sync init --name <name>' or set [user] name.")?;

    let link = create_share_link(&config.share.base_url, task, name)?;
    println!("{link}");
    Ok(link)
}

/// Run the accept command: add the shared task as a new local task.
pub async fn accept(data_dir: &Path, link: &str) -> Result<()> {
    let store = user_store(data_dir);
    let mut user = load_user(&store).await?;
    let shared = parse_share_link(link).context("Could not accept share link")?;
    let id = shared.task.id;
    let name = shared.task.name.clone();
    user.add_task(shared.task)?;
    save_user(&store, &user).await?;
    println!(
        "Added \"{name}\" ({}) shared by {}",
        short_id(&id),
        shared.user_name
    );
    Ok(())
}
