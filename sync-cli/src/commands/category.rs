//! Category commands.

use anyhow::{bail, Result};
use std::path::Path;
use todo_sync_types::{Category, Color};

use super::{load_user, resolve_category, save_user, short_id, user_store};

/// Run `category add`.
pub async fn add(data_dir: &Path, name: &str, emoji: Option<String>, color: Option<String>) -> Result<()> {
    let store = user_store(data_dir);
    let mut user = load_user(&store).await?;
    if user
        .categories
        .iter()
        .any(|c| c.name.eq_ignore_ascii_case(name.trim()))
    {
        bail!("Category '{}' already exists", name.trim());
    }

    let color = match color {
        Some(color) => Color::parse(&color)?,
        None => Color::default(),
    };
    let mut category = Category::new(name.trim(), color);
    if let Some(emoji) = emoji {
        category = category.with_emoji(emoji);
    }
    let id = category.id;
    user.add_category(category)?;
    save_user(&store, &user).await?;
    println!("Added category {}", short_id(&id));
    Ok(())
}

/// Run `category list`.
pub async fn list(data_dir: &Path) -> Result<()> {
    let user = load_user(&user_store(data_dir)).await?;
    if user.categories.is_empty() {
        println!("No categories.");
        return Ok(());
    }
    for category in &user.categories {
        let uses = user.tasks.iter().filter(|t| t.has_category(category.id)).count();
        let favorite = if user.favorite_categories.contains(&category.id) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {} {} {} ({} tasks)",
            short_id(&category.id),
            favorite,
            category.color,
            category.name,
            uses
        );
    }
    Ok(())
}

/// Run `category delete`. Tasks keep existing without the category.
pub async fn delete(data_dir: &Path, input: &str) -> Result<()> {
    let store = user_store(data_dir);
    let mut user = load_user(&store).await?;
    let id = resolve_category(&user, input)?;
    user.delete_category(id);
    save_user(&store, &user).await?;
    println!("Deleted category {}", short_id(&id));
    Ok(())
}

/// Run `category favorite` (toggles).
pub async fn favorite(data_dir: &Path, input: &str) -> Result<()> {
    let store = user_store(data_dir);
    let mut user = load_user(&store).await?;
    let id = resolve_category(&user, input)?;
    let now_favorite = user.toggle_favorite(id);
    save_user(&store, &user).await?;
    println!(
        "Category {} {} favorites",
        short_id(&id),
        if now_favorite { "added to" } else { "removed from" }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::init;
    use crate::commands::task::{self, NewTask};
    use tempfile::tempdir;

    #[tokio::test]
    async fn category_lifecycle() {
        let dir = tempdir().unwrap();
        init::run(dir.path(), "Ana").await.unwrap();
        add(dir.path(), "Work", None, Some("#123abc".into()))
            .await
            .unwrap();
        assert!(add(dir.path(), "work", None, None).await.is_err());

        task::add(
            dir.path(),
            NewTask {
                name: "Report".into(),
                categories: vec!["Work".into()],
                ..NewTask::default()
            },
        )
        .await
        .unwrap();

        favorite(dir.path(), "Work").await.unwrap();
        let store = user_store(dir.path());
        let user = load_user(&store).await.unwrap();
        let id = user.categories[0].id;
        assert_eq!(user.favorite_categories, vec![id]);

        delete(dir.path(), "work").await.unwrap();
        let user = load_user(&store).await.unwrap();
        assert!(user.categories.is_empty());
        assert!(user.favorite_categories.is_empty());
        assert_eq!(user.deleted_categories, vec![id]);
        assert!(!user.tasks[0].has_category(id));
    }
}
