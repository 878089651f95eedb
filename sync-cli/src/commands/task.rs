//! Task commands: add, list, done, delete.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use std::path::Path;
use todo_sync_types::{Color, Task, Timestamp, User};

use super::{load_user, resolve_category, resolve_task, save_user, short_id, user_store};

/// Fields for a new task.
#[derive(Debug, Default)]
pub struct NewTask {
    /// Task name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional emoji.
    pub emoji: Option<String>,
    /// Optional `#RRGGBB` color.
    pub color: Option<String>,
    /// Optional deadline (`YYYY-MM-DD` or RFC 3339).
    pub deadline: Option<String>,
    /// Category names or ID prefixes.
    pub categories: Vec<String>,
}

/// Parse a deadline given as a date or a full timestamp.
pub fn parse_deadline(input: &str) -> Result<Timestamp> {
    let input = input.trim();
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("Invalid deadline '{input}' (use YYYY-MM-DD or RFC 3339)"))?;
    date.and_hms_opt(23, 59, 59)
        .map(|end_of_day| end_of_day.and_utc())
        .with_context(|| format!("Invalid deadline '{input}'"))
}

fn build_task(user: &User, new: NewTask) -> Result<Task> {
    let color = match new.color {
        Some(color) => Color::parse(&color)?,
        None => Color::default(),
    };
    let mut task = Task::new(new.name, color);
    if let Some(description) = new.description {
        task = task.with_description(description);
    }
    if let Some(emoji) = new.emoji {
        task = task.with_emoji(emoji);
    }
    if let Some(deadline) = new.deadline {
        task = task.with_deadline(parse_deadline(&deadline)?);
    }
    if !new.categories.is_empty() {
        let categories = new
            .categories
            .iter()
            .map(|input| {
                let id = resolve_category(user, input)?;
                user.category(id)
                    .cloned()
                    .with_context(|| format!("Category '{input}' vanished"))
            })
            .collect::<Result<Vec<_>>>()?;
        task = task.with_categories(categories);
    }
    Ok(task)
}

/// Run the add command.
pub async fn add(data_dir: &Path, new: NewTask) -> Result<()> {
    let store = user_store(data_dir);
    let mut user = load_user(&store).await?;
    let task = build_task(&user, new)?;
    let id = task.id;
    user.add_task(task)?;
    save_user(&store, &user).await?;
    println!("Added task {}", short_id(&id));
    Ok(())
}

/// Render one task as a list line.
pub fn format_task(task: &Task) -> String {
    let mut line = format!(
        "{} [{}] {}{}",
        short_id(&task.id),
        if task.done { "x" } else { " " },
        if task.pinned { "* " } else { "" },
        task.name
    );
    if let Some(categories) = &task.category {
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        line.push_str(&format!(" ({})", names.join(", ")));
    }
    if let Some(deadline) = task.deadline {
        line.push_str(&format!(" due {}", deadline.format("%Y-%m-%d")));
    }
    if let Some(by) = &task.shared_by {
        line.push_str(&format!(" from {by}"));
    }
    line
}

/// Run the list command.
pub async fn list(data_dir: &Path) -> Result<()> {
    let user = load_user(&user_store(data_dir)).await?;
    if user.tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    let (done, open): (Vec<&Task>, Vec<&Task>) = user.tasks.iter().partition(|t| t.done);
    let ordered: Vec<&Task> = if user.settings.done_to_bottom {
        open.into_iter().chain(done).collect()
    } else {
        user.tasks.iter().collect()
    };
    for task in ordered {
        println!("{}", format_task(task));
    }
    Ok(())
}

/// Run the done command (toggles completion).
pub async fn done(data_dir: &Path, id: &str) -> Result<()> {
    let store = user_store(data_dir);
    let mut user = load_user(&store).await?;
    let id = resolve_task(&user, id)?;
    user.toggle_done(id);
    save_user(&store, &user).await?;
    if let Some(task) = user.task(id) {
        println!("{}", format_task(task));
    }
    Ok(())
}

/// Run the delete command.
pub async fn delete(data_dir: &Path, id: &str) -> Result<()> {
    let store = user_store(data_dir);
    let mut user = load_user(&store).await?;
    let id = resolve_task(&user, id)?;
    user.delete_task(id);
    save_user(&store, &user).await?;
    println!("Deleted task {}", short_id(&id));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::init;
    use tempfile::tempdir;
    use todo_sync_types::Category;

    #[test]
    fn deadline_formats() {
        let date = parse_deadline("2024-05-01").unwrap();
        assert_eq!(date.format("%Y-%m-%d %H:%M").to_string(), "2024-05-01 23:59");
        let ts = parse_deadline("2024-05-01T10:00:00+02:00").unwrap();
        assert_eq!(ts.format("%H:%M").to_string(), "08:00");
        assert!(parse_deadline("tomorrow").is_err());
    }

    #[test]
    fn build_task_embeds_categories() {
        let mut user = User::default();
        user.add_category(Category::new("Work", Color::default()))
            .unwrap();
        let task = build_task(
            &user,
            NewTask {
                name: "Report".into(),
                categories: vec!["work".into()],
                color: Some("#00ff00".into()),
                ..NewTask::default()
            },
        )
        .unwrap();
        assert_eq!(task.category.as_ref().map(Vec::len), Some(1));
        assert_eq!(task.color.as_str(), "#00ff00");
    }

    #[test]
    fn build_task_rejects_bad_color() {
        let result = build_task(
            &User::default(),
            NewTask {
                name: "x".into(),
                color: Some("green".into()),
                ..NewTask::default()
            },
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn add_done_delete_cycle() {
        let dir = tempdir().unwrap();
        init::run(dir.path(), "Ana").await.unwrap();
        add(
            dir.path(),
            NewTask {
                name: "Water plants".into(),
                ..NewTask::default()
            },
        )
        .await
        .unwrap();

        let store = user_store(dir.path());
        let user = load_user(&store).await.unwrap();
        let id = user.tasks[0].id;

        done(dir.path(), &short_id(&id)).await.unwrap();
        assert!(load_user(&store).await.unwrap().tasks[0].done);

        delete(dir.path(), &id.to_string()).await.unwrap();
        let user = load_user(&store).await.unwrap();
        assert!(user.tasks.is_empty());
        assert_eq!(user.deleted_tasks, vec![id]);
    }

    #[tokio::test]
    async fn add_rejects_long_name() {
        let dir = tempdir().unwrap();
        init::run(dir.path(), "Ana").await.unwrap();
        let result = add(
            dir.path(),
            NewTask {
                name: "x".repeat(31),
                ..NewTask::default()
            },
        )
        .await;
        assert!(result.is_err());
    }
}
