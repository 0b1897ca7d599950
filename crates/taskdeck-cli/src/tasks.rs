use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use std::fmt::Write as _;
use taskdeck_core::{NewTask, Project, Status, Task, TaskPatch};
use taskdeck_storage::{TaskStore, TaskSummary};

pub fn show_open(store: &TaskStore) -> Result<()> {
    let reopened = store.reopen_snoozed_due()?;
    if reopened > 0 {
        println!("⏰ {reopened} snoozed task(s) reopened\n");
    }
    print!("{}", render_open_listing(store)?);
    Ok(())
}

pub fn show_done(store: &TaskStore) -> Result<()> {
    let tasks = store.get_done_tasks()?;
    println!("\n=== Done Tasks ===\n");
    for task in &tasks {
        println!("  {} {} · {}", task.priority.tag(), short_id(&task.id), task.title);
    }
    println!("\nTotal done: {}", tasks.len());
    Ok(())
}

pub fn insert(store: &TaskStore, json: &str) -> Result<()> {
    let task: NewTask =
        serde_json::from_str(json).context("Invalid task payload, expected NewTask JSON")?;
    store.insert_task(&task)?;
    println!("✓ Task inserted: {}", task.title);
    Ok(())
}

pub fn mark_done(store: &TaskStore, prefix: &str) -> Result<()> {
    let count = store.update_status(prefix, Status::Done, None)?;
    ensure_matched(count, prefix)?;
    println!("✓ Task {prefix} marked as done");
    Ok(())
}

pub fn snooze(store: &TaskStore, prefix: &str, until: NaiveDate) -> Result<()> {
    let count = store.update_status(prefix, Status::Snoozed, Some(until))?;
    ensure_matched(count, prefix)?;
    println!("✓ Task {prefix} snoozed until {until}");
    Ok(())
}

pub fn reopen(store: &TaskStore, prefix: &str) -> Result<()> {
    let count = store.update_status(prefix, Status::Open, None)?;
    ensure_matched(count, prefix)?;
    println!("✓ Task {prefix} reopened");
    Ok(())
}

pub fn update(store: &TaskStore, prefix: &str, json: &str) -> Result<()> {
    let patch: TaskPatch =
        serde_json::from_str(json).context("Invalid patch payload, expected TaskPatch JSON")?;
    let count = store.update_task(prefix, &patch)?;
    ensure_matched(count, prefix)?;
    println!("✓ Task {prefix} updated");
    Ok(())
}

pub fn dupes(store: &TaskStore) -> Result<()> {
    let dupes = store.get_exact_dupes()?;
    println!("\n=== Exact duplicates (open vs done) ===\n");
    if dupes.is_empty() {
        println!("  none");
    }
    for dupe in &dupes {
        println!(
            "  {} — open {} / done {}",
            dupe.title,
            short_id(&dupe.open_id),
            short_id(&dupe.done_id)
        );
    }

    print_summary_block(
        "Open",
        &store.get_tasks_by_status(Status::Open)?,
    );
    print_summary_block(
        "Done",
        &store.get_tasks_by_status(Status::Done)?,
    );
    Ok(())
}

pub fn exists(store: &TaskStore, title: &str) -> Result<bool> {
    let exists = store.task_exists_by_title(title)?;
    println!("{exists}");
    Ok(exists)
}

fn ensure_matched(count: usize, prefix: &str) -> Result<()> {
    if count == 0 {
        bail!("No task found with ID starting with: {prefix}");
    }
    Ok(())
}

fn print_summary_block(label: &str, tasks: &[TaskSummary]) {
    println!("\n=== {label} ({}) ===\n", tasks.len());
    for task in tasks {
        println!("  {} · {}", short_id(&task.id), task.title);
    }
}

/// Grouped open listing: projects in fixed order, priority-ranked lines.
fn render_open_listing(store: &TaskStore) -> Result<String> {
    let mut out = String::new();
    let mut total = 0;

    writeln!(out, "\n=== Open Tasks ===\n")?;
    for project in Project::ALL {
        let tasks = store.get_open_tasks(Some(project))?;
        if tasks.is_empty() {
            continue;
        }
        total += tasks.len();
        writeln!(out, "{} {} ({})", project.emoji(), project.label(), tasks.len())?;
        for task in &tasks {
            writeln!(out, "{}", task_line(task))?;
            if let Some(context) = &task.context {
                writeln!(out, "           {context}")?;
            }
        }
        writeln!(out)?;
    }
    writeln!(out, "Total open: {total}")?;
    Ok(out)
}

fn task_line(task: &Task) -> String {
    format!(
        "  {} {} · {}",
        task.priority.tag(),
        short_id(&task.id),
        task.title
    )
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
