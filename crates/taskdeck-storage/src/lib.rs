use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, ToSql};
use std::path::Path;
use taskdeck_core::{NewTask, Priority, Project, Source, Status, Task, TaskPatch};
use thiserror::Error;

pub const TASKS_SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("timestamp parse error: {0}")]
    Timestamp(String),
    #[error("unsupported schema version {found}, max supported {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },
}

/// Compact row used by title-ordered listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    pub id: String,
    pub title: String,
    pub status: Status,
}

/// An open task and a done task sharing a case-insensitive title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactDupe {
    pub open_id: String,
    pub done_id: String,
    pub title: String,
}

pub struct TaskStore {
    conn: Connection,
}

impl TaskStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn schema_version(&self) -> Result<i64, StorageError> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    /// Idempotent; runs on every open.
    pub fn migrate(&self) -> Result<(), StorageError> {
        let current = self.schema_version()?;
        if current > TASKS_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedSchemaVersion {
                found: current,
                supported: TASKS_SCHEMA_VERSION,
            });
        }

        if current < 1 {
            let sql = include_str!("../migrations/0001_tasks.sql");
            self.conn.execute_batch(sql)?;
            self.conn
                .execute("PRAGMA user_version = 1", [])
                .map(|_| ())?;
        }

        Ok(())
    }

    /// Inserts a task, generating an id when none is supplied. A duplicate
    /// id is a silent no-op. Returns the id the row was written (or already
    /// stored) under.
    pub fn insert_task(&self, task: &NewTask) -> Result<String, StorageError> {
        let id = task.resolved_id();
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "
            INSERT OR IGNORE INTO tasks (
                id,
                title,
                context,
                source,
                source_ref,
                project,
                priority,
                status,
                snooze_until,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
            params![
                id,
                task.title,
                task.context,
                task.source.as_str(),
                task.source_ref,
                task.project.as_str(),
                task.priority.as_str(),
                task.status.as_str(),
                task.snooze_until.map(|date| date.to_string()),
                now,
                now,
            ],
        )?;

        Ok(id)
    }

    /// Transitions every task whose id starts with `prefix`. The snooze date
    /// is always rewritten, so leaving it out clears any previous one.
    /// Returns the affected-row count; zero means no task matched.
    pub fn update_status(
        &self,
        prefix: &str,
        status: Status,
        snooze_until: Option<NaiveDate>,
    ) -> Result<usize, StorageError> {
        let changes = self.conn.execute(
            "
            UPDATE tasks
            SET status = ?1, snooze_until = ?2, updated_at = ?3
            WHERE id LIKE ?4
            ",
            params![
                status.as_str(),
                snooze_until.map(|date| date.to_string()),
                Utc::now().to_rfc3339(),
                format!("{prefix}%"),
            ],
        )?;

        Ok(changes)
    }

    /// Partial update over the allow-listed fields. An empty patch returns
    /// zero without touching the store.
    pub fn update_task(&self, prefix: &str, patch: &TaskPatch) -> Result<usize, StorageError> {
        let mut assignments: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(title) = &patch.title {
            assignments.push("title = ?");
            values.push(Box::new(title.clone()));
        }
        if let Some(context) = &patch.context {
            assignments.push("context = ?");
            values.push(Box::new(context.clone()));
        }
        if let Some(project) = patch.project {
            assignments.push("project = ?");
            values.push(Box::new(project.as_str()));
        }
        if let Some(priority) = patch.priority {
            assignments.push("priority = ?");
            values.push(Box::new(priority.as_str()));
        }

        if assignments.is_empty() {
            return Ok(0);
        }

        assignments.push("updated_at = ?");
        values.push(Box::new(Utc::now().to_rfc3339()));
        values.push(Box::new(format!("{prefix}%")));

        let sql = format!(
            "UPDATE tasks SET {} WHERE id LIKE ?",
            assignments.join(", ")
        );
        let changes = self
            .conn
            .execute(&sql, params_from_iter(values.iter().map(|v| v.as_ref())))?;

        Ok(changes)
    }

    /// Flips every snoozed task whose snooze date is today or earlier back
    /// to open, clearing the date. Returns the reopened count.
    pub fn reopen_snoozed_due(&self) -> Result<usize, StorageError> {
        let changes = self.conn.execute(
            "
            UPDATE tasks
            SET status = 'open', snooze_until = NULL, updated_at = ?1
            WHERE status = 'snoozed' AND snooze_until <= date('now')
            ",
            params![Utc::now().to_rfc3339()],
        )?;

        Ok(changes)
    }

    pub fn task_exists_by_title(&self, title: &str) -> Result<bool, StorageError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM tasks WHERE LOWER(title) = LOWER(?1) LIMIT 1",
                [title],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn get_tasks_by_status(&self, status: Status) -> Result<Vec<TaskSummary>, StorageError> {
        let mut statement = self.conn.prepare(
            "
            SELECT id, title, status
            FROM tasks
            WHERE status = ?1
            ORDER BY LOWER(title)
            ",
        )?;

        let rows = statement.query_map([status.as_str()], |row| {
            let status_raw: String = row.get(2)?;
            Ok(TaskSummary {
                id: row.get(0)?,
                title: row.get(1)?,
                status: parse_column(2, &status_raw)?,
            })
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }

    /// Pairs of open and done tasks sharing a case-insensitive title. A row
    /// never pairs with itself since the two sides carry different statuses.
    pub fn get_exact_dupes(&self) -> Result<Vec<ExactDupe>, StorageError> {
        let mut statement = self.conn.prepare(
            "
            SELECT o.id AS open_id, d.id AS done_id, o.title
            FROM tasks o
            JOIN tasks d ON LOWER(o.title) = LOWER(d.title) AND o.id != d.id
            WHERE o.status = 'open' AND d.status = 'done'
            ",
        )?;

        let rows = statement.query_map([], |row| {
            Ok(ExactDupe {
                open_id: row.get(0)?,
                done_id: row.get(1)?,
                title: row.get(2)?,
            })
        })?;

        let mut dupes = Vec::new();
        for row in rows {
            dupes.push(row?);
        }
        Ok(dupes)
    }

    /// Open tasks, optionally scoped to one project, ordered high before
    /// medium before low. Ties keep storage order.
    pub fn get_open_tasks(&self, project: Option<Project>) -> Result<Vec<Task>, StorageError> {
        let base = "
            SELECT id, title, context, source, source_ref, project, priority,
                   status, snooze_until, created_at, updated_at
            FROM tasks
            WHERE status = 'open'
        ";
        let order = "
            ORDER BY CASE priority WHEN 'high' THEN 1 WHEN 'medium' THEN 2 WHEN 'low' THEN 3 END
        ";

        let mut tasks = Vec::new();
        match project {
            Some(project) => {
                let sql = format!("{base} AND project = ?1 {order}");
                let mut statement = self.conn.prepare(&sql)?;
                let rows = statement.query_map([project.as_str()], map_task_row)?;
                for row in rows {
                    tasks.push(row?);
                }
            }
            None => {
                let sql = format!("{base} {order}");
                let mut statement = self.conn.prepare(&sql)?;
                let rows = statement.query_map([], map_task_row)?;
                for row in rows {
                    tasks.push(row?);
                }
            }
        }
        Ok(tasks)
    }

    /// Done tasks in insertion order.
    pub fn get_done_tasks(&self) -> Result<Vec<Task>, StorageError> {
        let mut statement = self.conn.prepare(
            "
            SELECT id, title, context, source, source_ref, project, priority,
                   status, snooze_until, created_at, updated_at
            FROM tasks
            WHERE status = 'done'
            ORDER BY rowid
            ",
        )?;

        let rows = statement.query_map([], map_task_row)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    pub fn table_exists(&self, table_name: &str) -> Result<bool, StorageError> {
        let exists = self
            .conn
            .query_row(
                "
                SELECT 1
                FROM sqlite_master
                WHERE type='table' AND name = ?1
                LIMIT 1
                ",
                [table_name],
                |_| Ok(()),
            )
            .optional()?;
        Ok(exists.is_some())
    }
}

fn map_task_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let source: Source = parse_column(3, &row.get::<_, String>(3)?)?;
    let project: Project = parse_column(5, &row.get::<_, String>(5)?)?;
    let priority: Priority = parse_column(6, &row.get::<_, String>(6)?)?;
    let status: Status = parse_column(7, &row.get::<_, String>(7)?)?;

    let snooze_until = row
        .get::<_, Option<String>>(8)?
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(
                    8,
                    rusqlite::types::Type::Text,
                    Box::new(err),
                )
            })
        })
        .transpose()?;

    let created_at = parse_timestamp_column(9, row.get::<_, String>(9)?)?;
    let updated_at = parse_timestamp_column(10, row.get::<_, String>(10)?)?;

    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        context: row.get(2)?,
        source,
        source_ref: row.get(4)?,
        project,
        priority,
        status,
        snooze_until,
        created_at,
        updated_at,
    })
}

fn parse_column<T: std::str::FromStr<Err = String>>(
    index: usize,
    raw: &str,
) -> rusqlite::Result<T> {
    raw.parse::<T>().map_err(|message| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
        )
    })
}

fn parse_timestamp_column(index: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(
                index,
                rusqlite::types::Type::Text,
                Box::new(err),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;
    use tempfile::NamedTempFile;

    fn new_task(id: Option<&str>, title: &str, project: Project, priority: Priority) -> NewTask {
        NewTask {
            id: id.map(str::to_string),
            title: title.to_string(),
            context: None,
            source: Source::Slack,
            source_ref: None,
            project,
            priority,
            status: Status::Open,
            snooze_until: None,
        }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    #[test]
    fn migration_creates_tasks_table_and_is_idempotent() {
        let store = TaskStore::open_in_memory().expect("open store");
        assert!(store.table_exists("tasks").expect("table check"));
        assert_eq!(
            store.schema_version().expect("schema version"),
            TASKS_SCHEMA_VERSION
        );
        store.migrate().expect("second migrate is a no-op");
    }

    #[test]
    fn insert_with_explicit_id_is_idempotent() {
        let store = TaskStore::open_in_memory().expect("open store");
        let task = new_task(Some("fixed-id"), "Ping Bob", Project::Nexo, Priority::High);

        let first = store.insert_task(&task).expect("first insert");
        let second = store.insert_task(&task).expect("duplicate insert");
        assert_eq!(first, "fixed-id");
        assert_eq!(second, "fixed-id");

        let open = store.get_tasks_by_status(Status::Open).expect("list open");
        assert_eq!(open.len(), 1);
    }

    #[test]
    fn insert_without_id_generates_unique_ids() {
        let store = TaskStore::open_in_memory().expect("open store");
        let task = new_task(None, "same title", Project::Personal, Priority::Low);

        let a = store.insert_task(&task).expect("insert a");
        let b = store.insert_task(&task).expect("insert b");
        assert!(!a.is_empty());
        assert_ne!(a, b);

        let open = store.get_tasks_by_status(Status::Open).expect("list open");
        assert_eq!(open.len(), 2);
    }

    #[test]
    fn due_sweep_reopens_past_and_today_but_not_future() {
        let store = TaskStore::open_in_memory().expect("open store");
        for id in ["past-1", "today-1", "future-1"] {
            store
                .insert_task(&new_task(Some(id), id, Project::Nexo, Priority::Medium))
                .expect("insert");
        }

        let yesterday = today().checked_sub_days(Days::new(1)).expect("yesterday");
        let tomorrow = today().checked_add_days(Days::new(1)).expect("tomorrow");
        store
            .update_status("past-1", Status::Snoozed, Some(yesterday))
            .expect("snooze past");
        store
            .update_status("today-1", Status::Snoozed, Some(today()))
            .expect("snooze today");
        store
            .update_status("future-1", Status::Snoozed, Some(tomorrow))
            .expect("snooze future");

        let reopened = store.reopen_snoozed_due().expect("sweep");
        assert_eq!(reopened, 2);

        let open = store.get_open_tasks(None).expect("open tasks");
        let open_ids: Vec<&str> = open.iter().map(|task| task.id.as_str()).collect();
        assert!(open_ids.contains(&"past-1"));
        assert!(open_ids.contains(&"today-1"));
        assert!(open.iter().all(|task| task.snooze_until.is_none()));

        let snoozed = store
            .get_tasks_by_status(Status::Snoozed)
            .expect("snoozed tasks");
        assert_eq!(snoozed.len(), 1);
        assert_eq!(snoozed[0].id, "future-1");
    }

    #[test]
    fn update_status_matches_by_prefix_and_reports_count() {
        let store = TaskStore::open_in_memory().expect("open store");
        store
            .insert_task(&new_task(
                Some("abcd1234-task"),
                "x",
                Project::Nexo,
                Priority::High,
            ))
            .expect("insert");

        assert_eq!(
            store
                .update_status("zzzz", Status::Done, None)
                .expect("no match"),
            0
        );
        assert_eq!(
            store
                .update_status("abcd", Status::Done, None)
                .expect("prefix match"),
            1
        );

        let done = store.get_done_tasks().expect("done tasks");
        assert_eq!(done.len(), 1);
        assert!(done[0].updated_at > done[0].created_at);
    }

    #[test]
    fn update_task_respects_allow_list_and_prefix() {
        let store = TaskStore::open_in_memory().expect("open store");
        store
            .insert_task(&new_task(
                Some("abcd1234-task"),
                "old title",
                Project::Nexo,
                Priority::Low,
            ))
            .expect("insert");

        assert_eq!(
            store
                .update_task("abcd", &TaskPatch::default())
                .expect("empty patch"),
            0
        );
        assert_eq!(
            store
                .update_task("zzzz", &TaskPatch {
                    title: Some("new".to_string()),
                    ..TaskPatch::default()
                })
                .expect("no match"),
            0
        );

        let patch = TaskPatch {
            title: Some("new title".to_string()),
            priority: Some(Priority::High),
            ..TaskPatch::default()
        };
        assert_eq!(store.update_task("abcd", &patch).expect("patch"), 1);

        let open = store.get_open_tasks(None).expect("open tasks");
        assert_eq!(open[0].title, "new title");
        assert_eq!(open[0].priority, Priority::High);
        assert_eq!(open[0].project, Project::Nexo);
        assert!(open[0].updated_at > open[0].created_at);
    }

    #[test]
    fn open_tasks_are_ordered_by_priority_rank() {
        let store = TaskStore::open_in_memory().expect("open store");
        store
            .insert_task(&new_task(Some("l"), "low", Project::Mindhub, Priority::Low))
            .expect("insert low");
        store
            .insert_task(&new_task(
                Some("h"),
                "high",
                Project::Mindhub,
                Priority::High,
            ))
            .expect("insert high");
        store
            .insert_task(&new_task(
                Some("m"),
                "medium",
                Project::Mindhub,
                Priority::Medium,
            ))
            .expect("insert medium");
        store
            .insert_task(&new_task(
                Some("other"),
                "other project",
                Project::Nexo,
                Priority::High,
            ))
            .expect("insert other");

        let tasks = store
            .get_open_tasks(Some(Project::Mindhub))
            .expect("open tasks");
        let priorities: Vec<Priority> = tasks.iter().map(|task| task.priority).collect();
        assert_eq!(
            priorities,
            vec![Priority::High, Priority::Medium, Priority::Low]
        );
        assert!(tasks.iter().all(|task| task.project == Project::Mindhub));
    }

    #[test]
    fn exact_dupes_pair_open_with_done_titles_only() {
        let store = TaskStore::open_in_memory().expect("open store");
        store
            .insert_task(&new_task(
                Some("open-1"),
                "Buy Milk",
                Project::Personal,
                Priority::Low,
            ))
            .expect("insert open");
        store
            .insert_task(&new_task(
                Some("done-1"),
                "buy milk",
                Project::Personal,
                Priority::Low,
            ))
            .expect("insert done");
        store
            .insert_task(&new_task(
                Some("open-2"),
                "Buy Milk",
                Project::Nexo,
                Priority::Low,
            ))
            .expect("insert second open");
        store
            .update_status("done-1", Status::Done, None)
            .expect("mark done");

        let dupes = store.get_exact_dupes().expect("dupes");
        assert_eq!(dupes.len(), 2);
        assert!(dupes.iter().all(|dupe| dupe.done_id == "done-1"));
        assert!(dupes.iter().all(|dupe| dupe.open_id != dupe.done_id));
    }

    #[test]
    fn title_existence_check_is_case_insensitive() {
        let store = TaskStore::open_in_memory().expect("open store");
        store
            .insert_task(&new_task(
                None,
                "Buy Milk",
                Project::Personal,
                Priority::Low,
            ))
            .expect("insert");

        assert!(store.task_exists_by_title("buy milk").expect("lower"));
        assert!(store.task_exists_by_title("BUY MILK").expect("upper"));
        assert!(!store.task_exists_by_title("buy milks").expect("other"));
    }

    #[test]
    fn store_persists_across_reopen() {
        let file = NamedTempFile::new().expect("temp db");
        {
            let store = TaskStore::open(file.path()).expect("open store");
            store
                .insert_task(&new_task(
                    Some("persisted"),
                    "survives reopen",
                    Project::Nexo,
                    Priority::High,
                ))
                .expect("insert");
        }

        let store = TaskStore::open(file.path()).expect("reopen store");
        let open = store.get_tasks_by_status(Status::Open).expect("list open");
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, "persisted");
    }
}
