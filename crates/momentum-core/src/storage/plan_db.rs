//! SQLite-based storage for plan tasks, habit check-offs and the
//! character profile.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::data_dir;
use crate::character::{CharacterProfile, UserType};
use crate::completion::HabitCompletion;
use crate::error::{CollaboratorError, CoreError};
use crate::plan::{PlanStore, PlanTask, StoredHabitCompletion, StoredTaskCompletion};

const SCHEMA_VERSION: i32 = 2;
const DATE_FORMAT: &str = "%Y-%m-%d";

// === Helper Functions ===

/// Parse datetime from RFC3339 string with fallback to current time
fn parse_datetime_fallback(dt_str: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Unparseable dates read back as unscheduled.
fn parse_planned_date(date_str: Option<String>) -> Option<NaiveDate> {
    date_str.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok())
}

fn format_planned_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn row_to_task(row: &rusqlite::Row) -> Result<PlanTask, rusqlite::Error> {
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    Ok(PlanTask {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        planned_date: parse_planned_date(row.get(3)?),
        completed: row.get(4)?,
        milestone_ref: row.get(5)?,
        created_at: parse_datetime_fallback(&created_at),
        updated_at: parse_datetime_fallback(&updated_at),
    })
}

fn insert_task(conn: &Connection, task: &PlanTask) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO plan_tasks (
            id, title, description, planned_date, completed, milestone_ref,
            created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            task.id,
            task.title,
            task.description,
            format_planned_date(task.planned_date),
            task.completed,
            task.milestone_ref,
            task.created_at.to_rfc3339(),
            task.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn update_task_row(conn: &Connection, task: &PlanTask) -> Result<(), CollaboratorError> {
    let changed = conn.execute(
        "UPDATE plan_tasks
         SET title = ?2, description = ?3, planned_date = ?4, completed = ?5,
             milestone_ref = ?6, updated_at = ?7
         WHERE id = ?1",
        params![
            task.id,
            task.title,
            task.description,
            format_planned_date(task.planned_date),
            task.completed,
            task.milestone_ref,
            task.updated_at.to_rfc3339(),
        ],
    )?;
    if changed == 0 {
        return Err(CollaboratorError::Database(rusqlite::Error::QueryReturnedNoRows));
    }
    Ok(())
}

fn insert_task_completion(
    conn: &Connection,
    completion: &StoredTaskCompletion,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO task_completions (task_id, completed, recorded_at) VALUES (?1, ?2, ?3)",
        params![
            completion.task_id,
            completion.completed,
            completion.recorded_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// SQLite database for plan storage.
pub struct PlanDb {
    conn: Connection,
}

impl PlanDb {
    /// Open the database at `~/.config/momentum/momentum.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened
    /// or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("momentum.db");
        Ok(Self::open_at(path)?)
    }

    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version >= SCHEMA_VERSION {
            return Ok(());
        }

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS plan_tasks (
                    id            TEXT PRIMARY KEY,
                    title         TEXT NOT NULL,
                    description   TEXT NOT NULL DEFAULT '',
                    planned_date  TEXT,
                    completed     INTEGER NOT NULL DEFAULT 0,
                    milestone_ref TEXT,
                    created_at    TEXT NOT NULL,
                    updated_at    TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS habit_completions (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    habit_id    TEXT NOT NULL,
                    completed   INTEGER,
                    notes       TEXT,
                    recorded_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS character_profile (
                    id                    INTEGER PRIMARY KEY CHECK (id = 1),
                    user_type             TEXT NOT NULL,
                    has_interacted_before INTEGER NOT NULL DEFAULT 0
                );

                CREATE INDEX IF NOT EXISTS idx_plan_tasks_milestone
                    ON plan_tasks(milestone_ref);",
            )?;
        }

        if version < 2 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS task_completions (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    task_id     TEXT NOT NULL,
                    completed   INTEGER NOT NULL,
                    recorded_at TEXT NOT NULL
                );",
            )?;
        }

        self.conn
            .pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    /// Get a task by ID.
    pub fn get_task(&self, id: &str) -> Result<Option<PlanTask>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, title, description, planned_date, completed, milestone_ref,
                        created_at, updated_at
                 FROM plan_tasks WHERE id = ?1",
                params![id],
                row_to_task,
            )
            .optional()
    }
}

impl PlanStore for PlanDb {
    fn create_task(&mut self, task: &PlanTask) -> Result<(), CollaboratorError> {
        insert_task(&self.conn, task)?;
        Ok(())
    }

    fn create_tasks(&mut self, tasks: &[PlanTask]) -> Result<(), CollaboratorError> {
        let tx = self.conn.transaction()?;
        for task in tasks {
            insert_task(&tx, task)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn update_task(&mut self, task: &PlanTask) -> Result<(), CollaboratorError> {
        update_task_row(&self.conn, task)
    }

    fn update_task_completion(
        &mut self,
        task: &PlanTask,
        completion: &StoredTaskCompletion,
    ) -> Result<(), CollaboratorError> {
        let tx = self.conn.transaction()?;
        update_task_row(&tx, task)?;
        insert_task_completion(&tx, completion)?;
        tx.commit()?;
        Ok(())
    }

    fn record_task_completion(
        &mut self,
        completion: &StoredTaskCompletion,
    ) -> Result<(), CollaboratorError> {
        insert_task_completion(&self.conn, completion)?;
        Ok(())
    }

    fn list_task_completions(&self) -> Result<Vec<StoredTaskCompletion>, CollaboratorError> {
        let mut stmt = self.conn.prepare(
            "SELECT task_id, completed, recorded_at FROM task_completions ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let recorded_at: String = row.get(2)?;
                Ok(StoredTaskCompletion {
                    task_id: row.get(0)?,
                    completed: row.get(1)?,
                    recorded_at: parse_datetime_fallback(&recorded_at),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn list_tasks(&self) -> Result<Vec<PlanTask>, CollaboratorError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, planned_date, completed, milestone_ref,
                    created_at, updated_at
             FROM plan_tasks ORDER BY rowid",
        )?;
        let tasks = stmt
            .query_map([], row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    fn record_habit_completion(
        &mut self,
        completion: &StoredHabitCompletion,
    ) -> Result<(), CollaboratorError> {
        self.conn.execute(
            "INSERT INTO habit_completions (habit_id, completed, notes, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                completion.record.habit_id,
                completion.record.completed,
                completion.record.notes,
                completion.recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn list_habit_completions(&self) -> Result<Vec<StoredHabitCompletion>, CollaboratorError> {
        let mut stmt = self.conn.prepare(
            "SELECT habit_id, completed, notes, recorded_at
             FROM habit_completions ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let recorded_at: String = row.get(3)?;
                Ok(StoredHabitCompletion {
                    record: HabitCompletion {
                        habit_id: row.get(0)?,
                        completed: row.get(1)?,
                        notes: row.get(2)?,
                    },
                    recorded_at: parse_datetime_fallback(&recorded_at),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn load_profile(&self) -> Result<Option<CharacterProfile>, CollaboratorError> {
        let profile = self
            .conn
            .query_row(
                "SELECT user_type, has_interacted_before FROM character_profile WHERE id = 1",
                [],
                |row| {
                    let user_type: String = row.get(0)?;
                    Ok(CharacterProfile {
                        user_type: UserType::parse(&user_type),
                        has_interacted_before: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    fn save_profile(&mut self, profile: &CharacterProfile) -> Result<(), CollaboratorError> {
        self.conn.execute(
            "INSERT INTO character_profile (id, user_type, has_interacted_before)
             VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET
                user_type = excluded.user_type,
                has_interacted_before = excluded.has_interacted_before",
            params![profile.user_type.as_str(), profile.has_interacted_before],
        )?;
        Ok(())
    }
}
