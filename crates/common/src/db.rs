//! SQLite database for Coursework state persistence

use crate::types::{CourseRecords, FetchedEntry, ReleasedEntry, SubmittedEntry};
use crate::Result;
use parking_lot::Mutex;
use rusqlite::{params, Connection, Transaction};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Tables holding one collection each, in insertion order
const TABLES: [&str; 3] = ["released", "fetched", "submitted"];

/// Database wrapper for state persistence
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path.as_ref())?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.init_schema()?;

        info!("Opened database at {:?}", path.as_ref());
        Ok(db)
    }

    /// Open in-memory database (for testing)
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        for table in TABLES {
            conn.execute_batch(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    course TEXT NOT NULL,
                    name TEXT NOT NULL,
                    payload TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_{table}_course ON {table}(course);
                "#,
            ))?;
        }

        debug!("Database schema initialized");
        Ok(())
    }

    /// Replace every stored row of one course with `records`
    pub fn save_course(&self, records: &CourseRecords) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        for table in TABLES {
            tx.execute(
                &format!("DELETE FROM {} WHERE course = ?1", table),
                params![records.course],
            )?;
        }

        for entry in &records.released {
            insert_row(&tx, "released", &records.course, &entry.assignment_name, entry)?;
        }
        for entry in &records.fetched {
            insert_row(&tx, "fetched", &records.course, &entry.assignment_name, entry)?;
        }
        for entry in &records.submitted {
            insert_row(&tx, "submitted", &records.course, &entry.assignment_name, entry)?;
        }

        tx.commit()?;

        debug!(
            "Saved course {} ({} released, {} fetched, {} submitted)",
            records.course,
            records.released.len(),
            records.fetched.len(),
            records.submitted.len()
        );
        Ok(())
    }

    /// Names of all stored courses, sorted
    pub fn courses(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            "SELECT course FROM released
             UNION SELECT course FROM fetched
             UNION SELECT course FROM submitted
             ORDER BY course",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut courses = Vec::new();
        for row in rows {
            courses.push(row?);
        }
        Ok(courses)
    }

    /// Load the collections of one course (empty if nothing is stored)
    pub fn load_course(&self, course: &str) -> Result<CourseRecords> {
        let conn = self.conn.lock();

        Ok(CourseRecords {
            course: course.to_string(),
            released: select_payloads::<ReleasedEntry>(&conn, "released", course)?,
            fetched: select_payloads::<FetchedEntry>(&conn, "fetched", course)?,
            submitted: select_payloads::<SubmittedEntry>(&conn, "submitted", course)?,
        })
    }

    /// Load every stored course
    pub fn load_all(&self) -> Result<Vec<CourseRecords>> {
        let mut all = Vec::new();
        for course in self.courses()? {
            all.push(self.load_course(&course)?);
        }
        Ok(all)
    }
}

fn insert_row<T: serde::Serialize>(
    tx: &Transaction<'_>,
    table: &str,
    course: &str,
    name: &str,
    entry: &T,
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    tx.execute(
        &format!(
            "INSERT INTO {} (course, name, payload, created_at) VALUES (?1, ?2, ?3, ?4)",
            table
        ),
        params![course, name, serde_json::to_string(entry)?, now],
    )?;
    Ok(())
}

fn select_payloads<T: serde::de::DeserializeOwned>(
    conn: &Connection,
    table: &str,
    course: &str,
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT payload FROM {} WHERE course = ?1 ORDER BY seq ASC",
        table
    ))?;
    let rows = stmt.query_map(params![course], |row| row.get::<_, String>(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(serde_json::from_str(&row?)?);
    }
    Ok(results)
}
