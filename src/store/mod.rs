use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context as _;
use async_trait::async_trait;
use rusqlite::Connection;

use crate::catalog::model::{BookFields, CatalogItem};
use crate::catalog::query::RecommendationFilter;
use crate::records::{
    Department, Formation, NewDepartment, NewFormation, NewStudent, RecordsError, Student,
};

mod catalog;
mod records;

/// Persistent book catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Deletes every stored book and returns how many were removed.
    async fn clear(&self) -> anyhow::Result<u64>;
    /// Inserts all books in one transaction, or none of them.
    async fn insert_batch(&self, books: &[BookFields]) -> anyhow::Result<()>;
    /// Deletes every stored book and inserts `books` in one transaction.
    async fn replace_all(&self, books: &[BookFields]) -> anyhow::Result<()>;
    async fn recommendations(
        &self,
        filter: &RecommendationFilter,
    ) -> anyhow::Result<Vec<CatalogItem>>;
    async fn count(&self) -> anyhow::Result<u64>;
    /// The most recently inserted book (highest id).
    async fn latest(&self) -> anyhow::Result<Option<CatalogItem>>;
    async fn find_by_title(&self, title: &str) -> anyhow::Result<Option<CatalogItem>>;
}

/// Departments, students, formations and enrollments.
#[async_trait]
pub trait RecordsStore: Send + Sync {
    async fn list_departments(&self) -> Result<Vec<Department>, RecordsError>;
    async fn create_department(&self, new: NewDepartment) -> Result<Department, RecordsError>;
    async fn create_student(&self, new: NewStudent) -> Result<Student, RecordsError>;
    async fn list_students(&self) -> Result<Vec<Student>, RecordsError>;
    async fn get_student(&self, id: i64) -> Result<Option<Student>, RecordsError>;
    async fn create_formation(&self, new: NewFormation) -> Result<Formation, RecordsError>;
    async fn list_formations(&self) -> Result<Vec<Formation>, RecordsError>;
    async fn enroll(&self, student_id: i64, formation_id: i64) -> Result<(), RecordsError>;
    async fn student_formations(&self, student_id: i64) -> Result<Vec<Formation>, RecordsError>;
}

/// SQLite-backed store. One connection, serialized behind a mutex and driven
/// from the blocking thread pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("open sqlite database: {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("enable WAL journal")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .context("enable foreign keys")?;
        init_schema(&conn).context("initialize schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&mut Connection) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| anyhow::anyhow!("sqlite connection mutex is poisoned"))?;
            f(&mut conn)
        })
        .await
        .context("join sqlite task")?
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS departments (
            id    INTEGER PRIMARY KEY,
            name  TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS students (
            id             INTEGER PRIMARY KEY,
            name           TEXT NOT NULL,
            email          TEXT NOT NULL UNIQUE,
            department_id  INTEGER NOT NULL REFERENCES departments(id)
        );
        CREATE INDEX IF NOT EXISTS idx_students_department ON students(department_id);

        CREATE TABLE IF NOT EXISTS formations (
            id     INTEGER PRIMARY KEY,
            title  TEXT NOT NULL,
            theme  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS student_formations (
            student_id    INTEGER NOT NULL REFERENCES students(id),
            formation_id  INTEGER NOT NULL REFERENCES formations(id),
            PRIMARY KEY (student_id, formation_id)
        );

        -- AUTOINCREMENT keeps ids growing across wholesale replaces.
        CREATE TABLE IF NOT EXISTS recommended_books (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            title         TEXT NOT NULL CHECK (length(title) > 0),
            price         REAL NOT NULL CHECK (price >= 0),
            category      TEXT NOT NULL,
            -- category lowercased with Unicode rules; SQLite lower() is ASCII-only.
            category_key  TEXT NOT NULL,
            availability  TEXT NOT NULL,
            created_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_books_title ON recommended_books(title);
        CREATE INDEX IF NOT EXISTS idx_books_price ON recommended_books(price);
        ",
    )
}
