use crate::error::{AppError, Result};
use crate::persistence::ToolRepository;
use crate::schema::{InputField, ToolCategory, ToolRecord, ToolSpecification};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CREATE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tools (
    id                            INTEGER PRIMARY KEY AUTOINCREMENT,
    schema_version                INTEGER NOT NULL,
    human_readable_function_title TEXT NOT NULL,
    function_title                TEXT NOT NULL,
    function_description          TEXT NOT NULL,
    code                          TEXT NOT NULL,
    inputs                        TEXT NOT NULL,
    output                        TEXT NOT NULL,
    tool_type                     TEXT,
    requires_manual_run           INTEGER,
    created_at                    TEXT NOT NULL
);
";

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed repository.
///
/// Every operation opens its own connection on the blocking pool, so no
/// in-process lock is shared between requests. Unique ids come from
/// `AUTOINCREMENT`, which also guarantees deleted ids are never reissued.
pub struct SqliteToolRepository {
    path: PathBuf,
}

impl SqliteToolRepository {
    /// Open the database named by `database_url`, creating the table if needed.
    ///
    /// Accepts `sqlite://<path>`, `sqlite:<path>` or a bare path.
    pub fn open(database_url: &str) -> Result<Self> {
        let path = parse_database_url(database_url)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::StorageUnavailableError(format!(
                    "Failed to create database directory: {}",
                    e
                ))
            })?;
        }

        let conn = connect(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(CREATE_SCHEMA)?;

        tracing::info!(path = %path.display(), "Tool database ready");
        Ok(Self { path })
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = connect(&path)?;
            op(&conn)
        })
        .await
        .map_err(|e| AppError::StorageUnavailableError(format!("Storage task join error: {}", e)))?
    }
}

#[async_trait]
impl ToolRepository for SqliteToolRepository {
    async fn create(&self, spec: ToolSpecification, schema_version: u32) -> Result<ToolRecord> {
        let inputs_json = serde_json::to_string(&spec.inputs).map_err(|e| {
            AppError::StorageUnavailableError(format!("Failed to encode inputs: {}", e))
        })?;

        self.run(move |conn| {
            let created_at = Utc::now();
            let output = spec.output.to_storage_text();

            conn.execute(
                "INSERT INTO tools (schema_version, human_readable_function_title, function_title,
                                    function_description, code, inputs, output, tool_type,
                                    requires_manual_run, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    schema_version,
                    spec.human_readable_title,
                    spec.function_name,
                    spec.description,
                    spec.code,
                    inputs_json,
                    output,
                    spec.category.map(|c| c.as_str()),
                    spec.requires_manual_run,
                    created_at.to_rfc3339(),
                ],
            )?;
            let id = conn.last_insert_rowid();

            Ok(ToolRecord {
                id,
                schema_version,
                human_readable_title: spec.human_readable_title,
                function_name: spec.function_name,
                description: spec.description,
                code: spec.code,
                inputs: spec.inputs,
                output,
                category: spec.category,
                requires_manual_run: spec.requires_manual_run,
                created_at,
            })
        })
        .await
    }

    async fn list(&self) -> Result<Vec<ToolRecord>> {
        self.run(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, schema_version, human_readable_function_title, function_title,
                        function_description, code, inputs, output, tool_type,
                        requires_manual_run, created_at
                 FROM tools ORDER BY id",
            )?;

            let rows = stmt.query_map([], |row| {
                Ok(StoredRow {
                    id: row.get(0)?,
                    schema_version: row.get(1)?,
                    human_readable_title: row.get(2)?,
                    function_name: row.get(3)?,
                    description: row.get(4)?,
                    code: row.get(5)?,
                    inputs: row.get(6)?,
                    output: row.get(7)?,
                    category: row.get(8)?,
                    requires_manual_run: row.get(9)?,
                    created_at: row.get(10)?,
                })
            })?;

            rows.map(|row| row.map_err(AppError::from).and_then(StoredRow::into_record))
                .collect()
        })
        .await
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool> {
        self.run(move |conn| {
            let removed = conn.execute("DELETE FROM tools WHERE id = ?1", params![id])?;
            Ok(removed > 0)
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        self.run(|conn| {
            conn.query_row("SELECT COUNT(*) FROM tools", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }
}

/// Raw column values of one `tools` row.
struct StoredRow {
    id: i64,
    schema_version: u32,
    human_readable_title: String,
    function_name: String,
    description: String,
    code: String,
    inputs: String,
    output: String,
    category: Option<String>,
    requires_manual_run: Option<bool>,
    created_at: String,
}

impl StoredRow {
    fn into_record(self) -> Result<ToolRecord> {
        let id = self.id;
        let corrupt = |what: &str, detail: String| {
            AppError::StorageUnavailableError(format!("Tool {} has corrupt {}: {}", id, what, detail))
        };

        let inputs: Vec<InputField> =
            serde_json::from_str(&self.inputs).map_err(|e| corrupt("inputs", e.to_string()))?;
        let category = self
            .category
            .map(|c| c.parse::<ToolCategory>())
            .transpose()
            .map_err(|e| corrupt("tool_type", e))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| corrupt("created_at", e.to_string()))?
            .with_timezone(&Utc);

        Ok(ToolRecord {
            id,
            schema_version: self.schema_version,
            human_readable_title: self.human_readable_title,
            function_name: self.function_name,
            description: self.description,
            code: self.code,
            inputs,
            output: self.output,
            category,
            requires_manual_run: self.requires_manual_run,
            created_at,
        })
    }
}

fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

fn parse_database_url(url: &str) -> Result<PathBuf> {
    let url = url.trim();
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);

    if path.is_empty() || path.contains("://") {
        return Err(AppError::StorageUnavailableError(format!(
            "Unsupported database url '{}'",
            url
        )));
    }
    if path == ":memory:" {
        return Err(AppError::StorageUnavailableError(
            "In-memory databases are not shared between connections; use a file path".to_string(),
        ));
    }

    Ok(PathBuf::from(path))
}
