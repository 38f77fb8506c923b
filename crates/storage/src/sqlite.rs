//! SQLite Storage - Persistent document collections using SQLite
//!
//! Each collection is a table of `(id, key, value)` rows where `value` holds
//! the JSON-encoded preference value.
//!
//! Features:
//! - Persistent storage across sessions
//! - Real unique indexes on the key column
//! - Async-friendly using spawn_blocking

use async_trait::async_trait;
use docpref_core::{
    Filter, IndexOptions, PrefDocument, PrefError, PrefValue, Result, UpdateOptions, KEY_FIELD,
    VALUE_FIELD,
};
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::trait_::{
    validate_collection_name, DocumentCollection, DocumentDatabase, SharedCollection,
};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

fn db_err(e: rusqlite::Error) -> PrefError {
    PrefError::Storage(e.to_string())
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn open_connection(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).map_err(db_err)?;
    conn.busy_timeout(BUSY_TIMEOUT).map_err(db_err)?;
    Ok(conn)
}

/// Helper function to run blocking SQLite operations
async fn run_sqlite<T, F>(path: PathBuf, f: F) -> Result<T>
where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let conn = open_connection(&path)?;
        f(&conn)
    })
    .await
    .map_err(|e| PrefError::Runtime(e.to_string()))?
}

/// WHERE clause and its positional arguments for a filter
fn where_clause(filter: &Filter) -> (&'static str, Vec<String>) {
    match filter {
        Filter::All => ("", Vec::new()),
        Filter::KeyEq(key) => (" WHERE key = ?", vec![key.clone()]),
    }
}

fn column_for(field: &str) -> Result<&'static str> {
    match field {
        KEY_FIELD => Ok("key"),
        VALUE_FIELD => Ok("value"),
        other => Err(PrefError::Storage(format!("unknown field: {other}"))),
    }
}

/// SQLite database holding one table per collection
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    /// Database file path
    path: PathBuf,
}

impl SqliteDatabase {
    /// Open (or create) the database file at `path`
    pub async fn open(path: PathBuf, enable_wal: bool) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        run_sqlite(path.clone(), move |conn| {
            if enable_wal {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))
                    .map_err(db_err)?;
            }
            Ok(())
        })
        .await?;

        info!("SQLite preference database opened at: {:?}", path);
        Ok(Self { path })
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl DocumentDatabase for SqliteDatabase {
    async fn collection(&self, name: &str) -> Result<SharedCollection> {
        validate_collection_name(name)?;
        let table = name.to_string();

        run_sqlite(self.path.clone(), move |conn| {
            conn.execute(
                &format!(
                    r#"
                    CREATE TABLE IF NOT EXISTS "{table}" (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        key TEXT NOT NULL,
                        value TEXT NOT NULL
                    )
                    "#
                ),
                [],
            )
            .map_err(db_err)?;
            Ok(())
        })
        .await?;

        Ok(Arc::new(SqliteCollection {
            path: self.path.clone(),
            table: name.to_string(),
        }))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        run_sqlite(self.path.clone(), |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT name FROM sqlite_master \
                     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                )
                .map_err(db_err)?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(db_err)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(db_err)?;
            Ok(names)
        })
        .await
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        validate_collection_name(name)?;
        let table = name.to_string();
        run_sqlite(self.path.clone(), move |conn| {
            conn.execute(&format!(r#"DROP TABLE IF EXISTS "{table}""#), [])
                .map_err(db_err)?;
            Ok(())
        })
        .await
    }
}

/// A collection stored as one SQLite table
#[derive(Debug, Clone)]
pub struct SqliteCollection {
    path: PathBuf,
    table: String,
}

impl SqliteCollection {
    fn index_name(&self, field: &str) -> String {
        format!("idx_{}_{}", self.table, field)
    }
}

#[async_trait]
impl DocumentCollection for SqliteCollection {
    fn name(&self) -> &str {
        &self.table
    }

    async fn has_index(&self, field: &str) -> Result<bool> {
        let index = self.index_name(field);
        run_sqlite(self.path.clone(), move |conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?",
                    [&index],
                    |_| Ok(()),
                )
                .optional()
                .map_err(db_err)?;
            Ok(found.is_some())
        })
        .await
    }

    async fn create_index(&self, field: &str, options: IndexOptions) -> Result<()> {
        let column = column_for(field)?;
        let index = self.index_name(field);
        let table = self.table.clone();
        let field = field.to_string();
        let unique = if options.unique { "UNIQUE " } else { "" };

        run_sqlite(self.path.clone(), move |conn| {
            conn.execute(
                &format!(r#"CREATE {unique}INDEX IF NOT EXISTS "{index}" ON "{table}"({column})"#),
                [],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    PrefError::UniqueViolation {
                        field: field.clone(),
                        key: String::new(),
                    }
                } else {
                    db_err(e)
                }
            })?;
            Ok(())
        })
        .await?;

        debug!("Created index on {} (unique: {})", self.table, options.unique);
        Ok(())
    }

    async fn drop_index(&self, field: &str) -> Result<()> {
        if !self.has_index(field).await? {
            return Err(PrefError::IndexMissing(field.to_string()));
        }
        let index = self.index_name(field);
        run_sqlite(self.path.clone(), move |conn| {
            conn.execute(&format!(r#"DROP INDEX IF EXISTS "{index}""#), [])
                .map_err(db_err)?;
            Ok(())
        })
        .await
    }

    async fn find(&self, filter: &Filter, limit: Option<usize>) -> Result<Vec<PrefDocument>> {
        let (clause, args) = where_clause(filter);
        let limit = limit.map(|n| format!(" LIMIT {n}")).unwrap_or_default();
        let sql = format!(
            r#"SELECT key, value FROM "{}"{clause} ORDER BY id{limit}"#,
            self.table
        );

        run_sqlite(self.path.clone(), move |conn| {
            let mut stmt = conn.prepare(&sql).map_err(db_err)?;
            let rows = stmt
                .query_map(params_from_iter(args.iter()), |row| {
                    let key: String = row.get(0)?;
                    let value_json: String = row.get(1)?;
                    let value: PrefValue = serde_json::from_str(&value_json).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            1,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?;
                    Ok(PrefDocument { key, value })
                })
                .map_err(db_err)?;

            let mut result = Vec::new();
            for doc in rows {
                result.push(doc.map_err(db_err)?);
            }
            Ok(result)
        })
        .await
    }

    async fn count(&self, filter: &Filter) -> Result<usize> {
        let (clause, args) = where_clause(filter);
        let sql = format!(r#"SELECT COUNT(*) FROM "{}"{clause}"#, self.table);

        run_sqlite(self.path.clone(), move |conn| {
            let count: i64 = conn
                .query_row(&sql, params_from_iter(args.iter()), |row| row.get(0))
                .map_err(db_err)?;
            Ok(count as usize)
        })
        .await
    }

    async fn update(
        &self,
        filter: &Filter,
        document: PrefDocument,
        options: UpdateOptions,
    ) -> Result<usize> {
        let (clause, filter_args) = where_clause(filter);
        let table = self.table.clone();
        let value_json = serde_json::to_string(&document.value)?;
        let key = document.key;

        run_sqlite(self.path.clone(), move |conn| {
            let unique_err = |e: rusqlite::Error, key: &str| {
                if is_constraint_violation(&e) {
                    PrefError::UniqueViolation {
                        field: KEY_FIELD.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    db_err(e)
                }
            };

            let tx = conn.unchecked_transaction().map_err(db_err)?;

            let mut args = vec![key.clone(), value_json.clone()];
            args.extend(filter_args);
            let mut affected = tx
                .execute(
                    &format!(r#"UPDATE "{table}" SET key = ?, value = ?{clause}"#),
                    params_from_iter(args.iter()),
                )
                .map_err(|e| unique_err(e, &key))?;

            if affected == 0 && options.upsert {
                affected = tx
                    .execute(
                        &format!(r#"INSERT INTO "{table}" (key, value) VALUES (?, ?)"#),
                        [&key, &value_json],
                    )
                    .map_err(|e| unique_err(e, &key))?;
            }

            tx.commit().map_err(db_err)?;
            Ok(affected)
        })
        .await
    }

    async fn remove(&self, filter: &Filter) -> Result<usize> {
        let (clause, args) = where_clause(filter);
        let sql = format!(r#"DELETE FROM "{}"{clause}"#, self.table);

        run_sqlite(self.path.clone(), move |conn| {
            conn.execute(&sql, params_from_iter(args.iter()))
                .map_err(db_err)
        })
        .await
    }
}
