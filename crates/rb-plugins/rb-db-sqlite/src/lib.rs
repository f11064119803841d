//! # rb-db-sqlite Implementation
//!
//! This module implements the mapping between SQLite rows and the `rb-core`
//! documents. Each document row carries a version column; a commit only
//! succeeds if every version it was conditioned on is still current.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rb_core::models::{Board, Dat, Subject, Versioned};
use rb_core::traits::{Commit, CommitRequest, DocKey, DocumentStore, Put};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::debug;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS boards (
    name        TEXT PRIMARY KEY,
    version     INTEGER NOT NULL,
    subjects    TEXT NOT NULL,
    write_count INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS dats (
    board         TEXT NOT NULL REFERENCES boards(name),
    thread_key    TEXT NOT NULL,
    version       INTEGER NOT NULL,
    content       TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    PRIMARY KEY (board, thread_key)
);
"#;

pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Connects and creates the tables if needed. An in-memory URL needs
    /// `max_connections = 1`, since every connection opens its own database.
    pub async fn new(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }
}

fn db_version(version: u64) -> anyhow::Result<i64> {
    Ok(i64::try_from(version)?)
}

async fn current_version(
    conn: &mut SqliteConnection,
    key: &DocKey,
) -> anyhow::Result<Option<u64>> {
    let version: Option<i64> = match key {
        DocKey::Board(name) => {
            sqlx::query_scalar("SELECT version FROM boards WHERE name = ?")
                .bind(name)
                .fetch_optional(&mut *conn)
                .await?
        }
        DocKey::Dat { board, thread_key } => {
            sqlx::query_scalar("SELECT version FROM dats WHERE board = ? AND thread_key = ?")
                .bind(board)
                .bind(thread_key)
                .fetch_optional(&mut *conn)
                .await?
        }
    };
    Ok(version.map(u64::try_from).transpose()?)
}

/// Writes one document if its version still matches. Returns false otherwise.
async fn apply(conn: &mut SqliteConnection, put: &Put) -> anyhow::Result<bool> {
    let result = match put {
        Put::Board {
            name,
            expected: Some(version),
            board,
        } => {
            sqlx::query(
                "UPDATE boards SET version = version + 1, subjects = ?, write_count = ? \
                 WHERE name = ? AND version = ?",
            )
            .bind(serde_json::to_string(&board.subjects)?)
            .bind(i64::from(board.write_count))
            .bind(name)
            .bind(db_version(*version)?)
            .execute(&mut *conn)
            .await?
        }
        Put::Board {
            name,
            expected: None,
            board,
        } => {
            sqlx::query(
                "INSERT INTO boards (name, version, subjects, write_count) VALUES (?, 1, ?, ?) \
                 ON CONFLICT(name) DO NOTHING",
            )
            .bind(name)
            .bind(serde_json::to_string(&board.subjects)?)
            .bind(i64::from(board.write_count))
            .execute(&mut *conn)
            .await?
        }
        Put::Dat {
            board,
            thread_key,
            expected: Some(version),
            dat,
        } => {
            sqlx::query(
                "UPDATE dats SET version = version + 1, content = ?, last_modified = ? \
                 WHERE board = ? AND thread_key = ? AND version = ?",
            )
            .bind(&dat.content)
            .bind(dat.last_modified)
            .bind(board)
            .bind(thread_key)
            .bind(db_version(*version)?)
            .execute(&mut *conn)
            .await?
        }
        Put::Dat {
            board,
            thread_key,
            expected: None,
            dat,
        } => {
            sqlx::query(
                "INSERT INTO dats (board, thread_key, version, content, last_modified) \
                 VALUES (?, ?, 1, ?, ?) ON CONFLICT(board, thread_key) DO NOTHING",
            )
            .bind(board)
            .bind(thread_key)
            .bind(&dat.content)
            .bind(dat.last_modified)
            .execute(&mut *conn)
            .await?
        }
    };
    Ok(result.rows_affected() == 1)
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get_board(&self, name: &str) -> anyhow::Result<Option<Versioned<Board>>> {
        let row = sqlx::query("SELECT version, subjects, write_count FROM boards WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let subjects: Vec<Subject> = serde_json::from_str(&row.try_get::<String, _>("subjects")?)?;
        Ok(Some(Versioned {
            doc: Board {
                subjects,
                write_count: u32::try_from(row.try_get::<i64, _>("write_count")?)?,
            },
            version: u64::try_from(row.try_get::<i64, _>("version")?)?,
        }))
    }

    async fn get_dat(
        &self,
        board: &str,
        thread_key: &str,
    ) -> anyhow::Result<Option<Versioned<Dat>>> {
        let row = sqlx::query(
            "SELECT version, content, last_modified FROM dats WHERE board = ? AND thread_key = ?",
        )
        .bind(board)
        .bind(thread_key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(Versioned {
            doc: Dat {
                content: row.try_get("content")?,
                last_modified: row.try_get::<DateTime<Utc>, _>("last_modified")?,
            },
            version: u64::try_from(row.try_get::<i64, _>("version")?)?,
        }))
    }

    async fn list_boards(&self) -> anyhow::Result<Vec<String>> {
        Ok(sqlx::query_scalar("SELECT name FROM boards ORDER BY name")
            .fetch_all(&self.pool)
            .await?)
    }

    /// Checks and writes run in one SQLite transaction; returning early
    /// drops it, which rolls everything back.
    async fn commit(&self, request: CommitRequest) -> anyhow::Result<Commit> {
        let mut tx = self.pool.begin().await?;

        for (key, expected) in &request.checks {
            if current_version(&mut *tx, key).await? != *expected {
                debug!(?key, "stale read, rolling back");
                return Ok(Commit::Conflict);
            }
        }
        for put in &request.puts {
            if !apply(&mut *tx, put).await? {
                debug!(key = ?put.key(), "stale write, rolling back");
                return Ok(Commit::Conflict);
            }
        }

        tx.commit().await?;
        Ok(Commit::Applied)
    }
}
