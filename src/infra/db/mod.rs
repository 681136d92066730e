//! Usage: SQLite connection setup, schema migrations, and common DB helpers.

mod migrations;
pub(crate) mod seed;

use crate::shared::error::{db_err, AppError, AppResult, CODE_DB_MIGRATION};
use crate::shared::security::PasswordHasher;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DB_FILE_NAME: &str = "electric-bill.db";
const BUSY_TIMEOUT_DEFAULT: Duration = Duration::from_millis(2000);
const POOL_SIZE_DEFAULT: u32 = 4;

/// `PRAGMA synchronous` level applied to every pooled connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Synchronous {
    Off,
    #[default]
    Normal,
    Full,
    Extra,
}

impl Synchronous {
    pub fn as_str(self) -> &'static str {
        match self {
            Synchronous::Off => "OFF",
            Synchronous::Normal => "NORMAL",
            Synchronous::Full => "FULL",
            Synchronous::Extra => "EXTRA",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "OFF" => Some(Synchronous::Off),
            "NORMAL" => Some(Synchronous::Normal),
            "FULL" => Some(Synchronous::Full),
            "EXTRA" => Some(Synchronous::Extra),
            _ => None,
        }
    }
}

/// Pool and connection settings for the billing store.
///
/// Submits and payments serialize on `BEGIN IMMEDIATE`, so `busy_timeout` bounds how long a
/// writer waits for a concurrent one before failing with `DB_ERROR`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbRuntimeConfig {
    pub busy_timeout: Duration,
    pub pool_size: u32,
    pub synchronous: Synchronous,
}

impl Default for DbRuntimeConfig {
    fn default() -> Self {
        Self {
            busy_timeout: BUSY_TIMEOUT_DEFAULT,
            pool_size: POOL_SIZE_DEFAULT,
            synchronous: Synchronous::default(),
        }
    }
}

impl DbRuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_env_get(|key| env::var(key).ok())
    }

    /// Reads `EBILL_DB_BUSY_TIMEOUT_MS`, `EBILL_DB_POOL_SIZE` and `EBILL_DB_SYNCHRONOUS`.
    /// Zero, negative or unparsable values keep the default.
    pub fn from_env_get(mut get: impl FnMut(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            busy_timeout: get("EBILL_DB_BUSY_TIMEOUT_MS")
                .as_deref()
                .and_then(parse_trimmed::<u64>)
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.busy_timeout),
            pool_size: get("EBILL_DB_POOL_SIZE")
                .as_deref()
                .and_then(parse_trimmed::<u32>)
                .filter(|size| *size > 0)
                .unwrap_or(defaults.pool_size),
            synchronous: get("EBILL_DB_SYNCHRONOUS")
                .as_deref()
                .and_then(Synchronous::parse)
                .unwrap_or(defaults.synchronous),
        }
    }
}

/// Blank or unparsable input yields `None`.
pub(crate) fn parse_trimmed<T: FromStr>(raw: &str) -> Option<T> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse().ok()
}

#[derive(Clone)]
pub(crate) struct Db {
    pool: Pool<SqliteConnectionManager>,
}

impl Db {
    pub(crate) fn open_connection(
        &self,
    ) -> AppResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| db_err!("failed to get connection from pool: {e}"))
    }
}

pub fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DB_FILE_NAME)
}

pub(crate) fn init(
    path: &Path,
    config: &DbRuntimeConfig,
    hasher: &PasswordHasher,
) -> AppResult<Db> {
    let path_hint = path.to_string_lossy();

    tracing::info!(
        path = %path_hint,
        busy_timeout_ms = config.busy_timeout.as_millis(),
        pool_size = config.pool_size,
        synchronous = config.synchronous.as_str(),
        "opening billing store"
    );

    let manager = SqliteConnectionManager::file(path).with_init({
        let config = config.clone();
        move |conn| configure_connection(conn, &config)
    });

    let pool = Pool::builder()
        .max_size(config.pool_size)
        .build(manager)
        .map_err(|e| db_err!("failed to create db pool: {e}"))?;
    let mut conn = pool
        .get()
        .map_err(|e| db_err!("failed to get startup connection: {e}"))?;

    migrations::apply_migrations(&mut conn, hasher).map_err(|e| {
        AppError::new(
            CODE_DB_MIGRATION,
            format!("sqlite migration failed at {path_hint}: {}", e.message()),
        )
    })?;

    Ok(Db { pool })
}

/// Runs on every connection the pool opens.
fn configure_connection(conn: &Connection, config: &DbRuntimeConfig) -> rusqlite::Result<()> {
    conn.busy_timeout(config.busy_timeout)?;
    conn.execute_batch(&format!(
        "PRAGMA journal_mode = WAL;\nPRAGMA foreign_keys = ON;\nPRAGMA synchronous = {};",
        config.synchronous.as_str()
    ))
}

/// True only for a UNIQUE violation reported against `table`. NOT NULL, CHECK and trigger
/// aborts share the constraint error code but do not match.
pub(crate) fn is_unique_violation(err: &rusqlite::Error, table: &str) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, message) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                && message
                    .as_deref()
                    .is_some_and(|m| m.contains(&format!("{table}.")))
        }
        _ => false,
    }
}
