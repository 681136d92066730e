//! Usage: Baseline schema at version 1 for fresh installs.
//!
//! Mirrors the layout of the first release: plaintext `password` column and no uniqueness on
//! usage periods. Fresh installs pass through v1->v2 immediately afterwards.

use crate::shared::time::now_unix_millis;
use rusqlite::Connection;

pub(super) fn create_baseline_v1(conn: &mut Connection) -> Result<(), String> {
    const VERSION: i64 = 1;
    let tx = conn
        .transaction()
        .map_err(|e| format!("failed to start sqlite transaction: {e}"))?;

    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  username TEXT NOT NULL,
  password TEXT NOT NULL,
  role TEXT NOT NULL,
  customer_id TEXT,
  name TEXT NOT NULL,
  email TEXT NOT NULL,
  phone TEXT NOT NULL,
  address TEXT NOT NULL DEFAULT '',
  created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS electric_usage (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  customer_id TEXT NOT NULL,
  month INTEGER NOT NULL,
  year INTEGER NOT NULL,
  previous_reading REAL NOT NULL,
  current_reading REAL NOT NULL,
  usage_kwh REAL NOT NULL,
  rate_per_kwh REAL NOT NULL,
  total_amount REAL NOT NULL,
  is_paid INTEGER NOT NULL DEFAULT 0,
  due_date INTEGER NOT NULL,
  created_at INTEGER NOT NULL,
  updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS bills (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  customer_id TEXT NOT NULL,
  usage_id INTEGER NOT NULL,
  month INTEGER NOT NULL,
  year INTEGER NOT NULL,
  usage_kwh REAL NOT NULL,
  amount REAL NOT NULL,
  admin_fee REAL NOT NULL,
  total_amount REAL NOT NULL,
  is_paid INTEGER NOT NULL DEFAULT 0,
  paid_at INTEGER,
  due_date INTEGER NOT NULL,
  created_at INTEGER NOT NULL
);
"#,
    )
    .map_err(|e| format!("failed to create baseline schema: {e}"))?;

    let now = now_unix_millis();
    tx.execute(
        "INSERT OR REPLACE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        [VERSION, now],
    )
    .map_err(|e| format!("failed to insert schema_migrations row for v{VERSION}: {e}"))?;

    super::set_user_version(&tx, VERSION)?;

    tx.commit()
        .map_err(|e| format!("failed to commit sqlite transaction: {e}"))?;

    Ok(())
}
