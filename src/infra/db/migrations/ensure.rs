//! Usage: Idempotent ensure patches applied after all versioned migrations.
//!
//! These patches add indexes without bumping user_version. Unique indexes are only created
//! when existing rows already satisfy them; data written before the invariant existed is
//! never rewritten here.

use rusqlite::{Connection, OptionalExtension};

pub(super) fn apply_ensure_patches(conn: &mut Connection) -> crate::shared::error::AppResult<()> {
    ensure_lookup_indexes(conn)?;
    ensure_unique_index(
        conn,
        "idx_electric_usage_period",
        "electric_usage",
        "customer_id, month, year",
    )?;
    ensure_unique_index(conn, "idx_users_username", "users", "username")?;
    Ok(())
}

fn ensure_lookup_indexes(conn: &mut Connection) -> Result<(), String> {
    let tx = conn
        .transaction()
        .map_err(|e| format!("failed to start sqlite transaction: {e}"))?;

    tx.execute_batch(
        r#"
CREATE INDEX IF NOT EXISTS idx_electric_usage_customer_period
  ON electric_usage(customer_id, year, month);
CREATE INDEX IF NOT EXISTS idx_bills_customer_period
  ON bills(customer_id, year, month);
CREATE INDEX IF NOT EXISTS idx_bills_usage_id
  ON bills(usage_id);
CREATE INDEX IF NOT EXISTS idx_users_role
  ON users(role);
"#,
    )
    .map_err(|e| format!("failed to create lookup indexes: {e}"))?;

    tx.commit()
        .map_err(|e| format!("failed to commit sqlite transaction: {e}"))?;
    Ok(())
}

fn ensure_unique_index(
    conn: &mut Connection,
    index: &str,
    table: &str,
    columns: &str,
) -> Result<(), String> {
    let exists: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1 LIMIT 1",
            [index],
            |_| Ok(true),
        )
        .optional()
        .map_err(|e| format!("failed to query sqlite_master: {e}"))?
        .unwrap_or(false);
    if exists {
        return Ok(());
    }

    let duplicate_groups: i64 = conn
        .query_row(
            &format!(
                "SELECT COUNT(*) FROM (SELECT 1 FROM {table} GROUP BY {columns} HAVING COUNT(*) > 1)"
            ),
            [],
            |row| row.get(0),
        )
        .map_err(|e| format!("failed to check duplicates for {index}: {e}"))?;
    if duplicate_groups > 0 {
        tracing::warn!(
            index,
            table,
            duplicate_groups,
            "unique index skipped: existing rows contain duplicates"
        );
        return Ok(());
    }

    conn.execute_batch(&format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {index} ON {table}({columns});"
    ))
    .map_err(|e| format!("failed to create {index}: {e}"))?;
    tracing::info!(index, table, "unique index created");
    Ok(())
}
