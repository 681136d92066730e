//! Usage: SQLite migration v1->v2 - Replace plaintext passwords with bcrypt hashes.

use crate::shared::security::{PasswordHasher, MAX_PASSWORD_BYTES};
use crate::shared::time::now_unix_millis;
use rusqlite::{params, Connection};

pub(super) fn migrate_v1_to_v2(
    conn: &mut Connection,
    hasher: &PasswordHasher,
) -> Result<(), String> {
    const VERSION: i64 = 2;
    let tx = conn
        .transaction()
        .map_err(|e| format!("failed to start sqlite transaction: {e}"))?;

    tx.execute_batch("ALTER TABLE users ADD COLUMN password_hash TEXT NOT NULL DEFAULT '';")
        .map_err(|e| format!("failed to add users.password_hash: {e}"))?;

    let legacy: Vec<(i64, String)> = {
        let mut stmt = tx
            .prepare("SELECT id, password FROM users ORDER BY id")
            .map_err(|e| format!("failed to prepare legacy password query: {e}"))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
            .map_err(|e| format!("failed to read legacy passwords: {e}"))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| format!("failed to read legacy password row: {e}"))?);
        }
        out
    };

    for (id, plaintext) in &legacy {
        // An empty hash never verifies, so the account stays locked until a password update.
        let hash = if plaintext.len() > MAX_PASSWORD_BYTES {
            tracing::warn!(user_id = id, "legacy password too long to hash; account locked");
            String::new()
        } else {
            hasher
                .hash(plaintext)
                .map_err(|e| format!("failed to hash legacy password for user {id}: {e}"))?
        };
        tx.execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            params![hash, id],
        )
        .map_err(|e| format!("failed to store password hash for user {id}: {e}"))?;
    }

    tx.execute_batch("ALTER TABLE users DROP COLUMN password;")
        .map_err(|e| format!("failed to drop users.password: {e}"))?;

    if !legacy.is_empty() {
        tracing::info!(users = legacy.len(), "legacy plaintext passwords rehashed");
    }

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
