//! Usage: Metered usage records and the submit-then-bill use-case.

use crate::db;
use crate::domain::billing::{self, DEFAULT_RATE_PER_KWH};
use crate::domain::bills;
use crate::shared::error::{
    db_err, invalid_input, not_found, AppError, AppResult, CODE_USAGE_PERIOD_CONFLICT,
};
use crate::shared::time::now_unix_millis;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageRecord {
    pub id: i64,
    pub customer_id: String,
    pub month: u32,
    pub year: i32,
    pub previous_reading: f64,
    pub current_reading: f64,
    pub usage_kwh: f64,
    pub rate_per_kwh: f64,
    pub total_amount: f64,
    pub is_paid: bool,
    pub due_date: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Caller-supplied reading. Derived fields (`usage_kwh`, `total_amount`) are never accepted
/// from callers and are always recomputed.
#[derive(Debug, Clone, Deserialize)]
pub struct UsageInput {
    pub customer_id: String,
    pub month: u32,
    pub year: i32,
    pub previous_reading: f64,
    pub current_reading: f64,
    #[serde(default = "default_rate")]
    pub rate_per_kwh: f64,
    #[serde(default)]
    pub due_date: Option<i64>,
}

fn default_rate() -> f64 {
    DEFAULT_RATE_PER_KWH
}

impl UsageInput {
    pub fn new(
        customer_id: impl Into<String>,
        month: u32,
        year: i32,
        previous_reading: f64,
        current_reading: f64,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            month,
            year,
            previous_reading,
            current_reading,
            rate_per_kwh: DEFAULT_RATE_PER_KWH,
            due_date: None,
        }
    }

    pub fn with_rate(mut self, rate_per_kwh: f64) -> Self {
        self.rate_per_kwh = rate_per_kwh;
        self
    }

    pub fn with_due_date(mut self, due_date: i64) -> Self {
        self.due_date = Some(due_date);
        self
    }

    fn validated(&self) -> AppResult<&str> {
        let customer_id = self.customer_id.trim();
        if customer_id.is_empty() {
            return Err(invalid_input("customer_id is required"));
        }
        billing::validate_period(self.month, self.year)?;
        billing::validate_readings(self.previous_reading, self.current_reading)?;
        billing::validate_rate(self.rate_per_kwh)?;
        Ok(customer_id)
    }
}

fn period_conflict(customer_id: &str, month: u32, year: i32) -> AppError {
    AppError::new(
        CODE_USAGE_PERIOD_CONFLICT,
        format!("usage already recorded for customer_id={customer_id}, period={month}/{year}"),
    )
}

fn row_to_usage(row: &rusqlite::Row<'_>) -> Result<UsageRecord, rusqlite::Error> {
    Ok(UsageRecord {
        id: row.get("id")?,
        customer_id: row.get("customer_id")?,
        month: row.get("month")?,
        year: row.get("year")?,
        previous_reading: row.get("previous_reading")?,
        current_reading: row.get("current_reading")?,
        usage_kwh: row.get("usage_kwh")?,
        rate_per_kwh: row.get("rate_per_kwh")?,
        total_amount: row.get("total_amount")?,
        is_paid: row.get("is_paid")?,
        due_date: row.get("due_date")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

const SELECT_USAGE: &str = r#"
SELECT
  id,
  customer_id,
  month,
  year,
  previous_reading,
  current_reading,
  usage_kwh,
  rate_per_kwh,
  total_amount,
  is_paid,
  due_date,
  created_at,
  updated_at
FROM electric_usage
"#;

pub(crate) fn get_by_id_conn(conn: &Connection, usage_id: i64) -> AppResult<Option<UsageRecord>> {
    conn.query_row(
        &format!("{SELECT_USAGE} WHERE id = ?1"),
        params![usage_id],
        row_to_usage,
    )
    .optional()
    .map_err(|e| db_err!("failed to query usage: {e}"))
}

fn find_by_month_year_conn(
    conn: &Connection,
    customer_id: &str,
    month: u32,
    year: i32,
) -> AppResult<Option<UsageRecord>> {
    conn.query_row(
        &format!(
            "{SELECT_USAGE} WHERE customer_id = ?1 AND month = ?2 AND year = ?3 ORDER BY id LIMIT 1"
        ),
        params![customer_id, month, year],
        row_to_usage,
    )
    .optional()
    .map_err(|e| db_err!("failed to query usage by period: {e}"))
}

fn collect_usages(
    stmt: &mut rusqlite::Statement<'_>,
    params: impl rusqlite::Params,
) -> AppResult<Vec<UsageRecord>> {
    let rows = stmt
        .query_map(params, row_to_usage)
        .map_err(|e| db_err!("failed to list usage: {e}"))?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row.map_err(|e| db_err!("failed to read usage row: {e}"))?);
    }
    Ok(items)
}

pub fn get_by_id(db: &db::Db, usage_id: i64) -> AppResult<Option<UsageRecord>> {
    let conn = db.open_connection()?;
    get_by_id_conn(&conn, usage_id)
}

pub fn find_by_month_year(
    db: &db::Db,
    customer_id: &str,
    month: u32,
    year: i32,
) -> AppResult<Option<UsageRecord>> {
    let conn = db.open_connection()?;
    find_by_month_year_conn(&conn, customer_id.trim(), month, year)
}

/// Newest period first.
pub fn list_by_customer(db: &db::Db, customer_id: &str) -> AppResult<Vec<UsageRecord>> {
    let conn = db.open_connection()?;
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_USAGE} WHERE customer_id = ?1 ORDER BY year DESC, month DESC, id DESC"
        ))
        .map_err(|e| db_err!("failed to prepare usage query: {e}"))?;
    collect_usages(&mut stmt, params![customer_id.trim()])
}

pub fn list_all(db: &db::Db) -> AppResult<Vec<UsageRecord>> {
    let conn = db.open_connection()?;
    let mut stmt = conn
        .prepare(&format!("{SELECT_USAGE} ORDER BY year DESC, month DESC, id DESC"))
        .map_err(|e| db_err!("failed to prepare usage query: {e}"))?;
    collect_usages(&mut stmt, [])
}

/// Persists the reading and its bill in one transaction and returns the usage id.
///
/// The period check runs inside the same IMMEDIATE transaction as the inserts, so two
/// submits for the same (customer, month, year) cannot both succeed.
pub fn submit(db: &db::Db, input: &UsageInput) -> AppResult<i64> {
    let customer_id = input.validated()?;
    let amounts = billing::compute_usage(
        input.previous_reading,
        input.current_reading,
        input.rate_per_kwh,
    )?;
    let now = now_unix_millis();
    let due_date = input.due_date.unwrap_or_else(|| billing::default_due_date(now));

    let mut conn = db.open_connection()?;
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| db_err!("failed to start transaction: {e}"))?;

    if find_by_month_year_conn(&tx, customer_id, input.month, input.year)?.is_some() {
        tracing::warn!(
            customer_id,
            month = input.month,
            year = input.year,
            "usage submit rejected: period already recorded"
        );
        return Err(period_conflict(customer_id, input.month, input.year));
    }

    tx.execute(
        r#"
INSERT INTO electric_usage(
  customer_id,
  month,
  year,
  previous_reading,
  current_reading,
  usage_kwh,
  rate_per_kwh,
  total_amount,
  is_paid,
  due_date,
  created_at,
  updated_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?10, ?10)
"#,
        params![
            customer_id,
            input.month,
            input.year,
            input.previous_reading,
            input.current_reading,
            amounts.usage_kwh,
            input.rate_per_kwh,
            amounts.total_amount,
            due_date,
            now
        ],
    )
    .map_err(|e| {
        if db::is_unique_violation(&e, "electric_usage") {
            period_conflict(customer_id, input.month, input.year)
        } else {
            db_err!("failed to insert usage: {e}")
        }
    })?;

    let usage_id = tx.last_insert_rowid();
    let usage = get_by_id_conn(&tx, usage_id)?
        .ok_or_else(|| db_err!("inserted usage {usage_id} not readable"))?;
    let bill_id = bills::insert_derived(&tx, &usage)?;

    tx.commit().map_err(|e| db_err!("failed to commit: {e}"))?;

    tracing::info!(
        usage_id,
        bill_id,
        customer_id,
        month = input.month,
        year = input.year,
        usage_kwh = amounts.usage_kwh,
        "usage submitted"
    );

    Ok(usage_id)
}

/// Rewrites the reading and its derived fields. The bill created at submit time is a frozen
/// snapshot and is not touched.
pub fn update(db: &db::Db, usage_id: i64, input: &UsageInput) -> AppResult<UsageRecord> {
    let customer_id = input.validated()?;
    let amounts = billing::compute_usage(
        input.previous_reading,
        input.current_reading,
        input.rate_per_kwh,
    )?;
    let now = now_unix_millis();

    let mut conn = db.open_connection()?;
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| db_err!("failed to start transaction: {e}"))?;

    let before = get_by_id_conn(&tx, usage_id)?.ok_or_else(|| not_found("usage not found"))?;

    if let Some(existing) = find_by_month_year_conn(&tx, customer_id, input.month, input.year)? {
        if existing.id != usage_id {
            tracing::warn!(
                usage_id,
                conflicting_usage_id = existing.id,
                "usage update rejected: period already recorded"
            );
            return Err(period_conflict(customer_id, input.month, input.year));
        }
    }

    let due_date = input.due_date.unwrap_or(before.due_date);

    tx.execute(
        r#"
UPDATE electric_usage
SET
  customer_id = ?1,
  month = ?2,
  year = ?3,
  previous_reading = ?4,
  current_reading = ?5,
  usage_kwh = ?6,
  rate_per_kwh = ?7,
  total_amount = ?8,
  due_date = ?9,
  updated_at = ?10
WHERE id = ?11
"#,
        params![
            customer_id,
            input.month,
            input.year,
            input.previous_reading,
            input.current_reading,
            amounts.usage_kwh,
            input.rate_per_kwh,
            amounts.total_amount,
            due_date,
            now,
            usage_id
        ],
    )
    .map_err(|e| {
        if db::is_unique_violation(&e, "electric_usage") {
            period_conflict(customer_id, input.month, input.year)
        } else {
            db_err!("failed to update usage: {e}")
        }
    })?;

    tx.commit().map_err(|e| db_err!("failed to commit: {e}"))?;

    tracing::info!(usage_id, "usage updated");

    get_by_id_conn(&conn, usage_id)?.ok_or_else(|| not_found("usage not found"))
}

/// Removes the usage row only; its bill stays in place.
pub fn delete(db: &db::Db, usage_id: i64) -> AppResult<()> {
    let conn = db.open_connection()?;
    let changed = conn
        .execute(
            "DELETE FROM electric_usage WHERE id = ?1",
            params![usage_id],
        )
        .map_err(|e| db_err!("failed to delete usage: {e}"))?;
    if changed == 0 {
        return Err(not_found("usage not found"));
    }
    tracing::info!(usage_id, "usage deleted");
    Ok(())
}

#[cfg(test)]
mod tests;
