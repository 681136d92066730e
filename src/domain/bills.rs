//! Usage: Bill records derived from usage, listing, and the paid transition.

use crate::db;
use crate::domain::billing;
use crate::domain::usage::UsageRecord;
use crate::shared::error::{db_err, not_found, AppError, AppResult, CODE_BILL_ALREADY_PAID};
use crate::shared::time::now_unix_millis;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillRecord {
    pub id: i64,
    pub customer_id: String,
    pub usage_id: i64,
    pub month: u32,
    pub year: i32,
    pub usage_kwh: f64,
    pub amount: f64,
    pub admin_fee: f64,
    pub total_amount: f64,
    pub is_paid: bool,
    pub paid_at: Option<i64>,
    pub due_date: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BillSummary {
    pub count: usize,
    pub unpaid_count: usize,
    pub outstanding_total: f64,
    pub paid_total: f64,
}

fn row_to_bill(row: &rusqlite::Row<'_>) -> Result<BillRecord, rusqlite::Error> {
    Ok(BillRecord {
        id: row.get("id")?,
        customer_id: row.get("customer_id")?,
        usage_id: row.get("usage_id")?,
        month: row.get("month")?,
        year: row.get("year")?,
        usage_kwh: row.get("usage_kwh")?,
        amount: row.get("amount")?,
        admin_fee: row.get("admin_fee")?,
        total_amount: row.get("total_amount")?,
        is_paid: row.get("is_paid")?,
        paid_at: row.get("paid_at")?,
        due_date: row.get("due_date")?,
        created_at: row.get("created_at")?,
    })
}

const SELECT_BILL: &str = r#"
SELECT
  id,
  customer_id,
  usage_id,
  month,
  year,
  usage_kwh,
  amount,
  admin_fee,
  total_amount,
  is_paid,
  paid_at,
  due_date,
  created_at
FROM bills
"#;

fn get_by_id_conn(conn: &Connection, bill_id: i64) -> AppResult<Option<BillRecord>> {
    conn.query_row(
        &format!("{SELECT_BILL} WHERE id = ?1"),
        params![bill_id],
        row_to_bill,
    )
    .optional()
    .map_err(|e| db_err!("failed to query bill: {e}"))
}

fn collect_bills(
    stmt: &mut rusqlite::Statement<'_>,
    params: impl rusqlite::Params,
) -> AppResult<Vec<BillRecord>> {
    let rows = stmt
        .query_map(params, row_to_bill)
        .map_err(|e| db_err!("failed to list bills: {e}"))?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row.map_err(|e| db_err!("failed to read bill row: {e}"))?);
    }
    Ok(items)
}

/// Inserts the bill for a freshly inserted usage row. Runs on the caller's transaction.
pub(crate) fn insert_derived(conn: &Connection, usage: &UsageRecord) -> AppResult<i64> {
    let amounts = billing::compute_bill(usage.total_amount);
    conn.execute(
        r#"
INSERT INTO bills(
  customer_id,
  usage_id,
  month,
  year,
  usage_kwh,
  amount,
  admin_fee,
  total_amount,
  is_paid,
  paid_at,
  due_date,
  created_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, NULL, ?9, ?10)
"#,
        params![
            usage.customer_id,
            usage.id,
            usage.month,
            usage.year,
            usage.usage_kwh,
            amounts.amount,
            amounts.admin_fee,
            amounts.total_amount,
            usage.due_date,
            usage.created_at
        ],
    )
    .map_err(|e| db_err!("failed to insert bill: {e}"))?;
    Ok(conn.last_insert_rowid())
}

pub fn get_by_id(db: &db::Db, bill_id: i64) -> AppResult<Option<BillRecord>> {
    let conn = db.open_connection()?;
    get_by_id_conn(&conn, bill_id)
}

pub fn find_by_usage(db: &db::Db, usage_id: i64) -> AppResult<Option<BillRecord>> {
    let conn = db.open_connection()?;
    conn.query_row(
        &format!("{SELECT_BILL} WHERE usage_id = ?1 ORDER BY id LIMIT 1"),
        params![usage_id],
        row_to_bill,
    )
    .optional()
    .map_err(|e| db_err!("failed to query bill by usage: {e}"))
}

/// Newest period first.
pub fn list_by_customer(db: &db::Db, customer_id: &str) -> AppResult<Vec<BillRecord>> {
    let conn = db.open_connection()?;
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_BILL} WHERE customer_id = ?1 ORDER BY year DESC, month DESC, id DESC"
        ))
        .map_err(|e| db_err!("failed to prepare bills query: {e}"))?;
    collect_bills(&mut stmt, params![customer_id.trim()])
}

pub fn list_all(db: &db::Db) -> AppResult<Vec<BillRecord>> {
    let conn = db.open_connection()?;
    let mut stmt = conn
        .prepare(&format!("{SELECT_BILL} ORDER BY year DESC, month DESC, id DESC"))
        .map_err(|e| db_err!("failed to prepare bills query: {e}"))?;
    collect_bills(&mut stmt, [])
}

/// Flips `is_paid` false->true exactly once and stamps `paid_at`. Amounts are left as-is.
pub fn mark_paid(db: &db::Db, bill_id: i64) -> AppResult<BillRecord> {
    let conn = db.open_connection()?;
    let now = now_unix_millis();

    let changed = conn
        .execute(
            "UPDATE bills SET is_paid = 1, paid_at = ?1 WHERE id = ?2 AND is_paid = 0",
            params![now, bill_id],
        )
        .map_err(|e| db_err!("failed to mark bill paid: {e}"))?;

    if changed == 0 {
        return match get_by_id_conn(&conn, bill_id)? {
            Some(_) => {
                tracing::warn!(bill_id, "mark paid rejected: bill already paid");
                Err(AppError::new(
                    CODE_BILL_ALREADY_PAID,
                    format!("bill {bill_id} is already paid"),
                ))
            }
            None => Err(not_found("bill not found")),
        };
    }

    let bill = get_by_id_conn(&conn, bill_id)?.ok_or_else(|| not_found("bill not found"))?;
    tracing::info!(
        bill_id,
        customer_id = %bill.customer_id,
        total_amount = bill.total_amount,
        "bill paid"
    );
    Ok(bill)
}

pub fn summarize(bills: &[BillRecord]) -> BillSummary {
    bills.iter().fold(BillSummary::default(), |mut acc, bill| {
        acc.count += 1;
        if bill.is_paid {
            acc.paid_total += bill.total_amount;
        } else {
            acc.unpaid_count += 1;
            acc.outstanding_total += bill.total_amount;
        }
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bill(id: i64, total_amount: f64, is_paid: bool) -> BillRecord {
        BillRecord {
            id,
            customer_id: "CUST001".to_string(),
            usage_id: id,
            month: 11,
            year: 2024,
            usage_kwh: 0.0,
            amount: total_amount - billing::ADMIN_FEE,
            admin_fee: billing::ADMIN_FEE,
            total_amount,
            is_paid,
            paid_at: is_paid.then_some(1),
            due_date: 0,
            created_at: 0,
        }
    }

    #[test]
    fn summarize_splits_paid_and_outstanding() {
        let bills = vec![
            bill(1, 295956.0, false),
            bill(2, 10000.0, true),
            bill(3, 5000.0, false),
        ];
        let summary = summarize(&bills);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.unpaid_count, 2);
        assert!(billing::amounts_match(summary.outstanding_total, 300956.0));
        assert!(billing::amounts_match(summary.paid_total, 10000.0));
    }

    #[test]
    fn summarize_empty_is_zero() {
        assert_eq!(summarize(&[]), BillSummary::default());
    }
}
