//! Usage: Async bill facade (listing, payment, totals).

use crate::domain::bills::{self, BillRecord, BillSummary};
use crate::services::session::Scope;
use crate::shared::error::AppResult;
use crate::{blocking, db};

#[derive(Clone)]
pub struct BillService {
    db: db::Db,
}

impl BillService {
    pub(crate) fn new(db: db::Db) -> Self {
        Self { db }
    }

    pub async fn find_by_customer(
        &self,
        customer_id: impl Into<String>,
    ) -> AppResult<Vec<BillRecord>> {
        let db = self.db.clone();
        let customer_id = customer_id.into();
        blocking::run("bill_find_by_customer", move || {
            bills::list_by_customer(&db, &customer_id)
        })
        .await
    }

    pub async fn find_all(&self) -> AppResult<Vec<BillRecord>> {
        let db = self.db.clone();
        blocking::run("bill_find_all", move || bills::list_all(&db)).await
    }

    pub async fn list_for_scope(&self, scope: &Scope) -> AppResult<Vec<BillRecord>> {
        match scope {
            Scope::All => self.find_all().await,
            Scope::Customer(customer_id) => self.find_by_customer(customer_id.clone()).await,
        }
    }

    pub async fn get_by_id(&self, bill_id: i64) -> AppResult<Option<BillRecord>> {
        let db = self.db.clone();
        blocking::run("bill_get", move || bills::get_by_id(&db, bill_id)).await
    }

    pub async fn find_by_usage(&self, usage_id: i64) -> AppResult<Option<BillRecord>> {
        let db = self.db.clone();
        blocking::run("bill_find_by_usage", move || bills::find_by_usage(&db, usage_id)).await
    }

    /// Fails with `BILL_ALREADY_PAID` when the bill was paid before, `DB_NOT_FOUND` for unknown ids.
    pub async fn mark_paid(&self, bill_id: i64) -> AppResult<BillRecord> {
        let db = self.db.clone();
        blocking::run("bill_mark_paid", move || bills::mark_paid(&db, bill_id)).await
    }

    pub async fn summary_for_scope(&self, scope: &Scope) -> AppResult<BillSummary> {
        let items = self.list_for_scope(scope).await?;
        Ok(bills::summarize(&items))
    }
}
