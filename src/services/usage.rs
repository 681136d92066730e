//! Usage: Async usage facade; `submit` also creates the period's bill.

use crate::domain::usage::{self, UsageInput, UsageRecord};
use crate::services::session::Scope;
use crate::shared::error::AppResult;
use crate::{blocking, db};

#[derive(Clone)]
pub struct UsageService {
    db: db::Db,
}

impl UsageService {
    pub(crate) fn new(db: db::Db) -> Self {
        Self { db }
    }

    pub async fn find_by_customer(
        &self,
        customer_id: impl Into<String>,
    ) -> AppResult<Vec<UsageRecord>> {
        let db = self.db.clone();
        let customer_id = customer_id.into();
        blocking::run("usage_find_by_customer", move || {
            usage::list_by_customer(&db, &customer_id)
        })
        .await
    }

    pub async fn find_all(&self) -> AppResult<Vec<UsageRecord>> {
        let db = self.db.clone();
        blocking::run("usage_find_all", move || usage::list_all(&db)).await
    }

    /// Everything for admins, only the customer's own records otherwise.
    pub async fn list_for_scope(&self, scope: &Scope) -> AppResult<Vec<UsageRecord>> {
        match scope {
            Scope::All => self.find_all().await,
            Scope::Customer(customer_id) => self.find_by_customer(customer_id.clone()).await,
        }
    }

    pub async fn find_by_month_year(
        &self,
        customer_id: impl Into<String>,
        month: u32,
        year: i32,
    ) -> AppResult<Option<UsageRecord>> {
        let db = self.db.clone();
        let customer_id = customer_id.into();
        blocking::run("usage_find_by_month_year", move || {
            usage::find_by_month_year(&db, &customer_id, month, year)
        })
        .await
    }

    pub async fn get_by_id(&self, usage_id: i64) -> AppResult<Option<UsageRecord>> {
        let db = self.db.clone();
        blocking::run("usage_get", move || usage::get_by_id(&db, usage_id)).await
    }

    /// Returns the new usage id. The bill is committed together with the usage row.
    pub async fn submit(&self, input: UsageInput) -> AppResult<i64> {
        let db = self.db.clone();
        blocking::run("usage_submit", move || usage::submit(&db, &input)).await
    }

    pub async fn update(&self, usage_id: i64, input: UsageInput) -> AppResult<UsageRecord> {
        let db = self.db.clone();
        blocking::run("usage_update", move || usage::update(&db, usage_id, &input)).await
    }

    pub async fn delete(&self, usage_id: i64) -> AppResult<()> {
        let db = self.db.clone();
        blocking::run("usage_delete", move || usage::delete(&db, usage_id)).await
    }
}
