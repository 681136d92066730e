//! Usage: Async account facade (authentication, customer listing, provisioning).

use crate::domain::accounts::{self, Account, AccountInput, AccountUpdate};
use crate::shared::error::AppResult;
use crate::shared::security::PasswordHasher;
use crate::{blocking, db};
use std::sync::Arc;

#[derive(Clone)]
pub struct AccountService {
    db: db::Db,
    hasher: Arc<PasswordHasher>,
}

impl AccountService {
    pub(crate) fn new(db: db::Db, hasher: Arc<PasswordHasher>) -> Self {
        Self { db, hasher }
    }

    /// `Ok(None)` when the username is unknown or the password does not verify.
    pub async fn authenticate(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> AppResult<Option<Account>> {
        let db = self.db.clone();
        let hasher = Arc::clone(&self.hasher);
        let username = username.into();
        let password = password.into();
        blocking::run("account_authenticate", move || {
            accounts::authenticate(&db, &hasher, &username, &password)
        })
        .await
    }

    pub async fn list_customers(&self) -> AppResult<Vec<Account>> {
        let db = self.db.clone();
        blocking::run("account_list_customers", move || accounts::list_customers(&db)).await
    }

    pub async fn get_by_id(&self, account_id: i64) -> AppResult<Option<Account>> {
        let db = self.db.clone();
        blocking::run("account_get", move || accounts::get_by_id(&db, account_id)).await
    }

    pub async fn create(&self, input: AccountInput) -> AppResult<Account> {
        let db = self.db.clone();
        let hasher = Arc::clone(&self.hasher);
        blocking::run("account_create", move || accounts::create(&db, &hasher, input)).await
    }

    pub async fn update(&self, account_id: i64, update: AccountUpdate) -> AppResult<Account> {
        let db = self.db.clone();
        let hasher = Arc::clone(&self.hasher);
        blocking::run("account_update", move || {
            accounts::update(&db, &hasher, account_id, update)
        })
        .await
    }

    pub async fn delete(&self, account_id: i64) -> AppResult<()> {
        let db = self.db.clone();
        blocking::run("account_delete", move || accounts::delete(&db, account_id)).await
    }
}
