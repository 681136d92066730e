//! Usage: Signed-in account context (login/logout/restore) and the data scope it grants.

use crate::blocking;
use crate::domain::accounts::{Account, Role};
use crate::infra::session_store::{SessionStore, StoredSession};
use crate::services::accounts::AccountService;
use crate::shared::error::{AppError, AppResult, CODE_AUTH_INVALID_CREDENTIALS};
use crate::shared::mutex_ext::MutexExt;
use std::sync::{Arc, Mutex};

/// Which records a signed-in account may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Customer(String),
}

impl Scope {
    pub fn for_role(role: &Role) -> Self {
        match role {
            Role::Admin => Scope::All,
            Role::Customer { customer_id } => Scope::Customer(customer_id.clone()),
        }
    }

    pub fn allows(&self, customer_id: &str) -> bool {
        match self {
            Scope::All => true,
            Scope::Customer(own) => own == customer_id,
        }
    }
}

/// Holds the current account for this process and mirrors its identity into a
/// [`SessionStore`] so it survives restarts.
pub struct Session {
    accounts: AccountService,
    store: Arc<dyn SessionStore>,
    current: Mutex<Option<Account>>,
}

impl Session {
    pub fn new(accounts: AccountService, store: Arc<dyn SessionStore>) -> Self {
        Self {
            accounts,
            store,
            current: Mutex::new(None),
        }
    }

    /// Wrong credentials fail with `AUTH_INVALID_CREDENTIALS` and leave any existing session as-is.
    pub async fn login(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> AppResult<Account> {
        let Some(account) = self.accounts.authenticate(username, password).await? else {
            tracing::warn!("login rejected: invalid credentials");
            return Err(AppError::new(
                CODE_AUTH_INVALID_CREDENTIALS,
                "invalid username or password",
            ));
        };

        let stored = StoredSession {
            user_id: account.id,
            user_role: account.role.as_str().to_string(),
        };
        let store = Arc::clone(&self.store);
        blocking::run("session_save", move || store.save(&stored)).await?;

        *self.current.lock_or_recover() = Some(account.clone());
        tracing::info!(account_id = account.id, role = account.role.as_str(), "logged in");
        Ok(account)
    }

    pub async fn logout(&self) -> AppResult<()> {
        let store = Arc::clone(&self.store);
        blocking::run("session_clear", move || store.clear()).await?;

        let previous = self.current.lock_or_recover().take();
        if let Some(account) = previous {
            tracing::info!(account_id = account.id, "logged out");
        }
        Ok(())
    }

    /// Resolves the persisted account id without re-checking credentials. A stored id whose
    /// account is gone clears the store and yields `None`.
    pub async fn restore_session(&self) -> AppResult<Option<Account>> {
        let store = Arc::clone(&self.store);
        let Some(stored) = blocking::run("session_load", move || store.load()).await? else {
            return Ok(None);
        };

        let Some(account) = self.accounts.get_by_id(stored.user_id).await? else {
            tracing::warn!(
                account_id = stored.user_id,
                "stored session points at a missing account"
            );
            let store = Arc::clone(&self.store);
            blocking::run("session_clear", move || store.clear()).await?;
            *self.current.lock_or_recover() = None;
            return Ok(None);
        };

        if account.role.as_str() != stored.user_role {
            // Role is re-read from the account row; the stored copy is only refreshed.
            tracing::warn!(
                account_id = account.id,
                stored_role = %stored.user_role,
                role = account.role.as_str(),
                "stored session role is stale"
            );
            let refreshed = StoredSession {
                user_id: account.id,
                user_role: account.role.as_str().to_string(),
            };
            let store = Arc::clone(&self.store);
            blocking::run("session_save", move || store.save(&refreshed)).await?;
        }

        *self.current.lock_or_recover() = Some(account.clone());
        tracing::info!(account_id = account.id, "session restored");
        Ok(Some(account))
    }

    pub fn current(&self) -> Option<Account> {
        self.current.lock_or_recover().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current.lock_or_recover().is_some()
    }

    pub fn scope(&self) -> Option<Scope> {
        self.current
            .lock_or_recover()
            .as_ref()
            .map(|account| Scope::for_role(&account.role))
    }
}
