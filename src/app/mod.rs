//! Usage: Composition root wiring config, the SQLite pool, services, and the session.

pub mod config;
pub mod logging;

use crate::app::config::AppConfig;
use crate::infra::session_store::{FileSessionStore, SessionStore};
use crate::services::accounts::AccountService;
use crate::services::bills::BillService;
use crate::services::session::Session;
use crate::services::usage::UsageService;
use crate::shared::error::{AppError, AppResult, CODE_DB_ERROR};
use crate::shared::security::PasswordHasher;
use crate::{blocking, db};
use std::sync::Arc;

pub struct BillingApp {
    config: AppConfig,
    accounts: AccountService,
    usage: UsageService,
    bills: BillService,
    session: Session,
}

impl BillingApp {
    /// Opens the store under `config.data_dir` with a file-backed session.
    pub async fn open(config: AppConfig) -> AppResult<Self> {
        let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(config.session_path()));
        Self::open_with_store(config, store).await
    }

    pub async fn open_with_store(
        config: AppConfig,
        store: Arc<dyn SessionStore>,
    ) -> AppResult<Self> {
        let hasher = Arc::new(PasswordHasher::new(config.password_hash_cost));

        let db = {
            let config = config.clone();
            let hasher = Arc::clone(&hasher);
            blocking::run("db_init", move || -> AppResult<db::Db> {
                std::fs::create_dir_all(&config.data_dir).map_err(|e| {
                    AppError::new(
                        CODE_DB_ERROR,
                        format!("failed to create data dir {}: {e}", config.data_dir.display()),
                    )
                    .with_source(e)
                })?;
                let db = db::init(&config.db_path(), &config.db, &hasher)?;
                if config.seed_demo_data {
                    db::seed::ensure_demo_data(&db, &hasher)?;
                }
                Ok(db)
            })
            .await?
        };

        tracing::info!(
            data_dir = %config.data_dir.display(),
            seed_demo_data = config.seed_demo_data,
            "billing store ready"
        );

        let accounts = AccountService::new(db.clone(), hasher);
        let session = Session::new(accounts.clone(), store);
        Ok(Self {
            usage: UsageService::new(db.clone()),
            bills: BillService::new(db),
            accounts,
            session,
            config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    pub fn usage(&self) -> &UsageService {
        &self.usage
    }

    pub fn bills(&self) -> &BillService {
        &self.bills
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}
