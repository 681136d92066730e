mod app;
mod domain;
mod infra;
mod services;
mod shared;

pub(crate) use infra::db;
pub(crate) use shared::blocking;

pub use app::config::AppConfig;
pub use app::logging;
pub use app::BillingApp;
pub use domain::accounts::{Account, AccountInput, AccountUpdate, Role};
pub use domain::billing;
pub use domain::bills::{BillRecord, BillSummary};
pub use domain::usage::{UsageInput, UsageRecord};
pub use infra::db::{DbRuntimeConfig, Synchronous};
pub use infra::session_store::{FileSessionStore, MemorySessionStore, SessionStore, StoredSession};
pub use services::accounts::AccountService;
pub use services::bills::BillService;
pub use services::session::{Scope, Session};
pub use services::usage::UsageService;
pub use shared::error::{AppError, AppResult, ErrorKind};
pub use shared::security::PasswordHasher;
