//! Usage: Infrastructure layer (SQLite store and session persistence).

pub(crate) mod db;
pub mod session_store;
