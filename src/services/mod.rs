//! Usage: Async service facades; the boundary a presentation layer calls.
//!
//! Each call moves its SQLite work onto the blocking pool via `blocking::run`.

pub mod accounts;
pub mod bills;
pub mod session;
pub mod usage;
