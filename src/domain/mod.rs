//! Usage: Domain modules (billing rules and the account/usage/bill use-cases).

pub(crate) mod accounts;
pub mod billing;
pub(crate) mod bills;
pub(crate) mod usage;
