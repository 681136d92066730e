//! Usage: Cross-cutting helpers (errors, blocking offload, hashing, time).

pub(crate) mod blocking;
pub(crate) mod error;
pub(crate) mod mutex_ext;
pub(crate) mod security;
pub(crate) mod time;
