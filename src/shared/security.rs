//! Usage: Security-sensitive helpers (salted password hashing and verification).

use crate::shared::error::{invalid_input, AppError, AppResult, CODE_INTERNAL};
use std::sync::OnceLock;

pub const MIN_HASH_COST: u32 = 4;
pub const MAX_HASH_COST: u32 = 31;
pub const DEFAULT_HASH_COST: u32 = bcrypt::DEFAULT_COST;
/// bcrypt ignores input past this many bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// bcrypt wrapper. The salt is embedded in the produced hash string.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    // Hash compared against when a username is unknown so both paths pay one verify.
    decoy: OnceLock<Option<String>>,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_HASH_COST, MAX_HASH_COST),
            decoy: OnceLock::new(),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Passwords longer than [`MAX_PASSWORD_BYTES`] are rejected with `SEC_INVALID_INPUT`
    /// rather than silently truncated.
    pub fn hash(&self, password: &str) -> AppResult<String> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(invalid_input(format!(
                "password must be at most {MAX_PASSWORD_BYTES} bytes"
            )));
        }
        bcrypt::hash(password, self.cost).map_err(|e| {
            AppError::new(CODE_INTERNAL, "failed to hash password").with_source(e)
        })
    }

    /// Returns false for malformed hashes instead of failing; a corrupt row must not
    /// surface as a different error than a wrong password.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        // A longer candidate could only match through truncation.
        if password.len() > MAX_PASSWORD_BYTES {
            return false;
        }
        match bcrypt::verify(password, hash) {
            Ok(ok) => ok,
            Err(err) => {
                tracing::warn!("password hash verification failed: {err}");
                false
            }
        }
    }

    pub(crate) fn verify_decoy(&self, password: &str) {
        let decoy = self
            .decoy
            .get_or_init(|| bcrypt::hash("decoy-password", self.cost).ok());
        if let Some(hash) = decoy {
            let _ = bcrypt::verify(password, hash);
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_COST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_accepts_same_password() {
        let hasher = PasswordHasher::new(MIN_HASH_COST);
        let hash = hasher.hash("admin123").expect("hash");
        assert_ne!(hash, "admin123");
        assert!(hasher.verify("admin123", &hash));
        assert!(!hasher.verify("Admin123", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let hasher = PasswordHasher::new(MIN_HASH_COST);
        let a = hasher.hash("same").expect("hash a");
        let b = hasher.hash("same").expect("hash b");
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_never_verifies() {
        let hasher = PasswordHasher::new(MIN_HASH_COST);
        assert!(!hasher.verify("admin123", "admin123"));
    }

    #[test]
    fn overlong_passwords_are_rejected_not_truncated() {
        let hasher = PasswordHasher::new(MIN_HASH_COST);
        let at_limit = "a".repeat(MAX_PASSWORD_BYTES);
        let hash = hasher.hash(&at_limit).expect("hash at limit");
        assert!(hasher.verify(&at_limit, &hash));
        assert!(!hasher.verify(&format!("{at_limit}WRONG"), &hash));

        let err = hasher
            .hash(&format!("{at_limit}SECRET"))
            .expect_err("overlong password");
        assert_eq!(err.code(), "SEC_INVALID_INPUT");
    }

    #[test]
    fn cost_is_clamped() {
        assert_eq!(PasswordHasher::new(1).cost(), MIN_HASH_COST);
        assert_eq!(PasswordHasher::new(99).cost(), MAX_HASH_COST);
    }
}
