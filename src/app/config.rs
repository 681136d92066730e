//! Usage: Application configuration resolved from `EBILL_*` environment variables.

use crate::app::logging::{DEFAULT_LOG_FILTER, LOG_DIR_NAME};
use crate::db::{self, DbRuntimeConfig};
use crate::infra::session_store::SESSION_FILE_NAME;
use crate::shared::security::DEFAULT_HASH_COST;
use std::env;
use std::path::PathBuf;

const DATA_DIR_NAME: &str = ".electric-bill";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub seed_demo_data: bool,
    /// bcrypt cost; clamped when the hasher is built.
    pub password_hash_cost: u32,
    pub log_filter: String,
    pub db: DbRuntimeConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_env_get(|key| env::var(key).ok())
    }

    /// Invalid values are ignored and fall back to defaults.
    pub fn from_env_get(mut get: impl FnMut(&str) -> Option<String>) -> Self {
        let data_dir = get("EBILL_DATA_DIR")
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| default_data_dir(get("HOME")));

        let seed_demo_data = get("EBILL_SEED_DEMO_DATA")
            .as_deref()
            .and_then(parse_bool_trimmed)
            .unwrap_or(true);

        let password_hash_cost = get("EBILL_PASSWORD_HASH_COST")
            .as_deref()
            .and_then(db::parse_trimmed::<u32>)
            .unwrap_or(DEFAULT_HASH_COST);

        let log_filter = get("EBILL_LOG")
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Self {
            data_dir,
            seed_demo_data,
            password_hash_cost,
            log_filter,
            db: DbRuntimeConfig::from_env_get(get),
        }
    }

    /// Defaults rooted at `data_dir`, ignoring the environment.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::from_env_get(|_| None)
        }
    }

    pub fn db_path(&self) -> PathBuf {
        db::db_path(&self.data_dir)
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE_NAME)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join(LOG_DIR_NAME)
    }
}

fn default_data_dir(home: Option<String>) -> PathBuf {
    match home.map(|h| h.trim().to_string()).filter(|h| !h.is_empty()) {
        Some(home) => PathBuf::from(home).join(DATA_DIR_NAME),
        None => PathBuf::from(".").join(DATA_DIR_NAME),
    }
}

fn parse_bool_trimmed(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<&str, &str> = vars.iter().copied().collect();
        AppConfig::from_env_get(|key| vars.get(key).map(|v| (*v).to_string()))
    }

    #[test]
    fn defaults_without_env() {
        let cfg = config_from(&[("HOME", "/home/fathi")]);
        assert_eq!(cfg.data_dir, PathBuf::from("/home/fathi/.electric-bill"));
        assert!(cfg.seed_demo_data);
        assert_eq!(cfg.password_hash_cost, DEFAULT_HASH_COST);
        assert_eq!(cfg.log_filter, "info");
        assert_eq!(cfg.db, DbRuntimeConfig::default());
    }

    #[test]
    fn missing_home_uses_working_dir() {
        let cfg = config_from(&[]);
        assert_eq!(cfg.data_dir, PathBuf::from("./.electric-bill"));
    }

    #[test]
    fn parses_env_values() {
        let cfg = config_from(&[
            ("EBILL_DATA_DIR", " /var/lib/ebill "),
            ("EBILL_SEED_DEMO_DATA", "No"),
            ("EBILL_PASSWORD_HASH_COST", " 6 "),
            ("EBILL_LOG", "electric_bill_lib=debug"),
            ("EBILL_DB_POOL_SIZE", "2"),
        ]);
        assert_eq!(cfg.data_dir, PathBuf::from("/var/lib/ebill"));
        assert!(!cfg.seed_demo_data);
        assert_eq!(cfg.password_hash_cost, 6);
        assert_eq!(cfg.log_filter, "electric_bill_lib=debug");
        assert_eq!(cfg.db.pool_size, 2);
    }

    #[test]
    fn ignores_invalid_values() {
        let cfg = config_from(&[
            ("HOME", "/root"),
            ("EBILL_DATA_DIR", "   "),
            ("EBILL_SEED_DEMO_DATA", "maybe"),
            ("EBILL_PASSWORD_HASH_COST", "fast"),
            ("EBILL_LOG", ""),
        ]);
        assert_eq!(cfg.data_dir, PathBuf::from("/root/.electric-bill"));
        assert!(cfg.seed_demo_data);
        assert_eq!(cfg.password_hash_cost, DEFAULT_HASH_COST);
        assert_eq!(cfg.log_filter, "info");
    }

    #[test]
    fn derived_paths_live_under_data_dir() {
        let cfg = AppConfig::with_data_dir("/data");
        assert_eq!(cfg.db_path(), PathBuf::from("/data/electric-bill.db"));
        assert_eq!(cfg.session_path(), PathBuf::from("/data/session.json"));
        assert_eq!(cfg.log_dir(), PathBuf::from("/data/logs"));
    }
}
