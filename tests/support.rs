#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use electric_bill_lib::{AppConfig, BillingApp, SessionStore};
use tempfile::TempDir;

pub const TEST_HASH_COST: &str = "4";

pub struct TestApp {
    dir: TempDir,
    seed_demo_data: bool,
    app: BillingApp,
}

impl TestApp {
    /// Empty store: no demo accounts, no sample usage.
    pub async fn new() -> Self {
        Self::open(tempfile::tempdir().expect("tempdir"), false).await
    }

    /// Store seeded with the demo admin/customer and the CUST001 11/2024 sample.
    pub async fn seeded() -> Self {
        Self::open(tempfile::tempdir().expect("tempdir"), true).await
    }

    async fn open(dir: TempDir, seed_demo_data: bool) -> Self {
        let config = config_for(&dir, seed_demo_data);
        let app = BillingApp::open(config).await.expect("open billing app");
        Self {
            dir,
            seed_demo_data,
            app,
        }
    }

    /// Simulates a process restart on the same data dir.
    pub async fn reopen(self) -> Self {
        let Self {
            dir,
            seed_demo_data,
            app,
        } = self;
        drop(app);
        Self::open(dir, seed_demo_data).await
    }

    pub async fn open_with_store(store: Arc<dyn SessionStore>) -> (TempDir, BillingApp) {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config_for(&dir, true);
        let app = BillingApp::open_with_store(config, store)
            .await
            .expect("open billing app");
        (dir, app)
    }

    pub fn dir(&self) -> &std::path::Path {
        self.dir.path()
    }

    pub fn app(&self) -> &BillingApp {
        &self.app
    }
}

pub fn config_for(dir: &TempDir, seed_demo_data: bool) -> AppConfig {
    let vars: HashMap<&str, String> = HashMap::from([
        ("EBILL_DATA_DIR", dir.path().to_string_lossy().into_owned()),
        ("EBILL_SEED_DEMO_DATA", seed_demo_data.to_string()),
        ("EBILL_PASSWORD_HASH_COST", TEST_HASH_COST.to_string()),
    ]);
    AppConfig::from_env_get(|key| vars.get(key).cloned())
}

pub fn approx(actual: f64, expected: f64) -> bool {
    electric_bill_lib::billing::amounts_match(actual, expected)
}
