//! Usage: Demo accounts and a sample usage period for first-run installs.

use crate::db::Db;
use crate::domain::accounts::{self, AccountInput, Role};
use crate::domain::usage::{self, UsageInput};
use crate::shared::error::AppResult;
use crate::shared::security::PasswordHasher;

const DEMO_ADMIN_USERNAME: &str = "admin";
const DEMO_CUSTOMER_USERNAME: &str = "customer";
const DEMO_CUSTOMER_ID: &str = "CUST001";
const DEMO_USAGE_MONTH: u32 = 11;
const DEMO_USAGE_YEAR: i32 = 2024;

fn demo_accounts() -> [AccountInput; 2] {
    [
        AccountInput {
            id: None,
            username: DEMO_ADMIN_USERNAME.to_string(),
            password: "admin123".to_string(),
            role: Role::Admin,
            name: "Administrator".to_string(),
            email: "admin@electric.com".to_string(),
            phone: "08123456789".to_string(),
            address: "Kantor PLN".to_string(),
        },
        AccountInput {
            id: None,
            username: DEMO_CUSTOMER_USERNAME.to_string(),
            password: "customer123".to_string(),
            role: Role::customer(DEMO_CUSTOMER_ID),
            name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            phone: "08111111111".to_string(),
            address: "Jl. Contoh No. 123".to_string(),
        },
    ]
}

/// Inserts the demo accounts that are missing by username. Existing rows are never overwritten.
pub(crate) fn ensure_demo_data(db: &Db, hasher: &PasswordHasher) -> AppResult<()> {
    let mut created_accounts = 0usize;
    let mut created_customer = false;
    for input in demo_accounts() {
        if accounts::exists_username(db, &input.username)? {
            continue;
        }
        let account = accounts::create(db, hasher, input)?;
        created_accounts += 1;
        created_customer |= !account.role.is_admin();
    }

    // The sample period ships with the demo customer only; a customer recreated later
    // still skips it when the period already exists.
    let mut created_usage = false;
    if created_customer
        && usage::find_by_month_year(db, DEMO_CUSTOMER_ID, DEMO_USAGE_MONTH, DEMO_USAGE_YEAR)?
            .is_none()
    {
        usage::submit(
            db,
            &UsageInput::new(
                DEMO_CUSTOMER_ID,
                DEMO_USAGE_MONTH,
                DEMO_USAGE_YEAR,
                1000.0,
                1150.0,
            ),
        )?;
        created_usage = true;
    }

    if created_accounts > 0 || created_usage {
        tracing::info!(created_accounts, created_usage, "demo data seeded");
    }
    Ok(())
}
