//! Usage: Account persistence, credential verification, and role mapping.

use crate::db;
use crate::shared::error::{
    db_err, invalid_input, not_found, AppError, AppResult, CODE_DB_CONSTRAINT,
};
use crate::shared::security::PasswordHasher;
use crate::shared::time::now_unix_millis;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

const ROLE_ADMIN: &str = "ADMIN";
const ROLE_CUSTOMER: &str = "CUSTOMER";

/// Admins carry no customer id; customers always carry exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Customer { customer_id: String },
}

impl Role {
    pub fn customer(customer_id: impl Into<String>) -> Self {
        Role::Customer {
            customer_id: customer_id.into(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => ROLE_ADMIN,
            Role::Customer { .. } => ROLE_CUSTOMER,
        }
    }

    pub fn customer_id(&self) -> Option<&str> {
        match self {
            Role::Admin => None,
            Role::Customer { customer_id } => Some(customer_id),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    fn from_columns(role: &str, customer_id: Option<String>) -> Result<Self, String> {
        match (role, customer_id) {
            (ROLE_ADMIN, None) => Ok(Role::Admin),
            (ROLE_ADMIN, Some(_)) => Err("ADMIN account must not carry a customer_id".to_string()),
            (ROLE_CUSTOMER, Some(id)) if !id.trim().is_empty() => {
                Ok(Role::Customer { customer_id: id })
            }
            (ROLE_CUSTOMER, _) => Err("CUSTOMER account is missing its customer_id".to_string()),
            (other, _) => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    #[serde(flatten)]
    pub role: Role,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub created_at: i64,
}

impl Account {
    pub fn customer_id(&self) -> Option<&str> {
        self.role.customer_id()
    }
}

/// Provisioning payload. `id = Some(_)` replaces the row with that id if it exists.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInput {
    #[serde(default)]
    pub id: Option<i64>,
    pub username: String,
    pub password: String,
    #[serde(flatten)]
    pub role: Role,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

/// Contact details and credentials; username and role are fixed at provisioning.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountUpdate {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub password: Option<String>,
}

fn row_to_account(row: &rusqlite::Row<'_>) -> Result<(Account, String), rusqlite::Error> {
    let role_raw: String = row.get("role")?;
    let customer_id: Option<String> = row.get("customer_id")?;
    let role = Role::from_columns(&role_raw, customer_id).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.into())
    })?;

    Ok((
        Account {
            id: row.get("id")?,
            username: row.get("username")?,
            role,
            name: row.get("name")?,
            email: row.get("email")?,
            phone: row.get("phone")?,
            address: row.get("address")?,
            created_at: row.get("created_at")?,
        },
        row.get("password_hash")?,
    ))
}

const SELECT_ACCOUNT: &str = r#"
SELECT
  id,
  username,
  password_hash,
  role,
  customer_id,
  name,
  email,
  phone,
  address,
  created_at
FROM users
"#;

fn get_row_by_id(conn: &Connection, account_id: i64) -> AppResult<Option<(Account, String)>> {
    conn.query_row(
        &format!("{SELECT_ACCOUNT} WHERE id = ?1"),
        params![account_id],
        row_to_account,
    )
    .optional()
    .map_err(|e| db_err!("failed to query account: {e}"))
}

fn get_row_by_username(conn: &Connection, username: &str) -> AppResult<Option<(Account, String)>> {
    conn.query_row(
        &format!("{SELECT_ACCOUNT} WHERE username = ?1 ORDER BY id LIMIT 1"),
        params![username],
        row_to_account,
    )
    .optional()
    .map_err(|e| db_err!("failed to query account by username: {e}"))
}

fn map_write_err(err: rusqlite::Error, username: &str, action: &str) -> AppError {
    if db::is_unique_violation(&err, "users") {
        return AppError::new(
            CODE_DB_CONSTRAINT,
            format!("account already exists for username={username}"),
        );
    }
    db_err!("failed to {action} account: {err}")
}

fn validate_contact(name: &str, email: &str, phone: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(invalid_input("name is required"));
    }
    if email.trim().is_empty() {
        return Err(invalid_input("email is required"));
    }
    if phone.trim().is_empty() {
        return Err(invalid_input("phone is required"));
    }
    Ok(())
}

/// Exact, case-sensitive username match; `None` on unknown user or wrong password.
pub fn authenticate(
    db: &db::Db,
    hasher: &PasswordHasher,
    username: &str,
    password: &str,
) -> AppResult<Option<Account>> {
    let conn = db.open_connection()?;
    match get_row_by_username(&conn, username)? {
        Some((account, hash)) => {
            if hasher.verify(password, &hash) {
                Ok(Some(account))
            } else {
                Ok(None)
            }
        }
        None => {
            hasher.verify_decoy(password);
            Ok(None)
        }
    }
}

pub fn get_by_id(db: &db::Db, account_id: i64) -> AppResult<Option<Account>> {
    let conn = db.open_connection()?;
    Ok(get_row_by_id(&conn, account_id)?.map(|(account, _)| account))
}

pub fn exists_username(db: &db::Db, username: &str) -> AppResult<bool> {
    let conn = db.open_connection()?;
    Ok(get_row_by_username(&conn, username)?.is_some())
}

/// Customers in insertion order.
pub fn list_customers(db: &db::Db) -> AppResult<Vec<Account>> {
    let conn = db.open_connection()?;
    let mut stmt = conn
        .prepare(&format!("{SELECT_ACCOUNT} WHERE role = ?1 ORDER BY id ASC"))
        .map_err(|e| db_err!("failed to prepare customers query: {e}"))?;

    let rows = stmt
        .query_map(params![ROLE_CUSTOMER], row_to_account)
        .map_err(|e| db_err!("failed to list customers: {e}"))?;

    let mut items = Vec::new();
    for row in rows {
        let (account, _) = row.map_err(|e| db_err!("failed to read account row: {e}"))?;
        items.push(account);
    }
    Ok(items)
}

pub fn create(db: &db::Db, hasher: &PasswordHasher, input: AccountInput) -> AppResult<Account> {
    let username = input.username.trim();
    if username.is_empty() {
        return Err(invalid_input("username is required"));
    }
    if input.password.is_empty() {
        return Err(invalid_input("password is required"));
    }
    if let Role::Customer { customer_id } = &input.role {
        if customer_id.trim().is_empty() {
            return Err(invalid_input("customer_id is required for CUSTOMER accounts"));
        }
    }
    validate_contact(&input.name, &input.email, &input.phone)?;

    let password_hash = hasher.hash(&input.password)?;
    let now = now_unix_millis();
    let customer_id = input.role.customer_id().map(|id| id.trim().to_string());

    let conn = db.open_connection()?;
    let id = match input.id {
        Some(id) => {
            conn.execute(
                r#"
INSERT INTO users(
  id,
  username,
  password_hash,
  role,
  customer_id,
  name,
  email,
  phone,
  address,
  created_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
ON CONFLICT(id) DO UPDATE SET
  username = excluded.username,
  password_hash = excluded.password_hash,
  role = excluded.role,
  customer_id = excluded.customer_id,
  name = excluded.name,
  email = excluded.email,
  phone = excluded.phone,
  address = excluded.address
"#,
                params![
                    id,
                    username,
                    password_hash,
                    input.role.as_str(),
                    customer_id,
                    input.name.trim(),
                    input.email.trim(),
                    input.phone.trim(),
                    input.address.trim(),
                    now
                ],
            )
            .map_err(|e| map_write_err(e, username, "upsert"))?;
            id
        }
        None => {
            conn.execute(
                r#"
INSERT INTO users(
  username,
  password_hash,
  role,
  customer_id,
  name,
  email,
  phone,
  address,
  created_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
"#,
                params![
                    username,
                    password_hash,
                    input.role.as_str(),
                    customer_id,
                    input.name.trim(),
                    input.email.trim(),
                    input.phone.trim(),
                    input.address.trim(),
                    now
                ],
            )
            .map_err(|e| map_write_err(e, username, "insert"))?;
            conn.last_insert_rowid()
        }
    };

    tracing::info!(account_id = id, role = input.role.as_str(), "account saved");

    get_row_by_id(&conn, id)?
        .map(|(account, _)| account)
        .ok_or_else(|| not_found("account not found"))
}

pub fn update(
    db: &db::Db,
    hasher: &PasswordHasher,
    account_id: i64,
    update: AccountUpdate,
) -> AppResult<Account> {
    validate_contact(&update.name, &update.email, &update.phone)?;

    let password_hash = match update.password.as_deref() {
        Some("") => return Err(invalid_input("password must not be empty")),
        Some(password) => Some(hasher.hash(password)?),
        None => None,
    };

    let conn = db.open_connection()?;
    let changed = conn
        .execute(
            r#"
UPDATE users
SET
  name = ?1,
  email = ?2,
  phone = ?3,
  address = ?4,
  password_hash = COALESCE(?5, password_hash)
WHERE id = ?6
"#,
            params![
                update.name.trim(),
                update.email.trim(),
                update.phone.trim(),
                update.address.trim(),
                password_hash,
                account_id
            ],
        )
        .map_err(|e| db_err!("failed to update account: {e}"))?;
    if changed == 0 {
        return Err(not_found("account not found"));
    }

    get_row_by_id(&conn, account_id)?
        .map(|(account, _)| account)
        .ok_or_else(|| not_found("account not found"))
}

pub fn delete(db: &db::Db, account_id: i64) -> AppResult<()> {
    let conn = db.open_connection()?;
    let changed = conn
        .execute("DELETE FROM users WHERE id = ?1", params![account_id])
        .map_err(|e| db_err!("failed to delete account: {e}"))?;
    if changed == 0 {
        return Err(not_found("account not found"));
    }
    tracing::info!(account_id, "account deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_from_columns_enforces_customer_pairing() {
        assert_eq!(Role::from_columns("ADMIN", None), Ok(Role::Admin));
        assert_eq!(
            Role::from_columns("CUSTOMER", Some("CUST001".to_string())),
            Ok(Role::customer("CUST001"))
        );
        assert!(Role::from_columns("ADMIN", Some("CUST001".to_string())).is_err());
        assert!(Role::from_columns("CUSTOMER", None).is_err());
        assert!(Role::from_columns("CUSTOMER", Some("  ".to_string())).is_err());
        assert!(Role::from_columns("admin", None).is_err());
    }

    #[test]
    fn role_serializes_with_flat_tag() {
        let value = serde_json::to_value(Role::customer("CUST001")).expect("serialize role");
        assert_eq!(value["role"], "CUSTOMER");
        assert_eq!(value["customer_id"], "CUST001");

        let admin = serde_json::to_value(Role::Admin).expect("serialize admin");
        assert_eq!(admin["role"], "ADMIN");
        assert!(admin.get("customer_id").is_none());
    }

    #[test]
    fn account_input_deserializes_role_fields() {
        let input: AccountInput = serde_json::from_value(serde_json::json!({
            "username": "budi",
            "password": "secret",
            "role": "CUSTOMER",
            "customer_id": "CUST002",
            "name": "Budi",
            "email": "budi@example.com",
            "phone": "0812"
        }))
        .expect("deserialize input");
        assert_eq!(input.role, Role::customer("CUST002"));
        assert_eq!(input.id, None);
        assert_eq!(input.address, "");
    }
}
