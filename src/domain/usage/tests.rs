use super::*;
use crate::shared::security::{PasswordHasher, MIN_HASH_COST};

fn open_db(dir: &tempfile::TempDir) -> db::Db {
    db::init(
        &db::db_path(dir.path()),
        &db::DbRuntimeConfig::default(),
        &PasswordHasher::new(MIN_HASH_COST),
    )
    .expect("init db")
}

#[test]
fn submit_derives_usage_and_bill() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = open_db(&dir);

    let usage_id =
        submit(&db, &UsageInput::new("CUST001", 12, 2024, 1000.0, 1200.0)).expect("submit");

    let usage = get_by_id(&db, usage_id).expect("get").expect("usage exists");
    assert!(billing::amounts_match(usage.usage_kwh, 200.0));
    assert!(billing::amounts_match(usage.total_amount, 293456.0));
    assert!(!usage.is_paid);
    assert!(usage.due_date > usage.created_at);

    let bill = bills::find_by_usage(&db, usage_id)
        .expect("find bill")
        .expect("bill exists");
    assert_eq!(bill.customer_id, "CUST001");
    assert_eq!((bill.month, bill.year), (12, 2024));
    assert!(billing::amounts_match(bill.usage_kwh, 200.0));
    assert!(billing::amounts_match(bill.amount, 293456.0));
    assert_eq!(bill.admin_fee, billing::ADMIN_FEE);
    assert!(billing::amounts_match(bill.total_amount, 295956.0));
    assert!(!bill.is_paid);
    assert_eq!(bill.paid_at, None);
    assert_eq!(bill.due_date, usage.due_date);
}

#[test]
fn submit_trims_customer_id_and_keeps_explicit_due_date() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = open_db(&dir);

    let input = UsageInput::new("  CUST002 ", 1, 2025, 0.0, 10.0)
        .with_rate(1000.0)
        .with_due_date(1_700_000_000_000);
    let usage_id = submit(&db, &input).expect("submit");

    let usage = get_by_id(&db, usage_id).expect("get").expect("usage exists");
    assert_eq!(usage.customer_id, "CUST002");
    assert_eq!(usage.due_date, 1_700_000_000_000);
    assert!(billing::amounts_match(usage.total_amount, 10000.0));
}

#[test]
fn submit_rejects_invalid_input_without_writing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = open_db(&dir);

    let cases = [
        UsageInput::new("CUST001", 11, 2024, 1000.0, 1000.0),
        UsageInput::new("CUST001", 11, 2024, 1000.0, 900.0),
        UsageInput::new("CUST001", 0, 2024, 0.0, 10.0),
        UsageInput::new("CUST001", 13, 2024, 0.0, 10.0),
        UsageInput::new("   ", 11, 2024, 0.0, 10.0),
        UsageInput::new("CUST001", 11, 2024, 0.0, 10.0).with_rate(0.0),
    ];
    for input in &cases {
        let err = submit(&db, input).expect_err("invalid input");
        assert_eq!(err.code(), "SEC_INVALID_INPUT", "{input:?}");
    }

    assert!(list_all(&db).expect("list usage").is_empty());
    assert!(bills::list_all(&db).expect("list bills").is_empty());
}

#[test]
fn submit_rejects_duplicate_period_and_keeps_first_bill() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = open_db(&dir);

    submit(&db, &UsageInput::new("CUST001", 11, 2024, 1000.0, 1150.0)).expect("first submit");
    let err = submit(&db, &UsageInput::new("CUST001", 11, 2024, 1150.0, 1300.0))
        .expect_err("duplicate period");
    assert_eq!(err.code(), CODE_USAGE_PERIOD_CONFLICT);

    assert_eq!(list_by_customer(&db, "CUST001").expect("list").len(), 1);
    assert_eq!(bills::list_by_customer(&db, "CUST001").expect("bills").len(), 1);

    // Same period for a different customer is fine.
    submit(&db, &UsageInput::new("CUST002", 11, 2024, 0.0, 50.0)).expect("other customer");
}

#[test]
fn list_orders_newest_period_first() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = open_db(&dir);

    submit(&db, &UsageInput::new("CUST001", 11, 2024, 0.0, 10.0)).expect("nov");
    submit(&db, &UsageInput::new("CUST001", 2, 2025, 30.0, 40.0)).expect("feb");
    submit(&db, &UsageInput::new("CUST001", 12, 2024, 10.0, 30.0)).expect("dec");

    let periods: Vec<(u32, i32)> = list_by_customer(&db, "CUST001")
        .expect("list")
        .into_iter()
        .map(|u| (u.month, u.year))
        .collect();
    assert_eq!(periods, vec![(2, 2025), (12, 2024), (11, 2024)]);
}

#[test]
fn find_by_month_year_is_scoped_to_customer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = open_db(&dir);

    submit(&db, &UsageInput::new("CUST001", 5, 2025, 0.0, 100.0)).expect("submit");

    assert!(find_by_month_year(&db, "CUST001", 5, 2025).expect("find").is_some());
    assert!(find_by_month_year(&db, "CUST002", 5, 2025).expect("find").is_none());
    assert!(find_by_month_year(&db, "CUST001", 6, 2025).expect("find").is_none());
}

#[test]
fn update_recomputes_usage_but_leaves_bill_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = open_db(&dir);

    let usage_id =
        submit(&db, &UsageInput::new("CUST001", 3, 2025, 1000.0, 1200.0)).expect("submit");
    let bill_before = bills::find_by_usage(&db, usage_id).expect("find").expect("bill");
    let due_before = get_by_id(&db, usage_id).expect("get").expect("usage").due_date;

    let updated = update(&db, usage_id, &UsageInput::new("CUST001", 3, 2025, 1000.0, 1100.0))
        .expect("update");
    assert!(billing::amounts_match(updated.usage_kwh, 100.0));
    assert!(billing::amounts_match(updated.total_amount, 146728.0));
    assert_eq!(updated.due_date, due_before);

    let bill_after = bills::find_by_usage(&db, usage_id).expect("find").expect("bill");
    assert_eq!(bill_after, bill_before);
}

#[test]
fn update_rejects_moving_onto_taken_period() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = open_db(&dir);

    submit(&db, &UsageInput::new("CUST001", 1, 2025, 0.0, 10.0)).expect("jan");
    let feb = submit(&db, &UsageInput::new("CUST001", 2, 2025, 10.0, 20.0)).expect("feb");

    let err = update(&db, feb, &UsageInput::new("CUST001", 1, 2025, 10.0, 20.0))
        .expect_err("period taken");
    assert_eq!(err.code(), CODE_USAGE_PERIOD_CONFLICT);

    // Re-saving the same period on the same row is allowed.
    update(&db, feb, &UsageInput::new("CUST001", 2, 2025, 10.0, 25.0)).expect("same period");
}

#[test]
fn update_and_delete_unknown_usage_are_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = open_db(&dir);

    let err = update(&db, 999, &UsageInput::new("CUST001", 1, 2025, 0.0, 10.0))
        .expect_err("missing usage");
    assert_eq!(err.code(), "DB_NOT_FOUND");

    let err = delete(&db, 999).expect_err("missing usage");
    assert_eq!(err.code(), "DB_NOT_FOUND");
}

#[test]
fn delete_removes_usage_and_keeps_bill() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = open_db(&dir);

    let usage_id =
        submit(&db, &UsageInput::new("CUST001", 4, 2025, 0.0, 10.0)).expect("submit");
    delete(&db, usage_id).expect("delete");

    assert!(get_by_id(&db, usage_id).expect("get").is_none());
    assert!(bills::find_by_usage(&db, usage_id).expect("find").is_some());

    // The period frees up once its usage row is gone.
    submit(&db, &UsageInput::new("CUST001", 4, 2025, 0.0, 12.0)).expect("resubmit");
}

#[test]
fn usage_input_deserializes_with_defaults() {
    let input: UsageInput = serde_json::from_value(serde_json::json!({
        "customer_id": "CUST001",
        "month": 11,
        "year": 2024,
        "previous_reading": 1000.0,
        "current_reading": 1150.0
    }))
    .expect("deserialize");
    assert_eq!(input.rate_per_kwh, DEFAULT_RATE_PER_KWH);
    assert_eq!(input.due_date, None);
}
