//! Usage: Billing rules shared by usage submission and bill derivation.

use crate::shared::error::{invalid_input, AppResult};
use crate::shared::time::MILLIS_PER_DAY;

/// Fixed surcharge added to every bill regardless of usage.
pub const ADMIN_FEE: f64 = 2500.0;
pub const DEFAULT_RATE_PER_KWH: f64 = 1467.28;
pub const DEFAULT_DUE_DAYS: i64 = 30;
/// Tolerance used when comparing derived currency amounts.
pub const AMOUNT_TOLERANCE: f64 = 0.01;

const MAX_YEAR: i32 = 9999;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageAmounts {
    pub usage_kwh: f64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillAmounts {
    pub amount: f64,
    pub admin_fee: f64,
    pub total_amount: f64,
}

pub fn validate_readings(previous_reading: f64, current_reading: f64) -> AppResult<()> {
    if !previous_reading.is_finite() || !current_reading.is_finite() {
        return Err(invalid_input("meter readings must be finite numbers"));
    }
    if previous_reading < 0.0 {
        return Err(invalid_input("previous_reading must be >= 0"));
    }
    if current_reading <= previous_reading {
        return Err(invalid_input(format!(
            "current_reading ({current_reading}) must be greater than previous_reading ({previous_reading})"
        )));
    }
    Ok(())
}

pub fn validate_period(month: u32, year: i32) -> AppResult<()> {
    if !(1..=12).contains(&month) {
        return Err(invalid_input(format!("month must be 1..=12, got {month}")));
    }
    if !(1..=MAX_YEAR).contains(&year) {
        return Err(invalid_input(format!("year must be 1..={MAX_YEAR}, got {year}")));
    }
    Ok(())
}

pub fn validate_rate(rate_per_kwh: f64) -> AppResult<()> {
    if !rate_per_kwh.is_finite() || rate_per_kwh <= 0.0 {
        return Err(invalid_input("rate_per_kwh must be a positive number"));
    }
    Ok(())
}

/// Fails with `SEC_INVALID_INPUT` when finite inputs still overflow to a non-finite amount.
pub fn compute_usage(
    previous_reading: f64,
    current_reading: f64,
    rate_per_kwh: f64,
) -> AppResult<UsageAmounts> {
    let usage_kwh = current_reading - previous_reading;
    let total_amount = usage_kwh * rate_per_kwh;
    if !usage_kwh.is_finite() || !total_amount.is_finite() {
        return Err(invalid_input(format!(
            "usage amount out of range: usage_kwh={usage_kwh}, rate_per_kwh={rate_per_kwh}"
        )));
    }
    Ok(UsageAmounts {
        usage_kwh,
        total_amount,
    })
}

/// The bill is a snapshot: `amount` is the usage charge, the admin fee is always added on top.
pub fn compute_bill(usage_total_amount: f64) -> BillAmounts {
    BillAmounts {
        amount: usage_total_amount,
        admin_fee: ADMIN_FEE,
        total_amount: usage_total_amount + ADMIN_FEE,
    }
}

pub fn default_due_date(now_ms: i64) -> i64 {
    now_ms.saturating_add(DEFAULT_DUE_DAYS * MILLIS_PER_DAY)
}

pub fn amounts_match(a: f64, b: f64) -> bool {
    (a - b).abs() <= AMOUNT_TOLERANCE
}

/// Month label as printed on bills and usage cards.
pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "Januari",
        2 => "Februari",
        3 => "Maret",
        4 => "April",
        5 => "Mei",
        6 => "Juni",
        7 => "Juli",
        8 => "Agustus",
        9 => "September",
        10 => "Oktober",
        11 => "November",
        12 => "Desember",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_usage_matches_reference_period() {
        let amounts = compute_usage(1000.0, 1200.0, 1467.28).expect("amounts");
        assert!(amounts_match(amounts.usage_kwh, 200.0));
        assert!(amounts_match(amounts.total_amount, 293456.0));
    }

    #[test]
    fn compute_usage_rejects_overflowing_amounts() {
        let err = compute_usage(0.0, f64::MAX, 2.0).expect_err("total overflows");
        assert_eq!(err.code(), "SEC_INVALID_INPUT");
        assert!(compute_usage(-f64::MAX, f64::MAX, 1.0).is_err());
        assert!(compute_usage(0.0, 1.0e300, 1.0).is_ok());
    }

    #[test]
    fn compute_bill_adds_fixed_admin_fee() {
        let bill = compute_bill(293456.0);
        assert_eq!(bill.admin_fee, ADMIN_FEE);
        assert!(amounts_match(bill.amount, 293456.0));
        assert!(amounts_match(bill.total_amount, 295956.0));
    }

    #[test]
    fn validate_readings_rejects_non_increasing() {
        assert!(validate_readings(1000.0, 1150.0).is_ok());
        let err = validate_readings(1000.0, 1000.0).expect_err("equal readings");
        assert_eq!(err.code(), "SEC_INVALID_INPUT");
        assert!(validate_readings(1000.0, 900.0).is_err());
        assert!(validate_readings(-1.0, 10.0).is_err());
        assert!(validate_readings(f64::NAN, 10.0).is_err());
        assert!(validate_readings(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn validate_period_bounds() {
        assert!(validate_period(1, 2024).is_ok());
        assert!(validate_period(12, 2024).is_ok());
        assert!(validate_period(0, 2024).is_err());
        assert!(validate_period(13, 2024).is_err());
        assert!(validate_period(6, 0).is_err());
    }

    #[test]
    fn validate_rate_requires_positive() {
        assert!(validate_rate(DEFAULT_RATE_PER_KWH).is_ok());
        assert!(validate_rate(0.0).is_err());
        assert!(validate_rate(-5.0).is_err());
        assert!(validate_rate(f64::NAN).is_err());
    }

    #[test]
    fn default_due_date_is_thirty_days_out() {
        assert_eq!(default_due_date(0), 30 * 24 * 60 * 60 * 1000);
    }

    #[test]
    fn month_names() {
        assert_eq!(month_name(1), "Januari");
        assert_eq!(month_name(8), "Agustus");
        assert_eq!(month_name(13), "Unknown");
    }
}
