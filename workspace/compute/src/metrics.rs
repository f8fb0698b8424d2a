//! Pure derived-metric arithmetic shared by the budget engine and the aggregate queries.

use std::collections::BTreeMap;

use chrono::{Months, NaiveDate};
use model::entities::transaction::TransactionKind;
use rust_decimal::Decimal;

use crate::error::{ComputeError, Result};

/// Smallest amount a transaction or budget may carry (one cent).
pub const MIN_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Spending figures for one budget window.
#[derive(Debug, Clone, PartialEq)]
pub struct SpendingMetrics {
    pub spent: Decimal,
    pub remaining: Decimal,
    pub usage_percentage: Decimal,
    pub transaction_count: u64,
}

impl SpendingMetrics {
    pub fn new(budgeted: Decimal, spent: Decimal, transaction_count: u64) -> Self {
        let spent = normalize_amount(spent);
        Self {
            remaining: budgeted - spent,
            usage_percentage: usage_percentage(spent, budgeted),
            spent,
            transaction_count,
        }
    }
}

/// `spent / budgeted * 100`, rounded to two places. Zero when nothing was budgeted.
pub fn usage_percentage(spent: Decimal, budgeted: Decimal) -> Decimal {
    if budgeted <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (spent / budgeted * Decimal::ONE_HUNDRED).round_dp(2)
}

/// Accepts amounts of at least [`MIN_AMOUNT`] with at most two decimal places.
pub fn check_amount(amount: Decimal) -> Result<()> {
    if amount < MIN_AMOUNT {
        return Err(ComputeError::Validation("Amount must be at least 0.01".to_string()));
    }
    if amount.normalize().scale() > 2 {
        return Err(ComputeError::Validation(
            "Amount must have at most two decimal places".to_string(),
        ));
    }
    Ok(())
}

/// Money is kept at cent precision everywhere.
pub fn normalize_amount(amount: Decimal) -> Decimal {
    amount.round_dp(2)
}

pub fn average(total: Decimal, count: u64) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        (total / Decimal::from(count)).round_dp(2)
    }
}

/// Calendar month label, e.g. `2024-01`.
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// First date still inside a window of the trailing `months` months ending at `today`.
pub fn trailing_start(today: NaiveDate, months: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

/// Per-month, per-kind totals.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyBucket {
    pub month: String,
    pub kind: TransactionKind,
    pub transaction_count: u64,
    pub total_amount: Decimal,
}

/// Groups `(date, kind, amount)` rows into month buckets, most recent month first.
pub fn bucket_by_month<I>(rows: I) -> Vec<MonthlyBucket>
where
    I: IntoIterator<Item = (NaiveDate, TransactionKind, Decimal)>,
{
    let mut grouped: BTreeMap<(String, TransactionKind), (u64, Decimal)> = BTreeMap::new();
    for (date, kind, amount) in rows {
        let entry = grouped
            .entry((month_key(date), kind))
            .or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += amount;
    }

    let mut buckets: Vec<MonthlyBucket> = grouped
        .into_iter()
        .map(|((month, kind), (count, total))| MonthlyBucket {
            month,
            kind,
            transaction_count: count,
            total_amount: normalize_amount(total),
        })
        .collect();

    buckets.sort_by(|a, b| b.month.cmp(&a.month).then(a.kind.cmp(&b.kind)));
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn metrics_follow_the_formula() {
        let metrics = SpendingMetrics::new(dec("500.00"), dec("250.50"), 3);
        assert_eq!(metrics.spent, dec("250.50"));
        assert_eq!(metrics.remaining, dec("249.50"));
        assert_eq!(metrics.usage_percentage, dec("50.1"));
        assert_eq!(metrics.transaction_count, 3);
    }

    #[test]
    fn overspending_goes_negative_and_above_hundred() {
        let metrics = SpendingMetrics::new(dec("100.00"), dec("125.00"), 2);
        assert_eq!(metrics.remaining, dec("-25.00"));
        assert_eq!(metrics.usage_percentage, dec("125"));
    }

    #[test]
    fn zero_budget_never_divides() {
        assert_eq!(usage_percentage(dec("10.00"), Decimal::ZERO), Decimal::ZERO);
        let metrics = SpendingMetrics::new(Decimal::ZERO, dec("42.00"), 1);
        assert_eq!(metrics.usage_percentage, Decimal::ZERO);
        assert_eq!(metrics.remaining, dec("-42.00"));
    }

    #[test]
    fn usage_rounds_to_two_places() {
        assert_eq!(usage_percentage(dec("1.00"), dec("3.00")), dec("33.33"));
    }

    #[test]
    fn amounts_must_be_whole_cents() {
        assert!(check_amount(dec("0.01")).is_ok());
        assert!(check_amount(dec("12.30")).is_ok());
        assert!(check_amount(dec("12.3400")).is_ok());
        assert!(check_amount(dec("7")).is_ok());

        for bad in ["0", "-1.00", "0.001", "0.009", "12.345"] {
            assert!(
                matches!(check_amount(dec(bad)), Err(ComputeError::Validation(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn average_of_nothing_is_zero() {
        assert_eq!(average(dec("10"), 0), Decimal::ZERO);
        assert_eq!(average(dec("10"), 4), dec("2.5"));
    }

    #[test]
    fn trailing_start_clamps_to_month_end() {
        assert_eq!(trailing_start(date(2024, 3, 31), 1), date(2024, 2, 29));
        assert_eq!(trailing_start(date(2024, 6, 15), 6), date(2023, 12, 15));
    }

    #[test]
    fn buckets_are_most_recent_first() {
        let buckets = bucket_by_month(vec![
            (date(2024, 1, 3), TransactionKind::Expense, dec("10.00")),
            (date(2024, 2, 1), TransactionKind::Income, dec("100.00")),
            (date(2024, 1, 20), TransactionKind::Expense, dec("5.50")),
            (date(2024, 2, 9), TransactionKind::Expense, dec("1.00")),
        ]);

        let keys: Vec<(&str, TransactionKind)> =
            buckets.iter().map(|b| (b.month.as_str(), b.kind)).collect();
        assert_eq!(
            keys,
            vec![
                ("2024-02", TransactionKind::Expense),
                ("2024-02", TransactionKind::Income),
                ("2024-01", TransactionKind::Expense),
            ]
        );
        assert_eq!(buckets[2].transaction_count, 2);
        assert_eq!(buckets[2].total_amount, dec("15.50"));
    }
}
