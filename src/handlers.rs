pub mod auth;
pub mod budgets;
pub mod categories;
pub mod health;
pub mod transactions;

use chrono::{NaiveDate, Utc};
use model::entities::{budget::BudgetPeriod, transaction::TransactionKind};
use tracing::warn;

use crate::error::{ApiError, ApiResult};

/// Calendar date the request is evaluated against.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub(crate) fn parse_kind(kind: &str) -> ApiResult<TransactionKind> {
    kind.parse().map_err(|e: String| {
        warn!("{}", e);
        ApiError::BadRequest("Type must be either \"expense\" or \"income\"".to_string())
    })
}

pub(crate) fn parse_period(period: &str) -> ApiResult<BudgetPeriod> {
    period.parse().map_err(|e: String| {
        warn!("{}", e);
        ApiError::BadRequest("Period must be either \"monthly\" or \"yearly\"".to_string())
    })
}

/// Accepts `#rgb` and `#rrggbb`.
pub(crate) fn check_hex_color(color: &str) -> ApiResult<()> {
    let digits = color.strip_prefix('#').unwrap_or("");
    let valid = matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(ApiError::BadRequest(
            "Color must be a valid hex color code".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        assert!(check_hex_color("#007bff").is_ok());
        assert!(check_hex_color("#FFF").is_ok());
        assert!(check_hex_color("007bff").is_err());
        assert!(check_hex_color("#12345").is_err());
        assert!(check_hex_color("#gggggg").is_err());
    }

    #[test]
    fn enum_strings_are_lowercase() {
        assert_eq!(parse_kind("income").unwrap(), TransactionKind::Income);
        assert!(parse_kind("Income").is_err());
        assert_eq!(parse_period("yearly").unwrap(), BudgetPeriod::Yearly);
        assert!(parse_period("weekly").is_err());
    }
}
