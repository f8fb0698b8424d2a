use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// An inclusive date range echoed back by period-scoped queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct DateWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateWindow {
    /// Fills missing bounds with the current calendar month up to `today`.
    pub fn or_month_to_date(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Self {
        Self {
            start_date: start.unwrap_or_else(|| month_start(today)),
            end_date: end.unwrap_or(today),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_month_to_date() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap();
        let window = DateWindow::or_month_to_date(None, None, today);
        assert_eq!(window.start_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(window.end_date, today);

        let explicit_start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let window = DateWindow::or_month_to_date(Some(explicit_start), None, today);
        assert_eq!(window.start_date, explicit_start);
    }
}
