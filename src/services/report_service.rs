// src/services/report_service.rs

use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::{
    common::error::AppError,
    db::ReportRepository,
    models::reports::{DailySales, DepartmentSales, InventoryValuation, SalesSummary, TopItem},
};

const DEFAULT_DAYS: u64 = 30;
const MAX_DAYS: i64 = 366;
const MAX_TOP_ITEMS: i64 = 50;

/// Inclusive calendar range, resolved to the half-open UTC interval
/// `[from 00:00, to + 1 day 00:00)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

pub fn resolve_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<ReportRange, AppError> {
    let to = to.unwrap_or(today);
    let from = match from {
        Some(from) => from,
        None => to
            .checked_sub_days(Days::new(DEFAULT_DAYS - 1))
            .ok_or(AppError::InvalidDateRange)?,
    };

    if from > to || (to - from).num_days() + 1 > MAX_DAYS {
        return Err(AppError::InvalidDateRange);
    }

    let end = to.checked_add_days(Days::new(1)).ok_or(AppError::InvalidDateRange)?;
    Ok(ReportRange {
        from: from.and_time(chrono::NaiveTime::MIN).and_utc(),
        to: end.and_time(chrono::NaiveTime::MIN).and_utc(),
    })
}

pub fn clamp_top_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(10).clamp(1, MAX_TOP_ITEMS)
}

#[derive(Clone)]
pub struct ReportService {
    report_repo: ReportRepository,
}

impl ReportService {
    pub fn new(report_repo: ReportRepository) -> Self {
        Self { report_repo }
    }

    pub async fn sales_summary(&self, range: ReportRange) -> Result<SalesSummary, AppError> {
        self.report_repo.sales_summary(range.from, range.to).await
    }

    pub async fn daily_sales(&self, range: ReportRange) -> Result<Vec<DailySales>, AppError> {
        self.report_repo.daily_sales(range.from, range.to).await
    }

    pub async fn top_items(&self, range: ReportRange, limit: Option<i64>) -> Result<Vec<TopItem>, AppError> {
        self.report_repo
            .top_items(range.from, range.to, clamp_top_limit(limit))
            .await
    }

    pub async fn department_sales(&self, range: ReportRange) -> Result<Vec<DepartmentSales>, AppError> {
        self.report_repo.department_sales(range.from, range.to).await
    }

    pub async fn inventory_valuation(&self) -> Result<InventoryValuation, AppError> {
        self.report_repo.inventory_valuation().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn defaults_to_the_last_thirty_days() {
        let range = resolve_range(None, None, day(2025, 3, 31)).unwrap();
        assert_eq!(range.from.date_naive(), day(2025, 3, 2));
        assert_eq!(range.to.date_naive(), day(2025, 4, 1));
    }

    #[test]
    fn the_end_date_is_included() {
        let range = resolve_range(Some(day(2025, 1, 1)), Some(day(2025, 1, 1)), day(2025, 6, 1)).unwrap();
        assert_eq!((range.to - range.from).num_hours(), 24);
    }

    #[test]
    fn reversed_or_too_long_ranges_are_rejected() {
        let today = day(2025, 6, 1);
        assert!(matches!(
            resolve_range(Some(day(2025, 2, 1)), Some(day(2025, 1, 1)), today),
            Err(AppError::InvalidDateRange)
        ));
        // 2024 is a leap year: 366 days is the maximum
        assert!(resolve_range(Some(day(2024, 1, 1)), Some(day(2024, 12, 31)), today).is_ok());
        assert!(resolve_range(Some(day(2024, 1, 1)), Some(day(2025, 1, 1)), today).is_err());
    }

    #[test]
    fn top_item_limit_is_capped() {
        assert_eq!(clamp_top_limit(None), 10);
        assert_eq!(clamp_top_limit(Some(500)), 50);
        assert_eq!(clamp_top_limit(Some(0)), 1);
    }
}
