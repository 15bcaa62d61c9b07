// src/handlers/reports.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{PermReportsRead, RequirePermission},
    },
    models::reports::{DailySales, DepartmentSales, InventoryValuation, SalesSummary, TopItem},
    services::report_service::{resolve_range, ReportRange},
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct RangeQuery {
    /// First day, inclusive. Defaults to 29 days before `to`.
    pub from: Option<NaiveDate>,
    /// Last day, inclusive. Defaults to today (UTC).
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TopItemsQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// At most 50.
    pub limit: Option<i64>,
}

fn range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    locale: &Locale,
    app_state: &AppState,
) -> Result<ReportRange, ApiError> {
    resolve_range(from, to, Utc::now().date_naive()).map_err(|e| e.to_api_error(locale, &app_state.i18n_store))
}

#[utoipa::path(
    get,
    path = "/api/reports/sales-summary",
    tag = "Reports",
    params(RangeQuery),
    responses(
        (status = 200, description = "Totals for the period", body = SalesSummary),
        (status = 400, description = "Invalid date range")
    ),
    security(("api_jwt" = []))
)]
pub async fn sales_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermReportsRead>,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let range = range(query.from, query.to, &locale, &app_state)?;
    let summary = app_state
        .report_service
        .sales_summary(range)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(summary)))
}

#[utoipa::path(
    get,
    path = "/api/reports/daily-sales",
    tag = "Reports",
    params(RangeQuery),
    responses((status = 200, description = "One entry per day with sales", body = Vec<DailySales>)),
    security(("api_jwt" = []))
)]
pub async fn daily_sales(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermReportsRead>,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let range = range(query.from, query.to, &locale, &app_state)?;
    let days = app_state
        .report_service
        .daily_sales(range)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(days)))
}

#[utoipa::path(
    get,
    path = "/api/reports/top-items",
    tag = "Reports",
    params(TopItemsQuery),
    responses((status = 200, description = "Best sellers by quantity", body = Vec<TopItem>)),
    security(("api_jwt" = []))
)]
pub async fn top_items(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermReportsRead>,
    Query(query): Query<TopItemsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let range = range(query.from, query.to, &locale, &app_state)?;
    let items = app_state
        .report_service
        .top_items(range, query.limit)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(items)))
}

#[utoipa::path(
    get,
    path = "/api/reports/departments",
    tag = "Reports",
    params(RangeQuery),
    responses((status = 200, description = "Sales per station", body = Vec<DepartmentSales>)),
    security(("api_jwt" = []))
)]
pub async fn department_sales(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermReportsRead>,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let range = range(query.from, query.to, &locale, &app_state)?;
    let departments = app_state
        .report_service
        .department_sales(range)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(departments)))
}

#[utoipa::path(
    get,
    path = "/api/reports/inventory-valuation",
    tag = "Reports",
    responses((status = 200, description = "Stock value and status counts", body = InventoryValuation)),
    security(("api_jwt" = []))
)]
pub async fn inventory_valuation(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermReportsRead>,
) -> Result<impl IntoResponse, ApiError> {
    let valuation = app_state
        .report_service
        .inventory_valuation()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(valuation)))
}
