// src/handlers/orders.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    db::order_repo::OrderFilter,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermOrdersPrepare, PermOrdersRead, PermOrdersWrite, PermPrintersWrite, RequirePermission},
    },
    models::{
        menu::Department,
        orders::{DepartmentStatus, OrderDetail, OrderPage, OrderStatus, QueueEntry},
        printers::PrintResult,
    },
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
    /// Inclusive lower bound on `createdAt`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `createdAt`.
    pub to: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusPayload {
    pub status: OrderStatus,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentStatusPayload {
    pub status: DepartmentStatus,
}

#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "Orders",
    params(ListOrdersQuery),
    responses((status = 200, description = "Orders, newest first", body = OrderPage)),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermOrdersRead>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = OrderFilter { status: query.status, from: query.from, to: query.to };
    let page = app_state
        .order_service
        .list_orders(&filter, query.page, query.per_page)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(page)))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with lines and departments", body = OrderDetail),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermOrdersRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .order_service
        .get_order(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(order)))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/status",
    tag = "Orders",
    request_body = UpdateStatusPayload,
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Status changed", body = OrderDetail),
        (status = 409, description = "Transition not allowed")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermOrdersWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let order = app_state
        .order_service
        .update_status(id, payload.status, payload.reason.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(order)))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/departments/{department}",
    tag = "Orders",
    request_body = DepartmentStatusPayload,
    params(
        ("id" = Uuid, Path, description = "Order id"),
        ("department" = Department, Path, description = "Station")
    ),
    responses(
        (status = 200, description = "Department progress saved", body = OrderDetail),
        (status = 403, description = "Another station's department"),
        (status = 409, description = "Order not in preparation or transition not allowed")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_department_status(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequirePermission<PermOrdersPrepare>,
    Path((id, department)): Path<(Uuid, Department)>,
    Json(payload): Json<DepartmentStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .order_service
        .update_department_status(&actor, id, department, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(order)))
}

#[utoipa::path(
    get,
    path = "/api/orders/queue/{department}",
    tag = "Orders",
    params(("department" = Department, Path, description = "Station")),
    responses((status = 200, description = "Open work for the station, oldest first", body = Vec<QueueEntry>)),
    security(("api_jwt" = []))
)]
pub async fn department_queue(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermOrdersRead>,
    Path(department): Path<Department>,
) -> Result<impl IntoResponse, ApiError> {
    let queue = app_state
        .order_service
        .department_queue(department)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(queue)))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/print",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses((status = 200, description = "One result per printer", body = Vec<PrintResult>)),
    security(("api_jwt" = []))
)]
pub async fn print_order(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermPrintersWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let results = app_state
        .printing_service
        .print_order(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(results)))
}
