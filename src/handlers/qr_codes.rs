// src/handlers/qr_codes.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{PermSettingsWrite, RequirePermission},
    },
    models::qr::{QrFormat, TableQr},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableQrPayload {
    #[validate(length(min = 1, max = 80, message = "The label is required."))]
    #[schema(example = "Terrace 4")]
    pub label: String,
    #[validate(range(min = 1, max = 9999, message = "The table number must be positive."))]
    pub table_number: i32,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RenderQuery {
    #[serde(default)]
    pub format: QrFormat,
    /// Side in pixels, clamped to 64..=1024.
    pub size: Option<u32>,
}

fn image_response(format: QrFormat, bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, format.content_type())], bytes).into_response()
}

#[utoipa::path(
    get,
    path = "/api/qr-codes",
    tag = "QR Codes",
    responses((status = 200, description = "Table QR codes", body = Vec<TableQr>)),
    security(("api_jwt" = []))
)]
pub async fn list_qr_codes(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermSettingsWrite>,
) -> Result<impl IntoResponse, ApiError> {
    let codes = app_state
        .qr_service
        .list()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(codes)))
}

#[utoipa::path(
    post,
    path = "/api/qr-codes",
    tag = "QR Codes",
    request_body = TableQrPayload,
    responses(
        (status = 201, description = "QR code created", body = TableQr),
        (status = 409, description = "Table already has a code")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_qr_code(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermSettingsWrite>,
    Json(payload): Json<TableQrPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let qr = app_state
        .qr_service
        .create(&payload.label, payload.table_number)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(qr)))
}

#[utoipa::path(
    put,
    path = "/api/qr-codes/{id}",
    tag = "QR Codes",
    request_body = TableQrPayload,
    params(("id" = Uuid, Path, description = "QR code id")),
    responses((status = 200, description = "QR code updated", body = TableQr)),
    security(("api_jwt" = []))
)]
pub async fn update_qr_code(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermSettingsWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TableQrPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let qr = app_state
        .qr_service
        .update(id, &payload.label, payload.table_number)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(qr)))
}

#[utoipa::path(
    delete,
    path = "/api/qr-codes/{id}",
    tag = "QR Codes",
    params(("id" = Uuid, Path, description = "QR code id")),
    responses((status = 204, description = "QR code deleted")),
    security(("api_jwt" = []))
)]
pub async fn delete_qr_code(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermSettingsWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .qr_service
        .delete(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/qr-codes/{id}/image",
    tag = "QR Codes",
    params(("id" = Uuid, Path, description = "QR code id"), RenderQuery),
    responses((status = 200, description = "PNG image, SVG when `format=svg`", content_type = "image/png")),
    security(("api_jwt" = []))
)]
pub async fn render_table_qr(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermSettingsWrite>,
    Path(id): Path<Uuid>,
    Query(query): Query<RenderQuery>,
) -> Result<Response, ApiError> {
    let bytes = app_state
        .qr_service
        .render_table(id, query.format, query.size)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(image_response(query.format, bytes))
}

#[utoipa::path(
    get,
    path = "/api/qr-codes/menu/image",
    tag = "QR Codes",
    params(RenderQuery),
    responses((status = 200, description = "Code for the bare menu URL, SVG when `format=svg`", content_type = "image/png")),
    security(("api_jwt" = []))
)]
pub async fn render_menu_qr(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermSettingsWrite>,
    Query(query): Query<RenderQuery>,
) -> Result<Response, ApiError> {
    let bytes = app_state
        .qr_service
        .render_menu(query.format, query.size)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(image_response(query.format, bytes))
}
