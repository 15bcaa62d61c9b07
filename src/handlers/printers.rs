// src/handlers/printers.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    db::printer_repo::PrinterFields,
    middleware::{
        i18n::Locale,
        rbac::{PermPrintersWrite, RequirePermission},
    },
    models::{
        menu::Department,
        printers::{PaperWidth, PrintResult, Printer},
    },
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrinterPayload {
    #[validate(length(min = 1, max = 80, message = "The name is required."))]
    pub name: String,
    #[validate(length(min = 1, max = 255, message = "The host is required."))]
    #[schema(example = "192.168.1.50")]
    pub host: String,
    #[validate(range(min = 1, max = 65535, message = "The port must be between 1 and 65535."))]
    #[serde(default = "default_port")]
    pub port: i32,
    /// Omit for the receipt printer.
    pub department: Option<Department>,
    #[serde(default = "default_width")]
    pub paper_width: PaperWidth,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_port() -> i32 {
    9100
}

fn default_width() -> PaperWidth {
    PaperWidth::Mm80
}

fn default_active() -> bool {
    true
}

impl PrinterPayload {
    fn fields(&self) -> PrinterFields<'_> {
        PrinterFields {
            name: self.name.trim(),
            host: self.host.trim(),
            port: self.port,
            department: self.department,
            paper_width: self.paper_width,
            is_active: self.is_active,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/printers",
    tag = "Printers",
    responses((status = 200, description = "Configured printers", body = Vec<Printer>)),
    security(("api_jwt" = []))
)]
pub async fn list_printers(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermPrintersWrite>,
) -> Result<impl IntoResponse, ApiError> {
    let printers = app_state
        .printing_service
        .list_printers()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(printers)))
}

#[utoipa::path(
    post,
    path = "/api/printers",
    tag = "Printers",
    request_body = PrinterPayload,
    responses((status = 201, description = "Printer added", body = Printer)),
    security(("api_jwt" = []))
)]
pub async fn create_printer(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermPrintersWrite>,
    Json(payload): Json<PrinterPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let printer = app_state
        .printing_service
        .create_printer(&payload.fields())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(printer)))
}

#[utoipa::path(
    put,
    path = "/api/printers/{id}",
    tag = "Printers",
    request_body = PrinterPayload,
    params(("id" = Uuid, Path, description = "Printer id")),
    responses((status = 200, description = "Printer updated", body = Printer)),
    security(("api_jwt" = []))
)]
pub async fn update_printer(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermPrintersWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PrinterPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let printer = app_state
        .printing_service
        .update_printer(id, &payload.fields())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(printer)))
}

#[utoipa::path(
    delete,
    path = "/api/printers/{id}",
    tag = "Printers",
    params(("id" = Uuid, Path, description = "Printer id")),
    responses((status = 204, description = "Printer removed")),
    security(("api_jwt" = []))
)]
pub async fn delete_printer(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermPrintersWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .printing_service
        .delete_printer(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/printers/{id}/test",
    tag = "Printers",
    params(("id" = Uuid, Path, description = "Printer id")),
    responses((status = 200, description = "Outcome of the test ticket", body = PrintResult)),
    security(("api_jwt" = []))
)]
pub async fn test_print(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermPrintersWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = app_state
        .printing_service
        .test_print(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(result)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_defaults_to_a_jetdirect_receipt_printer() {
        let payload: PrinterPayload =
            serde_json::from_value(serde_json::json!({ "name": "Counter", "host": "10.0.0.5" })).unwrap();
        assert_eq!(payload.port, 9100);
        assert_eq!(payload.paper_width, PaperWidth::Mm80);
        assert!(payload.department.is_none());
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn port_out_of_range_is_rejected() {
        let payload: PrinterPayload = serde_json::from_value(serde_json::json!({
            "name": "Bar", "host": "10.0.0.6", "port": 70000, "department": "barista"
        }))
        .unwrap();
        assert!(payload.validate().is_err());
    }
}
