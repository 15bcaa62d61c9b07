// src/handlers/documents.rs

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{PermOrdersRead, RequirePermission},
    },
};

#[utoipa::path(
    get,
    path = "/api/orders/{id}/receipt.pdf",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Printable receipt", content_type = "application/pdf"),
        (status = 404, description = "Order not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn receipt_pdf(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermOrdersRead>,
    Path(order_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let pdf_bytes = app_state
        .document_service
        .receipt_pdf(order_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_DISPOSITION, format!("inline; filename=\"order_{order_id}.pdf\"")),
    ];

    Ok((headers, pdf_bytes).into_response())
}
