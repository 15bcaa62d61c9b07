// src/handlers/inventory.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::{
        error::{ApiError, AppError},
        validation::{validate_not_negative, validate_positive},
    },
    config::AppState,
    db::inventory_repo::MaterialFields,
    middleware::{
        i18n::Locale,
        rbac::{PermInventoryRead, PermInventoryWrite, RequirePermission},
    },
    models::inventory::{Material, MaterialStatus, MovementReason, StockMovement},
};

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialPayload {
    #[validate(length(min = 1, max = 120, message = "The name is required."))]
    #[schema(example = "Whole milk")]
    pub name: String,

    #[validate(length(min = 1, max = 16, message = "The unit is required."))]
    #[schema(example = "L")]
    pub unit: String,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub min_stock: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub alert_stock: Decimal,

    pub supplier: Option<String>,
}

impl MaterialPayload {
    fn fields(&self) -> MaterialFields<'_> {
        MaterialFields {
            name: self.name.trim(),
            unit: self.unit.trim(),
            min_stock: self.min_stock,
            alert_stock: self.alert_stock,
            supplier: self.supplier.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaterialPayload {
    #[serde(flatten)]
    #[validate(nested)]
    pub material: MaterialPayload,

    // Opening balance. Zero is fine.
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub initial_stock: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub cost_per_unit: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestockPayload {
    #[validate(custom(function = "validate_positive"))]
    #[schema(example = "12")]
    pub quantity: Decimal,

    /// Purchase price per unit, folded into the weighted average cost.
    #[validate(custom(function = "validate_not_negative"))]
    pub unit_cost: Option<Decimal>,

    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustPayload {
    /// Counted stock after the adjustment.
    #[validate(custom(function = "validate_not_negative"))]
    pub new_quantity: Decimal,

    #[serde(default = "default_adjust_reason")]
    pub reason: MovementReason,

    pub notes: Option<String>,
}

fn default_adjust_reason() -> MovementReason {
    MovementReason::Adjustment
}

impl AdjustPayload {
    // Ledger reasons owned by orders and purchases are not accepted here.
    fn validate_reason(&self) -> Result<(), ValidationError> {
        match self.reason {
            MovementReason::Adjustment | MovementReason::Waste => Ok(()),
            _ => {
                let mut err = ValidationError::new("reason");
                err.message = Some("Adjustments must use 'adjustment' or 'waste'.".into());
                Err(err)
            }
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListMaterialsQuery {
    pub status: Option<MaterialStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MovementsQuery {
    pub limit: Option<i64>,
}

// ---
// Materials
// ---

#[utoipa::path(
    get,
    path = "/api/inventory/materials",
    tag = "Inventory",
    params(ListMaterialsQuery),
    responses((status = 200, description = "Materials", body = Vec<Material>)),
    security(("api_jwt" = []))
)]
pub async fn list_materials(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermInventoryRead>,
    Query(query): Query<ListMaterialsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let materials = app_state
        .inventory_service
        .list_materials(query.status, query.search.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(materials)))
}

#[utoipa::path(
    get,
    path = "/api/inventory/materials/{id}",
    tag = "Inventory",
    params(("id" = Uuid, Path, description = "Material id")),
    responses(
        (status = 200, description = "Material", body = Material),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_material(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermInventoryRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let material = app_state
        .inventory_service
        .get_material(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(material)))
}

#[utoipa::path(
    post,
    path = "/api/inventory/materials",
    tag = "Inventory",
    request_body = CreateMaterialPayload,
    responses(
        (status = 201, description = "Material created", body = Material),
        (status = 409, description = "Name already in use")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_material(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermInventoryWrite>,
    Json(payload): Json<CreateMaterialPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let material = app_state
        .inventory_service
        .create_material(&payload.material.fields(), payload.initial_stock, payload.cost_per_unit)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(material)))
}

#[utoipa::path(
    put,
    path = "/api/inventory/materials/{id}",
    tag = "Inventory",
    request_body = MaterialPayload,
    params(("id" = Uuid, Path, description = "Material id")),
    responses((status = 200, description = "Material updated", body = Material)),
    security(("api_jwt" = []))
)]
pub async fn update_material(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermInventoryWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MaterialPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let material = app_state
        .inventory_service
        .update_material(id, &payload.fields())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(material)))
}

#[utoipa::path(
    delete,
    path = "/api/inventory/materials/{id}",
    tag = "Inventory",
    params(("id" = Uuid, Path, description = "Material id")),
    responses(
        (status = 204, description = "Material deleted"),
        (status = 409, description = "Material is used by a recipe")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_material(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermInventoryWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .inventory_service
        .delete_material(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// ---
// Stock
// ---

#[utoipa::path(
    post,
    path = "/api/inventory/materials/{id}/restock",
    tag = "Inventory",
    request_body = RestockPayload,
    params(("id" = Uuid, Path, description = "Material id")),
    responses((status = 200, description = "Stock added", body = Material)),
    security(("api_jwt" = []))
)]
pub async fn restock(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermInventoryWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RestockPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let material = app_state
        .inventory_service
        .restock(id, payload.quantity, payload.unit_cost, payload.notes.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(material)))
}

#[utoipa::path(
    post,
    path = "/api/inventory/materials/{id}/adjust",
    tag = "Inventory",
    request_body = AdjustPayload,
    params(("id" = Uuid, Path, description = "Material id")),
    responses((status = 200, description = "Stock set to the counted quantity", body = Material)),
    security(("api_jwt" = []))
)]
pub async fn adjust(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermInventoryWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    payload.validate_reason().map_err(|e| {
        let mut errors = validator::ValidationErrors::new();
        errors.add("reason", e);
        AppError::ValidationError(errors).to_api_error(&locale, &app_state.i18n_store)
    })?;

    let material = app_state
        .inventory_service
        .adjust(id, payload.new_quantity, payload.reason, payload.notes.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(material)))
}

#[utoipa::path(
    get,
    path = "/api/inventory/materials/{id}/movements",
    tag = "Inventory",
    params(("id" = Uuid, Path, description = "Material id"), MovementsQuery),
    responses((status = 200, description = "Stock ledger, newest first", body = Vec<StockMovement>)),
    security(("api_jwt" = []))
)]
pub async fn list_movements(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermInventoryRead>,
    Path(id): Path<Uuid>,
    Query(query): Query<MovementsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let movements = app_state
        .inventory_service
        .movements(id, query.limit.unwrap_or(100))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(movements)))
}

#[utoipa::path(
    get,
    path = "/api/inventory/alerts",
    tag = "Inventory",
    responses((status = 200, description = "Materials low or out of stock", body = Vec<Material>)),
    security(("api_jwt" = []))
)]
pub async fn alerts(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermInventoryRead>,
) -> Result<impl IntoResponse, ApiError> {
    let materials = app_state
        .inventory_service
        .alerts()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(materials)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn create_payload_reads_flattened_fields() {
        let payload: CreateMaterialPayload = serde_json::from_value(serde_json::json!({
            "name": "Milk",
            "unit": "L",
            "minStock": 2,
            "alertStock": 5,
            "initialStock": 10
        }))
        .unwrap();
        assert!(payload.validate().is_ok());
        assert_eq!(payload.material.fields().alert_stock, dec!(5));
        assert_eq!(payload.cost_per_unit, dec!(0));
    }

    #[test]
    fn negative_thresholds_are_rejected() {
        let payload = MaterialPayload {
            name: "Milk".into(),
            unit: "L".into(),
            min_stock: dec!(-1),
            alert_stock: dec!(0),
            supplier: None,
        };
        assert!(payload.validate().unwrap_err().field_errors().contains_key("min_stock"));
    }

    #[test]
    fn adjustments_only_accept_manual_reasons() {
        let mut payload = AdjustPayload { new_quantity: dec!(3), reason: MovementReason::Waste, notes: None };
        assert!(payload.validate_reason().is_ok());
        payload.reason = MovementReason::Consumption;
        assert!(payload.validate_reason().is_err());
    }
}
