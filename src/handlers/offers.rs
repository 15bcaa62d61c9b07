// src/handlers/offers.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        validation::validate_not_negative,
    },
    config::AppState,
    db::offer_repo::OfferFields,
    middleware::{
        i18n::Locale,
        rbac::{PermOffersWrite, RequirePermission},
    },
    models::offers::{Offer, OfferKind},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfferPayload {
    #[validate(length(min = 1, max = 120, message = "The name is required."))]
    #[schema(example = "Happy hour")]
    pub name: String,
    pub description: Option<String>,
    pub kind: OfferKind,
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub value: Decimal,
    pub buy_quantity: Option<i32>,
    pub get_quantity: Option<i32>,
    pub target_item_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub min_order_amount: Decimal,
    #[validate(custom(function = "validate_not_negative"))]
    pub max_discount: Option<Decimal>,
    #[validate(length(min = 3, max = 32, message = "Codes have 3 to 32 characters."))]
    #[schema(example = "WELCOME10")]
    pub code: Option<String>,
    #[validate(range(min = 1, message = "The usage limit must be at least 1."))]
    pub usage_limit: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl OfferPayload {
    fn fields(&self) -> OfferFields<'_> {
        OfferFields {
            name: self.name.trim(),
            description: self.description.as_deref(),
            kind: self.kind,
            value: self.value,
            buy_quantity: self.buy_quantity,
            get_quantity: self.get_quantity,
            target_item_id: self.target_item_id,
            category_id: self.category_id,
            min_order_amount: self.min_order_amount,
            max_discount: self.max_discount,
            code: self.code.as_deref().map(str::trim).filter(|c| !c.is_empty()),
            usage_limit: self.usage_limit,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            is_active: self.is_active,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/offers",
    tag = "Offers",
    responses((status = 200, description = "All offers", body = Vec<Offer>)),
    security(("api_jwt" = []))
)]
pub async fn list_offers(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermOffersWrite>,
) -> Result<impl IntoResponse, ApiError> {
    let offers = app_state
        .offer_service
        .list()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(offers)))
}

#[utoipa::path(
    get,
    path = "/api/offers/{id}",
    tag = "Offers",
    params(("id" = Uuid, Path, description = "Offer id")),
    responses((status = 200, description = "Offer", body = Offer), (status = 404, description = "Not found")),
    security(("api_jwt" = []))
)]
pub async fn get_offer(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermOffersWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let offer = app_state
        .offer_service
        .get(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(offer)))
}

#[utoipa::path(
    post,
    path = "/api/offers",
    tag = "Offers",
    request_body = OfferPayload,
    responses(
        (status = 201, description = "Offer created", body = Offer),
        (status = 400, description = "Rules do not fit the offer kind"),
        (status = 409, description = "Code already in use")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_offer(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermOffersWrite>,
    Json(payload): Json<OfferPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let offer = app_state
        .offer_service
        .create(&payload.fields())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(offer)))
}

#[utoipa::path(
    put,
    path = "/api/offers/{id}",
    tag = "Offers",
    request_body = OfferPayload,
    params(("id" = Uuid, Path, description = "Offer id")),
    responses((status = 200, description = "Offer updated", body = Offer)),
    security(("api_jwt" = []))
)]
pub async fn update_offer(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermOffersWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OfferPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let offer = app_state
        .offer_service
        .update(id, &payload.fields())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(offer)))
}

#[utoipa::path(
    delete,
    path = "/api/offers/{id}",
    tag = "Offers",
    params(("id" = Uuid, Path, description = "Offer id")),
    responses((status = 204, description = "Offer deleted")),
    security(("api_jwt" = []))
)]
pub async fn delete_offer(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermOffersWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .offer_service
        .delete(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_codes_become_automatic_offers() {
        let payload: OfferPayload = serde_json::from_value(serde_json::json!({
            "name": "Lunch deal",
            "kind": "percentage",
            "value": 10,
            "code": "   "
        }))
        .unwrap();
        assert!(payload.is_active);
        assert_eq!(payload.fields().code, None);
    }
}
