// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;
use crate::models::{menu::Department, orders::{DepartmentStatus, OrderStatus}};

// Domain errors. Handlers never return these directly: they go through
// `to_api_error` so the message is rendered in the caller's language.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation error")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("account disabled")]
    AccountDisabled,

    #[error("missing permission {0}")]
    Forbidden(&'static str),

    #[error("department {0} belongs to another station")]
    WrongDepartment(Department),

    #[error("email already exists")]
    EmailAlreadyExists,

    #[error("cannot modify own account")]
    CannotModifySelf,

    #[error("{0} not found")]
    ResourceNotFound(&'static str),

    #[error("category name {0} already exists")]
    CategoryNameAlreadyExists(String),

    #[error("category still has items")]
    CategoryNotEmpty,

    #[error("menu item {0} is unavailable")]
    MenuItemUnavailable(String),

    #[error("menu item has orders")]
    MenuItemHasOrders,

    #[error("material name {0} already exists")]
    MaterialNameAlreadyExists(String),

    #[error("material is used by a recipe")]
    MaterialInUse,

    #[error("insufficient stock of {material}: required {required}, available {available}")]
    InsufficientStock {
        material: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("invalid status transition {from:?} -> {to:?}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("invalid department transition {from:?} -> {to:?}")]
    InvalidDepartmentTransition {
        from: DepartmentStatus,
        to: DepartmentStatus,
    },

    #[error("department {0} is not part of the order")]
    DepartmentNotInOrder(Department),

    #[error("order is not in preparation (status {0:?})")]
    OrderNotInPreparation(OrderStatus),

    #[error("invalid promo code {0}")]
    InvalidPromoCode(String),

    #[error("offer code {0} already exists")]
    OfferCodeAlreadyExists(String),

    #[error("offer {0} reached its usage limit")]
    OfferUsageLimitReached(String),

    #[error("table {0} already has a QR code")]
    TableAlreadyHasQr(i32),

    #[error("invalid date range")]
    InvalidDateRange,

    #[error("font not found: {0}")]
    FontNotFound(String),

    #[error("database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("internal server error")]
    InternalServerError(#[from] anyhow::Error),

    #[error("bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("jwt error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// What goes over the wire.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    /// Status code, catalog key and placeholder arguments for this error.
    fn descriptor(&self) -> (StatusCode, &'static str, Vec<(&'static str, String)>) {
        match self {
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "error.validation", vec![]),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "error.invalid_credentials", vec![]),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "error.invalid_token", vec![]),
            AppError::AccountDisabled => (StatusCode::FORBIDDEN, "error.account_disabled", vec![]),
            AppError::Forbidden(perm) => (
                StatusCode::FORBIDDEN,
                "error.forbidden",
                vec![("permission", perm.to_string())],
            ),
            AppError::WrongDepartment(d) => (
                StatusCode::FORBIDDEN,
                "error.wrong_department",
                vec![("department", d.as_str().to_string())],
            ),
            AppError::EmailAlreadyExists => (StatusCode::CONFLICT, "error.email_exists", vec![]),
            AppError::CannotModifySelf => (StatusCode::BAD_REQUEST, "error.cannot_modify_self", vec![]),
            AppError::ResourceNotFound(resource) => (
                StatusCode::NOT_FOUND,
                "error.not_found",
                vec![("resource", resource.to_string())],
            ),
            AppError::CategoryNameAlreadyExists(name) => (
                StatusCode::CONFLICT,
                "error.category_exists",
                vec![("name", name.clone())],
            ),
            AppError::CategoryNotEmpty => (StatusCode::CONFLICT, "error.category_not_empty", vec![]),
            AppError::MenuItemUnavailable(name) => (
                StatusCode::CONFLICT,
                "error.menu_item_unavailable",
                vec![("name", name.clone())],
            ),
            AppError::MenuItemHasOrders => (StatusCode::CONFLICT, "error.menu_item_has_orders", vec![]),
            AppError::MaterialNameAlreadyExists(name) => (
                StatusCode::CONFLICT,
                "error.material_exists",
                vec![("name", name.clone())],
            ),
            AppError::MaterialInUse => (StatusCode::CONFLICT, "error.material_in_use", vec![]),
            AppError::InsufficientStock { material, required, available } => (
                StatusCode::CONFLICT,
                "error.insufficient_stock",
                vec![
                    ("material", material.clone()),
                    ("required", required.normalize().to_string()),
                    ("available", available.normalize().to_string()),
                ],
            ),
            AppError::InvalidStatusTransition { from, to } => (
                StatusCode::CONFLICT,
                "error.invalid_transition",
                vec![("from", from.as_str().to_string()), ("to", to.as_str().to_string())],
            ),
            AppError::InvalidDepartmentTransition { from, to } => (
                StatusCode::CONFLICT,
                "error.invalid_transition",
                vec![("from", from.as_str().to_string()), ("to", to.as_str().to_string())],
            ),
            AppError::DepartmentNotInOrder(d) => (
                StatusCode::BAD_REQUEST,
                "error.department_not_in_order",
                vec![("department", d.as_str().to_string())],
            ),
            AppError::OrderNotInPreparation(status) => (
                StatusCode::CONFLICT,
                "error.order_not_in_preparation",
                vec![("status", status.as_str().to_string())],
            ),
            AppError::InvalidPromoCode(code) => (
                StatusCode::BAD_REQUEST,
                "error.invalid_promo_code",
                vec![("code", code.clone())],
            ),
            AppError::OfferCodeAlreadyExists(code) => (
                StatusCode::CONFLICT,
                "error.offer_code_exists",
                vec![("code", code.clone())],
            ),
            AppError::OfferUsageLimitReached(name) => (
                StatusCode::CONFLICT,
                "error.offer_limit_reached",
                vec![("name", name.clone())],
            ),
            AppError::TableAlreadyHasQr(table) => (
                StatusCode::CONFLICT,
                "error.table_has_qr",
                vec![("table", table.to_string())],
            ),
            AppError::InvalidDateRange => (StatusCode::BAD_REQUEST, "error.invalid_date_range", vec![]),
            AppError::FontNotFound(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "error.internal", vec![]),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.descriptor().0
    }

    pub fn to_api_error(self, locale: &Locale, store: &I18nStore) -> ApiError {
        let (status, key, args) = self.descriptor();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = ?self, "internal server error");
        }

        let error = store.translate(&locale.0, key, &args);

        // Validation errors carry the per-field messages.
        let details = match self {
            AppError::ValidationError(errors) => {
                let mut fields = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<Value> = field_errors
                        .iter()
                        .map(|e| {
                            let message = e
                                .message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string());
                            Value::String(message)
                        })
                        .collect();
                    fields.insert(field.to_string(), Value::Array(messages));
                }
                Some(Value::Object(fields))
            }
            _ => None,
        };

        ApiError { status, error, details }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn store() -> I18nStore {
        I18nStore::load().expect("embedded catalogs parse")
    }

    #[test]
    fn insufficient_stock_is_conflict_with_material_in_message() {
        let err = AppError::InsufficientStock {
            material: "Coffee beans".into(),
            required: dec!(0.500),
            available: dec!(0.2),
        };
        let api = err.to_api_error(&Locale("en".into()), &store());
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert!(api.error.contains("Coffee beans"));
        assert!(api.error.contains("0.5"));
    }

    #[test]
    fn validation_errors_expose_field_details() {
        let mut errors = validator::ValidationErrors::new();
        let mut e = validator::ValidationError::new("range");
        e.message = Some("too small".into());
        errors.add("quantity", e);

        let api = AppError::ValidationError(errors).to_api_error(&Locale("en".into()), &store());
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.expect("details");
        assert_eq!(details["quantity"][0], "too small");
    }

    #[test]
    fn internal_errors_hide_their_cause() {
        let err = AppError::InternalServerError(anyhow::anyhow!("secret connection string"));
        let api = err.to_api_error(&Locale("en".into()), &store());
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.error.contains("secret"));
    }

    #[test]
    fn exhausted_offer_is_a_conflict_naming_the_offer() {
        let api = AppError::OfferUsageLimitReached("Happy hour".into()).to_api_error(&Locale("en".into()), &store());
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert!(api.error.contains("Happy hour"));
    }

    #[test]
    fn messages_follow_the_locale() {
        let en = AppError::InvalidCredentials.to_api_error(&Locale("en".into()), &store());
        let pt = AppError::InvalidCredentials.to_api_error(&Locale("pt".into()), &store());
        assert_ne!(en.error, pt.error);
    }
}
