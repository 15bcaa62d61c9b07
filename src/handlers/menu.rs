// src/handlers/menu.rs

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
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        validation::{validate_not_negative, validate_positive},
    },
    config::AppState,
    db::menu_repo::MenuItemFields,
    middleware::{
        i18n::Locale,
        rbac::{PermMenuWrite, RequirePermission},
    },
    models::menu::{Category, Department, MenuItem, RecipeLine},
};

fn default_true() -> bool {
    true
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPayload {
    #[validate(length(min = 1, max = 80, message = "The name is required."))]
    #[schema(example = "Hot drinks")]
    pub name: String,
    pub description: Option<String>,
    #[validate(url(message = "The image must be a URL."))]
    pub image_url: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemPayload {
    pub category_id: Uuid,
    #[validate(length(min = 1, max = 120, message = "The name is required."))]
    #[schema(example = "Cappuccino")]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "3.50")]
    pub price: Decimal,
    pub department: Department,
    #[validate(url(message = "The image must be a URL."))]
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub sort_order: i32,
}

impl MenuItemPayload {
    fn fields(&self) -> MenuItemFields<'_> {
        MenuItemFields {
            category_id: self.category_id,
            name: self.name.trim(),
            description: self.description.as_deref(),
            price: self.price,
            department: self.department,
            image_url: self.image_url.as_deref(),
            is_available: self.is_available,
            sort_order: self.sort_order,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityPayload {
    pub is_available: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeLinePayload {
    pub material_id: Uuid,
    #[validate(custom(function = "validate_positive"))]
    #[schema(example = "0.018")]
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipePayload {
    #[validate(nested)]
    pub lines: Vec<RecipeLinePayload>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListItemsQuery {
    pub category_id: Option<Uuid>,
}

// ---
// Categories
// ---

#[utoipa::path(
    get,
    path = "/api/menu/categories",
    tag = "Menu",
    responses((status = 200, description = "All categories, inactive included", body = Vec<Category>)),
    security(("api_jwt" = []))
)]
pub async fn list_categories(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let categories = app_state
        .menu_service
        .list_categories()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(categories)))
}

#[utoipa::path(
    post,
    path = "/api/menu/categories",
    tag = "Menu",
    request_body = CategoryPayload,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 409, description = "Name already in use")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_category(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermMenuWrite>,
    Json(payload): Json<CategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let category = app_state
        .menu_service
        .create_category(
            &payload.name,
            payload.description.as_deref(),
            payload.image_url.as_deref(),
            payload.sort_order,
            payload.is_active,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    put,
    path = "/api/menu/categories/{id}",
    tag = "Menu",
    request_body = CategoryPayload,
    params(("id" = Uuid, Path, description = "Category id")),
    responses((status = 200, description = "Category updated", body = Category)),
    security(("api_jwt" = []))
)]
pub async fn update_category(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermMenuWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let category = app_state
        .menu_service
        .update_category(
            id,
            &payload.name,
            payload.description.as_deref(),
            payload.image_url.as_deref(),
            payload.sort_order,
            payload.is_active,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(category)))
}

#[utoipa::path(
    delete,
    path = "/api/menu/categories/{id}",
    tag = "Menu",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 409, description = "Category still has items")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_category(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermMenuWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .menu_service
        .delete_category(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// ---
// Items
// ---

#[utoipa::path(
    get,
    path = "/api/menu/items",
    tag = "Menu",
    params(ListItemsQuery),
    responses((status = 200, description = "Menu items", body = Vec<MenuItem>)),
    security(("api_jwt" = []))
)]
pub async fn list_items(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<ListItemsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let items = app_state
        .menu_service
        .list_items(query.category_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(items)))
}

#[utoipa::path(
    get,
    path = "/api/menu/items/{id}",
    tag = "Menu",
    params(("id" = Uuid, Path, description = "Menu item id")),
    responses(
        (status = 200, description = "Menu item", body = MenuItem),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_item(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .menu_service
        .get_item(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(item)))
}

#[utoipa::path(
    post,
    path = "/api/menu/items",
    tag = "Menu",
    request_body = MenuItemPayload,
    responses((status = 201, description = "Menu item created", body = MenuItem)),
    security(("api_jwt" = []))
)]
pub async fn create_item(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermMenuWrite>,
    Json(payload): Json<MenuItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let item = app_state
        .menu_service
        .create_item(&payload.fields())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    put,
    path = "/api/menu/items/{id}",
    tag = "Menu",
    request_body = MenuItemPayload,
    params(("id" = Uuid, Path, description = "Menu item id")),
    responses((status = 200, description = "Menu item updated", body = MenuItem)),
    security(("api_jwt" = []))
)]
pub async fn update_item(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermMenuWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MenuItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let item = app_state
        .menu_service
        .update_item(id, &payload.fields())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(item)))
}

#[utoipa::path(
    patch,
    path = "/api/menu/items/{id}/availability",
    tag = "Menu",
    request_body = AvailabilityPayload,
    params(("id" = Uuid, Path, description = "Menu item id")),
    responses((status = 200, description = "Availability changed", body = MenuItem)),
    security(("api_jwt" = []))
)]
pub async fn set_availability(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermMenuWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AvailabilityPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .menu_service
        .set_availability(id, payload.is_available)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(item)))
}

#[utoipa::path(
    delete,
    path = "/api/menu/items/{id}",
    tag = "Menu",
    params(("id" = Uuid, Path, description = "Menu item id")),
    responses(
        (status = 204, description = "Menu item deleted"),
        (status = 409, description = "Item appears in past orders")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_item(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermMenuWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .menu_service
        .delete_item(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// ---
// Recipes
// ---

#[utoipa::path(
    get,
    path = "/api/menu/items/{id}/recipe",
    tag = "Menu",
    params(("id" = Uuid, Path, description = "Menu item id")),
    responses((status = 200, description = "Recipe lines", body = Vec<RecipeLine>)),
    security(("api_jwt" = []))
)]
pub async fn get_recipe(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let recipe = app_state
        .menu_service
        .get_recipe(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(recipe)))
}

#[utoipa::path(
    put,
    path = "/api/menu/items/{id}/recipe",
    tag = "Menu",
    request_body = RecipePayload,
    params(("id" = Uuid, Path, description = "Menu item id")),
    responses(
        (status = 200, description = "Recipe replaced", body = Vec<RecipeLine>),
        (status = 404, description = "Unknown item or material")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_recipe(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermMenuWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecipePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let lines: Vec<(Uuid, Decimal)> = payload.lines.iter().map(|l| (l.material_id, l.quantity)).collect();
    let recipe = app_state
        .menu_service
        .set_recipe(id, &lines)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(recipe)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn item_payload_defaults_and_validation() {
        let payload: MenuItemPayload = serde_json::from_value(serde_json::json!({
            "categoryId": Uuid::nil(),
            "name": "Latte",
            "price": 3.5,
            "department": "barista"
        }))
        .unwrap();
        assert!(payload.is_available);
        assert_eq!(payload.sort_order, 0);
        assert!(payload.validate().is_ok());
        assert_eq!(payload.fields().price, dec!(3.5));
    }

    #[test]
    fn recipe_quantities_must_be_positive() {
        let payload = RecipePayload {
            lines: vec![RecipeLinePayload { material_id: Uuid::nil(), quantity: dec!(0) }],
        };
        assert!(payload.validate().is_err());
    }
}
