// src/handlers/public.rs
//
// Customer-facing routes. None of them require a token.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    handlers::qr_codes::RenderQuery,
    middleware::i18n::Locale,
    models::{
        menu::PublicMenuCategory,
        offers::{PriceBreakdown, PromoCodeCheck},
        orders::{OrderDetail, OrderTracking, PlaceOrderRequest, QuoteRequest},
    },
};

#[utoipa::path(
    get,
    path = "/api/public/menu",
    tag = "Public",
    responses((status = 200, description = "Active categories with available items", body = Vec<PublicMenuCategory>))
)]
pub async fn public_menu(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let menu = app_state
        .menu_service
        .public_menu()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(menu)))
}

#[utoipa::path(
    post,
    path = "/api/public/cart/quote",
    tag = "Public",
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Prices without placing the order", body = PriceBreakdown),
        (status = 404, description = "Unknown menu item")
    )
)]
pub async fn quote_cart(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<QuoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let quote = app_state
        .order_service
        .quote_cart(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(quote)))
}

#[utoipa::path(
    post,
    path = "/api/public/orders",
    tag = "Public",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderDetail),
        (status = 400, description = "Invalid cart or promo code"),
        (status = 409, description = "Item unavailable or not enough stock")
    )
)]
pub async fn place_order(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .order_service
        .place_order(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(order)))
}

#[utoipa::path(
    get,
    path = "/api/public/orders/{id}",
    tag = "Public",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Status and department progress", body = OrderTracking),
        (status = 404, description = "Order not found")
    )
)]
pub async fn track_order(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tracking = app_state
        .order_service
        .track_order(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(tracking)))
}

#[utoipa::path(
    get,
    path = "/api/public/promo-codes/{code}",
    tag = "Public",
    params(("code" = String, Path, description = "Code typed by the customer")),
    responses((status = 200, description = "Whether the code can be redeemed now", body = PromoCodeCheck))
)]
pub async fn validate_promo_code(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let check = app_state
        .offer_service
        .validate_code(&code)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(check)))
}

#[utoipa::path(
    get,
    path = "/api/public/menu/qr",
    tag = "Public",
    params(RenderQuery),
    responses((status = 200, description = "QR code for the menu URL, SVG when `format=svg`", content_type = "image/png"))
)]
pub async fn menu_qr(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<RenderQuery>,
) -> Result<Response, ApiError> {
    let bytes = app_state
        .qr_service
        .render_menu(query.format, query.size)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(([(header::CONTENT_TYPE, query.format.content_type())], bytes).into_response())
}
