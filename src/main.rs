//src/main.rs

use anyhow::Context;
use axum::{
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppConfig, AppState};
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = AppConfig::from_env()?;
    let bind_addr = config.bind_addr;
    let bootstrap = config.admin_email.clone().zip(config.admin_password.clone());

    let app_state = AppState::new(config).await?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("failed to run database migrations")?;
    tracing::info!("database migrations applied");

    if let Some((email, password)) = bootstrap {
        match app_state.auth_service.bootstrap_admin(&email, &password).await {
            Ok(Some(admin)) => tracing::info!(staff_id = %admin.id, "bootstrap admin created"),
            Ok(None) => tracing::debug!("staff already exists, bootstrap skipped"),
            Err(e) => tracing::error!(error = ?e, "bootstrap admin failed"),
        }
    }

    let app = build_router(app_state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .context("server error")?;

    Ok(())
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin.and_then(|o| HeaderValue::from_str(o).ok()) {
        Some(origin) => layer.allow_origin(origin),
        None => layer.allow_origin(Any),
    }
}

pub fn build_router(app_state: AppState) -> Router {
    // Customer-facing, no token.
    let public_routes = Router::new()
        .route("/menu", get(handlers::public::public_menu))
        .route("/menu/qr", get(handlers::public::menu_qr))
        .route("/settings", get(handlers::settings::get_settings))
        .route("/cart/quote", post(handlers::public::quote_cart))
        .route("/orders", post(handlers::public::place_order))
        .route("/orders/{id}", get(handlers::public::track_order))
        .route("/promo-codes/{code}", get(handlers::public::validate_promo_code));

    let staff_routes = Router::new()
        .route("/", get(handlers::auth::list_staff).post(handlers::auth::create_staff))
        .route(
            "/{id}",
            put(handlers::auth::update_staff).delete(handlers::auth::delete_staff),
        )
        .route("/{id}/password", put(handlers::auth::reset_password));

    let menu_routes = Router::new()
        .route(
            "/categories",
            get(handlers::menu::list_categories).post(handlers::menu::create_category),
        )
        .route(
            "/categories/{id}",
            put(handlers::menu::update_category).delete(handlers::menu::delete_category),
        )
        .route("/items", get(handlers::menu::list_items).post(handlers::menu::create_item))
        .route(
            "/items/{id}",
            get(handlers::menu::get_item)
                .put(handlers::menu::update_item)
                .delete(handlers::menu::delete_item),
        )
        .route("/items/{id}/availability", patch(handlers::menu::set_availability))
        .route(
            "/items/{id}/recipe",
            get(handlers::menu::get_recipe).put(handlers::menu::set_recipe),
        );

    let inventory_routes = Router::new()
        .route(
            "/materials",
            get(handlers::inventory::list_materials).post(handlers::inventory::create_material),
        )
        .route(
            "/materials/{id}",
            get(handlers::inventory::get_material)
                .put(handlers::inventory::update_material)
                .delete(handlers::inventory::delete_material),
        )
        .route("/materials/{id}/restock", post(handlers::inventory::restock))
        .route("/materials/{id}/adjust", post(handlers::inventory::adjust))
        .route("/materials/{id}/movements", get(handlers::inventory::list_movements))
        .route("/alerts", get(handlers::inventory::alerts));

    let order_routes = Router::new()
        .route("/", get(handlers::orders::list_orders))
        .route("/queue/{department}", get(handlers::orders::department_queue))
        .route("/{id}", get(handlers::orders::get_order))
        .route("/{id}/status", patch(handlers::orders::update_status))
        .route(
            "/{id}/departments/{department}",
            patch(handlers::orders::update_department_status),
        )
        .route("/{id}/print", post(handlers::orders::print_order))
        .route("/{id}/receipt.pdf", get(handlers::documents::receipt_pdf));

    let offer_routes = Router::new()
        .route("/", get(handlers::offers::list_offers).post(handlers::offers::create_offer))
        .route(
            "/{id}",
            get(handlers::offers::get_offer)
                .put(handlers::offers::update_offer)
                .delete(handlers::offers::delete_offer),
        );

    let notification_routes = Router::new()
        .route("/", get(handlers::notifications::list_notifications))
        .route("/unread-count", get(handlers::notifications::unread_count))
        .route("/read-all", post(handlers::notifications::mark_all_read))
        .route("/{id}", axum::routing::delete(handlers::notifications::delete_notification))
        .route("/{id}/read", patch(handlers::notifications::mark_read));

    let printer_routes = Router::new()
        .route(
            "/",
            get(handlers::printers::list_printers).post(handlers::printers::create_printer),
        )
        .route(
            "/{id}",
            put(handlers::printers::update_printer).delete(handlers::printers::delete_printer),
        )
        .route("/{id}/test", post(handlers::printers::test_print));

    let qr_routes = Router::new()
        .route(
            "/",
            get(handlers::qr_codes::list_qr_codes).post(handlers::qr_codes::create_qr_code),
        )
        .route("/menu/image", get(handlers::qr_codes::render_menu_qr))
        .route(
            "/{id}",
            put(handlers::qr_codes::update_qr_code).delete(handlers::qr_codes::delete_qr_code),
        )
        .route("/{id}/image", get(handlers::qr_codes::render_table_qr));

    let report_routes = Router::new()
        .route("/sales-summary", get(handlers::reports::sales_summary))
        .route("/daily-sales", get(handlers::reports::daily_sales))
        .route("/top-items", get(handlers::reports::top_items))
        .route("/departments", get(handlers::reports::department_sales))
        .route("/inventory-valuation", get(handlers::reports::inventory_valuation));

    // Everything behind a bearer token.
    let protected_routes = Router::new()
        .route("/api/auth/me", get(handlers::auth::get_me))
        .route("/api/permissions", get(handlers::rbac::list_permissions))
        .route("/api/settings", put(handlers::settings::update_settings))
        .nest("/api/staff", staff_routes)
        .nest("/api/menu", menu_routes)
        .nest("/api/inventory", inventory_routes)
        .nest("/api/orders", order_routes)
        .nest("/api/offers", offer_routes)
        .nest("/api/notifications", notification_routes)
        .nest("/api/printers", printer_routes)
        .nest("/api/qr-codes", qr_routes)
        .nest("/api/reports", report_routes)
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let cors = cors_layer(app_state.config.cors_allowed_origin.as_deref());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/auth/login", post(handlers::auth::login))
        .nest("/api/public", public_routes)
        .merge(protected_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let config = AppConfig::for_tests();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        build_router(AppState::with_pool(config, pool).unwrap())
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_answers_without_a_database() {
        let response = test_router()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn staff_routes_require_a_bearer_token() {
        for uri in ["/api/auth/me", "/api/orders", "/api/inventory/alerts", "/api/permissions"] {
            let response = test_router()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn malformed_token_is_rejected_before_any_lookup() {
        let response = test_router()
            .oneshot(
                Request::get("/api/orders")
                    .header("Authorization", "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn empty_cart_quote_is_a_validation_error() {
        let response = test_router()
            .oneshot(
                Request::post("/api/public/cart/quote")
                    .header("Content-Type", "application/json")
                    .header("Accept-Language", "en")
                    .body(Body::from(r#"{"items":[]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].is_string());
        assert!(body["details"]["items"].is_array());
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found_rather_than_unauthorized() {
        let response = test_router()
            .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
