// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::middleware;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Public ---
        handlers::public::public_menu,
        handlers::public::quote_cart,
        handlers::public::place_order,
        handlers::public::track_order,
        handlers::public::validate_promo_code,
        handlers::public::menu_qr,
        handlers::settings::get_settings,

        // --- Auth & staff ---
        handlers::auth::login,
        handlers::auth::get_me,
        handlers::auth::list_staff,
        handlers::auth::create_staff,
        handlers::auth::update_staff,
        handlers::auth::reset_password,
        handlers::auth::delete_staff,
        handlers::rbac::list_permissions,

        // --- Menu ---
        handlers::menu::list_categories,
        handlers::menu::create_category,
        handlers::menu::update_category,
        handlers::menu::delete_category,
        handlers::menu::list_items,
        handlers::menu::get_item,
        handlers::menu::create_item,
        handlers::menu::update_item,
        handlers::menu::set_availability,
        handlers::menu::delete_item,
        handlers::menu::get_recipe,
        handlers::menu::set_recipe,

        // --- Inventory ---
        handlers::inventory::list_materials,
        handlers::inventory::get_material,
        handlers::inventory::create_material,
        handlers::inventory::update_material,
        handlers::inventory::delete_material,
        handlers::inventory::restock,
        handlers::inventory::adjust,
        handlers::inventory::list_movements,
        handlers::inventory::alerts,

        // --- Orders ---
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::update_status,
        handlers::orders::update_department_status,
        handlers::orders::department_queue,
        handlers::orders::print_order,
        handlers::documents::receipt_pdf,

        // --- Offers ---
        handlers::offers::list_offers,
        handlers::offers::get_offer,
        handlers::offers::create_offer,
        handlers::offers::update_offer,
        handlers::offers::delete_offer,

        // --- Notifications ---
        handlers::notifications::list_notifications,
        handlers::notifications::unread_count,
        handlers::notifications::mark_read,
        handlers::notifications::mark_all_read,
        handlers::notifications::delete_notification,

        // --- Printers ---
        handlers::printers::list_printers,
        handlers::printers::create_printer,
        handlers::printers::update_printer,
        handlers::printers::delete_printer,
        handlers::printers::test_print,

        // --- QR codes ---
        handlers::qr_codes::list_qr_codes,
        handlers::qr_codes::create_qr_code,
        handlers::qr_codes::update_qr_code,
        handlers::qr_codes::delete_qr_code,
        handlers::qr_codes::render_table_qr,
        handlers::qr_codes::render_menu_qr,

        // --- Reports ---
        handlers::reports::sales_summary,
        handlers::reports::daily_sales,
        handlers::reports::top_items,
        handlers::reports::department_sales,
        handlers::reports::inventory_valuation,

        // --- Settings ---
        handlers::settings::update_settings,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::StaffRole,
            models::auth::StaffMember,
            models::auth::LoginPayload,
            models::auth::AuthResponse,
            models::auth::CreateStaffPayload,
            models::auth::UpdateStaffPayload,
            models::auth::ResetPasswordPayload,
            middleware::rbac::PermissionView,

            // --- Menu ---
            models::menu::Department,
            models::menu::Category,
            models::menu::MenuItem,
            models::menu::RecipeLine,
            models::menu::PublicMenuItem,
            models::menu::PublicMenuCategory,
            handlers::menu::CategoryPayload,
            handlers::menu::MenuItemPayload,
            handlers::menu::AvailabilityPayload,
            handlers::menu::RecipeLinePayload,
            handlers::menu::RecipePayload,

            // --- Inventory ---
            models::inventory::MaterialStatus,
            models::inventory::Material,
            models::inventory::MovementReason,
            models::inventory::StockMovement,
            handlers::inventory::MaterialPayload,
            handlers::inventory::CreateMaterialPayload,
            handlers::inventory::RestockPayload,
            handlers::inventory::AdjustPayload,

            // --- Orders ---
            models::orders::OrderStatus,
            models::orders::OrderType,
            models::orders::DepartmentStatus,
            models::orders::Order,
            models::orders::OrderItem,
            models::orders::OrderDepartment,
            models::orders::OrderDetail,
            models::orders::OrderTracking,
            models::orders::OrderPage,
            models::orders::CartItemRequest,
            models::orders::QuoteRequest,
            models::orders::PlaceOrderRequest,
            models::orders::QueueEntry,
            handlers::orders::UpdateStatusPayload,
            handlers::orders::DepartmentStatusPayload,

            // --- Offers ---
            models::offers::OfferKind,
            models::offers::Offer,
            models::offers::AppliedOffer,
            models::offers::PriceBreakdown,
            models::offers::PromoCodeCheck,
            handlers::offers::OfferPayload,

            // --- Notifications ---
            models::notifications::NotificationKind,
            models::notifications::Notification,
            models::notifications::UnreadCount,
            handlers::notifications::MarkedRead,

            // --- Printers & QR ---
            models::printers::PaperWidth,
            models::printers::Printer,
            models::printers::PrintResult,
            handlers::printers::PrinterPayload,
            models::qr::TableQr,
            models::qr::QrFormat,
            handlers::qr_codes::TableQrPayload,

            // --- Reports ---
            models::reports::SalesSummary,
            models::reports::DailySales,
            models::reports::TopItem,
            models::reports::DepartmentSales,
            models::reports::InventoryValuation,

            // --- Settings ---
            models::settings::RestaurantSettings,
            models::settings::UpdateSettingsRequest,
        )
    ),
    tags(
        (name = "Public", description = "Customer menu, checkout and tracking"),
        (name = "Auth", description = "Login and current staff member"),
        (name = "Staff", description = "Staff accounts and permissions"),
        (name = "Menu", description = "Categories, items and recipes"),
        (name = "Inventory", description = "Materials, stock movements and alerts"),
        (name = "Orders", description = "Order lifecycle and department queues"),
        (name = "Offers", description = "Automatic offers and promo codes"),
        (name = "Notifications", description = "Staff notification feed"),
        (name = "Printers", description = "Thermal printers and tickets"),
        (name = "QR Codes", description = "Table QR codes"),
        (name = "Reports", description = "Sales and stock reports"),
        (name = "Settings", description = "Restaurant details and theme")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qr_images_are_documented_as_png() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        for path in ["/api/qr-codes/{id}/image", "/api/qr-codes/menu/image", "/api/public/menu/qr"] {
            let content = &doc["paths"][path]["get"]["responses"]["200"]["content"];
            assert!(content["image/png"].is_object(), "{path}");
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert_eq!(doc["components"]["securitySchemes"]["api_jwt"]["scheme"], "bearer");
    }
}
