// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use serde::Serialize;
use std::marker::PhantomData;
use utoipa::ToSchema;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::StaffRole,
};

/// A permission known at compile time.
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// Every permission registers itself here so the API can list them.
pub struct PermissionInfo {
    pub slug: &'static str,
    pub description: &'static str,
}

::inventory::collect!(PermissionInfo);

macro_rules! permission {
    ($name:ident, $slug:literal, $description:literal) => {
        pub struct $name;

        impl PermissionDef for $name {
            fn slug() -> &'static str {
                $slug
            }
        }

        ::inventory::submit! {
            PermissionInfo { slug: $slug, description: $description }
        }
    };
}

permission!(PermMenuWrite, "menu:write", "Create and edit categories, menu items and recipes");
permission!(PermInventoryRead, "inventory:read", "View materials, stock movements and alerts");
permission!(PermInventoryWrite, "inventory:write", "Create materials, restock and adjust stock");
permission!(PermOrdersRead, "orders:read", "View orders and department queues");
permission!(PermOrdersWrite, "orders:write", "Change order status and cancel orders");
permission!(PermOrdersPrepare, "orders:prepare", "Update department preparation status");
permission!(PermOffersWrite, "offers:write", "Manage offers and promo codes");
permission!(PermStaffManage, "staff:manage", "Manage staff accounts");
permission!(PermSettingsWrite, "settings:write", "Edit restaurant settings, theme and QR codes");
permission!(PermReportsRead, "reports:read", "View sales and inventory reports");
permission!(PermPrintersWrite, "printers:write", "Configure printers and print tickets");
permission!(PermNotificationsRead, "notifications:read", "Read the notification center");

/// Static role matrix.
pub fn role_has_permission(role: StaffRole, slug: &str) -> bool {
    match role {
        StaffRole::Admin => true,
        StaffRole::Manager => slug != "staff:manage",
        StaffRole::Cashier => matches!(
            slug,
            "orders:read" | "orders:write" | "orders:prepare" | "notifications:read" | "printers:write"
        ),
        StaffRole::Kitchen | StaffRole::Barista | StaffRole::Shisha => matches!(
            slug,
            "orders:read" | "orders:prepare" | "inventory:read" | "notifications:read"
        ),
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionView {
    #[schema(example = "inventory:read")]
    pub slug: String,
    pub description: String,
    pub roles: Vec<StaffRole>,
}

pub fn list_permissions() -> Vec<PermissionView> {
    const ROLES: [StaffRole; 6] = [
        StaffRole::Admin,
        StaffRole::Manager,
        StaffRole::Cashier,
        StaffRole::Kitchen,
        StaffRole::Barista,
        StaffRole::Shisha,
    ];

    let mut perms: Vec<PermissionView> = ::inventory::iter::<PermissionInfo>
        .into_iter()
        .map(|p| PermissionView {
            slug: p.slug.to_string(),
            description: p.description.to_string(),
            roles: ROLES.into_iter().filter(|r| role_has_permission(*r, p.slug)).collect(),
        })
        .collect();
    perms.sort_by(|a, b| a.slug.cmp(&b.slug));
    perms
}

/// Extractor that rejects the request unless the staff member's role grants `T`.
pub struct RequirePermission<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let Ok(locale) = Locale::from_request_parts(parts, state).await;

        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        let required = T::slug();
        if !role_has_permission(user.0.role, required) {
            tracing::warn!(staff_id = %user.0.id, permission = required, "permission denied");
            return Err(AppError::Forbidden(required).to_api_error(&locale, &app_state.i18n_store));
        }

        Ok(RequirePermission(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_registered_permission_is_listed_once() {
        let perms = list_permissions();
        assert_eq!(perms.len(), 12);
        let mut slugs: Vec<_> = perms.iter().map(|p| p.slug.as_str()).collect();
        slugs.dedup();
        assert_eq!(slugs.len(), 12);
        assert!(slugs.contains(&PermInventoryWrite::slug()));
    }

    #[test]
    fn admin_holds_everything() {
        for p in list_permissions() {
            assert!(p.roles.contains(&StaffRole::Admin), "{}", p.slug);
        }
    }

    #[test]
    fn only_admin_manages_staff() {
        let staff = list_permissions()
            .into_iter()
            .find(|p| p.slug == PermStaffManage::slug())
            .unwrap();
        assert_eq!(staff.roles, vec![StaffRole::Admin]);
    }

    #[test]
    fn stations_prepare_but_do_not_cancel() {
        for role in [StaffRole::Kitchen, StaffRole::Barista, StaffRole::Shisha] {
            assert!(role_has_permission(role, PermOrdersPrepare::slug()));
            assert!(!role_has_permission(role, PermOrdersWrite::slug()));
            assert!(!role_has_permission(role, PermMenuWrite::slug()));
        }
    }

    #[test]
    fn cashier_cannot_touch_stock_or_settings() {
        assert!(!role_has_permission(StaffRole::Cashier, PermInventoryWrite::slug()));
        assert!(!role_has_permission(StaffRole::Cashier, PermSettingsWrite::slug()));
        assert!(role_has_permission(StaffRole::Cashier, PermOrdersWrite::slug()));
    }
}
