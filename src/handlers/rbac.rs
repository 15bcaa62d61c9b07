// src/handlers/rbac.rs

use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::middleware::{
    auth::AuthenticatedUser,
    rbac::{self, PermissionView},
};

// GET /api/permissions
#[utoipa::path(
    get,
    path = "/api/permissions",
    tag = "Staff",
    responses((status = 200, description = "Permission slugs and the roles that hold them", body = Vec<PermissionView>)),
    security(("api_jwt" = []))
)]
pub async fn list_permissions(_user: AuthenticatedUser) -> impl IntoResponse {
    (StatusCode::OK, Json(rbac::list_permissions()))
}
