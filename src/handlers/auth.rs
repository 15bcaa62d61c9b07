// src/handlers/auth.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermStaffManage, RequirePermission},
    },
    models::auth::{
        AuthResponse, CreateStaffPayload, LoginPayload, ResetPasswordPayload, StaffMember,
        UpdateStaffPayload,
    },
};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Session token", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account disabled")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let token = app_state
        .auth_service
        .login(&payload.email, &payload.password)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(AuthResponse { token })))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses((status = 200, description = "The signed-in staff member", body = StaffMember)),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(staff): AuthenticatedUser) -> Json<StaffMember> {
    Json(staff)
}

// ---
// Staff management
// ---

#[utoipa::path(
    get,
    path = "/api/staff",
    tag = "Staff",
    responses((status = 200, description = "All staff accounts", body = Vec<StaffMember>)),
    security(("api_jwt" = []))
)]
pub async fn list_staff(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermStaffManage>,
) -> Result<impl IntoResponse, ApiError> {
    let staff = app_state
        .auth_service
        .list_staff()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(staff)))
}

#[utoipa::path(
    post,
    path = "/api/staff",
    tag = "Staff",
    request_body = CreateStaffPayload,
    responses(
        (status = 201, description = "Staff account created", body = StaffMember),
        (status = 409, description = "Email already in use")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_staff(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermStaffManage>,
    Json(payload): Json<CreateStaffPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let staff = app_state
        .auth_service
        .create_staff(&payload.name, &payload.email, &payload.password, payload.role)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(staff)))
}

#[utoipa::path(
    put,
    path = "/api/staff/{id}",
    tag = "Staff",
    request_body = UpdateStaffPayload,
    params(("id" = Uuid, Path, description = "Staff id")),
    responses(
        (status = 200, description = "Staff account updated", body = StaffMember),
        (status = 400, description = "Cannot demote or disable yourself"),
        (status = 404, description = "Not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_staff(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequirePermission<PermStaffManage>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStaffPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let staff = app_state
        .auth_service
        .update_staff(&actor, id, &payload.name, payload.role, payload.is_active)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(staff)))
}

#[utoipa::path(
    put,
    path = "/api/staff/{id}/password",
    tag = "Staff",
    request_body = ResetPasswordPayload,
    params(("id" = Uuid, Path, description = "Staff id")),
    responses((status = 204, description = "Password replaced")),
    security(("api_jwt" = []))
)]
pub async fn reset_password(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermStaffManage>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .auth_service
        .reset_password(id, &payload.new_password)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/staff/{id}",
    tag = "Staff",
    params(("id" = Uuid, Path, description = "Staff id")),
    responses(
        (status = 204, description = "Staff account deleted"),
        (status = 400, description = "Cannot delete yourself")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_staff(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequirePermission<PermStaffManage>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .auth_service
        .delete_staff(&actor, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
