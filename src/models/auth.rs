// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::menu::Department;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "staff_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Admin,
    Manager,
    Cashier,
    Kitchen,
    Barista,
    Shisha,
}

impl StaffRole {
    /// Station roles only work their own department queue.
    pub fn department(&self) -> Option<Department> {
        match self {
            StaffRole::Kitchen => Some(Department::Kitchen),
            StaffRole::Barista => Some(Department::Barista),
            StaffRole::Shisha => Some(Department::Shisha),
            _ => None,
        }
    }
}

// A staff account as stored in the database
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    pub id: Uuid,
    #[schema(example = "Maria Silva")]
    pub name: String,
    #[schema(example = "maria@restaurant.com")]
    pub email: String,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password_hash: String,

    pub role: StaffRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(email(message = "The email is invalid."))]
    #[schema(example = "admin@restaurant.com")]
    pub email: String,
    #[validate(length(min = 1, message = "The password is required."))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStaffPayload {
    #[validate(length(min = 1, max = 120, message = "The name is required."))]
    pub name: String,
    #[validate(email(message = "The email is invalid."))]
    pub email: String,
    #[validate(length(min = 8, message = "The password must have at least 8 characters."))]
    pub password: String,
    pub role: StaffRole,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStaffPayload {
    #[validate(length(min = 1, max = 120, message = "The name is required."))]
    pub name: String,
    pub role: StaffRole,
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordPayload {
    #[validate(length(min = 8, message = "The password must have at least 8 characters."))]
    pub new_password: String,
}

// JWT claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: StaffRole,
    pub exp: usize,
    pub iat: usize,
}
