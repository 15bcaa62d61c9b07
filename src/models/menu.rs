// src/models/menu.rs

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;

// Fulfillment queue an order line is routed to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "department", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Department {
    Kitchen,
    Barista,
    Shisha,
}

impl Department {
    pub const ALL: [Department; 3] = [Department::Kitchen, Department::Barista, Department::Shisha];

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Kitchen => "kitchen",
            Department::Barista => "barista",
            Department::Shisha => "shisha",
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    #[schema(example = "Hot drinks")]
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: Uuid,
    pub category_id: Uuid,
    #[schema(example = "Cappuccino")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "3.50")]
    pub price: Decimal,
    pub department: Department,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// One recipe row joined with its material.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeLine {
    pub material_id: Uuid,
    pub material_name: String,
    pub unit: String,
    #[schema(example = "0.018")]
    pub quantity: Decimal,
}

// Raw recipe row, used by stock consumption.
#[derive(Debug, Clone, FromRow)]
pub struct RecipeIngredient {
    pub menu_item_id: Uuid,
    pub material_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicMenuItem {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub department: Department,
    pub image_url: Option<String>,
    /// False when any recipe material is out of stock.
    pub in_stock: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicMenuCategory {
    #[serde(flatten)]
    pub category: Category,
    pub items: Vec<PublicMenuItem>,
}
