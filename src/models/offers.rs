// src/models/offers.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "offer_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OfferKind {
    Percentage,
    FixedAmount,
    BuyXGetY,
    FreeItem,
}

// A discount rule. With a `code` it is a promotion the customer has to enter;
// without one it applies automatically.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub id: Uuid,
    #[schema(example = "Happy hour")]
    pub name: String,
    pub description: Option<String>,
    pub kind: OfferKind,
    /// Percent for `percentage`, amount for `fixed_amount`, unused otherwise.
    #[schema(example = "10")]
    pub value: Decimal,
    pub buy_quantity: Option<i32>,
    pub get_quantity: Option<i32>,
    pub target_item_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub min_order_amount: Decimal,
    pub max_discount: Option<Decimal>,
    #[schema(example = "WELCOME10")]
    pub code: Option<String>,
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// A priced cart line, built from the menu, never from client prices.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub menu_item_id: Uuid,
    pub category_id: Uuid,
    pub unit_price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppliedOffer {
    pub id: Uuid,
    pub name: String,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub service_charge: Decimal,
    pub total: Decimal,
    pub applied_offer: Option<AppliedOffer>,
    /// Non-fatal issues, e.g. a promo code that matched nothing.
    pub warnings: Vec<String>,
}

// Answer to a public promo code check. Details are only given for valid codes.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromoCodeCheck {
    pub code: String,
    pub valid: bool,
    pub name: Option<String>,
    pub kind: Option<OfferKind>,
    pub value: Option<Decimal>,
    pub min_order_amount: Option<Decimal>,
}
