// src/models/reports.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;

use crate::models::menu::Department;

// 1. Header cards for a period
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub order_count: i64,
    pub delivered_count: i64,
    pub cancelled_count: i64,
    pub gross_sales: Decimal,
    pub discounts: Decimal,
    pub taxes: Decimal,
    pub service_charges: Decimal,
    pub net_sales: Decimal,
    pub average_ticket: Decimal,
}

// 2. Sales chart
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailySales {
    pub day: NaiveDate,
    pub order_count: i64,
    pub total: Decimal,
}

// 3. Best sellers
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopItem {
    pub menu_item_id: Uuid,
    pub name: String,
    pub total_quantity: i64,
    pub total_revenue: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentSales {
    pub department: Department,
    pub item_count: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryValuation {
    pub total_value: Decimal,
    pub material_count: i64,
    pub active_count: i64,
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
}
