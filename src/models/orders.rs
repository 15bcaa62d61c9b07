// src/models/orders.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::menu::Department;

// --- Lifecycle ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// One step forward, or cancellation from any open status.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (from, Cancelled) => !from.is_terminal(),
            (Pending, Confirmed) | (Confirmed, Preparing) | (Preparing, Ready) | (Ready, Delivered) => true,
            _ => false,
        }
    }

    /// Department work is only accepted while the order is in the kitchen.
    pub fn accepts_department_updates(&self) -> bool {
        matches!(self, OrderStatus::Confirmed | OrderStatus::Preparing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "order_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    DineIn,
    Takeaway,
    Delivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "department_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DepartmentStatus {
    Pending,
    Preparing,
    Ready,
}

impl DepartmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepartmentStatus::Pending => "pending",
            DepartmentStatus::Preparing => "preparing",
            DepartmentStatus::Ready => "ready",
        }
    }

    // Forward only. Pending may jump straight to ready.
    pub fn can_transition_to(&self, next: DepartmentStatus) -> bool {
        use DepartmentStatus::*;
        matches!((self, next), (Pending, Preparing) | (Pending, Ready) | (Preparing, Ready))
    }
}

/// Order status implied by its departments after one of them moved.
/// Returns `current` when the departments say nothing new.
pub fn derive_order_status(current: OrderStatus, departments: &[DepartmentStatus]) -> OrderStatus {
    if departments.is_empty() || !current.accepts_department_updates() {
        return current;
    }
    if departments.iter().all(|s| *s == DepartmentStatus::Ready) {
        OrderStatus::Ready
    } else if departments.iter().any(|s| *s != DepartmentStatus::Pending) {
        OrderStatus::Preparing
    } else {
        current
    }
}

// --- Records ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    #[schema(example = 1024)]
    pub order_number: i64,
    #[schema(example = "John Doe")]
    pub customer_name: String,
    #[schema(example = "+15550001111")]
    pub customer_phone: String,
    pub order_type: OrderType,
    pub table_number: Option<i32>,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub status: OrderStatus,
    #[schema(example = "24.00")]
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub service_charge: Decimal,
    #[schema(example = "26.40")]
    pub total: Decimal,
    pub offer_id: Option<Uuid>,
    pub promo_code: Option<String>,
    pub inventory_consumed: bool,
    pub inventory_restored: bool,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub menu_item_id: Uuid,
    #[schema(example = "Cappuccino")]
    pub name: String,
    pub department: Department,
    #[schema(example = 2)]
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDepartment {
    pub order_id: Uuid,
    pub department: Department,
    pub status: DepartmentStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub departments: Vec<OrderDepartment>,
}

impl OrderDetail {
    pub fn items_for(&self, department: Department) -> impl Iterator<Item = &OrderItem> {
        self.items.iter().filter(move |i| i.department == department)
    }
}

// What a customer sees when tracking their order.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderTracking {
    pub id: Uuid,
    pub order_number: i64,
    pub status: OrderStatus,
    pub total: Decimal,
    pub departments: Vec<OrderDepartment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderDetail> for OrderTracking {
    fn from(detail: OrderDetail) -> Self {
        Self {
            id: detail.order.id,
            order_number: detail.order.order_number,
            status: detail.order.status,
            total: detail.order.total,
            departments: detail.departments,
            created_at: detail.order.created_at,
            updated_at: detail.order.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
    pub data: Vec<Order>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

// --- Checkout input ---
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub menu_item_id: Uuid,
    #[validate(range(min = 1, max = 99, message = "Quantity must be between 1 and 99."))]
    #[schema(example = 2)]
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[validate(length(min = 1, message = "The cart is empty."), nested)]
    pub items: Vec<CartItemRequest>,
    pub promo_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1, max = 120, message = "The name is required."))]
    pub customer_name: String,
    #[validate(length(min = 5, max = 32, message = "The phone number is invalid."))]
    pub customer_phone: String,
    pub order_type: OrderType,
    pub table_number: Option<i32>,
    pub delivery_address: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    pub promo_code: Option<String>,
    #[validate(length(min = 1, message = "The cart is empty."), nested)]
    pub items: Vec<CartItemRequest>,
}

// One entry of a department queue.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub order_id: Uuid,
    pub order_number: i64,
    pub order_type: OrderType,
    pub table_number: Option<i32>,
    pub order_status: OrderStatus,
    pub department_status: DepartmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use DepartmentStatus as D;
    use OrderStatus::*;

    #[test]
    fn forward_transitions_are_one_step() {
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Preparing));
        assert!(Preparing.can_transition_to(Ready));
        assert!(Ready.can_transition_to(Delivered));

        assert!(!Pending.can_transition_to(Preparing));
        assert!(!Confirmed.can_transition_to(Delivered));
        assert!(!Ready.can_transition_to(Preparing));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn cancellation_only_from_open_orders() {
        for open in [Pending, Confirmed, Preparing, Ready] {
            assert!(open.can_transition_to(Cancelled), "{open:?}");
        }
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
    }

    #[test]
    fn department_moves_forward_only() {
        assert!(D::Pending.can_transition_to(D::Preparing));
        assert!(D::Pending.can_transition_to(D::Ready));
        assert!(D::Preparing.can_transition_to(D::Ready));
        assert!(!D::Ready.can_transition_to(D::Preparing));
        assert!(!D::Preparing.can_transition_to(D::Pending));
        assert!(!D::Ready.can_transition_to(D::Ready));
    }

    #[test]
    fn all_departments_ready_makes_the_order_ready() {
        assert_eq!(derive_order_status(Preparing, &[D::Ready, D::Ready]), Ready);
        assert_eq!(derive_order_status(Confirmed, &[D::Ready]), Ready);
    }

    #[test]
    fn any_started_department_means_preparing() {
        assert_eq!(derive_order_status(Confirmed, &[D::Preparing, D::Pending]), Preparing);
        assert_eq!(derive_order_status(Confirmed, &[D::Ready, D::Pending]), Preparing);
    }

    #[test]
    fn untouched_departments_keep_the_status() {
        assert_eq!(derive_order_status(Confirmed, &[D::Pending, D::Pending]), Confirmed);
        assert_eq!(derive_order_status(Confirmed, &[]), Confirmed);
    }

    #[test]
    fn closed_orders_are_not_rederived() {
        assert_eq!(derive_order_status(Cancelled, &[D::Ready]), Cancelled);
        assert_eq!(derive_order_status(Pending, &[D::Ready]), Pending);
    }

    #[test]
    fn quote_lines_are_validated_one_by_one() {
        let line = |quantity| CartItemRequest { menu_item_id: Uuid::new_v4(), quantity, notes: None };

        let empty = QuoteRequest { items: vec![], promo_code: None };
        assert!(empty.validate().unwrap_err().field_errors().contains_key("items"));

        let zero = QuoteRequest { items: vec![line(2), line(0)], promo_code: None };
        assert!(zero.validate().unwrap_err().errors().contains_key("items"));

        let ok = QuoteRequest { items: vec![line(2)], promo_code: Some("WELCOME5".into()) };
        assert!(ok.validate().is_ok());
    }
}
