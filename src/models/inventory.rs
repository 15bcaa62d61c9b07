// src/models/inventory.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;

use crate::models::notifications::NotificationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "material_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MaterialStatus {
    Active,
    LowStock,
    OutOfStock,
}

impl MaterialStatus {
    /// Status is always derived from the stock levels, never set by hand.
    pub fn derive(current: Decimal, min_stock: Decimal, alert_stock: Decimal) -> Self {
        if current <= Decimal::ZERO {
            MaterialStatus::OutOfStock
        } else if current <= min_stock.max(alert_stock) {
            MaterialStatus::LowStock
        } else {
            MaterialStatus::Active
        }
    }

    /// Notification to raise when a material moves from `self` to `next`.
    pub fn transition_notification(self, next: MaterialStatus) -> Option<NotificationKind> {
        if self == next {
            return None;
        }
        match next {
            MaterialStatus::LowStock => Some(NotificationKind::LowStock),
            MaterialStatus::OutOfStock => Some(NotificationKind::OutOfStock),
            MaterialStatus::Active => Some(NotificationKind::Restocked),
        }
    }
}

// --- Material (ingredient) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: Uuid,
    #[schema(example = "Coffee beans")]
    pub name: String,
    #[schema(example = "kg")]
    pub unit: String,
    #[schema(example = "12.5")]
    pub current_stock: Decimal,
    #[schema(example = "2")]
    pub min_stock: Decimal,
    #[schema(example = "5")]
    pub alert_stock: Decimal,
    #[schema(example = "18.40")]
    pub cost_per_unit: Decimal,
    pub supplier: Option<String>,
    pub status: MaterialStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Material {
    pub fn derived_status(&self) -> MaterialStatus {
        MaterialStatus::derive(self.current_stock, self.min_stock, self.alert_stock)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "movement_reason", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    InitialStock,
    Purchase,
    Consumption,
    Restoration,
    Adjustment,
    Waste,
}

// --- Stock ledger ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    pub material_id: Uuid,
    pub quantity_changed: Decimal,
    pub reason: MovementReason,
    pub order_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn zero_or_negative_stock_is_out_of_stock() {
        assert_eq!(MaterialStatus::derive(dec!(0), dec!(1), dec!(2)), MaterialStatus::OutOfStock);
        assert_eq!(MaterialStatus::derive(dec!(-1), dec!(0), dec!(0)), MaterialStatus::OutOfStock);
    }

    #[test]
    fn low_stock_uses_the_higher_threshold() {
        // alert above min
        assert_eq!(MaterialStatus::derive(dec!(4), dec!(2), dec!(5)), MaterialStatus::LowStock);
        // min above alert
        assert_eq!(MaterialStatus::derive(dec!(4), dec!(5), dec!(2)), MaterialStatus::LowStock);
        // at the threshold counts as low
        assert_eq!(MaterialStatus::derive(dec!(5), dec!(2), dec!(5)), MaterialStatus::LowStock);
        assert_eq!(MaterialStatus::derive(dec!(5.001), dec!(2), dec!(5)), MaterialStatus::Active);
    }

    #[test]
    fn zero_thresholds_only_flag_empty_stock() {
        assert_eq!(MaterialStatus::derive(dec!(0.001), dec!(0), dec!(0)), MaterialStatus::Active);
    }

    #[test]
    fn notifications_only_on_change() {
        use MaterialStatus::*;
        assert_eq!(Active.transition_notification(Active), None);
        assert_eq!(LowStock.transition_notification(LowStock), None);
        assert_eq!(Active.transition_notification(LowStock), Some(NotificationKind::LowStock));
        assert_eq!(LowStock.transition_notification(OutOfStock), Some(NotificationKind::OutOfStock));
        assert_eq!(Active.transition_notification(OutOfStock), Some(NotificationKind::OutOfStock));
        assert_eq!(OutOfStock.transition_notification(Active), Some(NotificationKind::Restocked));
        assert_eq!(OutOfStock.transition_notification(LowStock), Some(NotificationKind::LowStock));
    }
}
