// src/services/notification_service.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::NotificationRepository,
    models::{
        inventory::Material,
        notifications::{NewNotification, Notification, NotificationKind},
        orders::Order,
    },
};

/// Alert for a material whose status just changed.
pub fn stock_alert(material: &Material, kind: NotificationKind) -> NewNotification {
    let stock = material.current_stock.normalize();
    let (title, message) = match kind {
        NotificationKind::OutOfStock => (
            "Out of stock".to_string(),
            format!("{} is out of stock.", material.name),
        ),
        NotificationKind::Restocked => (
            "Restocked".to_string(),
            format!("{} is back in stock ({} {}).", material.name, stock, material.unit),
        ),
        _ => (
            "Low stock".to_string(),
            format!("{} is running low ({} {} left).", material.name, stock, material.unit),
        ),
    };

    NewNotification { kind, title, message, material_id: Some(material.id), order_id: None }
}

pub fn new_order_alert(order: &Order) -> NewNotification {
    NewNotification {
        kind: NotificationKind::NewOrder,
        title: format!("New order #{}", order.order_number),
        message: format!("{} placed an order of {}.", order.customer_name, order.total),
        material_id: None,
        order_id: Some(order.id),
    }
}

pub fn cancelled_order_alert(order: &Order) -> NewNotification {
    let message = match &order.cancel_reason {
        Some(reason) => format!("Order #{} was cancelled: {reason}", order.order_number),
        None => format!("Order #{} was cancelled.", order.order_number),
    };
    NewNotification {
        kind: NotificationKind::OrderCancelled,
        title: format!("Order #{} cancelled", order.order_number),
        message,
        material_id: None,
        order_id: Some(order.id),
    }
}

#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
}

impl NotificationService {
    pub fn new(notification_repo: NotificationRepository) -> Self {
        Self { notification_repo }
    }

    /// Persists a notification on the caller's executor, usually its open transaction.
    pub async fn notify<'e, E>(&self, executor: E, notification: &NewNotification) -> Result<Notification, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = self.notification_repo.insert(executor, notification).await?;
        tracing::debug!(kind = ?created.kind, id = %created.id, "notification raised");
        Ok(created)
    }

    pub async fn list(&self, unread_only: bool, limit: i64) -> Result<Vec<Notification>, AppError> {
        self.notification_repo.list(unread_only, limit.clamp(1, 200)).await
    }

    pub async fn unread_count(&self) -> Result<i64, AppError> {
        self.notification_repo.unread_count().await
    }

    pub async fn mark_read(&self, id: Uuid) -> Result<Notification, AppError> {
        self.notification_repo
            .mark_read(id)
            .await?
            .ok_or(AppError::ResourceNotFound("notification"))
    }

    pub async fn mark_all_read(&self) -> Result<u64, AppError> {
        self.notification_repo.mark_all_read().await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.notification_repo.delete(id).await? {
            return Err(AppError::ResourceNotFound("notification"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inventory::MaterialStatus;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn milk(stock: rust_decimal::Decimal) -> Material {
        Material {
            id: Uuid::new_v4(),
            name: "Milk".into(),
            unit: "L".into(),
            current_stock: stock,
            min_stock: dec!(2),
            alert_stock: dec!(5),
            cost_per_unit: dec!(1.10),
            supplier: None,
            status: MaterialStatus::LowStock,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn stock_alerts_point_at_the_material() {
        let m = milk(dec!(3.000));
        let n = stock_alert(&m, NotificationKind::LowStock);
        assert_eq!(n.kind, NotificationKind::LowStock);
        assert_eq!(n.material_id, Some(m.id));
        assert_eq!(n.message, "Milk is running low (3 L left).");
    }

    #[test]
    fn out_of_stock_message_omits_quantity() {
        let n = stock_alert(&milk(dec!(0)), NotificationKind::OutOfStock);
        assert_eq!(n.title, "Out of stock");
        assert_eq!(n.message, "Milk is out of stock.");
    }
}
