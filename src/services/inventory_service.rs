// src/services/inventory_service.rs

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{inventory_repo::MaterialFields, InventoryRepository},
    models::{
        inventory::{Material, MaterialStatus, MovementReason, StockMovement},
        menu::RecipeIngredient,
    },
    services::notification_service::{stock_alert, NotificationService},
};

/// Weighted average of the stock on hand and an incoming batch.
pub fn calculate_new_average_cost(
    current_qty: Decimal,
    current_avg: Decimal,
    incoming_qty: Decimal,
    incoming_cost: Decimal,
) -> Decimal {
    // Negative stock carries no value.
    let current_qty = current_qty.max(Decimal::ZERO);
    let total_current_value = current_qty * current_avg;
    let total_incoming_value = incoming_qty * incoming_cost;
    let new_total_qty = current_qty + incoming_qty;

    if new_total_qty <= Decimal::ZERO {
        return current_avg;
    }
    ((total_current_value + total_incoming_value) / new_total_qty).round_dp(4)
}

/// Total quantity of each material needed for a set of (menu item, quantity)
/// lines. Keyed by material id, so iteration order is the lock order.
pub fn compute_requirements(lines: &[(Uuid, i32)], recipes: &[RecipeIngredient]) -> BTreeMap<Uuid, Decimal> {
    let mut per_item: HashMap<Uuid, Vec<&RecipeIngredient>> = HashMap::new();
    for r in recipes {
        per_item.entry(r.menu_item_id).or_default().push(r);
    }

    let mut required: BTreeMap<Uuid, Decimal> = BTreeMap::new();
    for (menu_item_id, qty) in lines {
        for r in per_item.get(menu_item_id).into_iter().flatten() {
            *required.entry(r.material_id).or_default() += r.quantity * Decimal::from(*qty);
        }
    }
    required
}

/// First material that cannot cover its requirement.
pub fn check_availability(required: &BTreeMap<Uuid, Decimal>, materials: &[Material]) -> Result<(), AppError> {
    for (material_id, needed) in required {
        let Some(material) = materials.iter().find(|m| m.id == *material_id) else {
            return Err(AppError::ResourceNotFound("material"));
        };
        if material.current_stock < *needed {
            return Err(AppError::InsufficientStock {
                material: material.name.clone(),
                required: *needed,
                available: material.current_stock,
            });
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct InventoryService {
    inventory_repo: InventoryRepository,
    notification_service: NotificationService,
    pool: PgPool,
}

impl InventoryService {
    pub fn new(inventory_repo: InventoryRepository, notification_service: NotificationService, pool: PgPool) -> Self {
        Self { inventory_repo, notification_service, pool }
    }

    // Writes a new level and raises the notification for a status change.
    async fn apply_stock(
        &self,
        conn: &mut PgConnection,
        material: &Material,
        new_stock: Decimal,
        new_cost: Decimal,
    ) -> Result<Material, AppError> {
        let next_status = MaterialStatus::derive(new_stock, material.min_stock, material.alert_stock);
        let updated = self
            .inventory_repo
            .set_stock(&mut *conn, material.id, new_stock, new_cost, next_status)
            .await?;

        if let Some(kind) = material.status.transition_notification(next_status) {
            tracing::info!(material = %updated.name, from = ?material.status, to = ?next_status, "material status changed");
            self.notification_service.notify(&mut *conn, &stock_alert(&updated, kind)).await?;
        }
        Ok(updated)
    }

    // ---
    // Materials
    // ---

    pub async fn list_materials(
        &self,
        status: Option<MaterialStatus>,
        search: Option<&str>,
    ) -> Result<Vec<Material>, AppError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        self.inventory_repo.list_materials(status, search).await
    }

    pub async fn get_material(&self, id: Uuid) -> Result<Material, AppError> {
        self.inventory_repo
            .get_material(&self.pool, id)
            .await?
            .ok_or(AppError::ResourceNotFound("material"))
    }

    pub async fn create_material(
        &self,
        fields: &MaterialFields<'_>,
        initial_stock: Decimal,
        cost_per_unit: Decimal,
    ) -> Result<Material, AppError> {
        let mut tx = self.pool.begin().await?;

        let status = MaterialStatus::derive(initial_stock, fields.min_stock, fields.alert_stock);
        let material = self
            .inventory_repo
            .create_material(&mut *tx, fields, initial_stock, cost_per_unit, status)
            .await?;

        if initial_stock > Decimal::ZERO {
            self.inventory_repo
                .record_movement(&mut *tx, material.id, initial_stock, MovementReason::InitialStock, None, None)
                .await?;
        }

        tx.commit().await?;
        tracing::info!(material_id = %material.id, name = %material.name, "material created");
        Ok(material)
    }

    pub async fn update_material(&self, id: Uuid, fields: &MaterialFields<'_>) -> Result<Material, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = self
            .inventory_repo
            .get_material_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::ResourceNotFound("material"))?;

        // Thresholds may have moved, so the status is derived again.
        let next_status = MaterialStatus::derive(current.current_stock, fields.min_stock, fields.alert_stock);
        let updated = self
            .inventory_repo
            .update_material(&mut *tx, id, fields, next_status)
            .await?
            .ok_or(AppError::ResourceNotFound("material"))?;

        if let Some(kind) = current.status.transition_notification(next_status) {
            self.notification_service.notify(&mut *tx, &stock_alert(&updated, kind)).await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn delete_material(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        if self.inventory_repo.is_used_in_recipe(&mut *tx, id).await? {
            return Err(AppError::MaterialInUse);
        }
        if !self.inventory_repo.delete_material(&mut *tx, id).await? {
            return Err(AppError::ResourceNotFound("material"));
        }

        tx.commit().await?;
        Ok(())
    }

    // ---
    // Stock changes
    // ---

    pub async fn restock(
        &self,
        id: Uuid,
        quantity: Decimal,
        unit_cost: Option<Decimal>,
        notes: Option<&str>,
    ) -> Result<Material, AppError> {
        let mut tx = self.pool.begin().await?;

        let material = self
            .inventory_repo
            .get_material_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::ResourceNotFound("material"))?;

        let new_cost = match unit_cost {
            Some(cost) => calculate_new_average_cost(material.current_stock, material.cost_per_unit, quantity, cost),
            None => material.cost_per_unit,
        };

        let updated = self
            .apply_stock(&mut tx, &material, material.current_stock + quantity, new_cost)
            .await?;
        self.inventory_repo
            .record_movement(&mut *tx, id, quantity, MovementReason::Purchase, None, notes)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Sets the stock to an absolute count after a physical check or waste.
    pub async fn adjust(
        &self,
        id: Uuid,
        new_quantity: Decimal,
        reason: MovementReason,
        notes: Option<&str>,
    ) -> Result<Material, AppError> {
        let mut tx = self.pool.begin().await?;

        let material = self
            .inventory_repo
            .get_material_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::ResourceNotFound("material"))?;

        let delta = new_quantity - material.current_stock;
        let updated = self
            .apply_stock(&mut tx, &material, new_quantity, material.cost_per_unit)
            .await?;

        if !delta.is_zero() {
            self.inventory_repo
                .record_movement(&mut *tx, id, delta, reason, None, notes)
                .await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn movements(&self, id: Uuid, limit: i64) -> Result<Vec<StockMovement>, AppError> {
        // 404 rather than an empty ledger for unknown materials
        self.get_material(id).await?;
        self.inventory_repo.movements(id, limit.clamp(1, 500)).await
    }

    pub async fn alerts(&self) -> Result<Vec<Material>, AppError> {
        self.inventory_repo.alerts().await
    }

    // ---
    // Orders
    // ---

    /// Takes the recipe materials of an order out of stock inside the
    /// caller's transaction. Fails without touching anything when one of
    /// them is short.
    pub async fn consume_for_order(
        &self,
        conn: &mut PgConnection,
        order_id: Uuid,
        required: &BTreeMap<Uuid, Decimal>,
    ) -> Result<(), AppError> {
        if required.is_empty() {
            return Ok(());
        }

        let ids: Vec<Uuid> = required.keys().copied().collect();
        let materials = self.inventory_repo.lock_materials(&mut *conn, &ids).await?;
        check_availability(required, &materials)?;

        for material in &materials {
            let needed = required[&material.id];
            self.apply_stock(conn, material, material.current_stock - needed, material.cost_per_unit)
                .await?;
            self.inventory_repo
                .record_movement(&mut *conn, material.id, -needed, MovementReason::Consumption, Some(order_id), None)
                .await?;
        }

        tracing::debug!(%order_id, materials = materials.len(), "inventory consumed");
        Ok(())
    }

    /// Puts back exactly what the order's consumption movements removed.
    /// The caller guards against running this twice for the same order.
    pub async fn restore_for_order(&self, conn: &mut PgConnection, order_id: Uuid) -> Result<(), AppError> {
        let consumed = self.inventory_repo.consumed_by_order(&mut *conn, order_id).await?;
        if consumed.is_empty() {
            return Ok(());
        }

        let ids: Vec<Uuid> = consumed.iter().map(|(id, _)| *id).collect();
        let materials = self.inventory_repo.lock_materials(&mut *conn, &ids).await?;

        for (material_id, quantity) in consumed {
            let Some(material) = materials.iter().find(|m| m.id == material_id) else {
                // deleted since the order was placed
                continue;
            };
            self.apply_stock(conn, material, material.current_stock + quantity, material.cost_per_unit)
                .await?;
            self.inventory_repo
                .record_movement(&mut *conn, material_id, quantity, MovementReason::Restoration, Some(order_id), None)
                .await?;
        }

        tracing::info!(%order_id, "inventory restored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn material(id: Uuid, name: &str, stock: Decimal) -> Material {
        Material {
            id,
            name: name.into(),
            unit: "kg".into(),
            current_stock: stock,
            min_stock: dec!(0),
            alert_stock: dec!(0),
            cost_per_unit: dec!(1),
            supplier: None,
            status: MaterialStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn average_cost_weights_by_quantity() {
        // 10 @ 2.00 + 30 @ 4.00 = 140 / 40
        assert_eq!(calculate_new_average_cost(dec!(10), dec!(2), dec!(30), dec!(4)), dec!(3.5));
    }

    #[test]
    fn average_cost_from_empty_stock_is_the_batch_cost() {
        assert_eq!(calculate_new_average_cost(dec!(0), dec!(9), dec!(5), dec!(2.5)), dec!(2.5));
        // negative stock is treated as empty
        assert_eq!(calculate_new_average_cost(dec!(-3), dec!(9), dec!(5), dec!(2.5)), dec!(2.5));
    }

    #[test]
    fn requirements_sum_across_lines_sharing_materials() {
        let latte = Uuid::new_v4();
        let flat_white = Uuid::new_v4();
        let milk = Uuid::new_v4();
        let beans = Uuid::new_v4();

        let recipes = vec![
            RecipeIngredient { menu_item_id: latte, material_id: milk, quantity: dec!(0.200) },
            RecipeIngredient { menu_item_id: latte, material_id: beans, quantity: dec!(0.018) },
            RecipeIngredient { menu_item_id: flat_white, material_id: milk, quantity: dec!(0.150) },
            RecipeIngredient { menu_item_id: flat_white, material_id: beans, quantity: dec!(0.036) },
        ];

        let required = compute_requirements(&[(latte, 2), (flat_white, 1)], &recipes);
        assert_eq!(required[&milk], dec!(0.550));
        assert_eq!(required[&beans], dec!(0.072));
        assert_eq!(required.len(), 2);
    }

    #[test]
    fn items_without_recipe_need_nothing() {
        let water = Uuid::new_v4();
        assert!(compute_requirements(&[(water, 3)], &[]).is_empty());
    }

    #[test]
    fn requirement_order_is_ascending_by_id() {
        let item = Uuid::new_v4();
        let mut ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let recipes: Vec<_> = ids
            .iter()
            .map(|m| RecipeIngredient { menu_item_id: item, material_id: *m, quantity: dec!(1) })
            .collect();

        let keys: Vec<Uuid> = compute_requirements(&[(item, 1)], &recipes).into_keys().collect();
        ids.sort();
        assert_eq!(keys, ids);
    }

    #[test]
    fn shortfall_names_the_material() {
        let beans = Uuid::new_v4();
        let mut required = BTreeMap::new();
        required.insert(beans, dec!(0.5));

        let err = check_availability(&required, &[material(beans, "Coffee beans", dec!(0.2))]).unwrap_err();
        match err {
            AppError::InsufficientStock { material, required, available } => {
                assert_eq!(material, "Coffee beans");
                assert_eq!(required, dec!(0.5));
                assert_eq!(available, dec!(0.2));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn exact_stock_is_enough() {
        let beans = Uuid::new_v4();
        let mut required = BTreeMap::new();
        required.insert(beans, dec!(0.5));
        assert!(check_availability(&required, &[material(beans, "Coffee beans", dec!(0.5))]).is_ok());
    }
}
