// src/db/inventory_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::inventory::{Material, MaterialStatus, MovementReason, StockMovement},
};

pub struct MaterialFields<'a> {
    pub name: &'a str,
    pub unit: &'a str,
    pub min_stock: Decimal,
    pub alert_stock: Decimal,
    pub supplier: Option<&'a str>,
}

fn map_unique_name(name: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return AppError::MaterialNameAlreadyExists(name.to_string());
            }
        }
        e.into()
    }
}

#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Reads
    // ---

    pub async fn list_materials(
        &self,
        status: Option<MaterialStatus>,
        search: Option<&str>,
    ) -> Result<Vec<Material>, AppError> {
        let materials = sqlx::query_as::<_, Material>(
            r#"
            SELECT * FROM materials
            WHERE ($1::material_status IS NULL OR status = $1)
              AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%')
            ORDER BY name ASC
            "#,
        )
        .bind(status)
        .bind(search)
        .fetch_all(&self.pool)
        .await?;
        Ok(materials)
    }

    pub async fn get_material<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Material>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let material = sqlx::query_as::<_, Material>("SELECT * FROM materials WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(material)
    }

    /// Row lock on a single material for the rest of the transaction.
    pub async fn get_material_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Material>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let material = sqlx::query_as::<_, Material>("SELECT * FROM materials WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(material)
    }

    /// Locks every listed material. Rows are locked in ascending id order so
    /// concurrent checkouts touching the same materials cannot deadlock.
    pub async fn lock_materials<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<Vec<Material>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let materials = sqlx::query_as::<_, Material>(
            "SELECT * FROM materials WHERE id = ANY($1) ORDER BY id ASC FOR UPDATE",
        )
        .bind(ids)
        .fetch_all(executor)
        .await?;
        Ok(materials)
    }

    pub async fn alerts(&self) -> Result<Vec<Material>, AppError> {
        let materials = sqlx::query_as::<_, Material>(
            r#"
            SELECT * FROM materials
            WHERE status IN ('low_stock', 'out_of_stock')
            ORDER BY status DESC, name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(materials)
    }

    pub async fn is_used_in_recipe<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let used: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM recipe_ingredients WHERE material_id = $1)",
        )
        .bind(id)
        .fetch_one(executor)
        .await?;
        Ok(used)
    }

    // ---
    // Writes
    // ---

    pub async fn create_material<'e, E>(
        &self,
        executor: E,
        fields: &MaterialFields<'_>,
        current_stock: Decimal,
        cost_per_unit: Decimal,
        status: MaterialStatus,
    ) -> Result<Material, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Material>(
            r#"
            INSERT INTO materials
                (name, unit, current_stock, min_stock, alert_stock, cost_per_unit, supplier, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(fields.name)
        .bind(fields.unit)
        .bind(current_stock)
        .bind(fields.min_stock)
        .bind(fields.alert_stock)
        .bind(cost_per_unit)
        .bind(fields.supplier)
        .bind(status)
        .fetch_one(executor)
        .await
        .map_err(map_unique_name(fields.name))
    }

    pub async fn update_material<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        fields: &MaterialFields<'_>,
        status: MaterialStatus,
    ) -> Result<Option<Material>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Material>(
            r#"
            UPDATE materials
            SET name = $2, unit = $3, min_stock = $4, alert_stock = $5, supplier = $6,
                status = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(fields.name)
        .bind(fields.unit)
        .bind(fields.min_stock)
        .bind(fields.alert_stock)
        .bind(fields.supplier)
        .bind(status)
        .fetch_optional(executor)
        .await
        .map_err(map_unique_name(fields.name))
    }

    /// Writes the new stock level, cost and derived status in one statement.
    pub async fn set_stock<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        current_stock: Decimal,
        cost_per_unit: Decimal,
        status: MaterialStatus,
    ) -> Result<Material, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let material = sqlx::query_as::<_, Material>(
            r#"
            UPDATE materials
            SET current_stock = $2, cost_per_unit = $3, status = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(current_stock)
        .bind(cost_per_unit)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(material)
    }

    pub async fn delete_material<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM materials WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_foreign_key_violation() {
                        return AppError::MaterialInUse;
                    }
                }
                AppError::from(e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    // ---
    // Ledger
    // ---

    pub async fn record_movement<'e, E>(
        &self,
        executor: E,
        material_id: Uuid,
        quantity_changed: Decimal,
        reason: MovementReason,
        order_id: Option<Uuid>,
        notes: Option<&str>,
    ) -> Result<StockMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movement = sqlx::query_as::<_, StockMovement>(
            r#"
            INSERT INTO stock_movements (material_id, quantity_changed, reason, order_id, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(material_id)
        .bind(quantity_changed)
        .bind(reason)
        .bind(order_id)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(movement)
    }

    pub async fn movements(&self, material_id: Uuid, limit: i64) -> Result<Vec<StockMovement>, AppError> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM stock_movements
            WHERE material_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(material_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }

    /// Net quantity taken from each material by an order's consumption
    /// movements (positive numbers).
    pub async fn consumed_by_order<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
    ) -> Result<Vec<(Uuid, Decimal)>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, (Uuid, Decimal)>(
            r#"
            SELECT material_id, -SUM(quantity_changed)
            FROM stock_movements
            WHERE order_id = $1 AND reason = 'consumption'
            GROUP BY material_id
            ORDER BY material_id ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }
}
