// src/db/menu_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::menu::{Category, Department, MenuItem, PublicMenuItem, RecipeIngredient, RecipeLine},
};

// Column set shared by inserts and updates of menu items.
pub struct MenuItemFields<'a> {
    pub category_id: Uuid,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub price: Decimal,
    pub department: Department,
    pub image_url: Option<&'a str>,
    pub is_available: bool,
    pub sort_order: i32,
}

#[derive(Clone)]
pub struct MenuRepository {
    pool: PgPool,
}

impl MenuRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Categories
    // ---

    pub async fn list_categories(&self, active_only: bool) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT * FROM categories
            WHERE ($1 = FALSE OR is_active)
            ORDER BY sort_order ASC, name ASC
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn get_category<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(category)
    }

    pub async fn upsert_category<'e, E>(
        &self,
        executor: E,
        id: Option<Uuid>,
        name: &str,
        description: Option<&str>,
        image_url: Option<&str>,
        sort_order: i32,
        is_active: bool,
    ) -> Result<Option<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // With an id this is an update of an existing row; without one, an insert.
        let query = match id {
            Some(_) => {
                r#"
                UPDATE categories
                SET name = $2, description = $3, image_url = $4, sort_order = $5,
                    is_active = $6, updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#
            }
            None => {
                r#"
                INSERT INTO categories (id, name, description, image_url, sort_order, is_active)
                VALUES (COALESCE($1, gen_random_uuid()), $2, $3, $4, $5, $6)
                RETURNING *
                "#
            }
        };

        sqlx::query_as::<_, Category>(query)
            .bind(id)
            .bind(name)
            .bind(description)
            .bind(image_url)
            .bind(sort_order)
            .bind(is_active)
            .fetch_optional(executor)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return AppError::CategoryNameAlreadyExists(name.to_string());
                    }
                }
                e.into()
            })
    }

    pub async fn count_items_in_category<'e, E>(&self, executor: E, id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM menu_items WHERE category_id = $1")
            .bind(id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    pub async fn delete_category<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---
    // Menu items
    // ---

    pub async fn list_items(&self, category_id: Option<Uuid>) -> Result<Vec<MenuItem>, AppError> {
        let items = sqlx::query_as::<_, MenuItem>(
            r#"
            SELECT * FROM menu_items
            WHERE ($1::uuid IS NULL OR category_id = $1)
            ORDER BY sort_order ASC, name ASC
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn get_item<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<MenuItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, MenuItem>("SELECT * FROM menu_items WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(item)
    }

    pub async fn get_items_by_ids<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<Vec<MenuItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, MenuItem>("SELECT * FROM menu_items WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(executor)
            .await?;
        Ok(items)
    }

    pub async fn create_item<'e, E>(&self, executor: E, fields: &MenuItemFields<'_>) -> Result<MenuItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, MenuItem>(
            r#"
            INSERT INTO menu_items
                (category_id, name, description, price, department, image_url, is_available, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(fields.category_id)
        .bind(fields.name)
        .bind(fields.description)
        .bind(fields.price)
        .bind(fields.department)
        .bind(fields.image_url)
        .bind(fields.is_available)
        .bind(fields.sort_order)
        .fetch_one(executor)
        .await?;
        Ok(item)
    }

    pub async fn update_item<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        fields: &MenuItemFields<'_>,
    ) -> Result<Option<MenuItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, MenuItem>(
            r#"
            UPDATE menu_items
            SET category_id = $2, name = $3, description = $4, price = $5, department = $6,
                image_url = $7, is_available = $8, sort_order = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(fields.category_id)
        .bind(fields.name)
        .bind(fields.description)
        .bind(fields.price)
        .bind(fields.department)
        .bind(fields.image_url)
        .bind(fields.is_available)
        .bind(fields.sort_order)
        .fetch_optional(executor)
        .await?;
        Ok(item)
    }

    pub async fn set_availability<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        is_available: bool,
    ) -> Result<Option<MenuItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, MenuItem>(
            "UPDATE menu_items SET is_available = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(is_available)
        .fetch_optional(executor)
        .await?;
        Ok(item)
    }

    pub async fn delete_item<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_foreign_key_violation() {
                        return AppError::MenuItemHasOrders;
                    }
                }
                AppError::from(e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    // ---
    // Recipes
    // ---

    pub async fn get_recipe<'e, E>(&self, executor: E, menu_item_id: Uuid) -> Result<Vec<RecipeLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, RecipeLine>(
            r#"
            SELECT r.material_id, m.name AS material_name, m.unit, r.quantity
            FROM recipe_ingredients r
            JOIN materials m ON m.id = r.material_id
            WHERE r.menu_item_id = $1
            ORDER BY m.name ASC
            "#,
        )
        .bind(menu_item_id)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    pub async fn recipes_for_items<'e, E>(
        &self,
        executor: E,
        menu_item_ids: &[Uuid],
    ) -> Result<Vec<RecipeIngredient>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, RecipeIngredient>(
            "SELECT menu_item_id, material_id, quantity FROM recipe_ingredients WHERE menu_item_id = ANY($1)",
        )
        .bind(menu_item_ids)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn clear_recipe<'e, E>(&self, executor: E, menu_item_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM recipe_ingredients WHERE menu_item_id = $1")
            .bind(menu_item_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn add_recipe_line<'e, E>(
        &self,
        executor: E,
        menu_item_id: Uuid,
        material_id: Uuid,
        quantity: Decimal,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "INSERT INTO recipe_ingredients (menu_item_id, material_id, quantity) VALUES ($1, $2, $3)",
        )
        .bind(menu_item_id)
        .bind(material_id)
        .bind(quantity)
        .execute(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_foreign_key_violation() {
                    return AppError::ResourceNotFound("material");
                }
            }
            AppError::from(e)
        })?;
        Ok(())
    }

    // ---
    // Public menu
    // ---

    /// Available items of active categories, flagged with whether every recipe
    /// material is still in stock.
    pub async fn public_items(&self) -> Result<Vec<PublicMenuItem>, AppError> {
        let items = sqlx::query_as::<_, PublicMenuItem>(
            r#"
            SELECT
                i.id, i.category_id, i.name, i.description, i.price, i.department, i.image_url,
                NOT EXISTS (
                    SELECT 1 FROM recipe_ingredients r
                    JOIN materials m ON m.id = r.material_id
                    WHERE r.menu_item_id = i.id AND m.status = 'out_of_stock'
                ) AS in_stock
            FROM menu_items i
            JOIN categories c ON c.id = i.category_id
            WHERE i.is_available AND c.is_active
            ORDER BY i.sort_order ASC, i.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }
}
