// src/db/order_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, FromRow, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        menu::Department,
        orders::{
            DepartmentStatus, Order, OrderDepartment, OrderDetail, OrderItem, OrderStatus,
            OrderType,
        },
    },
};

pub struct NewOrder<'a> {
    pub customer_name: &'a str,
    pub customer_phone: &'a str,
    pub order_type: OrderType,
    pub table_number: Option<i32>,
    pub delivery_address: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub service_charge: Decimal,
    pub total: Decimal,
    pub offer_id: Option<Uuid>,
    pub promo_code: Option<&'a str>,
    pub inventory_consumed: bool,
}

pub struct NewOrderItem<'a> {
    pub menu_item_id: Uuid,
    pub name: &'a str,
    pub department: Department,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub notes: Option<&'a str>,
}

#[derive(Debug, Default, Clone)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

// Order header joined with one department's progress.
#[derive(Debug, FromRow)]
pub struct QueueRow {
    pub order_id: Uuid,
    pub order_number: i64,
    pub order_type: OrderType,
    pub table_number: Option<i32>,
    pub order_status: OrderStatus,
    pub department_status: DepartmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Inserts
    // ---

    pub async fn insert_order<'e, E>(&self, executor: E, order: &NewOrder<'_>) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (
                customer_name, customer_phone, order_type, table_number, delivery_address, notes,
                subtotal, discount_amount, tax_amount, service_charge, total, offer_id, promo_code,
                inventory_consumed
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(order.customer_name)
        .bind(order.customer_phone)
        .bind(order.order_type)
        .bind(order.table_number)
        .bind(order.delivery_address)
        .bind(order.notes)
        .bind(order.subtotal)
        .bind(order.discount_amount)
        .bind(order.tax_amount)
        .bind(order.service_charge)
        .bind(order.total)
        .bind(order.offer_id)
        .bind(order.promo_code)
        .bind(order.inventory_consumed)
        .fetch_one(executor)
        .await?;
        Ok(created)
    }

    pub async fn insert_item<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        item: &NewOrderItem<'_>,
    ) -> Result<OrderItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, OrderItem>(
            r#"
            INSERT INTO order_items
                (order_id, menu_item_id, name, department, quantity, unit_price, line_total, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(item.menu_item_id)
        .bind(item.name)
        .bind(item.department)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.line_total)
        .bind(item.notes)
        .fetch_one(executor)
        .await?;
        Ok(created)
    }

    pub async fn insert_department<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        department: Department,
    ) -> Result<OrderDepartment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, OrderDepartment>(
            "INSERT INTO order_departments (order_id, department) VALUES ($1, $2) RETURNING *",
        )
        .bind(order_id)
        .bind(department)
        .fetch_one(executor)
        .await?;
        Ok(created)
    }

    // ---
    // Reads
    // ---

    pub async fn get_order<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(order)
    }

    pub async fn lock_order<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(order)
    }

    pub async fn items<'e, E>(&self, executor: E, order_id: Uuid) -> Result<Vec<OrderItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = $1 ORDER BY department ASC, name ASC",
        )
        .bind(order_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn departments<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
    ) -> Result<Vec<OrderDepartment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let departments = sqlx::query_as::<_, OrderDepartment>(
            "SELECT * FROM order_departments WHERE order_id = $1 ORDER BY department ASC",
        )
        .bind(order_id)
        .fetch_all(executor)
        .await?;
        Ok(departments)
    }

    /// Order with its lines and department progress.
    pub async fn find_detail(&self, conn: &mut PgConnection, id: Uuid) -> Result<Option<OrderDetail>, AppError> {
        let Some(order) = self.get_order(&mut *conn, id).await? else {
            return Ok(None);
        };
        let items = self.items(&mut *conn, id).await?;
        let departments = self.departments(&mut *conn, id).await?;
        Ok(Some(OrderDetail { order, items, departments }))
    }

    pub async fn list_orders(&self, filter: &OrderFilter, limit: i64, offset: i64) -> Result<Vec<Order>, AppError> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE ($1::order_status IS NULL OR status = $1)
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at < $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.status)
        .bind(filter.from)
        .bind(filter.to)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    pub async fn count_orders(&self, filter: &OrderFilter) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE ($1::order_status IS NULL OR status = $1)
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at < $3)
            "#,
        )
        .bind(filter.status)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    // ---
    // Status
    // ---

    /// Moves the order to `status`, stamping `delivered_at`/`cancelled_at`.
    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: OrderStatus,
        cancel_reason: Option<&str>,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET status = $2,
                cancel_reason = COALESCE($3, cancel_reason),
                delivered_at = CASE WHEN $2 = 'delivered'::order_status THEN NOW() ELSE delivered_at END,
                cancelled_at = CASE WHEN $2 = 'cancelled'::order_status THEN NOW() ELSE cancelled_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(cancel_reason)
        .fetch_one(executor)
        .await?;
        Ok(order)
    }

    pub async fn mark_inventory_restored<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE orders SET inventory_restored = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn set_department_status<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        department: Department,
        status: DepartmentStatus,
    ) -> Result<Option<OrderDepartment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, OrderDepartment>(
            r#"
            UPDATE order_departments
            SET status = $3, updated_at = NOW()
            WHERE order_id = $1 AND department = $2
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(department)
        .bind(status)
        .fetch_optional(executor)
        .await?;
        Ok(updated)
    }

    pub async fn set_all_departments_ready<'e, E>(&self, executor: E, order_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE order_departments
            SET status = 'ready', updated_at = NOW()
            WHERE order_id = $1 AND status <> 'ready'
            "#,
        )
        .bind(order_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    // ---
    // Department queues
    // ---

    pub async fn queue(&self, department: Department) -> Result<Vec<QueueRow>, AppError> {
        let rows = sqlx::query_as::<_, QueueRow>(
            r#"
            SELECT
                o.id AS order_id, o.order_number, o.order_type, o.table_number,
                o.status AS order_status, d.status AS department_status, o.notes, o.created_at
            FROM orders o
            JOIN order_departments d ON d.order_id = o.id
            WHERE d.department = $1
              AND d.status <> 'ready'
              AND o.status IN ('confirmed', 'preparing')
            ORDER BY o.created_at ASC
            "#,
        )
        .bind(department)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn items_for_orders(
        &self,
        order_ids: &[Uuid],
        department: Department,
    ) -> Result<Vec<OrderItem>, AppError> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT * FROM order_items
            WHERE order_id = ANY($1) AND department = $2
            ORDER BY name ASC
            "#,
        )
        .bind(order_ids)
        .bind(department)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }
}
