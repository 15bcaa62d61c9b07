// src/db/report_repo.rs

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::reports::{DailySales, DepartmentSales, InventoryValuation, SalesSummary, TopItem},
};

// All queries take a half-open range [from, to).
#[derive(Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // 1. Summary cards. Cancelled orders count, but carry no money.
    pub async fn sales_summary(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<SalesSummary, AppError> {
        let summary = sqlx::query_as::<_, SalesSummary>(
            r#"
            WITH period AS (
                SELECT * FROM orders WHERE created_at >= $1 AND created_at < $2
            ),
            billed AS (
                SELECT * FROM period WHERE status <> 'cancelled'
            )
            SELECT
                (SELECT COUNT(*) FROM period) AS order_count,
                (SELECT COUNT(*) FROM period WHERE status = 'delivered') AS delivered_count,
                (SELECT COUNT(*) FROM period WHERE status = 'cancelled') AS cancelled_count,
                COALESCE((SELECT SUM(subtotal) FROM billed), 0) AS gross_sales,
                COALESCE((SELECT SUM(discount_amount) FROM billed), 0) AS discounts,
                COALESCE((SELECT SUM(tax_amount) FROM billed), 0) AS taxes,
                COALESCE((SELECT SUM(service_charge) FROM billed), 0) AS service_charges,
                COALESCE((SELECT SUM(total) FROM billed), 0) AS net_sales,
                COALESCE((SELECT ROUND(AVG(total), 2) FROM billed), 0) AS average_ticket
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;
        Ok(summary)
    }

    // 2. Line chart
    pub async fn daily_sales(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<DailySales>, AppError> {
        let rows = sqlx::query_as::<_, DailySales>(
            r#"
            SELECT
                (created_at AT TIME ZONE 'UTC')::date AS day,
                COUNT(*) AS order_count,
                COALESCE(SUM(total), 0) AS total
            FROM orders
            WHERE created_at >= $1 AND created_at < $2
              AND status <> 'cancelled'
            GROUP BY 1
            ORDER BY 1 ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // 3. Best sellers
    pub async fn top_items(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<TopItem>, AppError> {
        let rows = sqlx::query_as::<_, TopItem>(
            r#"
            SELECT
                i.menu_item_id,
                MAX(i.name) AS name,
                SUM(i.quantity)::bigint AS total_quantity,
                SUM(i.line_total) AS total_revenue
            FROM order_items i
            JOIN orders o ON o.id = i.order_id
            WHERE o.created_at >= $1 AND o.created_at < $2
              AND o.status <> 'cancelled'
            GROUP BY i.menu_item_id
            ORDER BY total_quantity DESC, total_revenue DESC
            LIMIT $3
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn department_sales(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<DepartmentSales>, AppError> {
        let rows = sqlx::query_as::<_, DepartmentSales>(
            r#"
            SELECT
                i.department,
                SUM(i.quantity)::bigint AS item_count,
                SUM(i.line_total) AS revenue
            FROM order_items i
            JOIN orders o ON o.id = i.order_id
            WHERE o.created_at >= $1 AND o.created_at < $2
              AND o.status <> 'cancelled'
            GROUP BY i.department
            ORDER BY revenue DESC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn inventory_valuation(&self) -> Result<InventoryValuation, AppError> {
        let row = sqlx::query_as::<_, InventoryValuation>(
            r#"
            SELECT
                COALESCE(SUM(GREATEST(current_stock, 0) * cost_per_unit), 0) AS total_value,
                COUNT(*) AS material_count,
                COUNT(*) FILTER (WHERE status = 'active') AS active_count,
                COUNT(*) FILTER (WHERE status = 'low_stock') AS low_stock_count,
                COUNT(*) FILTER (WHERE status = 'out_of_stock') AS out_of_stock_count
            FROM materials
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
