// src/db/printer_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        menu::Department,
        printers::{PaperWidth, Printer},
    },
};

pub struct PrinterFields<'a> {
    pub name: &'a str,
    pub host: &'a str,
    pub port: i32,
    pub department: Option<Department>,
    pub paper_width: PaperWidth,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct PrinterRepository {
    pool: PgPool,
}

impl PrinterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, active_only: bool) -> Result<Vec<Printer>, AppError> {
        let printers = sqlx::query_as::<_, Printer>(
            "SELECT * FROM printers WHERE ($1 = FALSE OR is_active) ORDER BY name ASC",
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(printers)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Printer>, AppError> {
        let printer = sqlx::query_as::<_, Printer>("SELECT * FROM printers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(printer)
    }

    pub async fn create(&self, fields: &PrinterFields<'_>) -> Result<Printer, AppError> {
        let printer = sqlx::query_as::<_, Printer>(
            r#"
            INSERT INTO printers (name, host, port, department, paper_width, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(fields.name)
        .bind(fields.host)
        .bind(fields.port)
        .bind(fields.department)
        .bind(fields.paper_width)
        .bind(fields.is_active)
        .fetch_one(&self.pool)
        .await?;
        Ok(printer)
    }

    pub async fn update(&self, id: Uuid, fields: &PrinterFields<'_>) -> Result<Option<Printer>, AppError> {
        let printer = sqlx::query_as::<_, Printer>(
            r#"
            UPDATE printers
            SET name = $2, host = $3, port = $4, department = $5, paper_width = $6,
                is_active = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(fields.name)
        .bind(fields.host)
        .bind(fields.port)
        .bind(fields.department)
        .bind(fields.paper_width)
        .bind(fields.is_active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(printer)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM printers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
