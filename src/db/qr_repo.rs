// src/db/qr_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::qr::TableQr};

fn map_unique_table(table_number: i32) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return AppError::TableAlreadyHasQr(table_number);
            }
        }
        e.into()
    }
}

#[derive(Clone)]
pub struct QrRepository {
    pool: PgPool,
}

impl QrRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<TableQr>, AppError> {
        let rows = sqlx::query_as::<_, TableQr>("SELECT * FROM table_qr_codes ORDER BY table_number ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<TableQr>, AppError> {
        let row = sqlx::query_as::<_, TableQr>("SELECT * FROM table_qr_codes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn create(&self, label: &str, table_number: i32) -> Result<TableQr, AppError> {
        sqlx::query_as::<_, TableQr>(
            "INSERT INTO table_qr_codes (label, table_number) VALUES ($1, $2) RETURNING *",
        )
        .bind(label)
        .bind(table_number)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_table(table_number))
    }

    pub async fn update(&self, id: Uuid, label: &str, table_number: i32) -> Result<Option<TableQr>, AppError> {
        sqlx::query_as::<_, TableQr>(
            "UPDATE table_qr_codes SET label = $2, table_number = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(label)
        .bind(table_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique_table(table_number))
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM table_qr_codes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
