// src/db/offer_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::offers::{Offer, OfferKind},
};

pub struct OfferFields<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub kind: OfferKind,
    pub value: Decimal,
    pub buy_quantity: Option<i32>,
    pub get_quantity: Option<i32>,
    pub target_item_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub min_order_amount: Decimal,
    pub max_discount: Option<Decimal>,
    pub code: Option<&'a str>,
    pub usage_limit: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

fn map_unique_code(code: Option<&str>) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return AppError::OfferCodeAlreadyExists(code.unwrap_or_default().to_string());
            }
        }
        e.into()
    }
}

#[derive(Clone)]
pub struct OfferRepository {
    pool: PgPool,
}

impl OfferRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Offer>, AppError> {
        let offers = sqlx::query_as::<_, Offer>("SELECT * FROM offers ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(offers)
    }

    /// Offers switched on and not yet expired. The window and usage limit are
    /// checked again by the pricing rules.
    pub async fn active<'e, E>(&self, executor: E, now: DateTime<Utc>) -> Result<Vec<Offer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let offers = sqlx::query_as::<_, Offer>(
            r#"
            SELECT * FROM offers
            WHERE is_active
              AND (ends_at IS NULL OR ends_at > $1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(now)
        .fetch_all(executor)
        .await?;
        Ok(offers)
    }

    pub async fn get<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Offer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let offer = sqlx::query_as::<_, Offer>("SELECT * FROM offers WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(offer)
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<Offer>, AppError> {
        let offer = sqlx::query_as::<_, Offer>("SELECT * FROM offers WHERE LOWER(code) = LOWER($1)")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(offer)
    }

    pub async fn create<'e, E>(&self, executor: E, fields: &OfferFields<'_>) -> Result<Offer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Offer>(
            r#"
            INSERT INTO offers (
                name, description, kind, value, buy_quantity, get_quantity, target_item_id,
                category_id, min_order_amount, max_discount, code, usage_limit, starts_at, ends_at,
                is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(fields.name)
        .bind(fields.description)
        .bind(fields.kind)
        .bind(fields.value)
        .bind(fields.buy_quantity)
        .bind(fields.get_quantity)
        .bind(fields.target_item_id)
        .bind(fields.category_id)
        .bind(fields.min_order_amount)
        .bind(fields.max_discount)
        .bind(fields.code)
        .bind(fields.usage_limit)
        .bind(fields.starts_at)
        .bind(fields.ends_at)
        .bind(fields.is_active)
        .fetch_one(executor)
        .await
        .map_err(map_unique_code(fields.code))
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        fields: &OfferFields<'_>,
    ) -> Result<Option<Offer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Offer>(
            r#"
            UPDATE offers
            SET name = $2, description = $3, kind = $4, value = $5, buy_quantity = $6,
                get_quantity = $7, target_item_id = $8, category_id = $9, min_order_amount = $10,
                max_discount = $11, code = $12, usage_limit = $13, starts_at = $14, ends_at = $15,
                is_active = $16, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(fields.name)
        .bind(fields.description)
        .bind(fields.kind)
        .bind(fields.value)
        .bind(fields.buy_quantity)
        .bind(fields.get_quantity)
        .bind(fields.target_item_id)
        .bind(fields.category_id)
        .bind(fields.min_order_amount)
        .bind(fields.max_discount)
        .bind(fields.code)
        .bind(fields.usage_limit)
        .bind(fields.starts_at)
        .bind(fields.ends_at)
        .bind(fields.is_active)
        .fetch_optional(executor)
        .await
        .map_err(map_unique_code(fields.code))
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM offers WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Counts one redemption. Returns false when the limit was already
    /// reached, so concurrent checkouts cannot push the count past it.
    pub async fn increment_usage<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE offers
            SET usage_count = usage_count + 1, updated_at = NOW()
            WHERE id = $1 AND (usage_limit IS NULL OR usage_count < usage_limit)
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
