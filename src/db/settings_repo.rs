// src/db/settings_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::settings::{RestaurantSettings, UpdateSettingsRequest},
};

#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The singleton row, or the defaults when nobody has saved settings yet.
    pub async fn get_settings<'e, E>(&self, executor: E) -> Result<RestaurantSettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let settings = sqlx::query_as::<_, RestaurantSettings>(
            r#"
            SELECT restaurant_name, logo_url, primary_color, secondary_color, accent_color,
                   currency, tax_rate, service_charge_rate, whatsapp_number, address, phone,
                   auto_print, updated_at
            FROM restaurant_settings
            "#,
        )
        .fetch_optional(executor)
        .await?;

        Ok(settings.unwrap_or_default())
    }

    pub async fn current(&self) -> Result<RestaurantSettings, AppError> {
        self.get_settings(&self.pool).await
    }

    pub async fn update_settings<'e, E>(
        &self,
        executor: E,
        input: &UpdateSettingsRequest,
    ) -> Result<RestaurantSettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // UPSERT on the singleton key
        let settings = sqlx::query_as::<_, RestaurantSettings>(
            r#"
            INSERT INTO restaurant_settings (
                id, restaurant_name, logo_url, primary_color, secondary_color, accent_color,
                currency, tax_rate, service_charge_rate, whatsapp_number, address, phone,
                auto_print, updated_at
            )
            VALUES (TRUE, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW())
            ON CONFLICT (id) DO UPDATE SET
                restaurant_name = EXCLUDED.restaurant_name,
                logo_url = EXCLUDED.logo_url,
                primary_color = EXCLUDED.primary_color,
                secondary_color = EXCLUDED.secondary_color,
                accent_color = EXCLUDED.accent_color,
                currency = EXCLUDED.currency,
                tax_rate = EXCLUDED.tax_rate,
                service_charge_rate = EXCLUDED.service_charge_rate,
                whatsapp_number = EXCLUDED.whatsapp_number,
                address = EXCLUDED.address,
                phone = EXCLUDED.phone,
                auto_print = EXCLUDED.auto_print,
                updated_at = NOW()
            RETURNING restaurant_name, logo_url, primary_color, secondary_color, accent_color,
                      currency, tax_rate, service_charge_rate, whatsapp_number, address, phone,
                      auto_print, updated_at
            "#,
        )
        .bind(&input.restaurant_name)
        .bind(&input.logo_url)
        .bind(&input.primary_color)
        .bind(&input.secondary_color)
        .bind(&input.accent_color)
        .bind(input.currency.to_uppercase())
        .bind(input.tax_rate)
        .bind(input.service_charge_rate)
        .bind(&input.whatsapp_number)
        .bind(&input.address)
        .bind(&input.phone)
        .bind(input.auto_print)
        .fetch_one(executor)
        .await?;

        Ok(settings)
    }
}
