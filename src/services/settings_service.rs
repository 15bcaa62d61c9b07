// src/services/settings_service.rs

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::SettingsRepository,
    models::settings::{RestaurantSettings, UpdateSettingsRequest},
};

#[derive(Clone)]
pub struct SettingsService {
    settings_repo: SettingsRepository,
    pool: PgPool,
}

impl SettingsService {
    pub fn new(settings_repo: SettingsRepository, pool: PgPool) -> Self {
        Self { settings_repo, pool }
    }

    pub async fn get_settings(&self) -> Result<RestaurantSettings, AppError> {
        self.settings_repo.current().await
    }

    pub async fn update_settings(&self, input: &UpdateSettingsRequest) -> Result<RestaurantSettings, AppError> {
        let settings = self.settings_repo.update_settings(&self.pool, input).await?;
        tracing::info!(name = %settings.restaurant_name, auto_print = settings.auto_print, "settings updated");
        Ok(settings)
    }
}
