// src/models/settings.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::common::validation::{validate_currency, validate_hex_color, validate_rate};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantSettings {
    #[schema(example = "Casa Nova")]
    pub restaurant_name: String,

    #[schema(example = "https://cdn.example.com/logo.png")]
    pub logo_url: Option<String>,

    #[schema(example = "#1F2937")]
    pub primary_color: String,

    #[schema(example = "#F59E0B")]
    pub secondary_color: String,

    #[schema(example = "#10B981")]
    pub accent_color: String,

    #[schema(example = "USD")]
    pub currency: String,

    #[schema(example = "10")]
    pub tax_rate: Decimal,

    #[schema(example = "5")]
    pub service_charge_rate: Decimal,

    #[schema(example = "+15550001111")]
    pub whatsapp_number: Option<String>,

    pub address: Option<String>,
    pub phone: Option<String>,
    pub auto_print: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for RestaurantSettings {
    // Served until an admin saves the settings for the first time.
    fn default() -> Self {
        Self {
            restaurant_name: "Restaurant".to_string(),
            logo_url: None,
            primary_color: "#111827".to_string(),
            secondary_color: "#F59E0B".to_string(),
            accent_color: "#10B981".to_string(),
            currency: "USD".to_string(),
            tax_rate: Decimal::ZERO,
            service_charge_rate: Decimal::ZERO,
            whatsapp_number: None,
            address: None,
            phone: None,
            auto_print: false,
            updated_at: None,
        }
    }
}

// PUT replaces the whole row.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    #[validate(length(min = 1, max = 120, message = "The restaurant name is required."))]
    pub restaurant_name: String,

    #[validate(url(message = "The logo must be a URL."))]
    pub logo_url: Option<String>,

    #[validate(custom(function = "validate_hex_color"))]
    pub primary_color: String,

    #[validate(custom(function = "validate_hex_color"))]
    pub secondary_color: String,

    #[validate(custom(function = "validate_hex_color"))]
    pub accent_color: String,

    #[validate(custom(function = "validate_currency"))]
    pub currency: String,

    #[validate(custom(function = "validate_rate"))]
    pub tax_rate: Decimal,

    #[validate(custom(function = "validate_rate"))]
    pub service_charge_rate: Decimal,

    pub whatsapp_number: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,

    #[serde(default)]
    pub auto_print: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> UpdateSettingsRequest {
        UpdateSettingsRequest {
            restaurant_name: "Casa Nova".into(),
            logo_url: Some("https://cdn.example.com/logo.png".into()),
            primary_color: "#123".into(),
            secondary_color: "#aabbcc".into(),
            accent_color: "#ABCDEF".into(),
            currency: "EUR".into(),
            tax_rate: dec!(21),
            service_charge_rate: dec!(0),
            whatsapp_number: None,
            address: None,
            phone: None,
            auto_print: true,
        }
    }

    #[test]
    fn valid_theme_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn bad_colors_and_rates_are_reported_per_field() {
        let mut req = request();
        req.primary_color = "red".into();
        req.tax_rate = dec!(150);
        req.logo_url = Some("not a url".into());

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("primary_color"));
        assert!(fields.contains_key("tax_rate"));
        assert!(fields.contains_key("logo_url"));
        assert!(!fields.contains_key("secondary_color"));
    }

    #[test]
    fn defaults_are_themselves_valid_colors() {
        let d = RestaurantSettings::default();
        for c in [&d.primary_color, &d.secondary_color, &d.accent_color] {
            assert!(validate_hex_color(c).is_ok());
        }
    }
}
