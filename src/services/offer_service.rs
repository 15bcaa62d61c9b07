// src/services/offer_service.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::{
    common::error::AppError,
    db::{offer_repo::OfferFields, OfferRepository},
    models::offers::{AppliedOffer, Offer, OfferKind, PromoCodeCheck},
};

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Cross-field rules that depend on the offer kind.
pub fn validate_offer_rules(fields: &OfferFields<'_>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    match fields.kind {
        OfferKind::Percentage => {
            if fields.value <= Decimal::ZERO || fields.value > Decimal::ONE_HUNDRED {
                errors.add("value", rule("range", "A percentage must be above 0 and at most 100."));
            }
        }
        OfferKind::FixedAmount => {
            if fields.value <= Decimal::ZERO {
                errors.add("value", rule("range", "The amount must be greater than zero."));
            }
        }
        OfferKind::BuyXGetY => {
            if fields.buy_quantity.is_none_or(|q| q < 1) {
                errors.add("buyQuantity", rule("range", "Buy quantity must be at least 1."));
            }
            if fields.get_quantity.is_none_or(|q| q < 1) {
                errors.add("getQuantity", rule("range", "Get quantity must be at least 1."));
            }
            if fields.target_item_id.is_none() {
                errors.add("targetItemId", rule("required", "This offer needs a target item."));
            }
        }
        OfferKind::FreeItem => {
            if fields.target_item_id.is_none() {
                errors.add("targetItemId", rule("required", "This offer needs a target item."));
            }
        }
    }

    if let (Some(starts), Some(ends)) = (fields.starts_at, fields.ends_at) {
        if ends <= starts {
            errors.add("endsAt", rule("range", "The offer must end after it starts."));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn is_redeemable(offer: &Offer, now: DateTime<Utc>) -> bool {
    offer.is_active
        && offer.starts_at.is_none_or(|s| now >= s)
        && offer.ends_at.is_none_or(|e| now < e)
        && offer.usage_limit.is_none_or(|limit| offer.usage_count < limit)
}

#[derive(Clone)]
pub struct OfferService {
    offer_repo: OfferRepository,
    pool: PgPool,
}

impl OfferService {
    pub fn new(offer_repo: OfferRepository, pool: PgPool) -> Self {
        Self { offer_repo, pool }
    }

    pub async fn list(&self) -> Result<Vec<Offer>, AppError> {
        self.offer_repo.list().await
    }

    pub async fn get(&self, id: Uuid) -> Result<Offer, AppError> {
        self.offer_repo
            .get(&self.pool, id)
            .await?
            .ok_or(AppError::ResourceNotFound("offer"))
    }

    pub async fn create(&self, fields: &OfferFields<'_>) -> Result<Offer, AppError> {
        validate_offer_rules(fields)?;
        let offer = self.offer_repo.create(&self.pool, fields).await?;
        tracing::info!(offer_id = %offer.id, kind = ?offer.kind, "offer created");
        Ok(offer)
    }

    pub async fn update(&self, id: Uuid, fields: &OfferFields<'_>) -> Result<Offer, AppError> {
        validate_offer_rules(fields)?;
        self.offer_repo
            .update(&self.pool, id, fields)
            .await?
            .ok_or(AppError::ResourceNotFound("offer"))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.offer_repo.delete(&self.pool, id).await? {
            return Err(AppError::ResourceNotFound("offer"));
        }
        Ok(())
    }

    /// Candidate offers for pricing, read on the caller's executor.
    pub async fn active_offers<'e, E>(&self, executor: E, now: DateTime<Utc>) -> Result<Vec<Offer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.offer_repo.active(executor, now).await
    }

    pub async fn record_usage<'e, E>(&self, executor: E, offer: &AppliedOffer) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if !self.offer_repo.increment_usage(executor, offer.id).await? {
            tracing::warn!(offer_id = %offer.id, "offer usage limit reached during checkout");
            return Err(AppError::OfferUsageLimitReached(offer.name.clone()));
        }
        Ok(())
    }

    pub async fn validate_code(&self, code: &str) -> Result<PromoCodeCheck, AppError> {
        let code = code.trim();
        let offer = self
            .offer_repo
            .find_by_code(code)
            .await?
            .filter(|o| is_redeemable(o, Utc::now()));

        Ok(match offer {
            Some(o) => PromoCodeCheck {
                code: code.to_string(),
                valid: true,
                name: Some(o.name),
                kind: Some(o.kind),
                value: Some(o.value),
                min_order_amount: Some(o.min_order_amount),
            },
            None => PromoCodeCheck {
                code: code.to_string(),
                valid: false,
                name: None,
                kind: None,
                value: None,
                min_order_amount: None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn fields(kind: OfferKind, value: Decimal) -> OfferFields<'static> {
        OfferFields {
            name: "Promo",
            description: None,
            kind,
            value,
            buy_quantity: None,
            get_quantity: None,
            target_item_id: None,
            category_id: None,
            min_order_amount: Decimal::ZERO,
            max_discount: None,
            code: None,
            usage_limit: None,
            starts_at: None,
            ends_at: None,
            is_active: true,
        }
    }

    #[test]
    fn percentage_must_be_within_0_and_100() {
        assert!(validate_offer_rules(&fields(OfferKind::Percentage, dec!(100))).is_ok());
        assert!(validate_offer_rules(&fields(OfferKind::Percentage, dec!(0))).is_err());
        assert!(validate_offer_rules(&fields(OfferKind::Percentage, dec!(101))).is_err());
    }

    #[test]
    fn buy_x_get_y_needs_quantities_and_target() {
        let errors = validate_offer_rules(&fields(OfferKind::BuyXGetY, dec!(0))).unwrap_err();
        let f = errors.field_errors();
        assert!(f.contains_key("buyQuantity"));
        assert!(f.contains_key("getQuantity"));
        assert!(f.contains_key("targetItemId"));

        let mut ok = fields(OfferKind::BuyXGetY, dec!(0));
        ok.buy_quantity = Some(2);
        ok.get_quantity = Some(1);
        ok.target_item_id = Some(Uuid::new_v4());
        assert!(validate_offer_rules(&ok).is_ok());
    }

    #[test]
    fn free_item_needs_a_target() {
        assert!(validate_offer_rules(&fields(OfferKind::FreeItem, dec!(0))).is_err());
    }

    #[test]
    fn window_must_end_after_it_starts() {
        let now = Utc::now();
        let mut f = fields(OfferKind::FixedAmount, dec!(5));
        f.starts_at = Some(now);
        f.ends_at = Some(now - Duration::minutes(1));
        let errors = validate_offer_rules(&f).unwrap_err();
        assert!(errors.field_errors().contains_key("endsAt"));
    }

    #[sqlx::test]
    async fn usage_stops_counting_at_the_limit(pool: PgPool) {
        let service = OfferService::new(OfferRepository::new(pool.clone()), pool.clone());

        let mut f = fields(OfferKind::Percentage, dec!(10));
        f.code = Some("ONCE");
        f.usage_limit = Some(1);
        let offer = service.create(&f).await.unwrap();
        let applied = AppliedOffer { id: offer.id, name: offer.name.clone(), code: offer.code.clone() };

        service.record_usage(&pool, &applied).await.unwrap();
        let second = service.record_usage(&pool, &applied).await;
        assert!(matches!(second, Err(AppError::OfferUsageLimitReached(name)) if name == "Promo"));
        assert_eq!(service.get(offer.id).await.unwrap().usage_count, 1);

        let check = service.validate_code("once").await.unwrap();
        assert!(!check.valid);
    }
}
