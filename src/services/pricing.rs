// src/services/pricing.rs
//! Cart pricing: subtotal, best offer, tax and service charge.
//!
//! Everything here is pure so checkout and quotes price a cart the same way.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    common::{
        error::AppError,
        money::{percent_of, round_money},
    },
    models::offers::{AppliedOffer, CartLine, Offer, OfferKind, PriceBreakdown},
};

pub struct PricingInput<'a> {
    pub lines: &'a [CartLine],
    pub offers: &'a [Offer],
    pub promo_code: Option<&'a str>,
    pub now: DateTime<Utc>,
    pub tax_rate: Decimal,
    pub service_charge_rate: Decimal,
}

pub fn subtotal(lines: &[CartLine]) -> Decimal {
    round_money(lines.iter().map(|l| l.unit_price * Decimal::from(l.quantity)).sum())
}

fn code_matches(offer: &Offer, promo_code: Option<&str>) -> bool {
    match (&offer.code, promo_code) {
        (None, _) => true,
        (Some(code), Some(given)) => code.eq_ignore_ascii_case(given.trim()),
        (Some(_), None) => false,
    }
}

/// Active, inside its window, under its usage limit, above the minimum
/// order and with a matching code if it has one.
pub fn is_eligible(offer: &Offer, subtotal: Decimal, promo_code: Option<&str>, now: DateTime<Utc>) -> bool {
    offer.is_active
        && offer.starts_at.is_none_or(|s| now >= s)
        && offer.ends_at.is_none_or(|e| now < e)
        && offer.usage_limit.is_none_or(|limit| offer.usage_count < limit)
        && subtotal >= offer.min_order_amount
        && code_matches(offer, promo_code)
}

fn target_lines<'a>(offer: &Offer, lines: &'a [CartLine]) -> impl Iterator<Item = &'a CartLine> {
    let target = offer.target_item_id;
    lines.iter().filter(move |l| target == Some(l.menu_item_id))
}

/// Discount the offer grants on these lines, capped by `max_discount` and
/// the subtotal. Zero when the cart has nothing the offer applies to.
pub fn discount_for(offer: &Offer, lines: &[CartLine]) -> Decimal {
    let in_scope = |l: &&CartLine| offer.category_id.is_none_or(|c| l.category_id == c);
    let scope_subtotal: Decimal = lines
        .iter()
        .filter(in_scope)
        .map(|l| l.unit_price * Decimal::from(l.quantity))
        .sum();

    let raw = match offer.kind {
        OfferKind::Percentage => scope_subtotal * offer.value / Decimal::ONE_HUNDRED,
        OfferKind::FixedAmount => offer.value.min(scope_subtotal),
        OfferKind::BuyXGetY => {
            let buy = offer.buy_quantity.unwrap_or(0);
            let get = offer.get_quantity.unwrap_or(0);
            if buy < 1 || get < 1 {
                Decimal::ZERO
            } else {
                target_lines(offer, lines)
                    .map(|l| {
                        let free = (l.quantity / (buy + get)) * get;
                        Decimal::from(free) * l.unit_price
                    })
                    .sum()
            }
        }
        OfferKind::FreeItem => target_lines(offer, lines).next().map(|l| l.unit_price).unwrap_or_default(),
    };

    let capped = match offer.max_discount {
        Some(max) => raw.min(max),
        None => raw,
    };
    round_money(capped.min(subtotal(lines)).max(Decimal::ZERO))
}

/// The best eligible offer and its discount. Ties go to the offer created first.
pub fn best_offer<'a>(
    offers: &'a [Offer],
    lines: &[CartLine],
    promo_code: Option<&str>,
    now: DateTime<Utc>,
) -> Option<(&'a Offer, Decimal)> {
    let subtotal = subtotal(lines);
    let mut best: Option<(&Offer, Decimal)> = None;

    for offer in offers.iter().filter(|o| is_eligible(o, subtotal, promo_code, now)) {
        let discount = discount_for(offer, lines);
        if discount <= Decimal::ZERO {
            continue;
        }
        best = match best {
            Some((current, d))
                if d > discount || (d == discount && current.created_at <= offer.created_at) =>
            {
                Some((current, d))
            }
            _ => Some((offer, discount)),
        };
    }
    best
}

/// Whether some coded offer matches `code` and is eligible for this subtotal.
/// Independent of which offer ends up winning.
pub fn promo_code_is_valid(offers: &[Offer], code: &str, subtotal: Decimal, now: DateTime<Utc>) -> bool {
    offers.iter().any(|o| {
        o.code.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(code)) && is_eligible(o, subtotal, Some(code), now)
    })
}

/// Prices a cart. A promo code that matches no eligible offer is reported
/// as a warning; checkout turns that into `InvalidPromoCode`.
pub fn price_cart(input: &PricingInput<'_>) -> PriceBreakdown {
    let promo_code = input.promo_code.map(str::trim).filter(|c| !c.is_empty());
    let subtotal = subtotal(input.lines);

    let best = best_offer(input.offers, input.lines, promo_code, input.now);
    let discount_amount = best.map(|(_, d)| d).unwrap_or_default();

    let mut warnings = Vec::new();
    if let Some(code) = promo_code {
        if !promo_code_is_valid(input.offers, code, subtotal, input.now) {
            warnings.push(format!("Promo code '{code}' is not valid for this cart."));
        }
    }

    let taxable = subtotal - discount_amount;
    let tax_amount = percent_of(taxable, input.tax_rate);
    let service_charge = percent_of(taxable, input.service_charge_rate);
    let total = round_money(taxable + tax_amount + service_charge);

    PriceBreakdown {
        subtotal,
        discount_amount,
        tax_amount,
        service_charge,
        total,
        applied_offer: best.map(|(o, _)| AppliedOffer { id: o.id, name: o.name.clone(), code: o.code.clone() }),
        warnings,
    }
}

/// Checkout variant: a promo code that was not applied is an error.
pub fn price_for_checkout(input: &PricingInput<'_>) -> Result<PriceBreakdown, AppError> {
    let breakdown = price_cart(input);
    if let Some(code) = input.promo_code.map(str::trim).filter(|c| !c.is_empty()) {
        if !breakdown.warnings.is_empty() {
            return Err(AppError::InvalidPromoCode(code.to_string()));
        }
    }
    Ok(breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn offer(kind: OfferKind, value: Decimal) -> Offer {
        Offer {
            id: Uuid::new_v4(),
            name: format!("{kind:?}"),
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
            usage_count: 0,
            starts_at: None,
            ends_at: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(price: Decimal, qty: i32) -> CartLine {
        CartLine { menu_item_id: Uuid::new_v4(), category_id: Uuid::new_v4(), unit_price: price, quantity: qty }
    }

    fn input<'a>(lines: &'a [CartLine], offers: &'a [Offer], code: Option<&'a str>) -> PricingInput<'a> {
        PricingInput {
            lines,
            offers,
            promo_code: code,
            now: Utc::now(),
            tax_rate: Decimal::ZERO,
            service_charge_rate: Decimal::ZERO,
        }
    }

    #[test]
    fn plain_cart_totals() {
        let lines = [line(dec!(3.50), 2), line(dec!(12.00), 1)];
        let p = PricingInput { tax_rate: dec!(10), service_charge_rate: dec!(5), ..input(&lines, &[], None) };
        let b = price_cart(&p);

        assert_eq!(b.subtotal, dec!(19.00));
        assert_eq!(b.discount_amount, dec!(0));
        assert_eq!(b.tax_amount, dec!(1.90));
        assert_eq!(b.service_charge, dec!(0.95));
        assert_eq!(b.total, dec!(21.85));
        assert!(b.applied_offer.is_none());
    }

    #[test]
    fn tax_applies_after_discount() {
        let lines = [line(dec!(50), 2)];
        let offers = [offer(OfferKind::Percentage, dec!(10))];
        let p = PricingInput { tax_rate: dec!(10), ..input(&lines, &offers, None) };
        let b = price_cart(&p);

        assert_eq!(b.discount_amount, dec!(10.00));
        assert_eq!(b.tax_amount, dec!(9.00));
        assert_eq!(b.total, dec!(99.00));
    }

    #[test]
    fn percentage_limited_to_category() {
        let mut a = line(dec!(10), 1);
        let b = line(dec!(20), 1);
        let cat = Uuid::new_v4();
        a.category_id = cat;
        let mut o = offer(OfferKind::Percentage, dec!(50));
        o.category_id = Some(cat);

        assert_eq!(discount_for(&o, &[a, b]), dec!(5.00));
    }

    #[test]
    fn fixed_amount_never_exceeds_the_subtotal() {
        let o = offer(OfferKind::FixedAmount, dec!(25));
        assert_eq!(discount_for(&o, &[line(dec!(8), 1)]), dec!(8.00));
        assert_eq!(discount_for(&o, &[line(dec!(30), 1)]), dec!(25.00));
    }

    #[test]
    fn max_discount_caps() {
        let mut o = offer(OfferKind::Percentage, dec!(50));
        o.max_discount = Some(dec!(7.5));
        assert_eq!(discount_for(&o, &[line(dec!(100), 1)]), dec!(7.50));
    }

    #[test]
    fn buy_two_get_one() {
        let coffee = line(dec!(3), 7);
        let mut o = offer(OfferKind::BuyXGetY, Decimal::ZERO);
        o.buy_quantity = Some(2);
        o.get_quantity = Some(1);
        o.target_item_id = Some(coffee.menu_item_id);

        // 7 / 3 = 2 groups, 2 free
        assert_eq!(discount_for(&o, &[coffee.clone(), line(dec!(9), 1)]), dec!(6.00));

        let mut two = coffee;
        two.quantity = 2;
        assert_eq!(discount_for(&o, &[two]), dec!(0));
    }

    #[test]
    fn free_item_needs_the_item_in_the_cart() {
        let cake = line(dec!(4.25), 3);
        let mut o = offer(OfferKind::FreeItem, Decimal::ZERO);
        o.target_item_id = Some(cake.menu_item_id);

        assert_eq!(discount_for(&o, &[cake]), dec!(4.25));
        assert_eq!(discount_for(&o, &[line(dec!(4.25), 3)]), dec!(0));
    }

    #[test]
    fn eligibility_window_usage_and_minimum() {
        let now = Utc::now();
        let mut o = offer(OfferKind::Percentage, dec!(10));
        assert!(is_eligible(&o, dec!(10), None, now));

        o.starts_at = Some(now + Duration::hours(1));
        assert!(!is_eligible(&o, dec!(10), None, now));
        o.starts_at = None;

        o.ends_at = Some(now);
        assert!(!is_eligible(&o, dec!(10), None, now));
        o.ends_at = None;

        o.usage_limit = Some(3);
        o.usage_count = 3;
        assert!(!is_eligible(&o, dec!(10), None, now));
        o.usage_limit = None;

        o.min_order_amount = dec!(20);
        assert!(!is_eligible(&o, dec!(19.99), None, now));
        assert!(is_eligible(&o, dec!(20), None, now));

        o.is_active = false;
        assert!(!is_eligible(&o, dec!(20), None, now));
    }

    #[test]
    fn coded_offers_need_a_case_insensitive_match() {
        let mut o = offer(OfferKind::Percentage, dec!(10));
        o.code = Some("WELCOME10".into());
        let now = Utc::now();

        assert!(!is_eligible(&o, dec!(10), None, now));
        assert!(!is_eligible(&o, dec!(10), Some("OTHER"), now));
        assert!(is_eligible(&o, dec!(10), Some("welcome10"), now));
        assert!(is_eligible(&o, dec!(10), Some(" Welcome10 "), now));
    }

    #[test]
    fn offers_do_not_stack_and_the_largest_wins() {
        let lines = [line(dec!(40), 1)];
        let small = offer(OfferKind::FixedAmount, dec!(5));
        let big = offer(OfferKind::Percentage, dec!(25));
        let offers = [small, big.clone()];

        let b = price_cart(&input(&lines, &offers, None));
        assert_eq!(b.discount_amount, dec!(10.00));
        assert_eq!(b.applied_offer.unwrap().id, big.id);
    }

    #[test]
    fn ties_go_to_the_oldest_offer() {
        let lines = [line(dec!(40), 1)];
        let mut older = offer(OfferKind::FixedAmount, dec!(4));
        older.created_at = Utc::now() - Duration::days(3);
        let newer = offer(OfferKind::Percentage, dec!(10));

        let offers = [newer, older.clone()];
        let (winner, discount) = best_offer(&offers, &lines, None, Utc::now()).unwrap();
        assert_eq!(winner.id, older.id);
        assert_eq!(discount, dec!(4.00));
    }

    #[test]
    fn unknown_promo_code_is_a_warning_in_quotes_and_an_error_at_checkout() {
        let lines = [line(dec!(10), 1)];
        let automatic = offer(OfferKind::FixedAmount, dec!(1));
        let offers = [automatic];

        let quote = price_cart(&input(&lines, &offers, Some("NOPE")));
        assert_eq!(quote.warnings.len(), 1);
        // the automatic offer still applies to the quote
        assert_eq!(quote.discount_amount, dec!(1.00));

        let err = price_for_checkout(&input(&lines, &offers, Some("NOPE"))).unwrap_err();
        assert!(matches!(err, AppError::InvalidPromoCode(code) if code == "NOPE"));
    }

    #[test]
    fn a_valid_code_is_applied_without_warnings() {
        let lines = [line(dec!(10), 2)];
        let mut promo = offer(OfferKind::Percentage, dec!(20));
        promo.code = Some("SPRING".into());
        let offers = [promo];

        let b = price_for_checkout(&input(&lines, &offers, Some("spring"))).unwrap();
        assert!(b.warnings.is_empty());
        assert_eq!(b.discount_amount, dec!(4.00));
        assert_eq!(b.total, dec!(16.00));
    }

    #[test]
    fn valid_code_is_accepted_when_an_automatic_offer_wins() {
        let lines = [line(dec!(100), 1)];
        let automatic = offer(OfferKind::Percentage, dec!(20));
        let mut coded = offer(OfferKind::Percentage, dec!(5));
        coded.code = Some("WELCOME5".into());
        let offers = [automatic.clone(), coded];

        let b = price_for_checkout(&input(&lines, &offers, Some("WELCOME5"))).unwrap();
        assert!(b.warnings.is_empty());
        assert_eq!(b.discount_amount, dec!(20.00));
        assert_eq!(b.applied_offer.unwrap().id, automatic.id);
    }

    #[test]
    fn exhausted_code_is_rejected_at_checkout() {
        let lines = [line(dec!(100), 1)];
        let mut coded = offer(OfferKind::Percentage, dec!(5));
        coded.code = Some("ONCE".into());
        coded.usage_limit = Some(1);
        coded.usage_count = 1;
        let offers = [coded];

        assert!(!promo_code_is_valid(&offers, "ONCE", dec!(100), Utc::now()));
        let err = price_for_checkout(&input(&lines, &offers, Some("once"))).unwrap_err();
        assert!(matches!(err, AppError::InvalidPromoCode(_)));
    }

    #[test]
    fn amounts_round_half_away_from_zero() {
        let lines = [line(dec!(0.35), 1)];
        let p = PricingInput { tax_rate: dec!(10), ..input(&lines, &[], None) };
        // 0.035 -> 0.04
        assert_eq!(price_cart(&p).tax_amount, dec!(0.04));
    }
}
