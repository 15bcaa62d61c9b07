// src/common/validation.rs
// Custom `validator` functions shared by the payloads.

use rust_decimal::Decimal;
use validator::ValidationError;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

pub fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        return Err(error("range", "The value cannot be negative."));
    }
    Ok(())
}

pub fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        return Err(error("range", "The value must be greater than zero."));
    }
    Ok(())
}

pub fn validate_rate(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::ZERO || *val > Decimal::ONE_HUNDRED {
        return Err(error("range", "The rate must be between 0 and 100."));
    }
    Ok(())
}

/// Accepts `#RGB` and `#RRGGBB`.
pub fn validate_hex_color(val: &str) -> Result<(), ValidationError> {
    let ok = val
        .strip_prefix('#')
        .filter(|hex| hex.len() == 3 || hex.len() == 6)
        .is_some_and(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()));

    if !ok {
        return Err(error("hex_color", "Colors must look like #RGB or #RRGGBB."));
    }
    Ok(())
}

pub fn validate_currency(val: &str) -> Result<(), ValidationError> {
    if val.len() != 3 || !val.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(error("currency", "Currency must be a 3-letter ISO code."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn hex_colors() {
        assert!(validate_hex_color("#fff").is_ok());
        assert!(validate_hex_color("#1A2b3C").is_ok());
        assert!(validate_hex_color("1A2B3C").is_err());
        assert!(validate_hex_color("#12345").is_err());
        assert!(validate_hex_color("#ggg").is_err());
    }

    #[test]
    fn decimals() {
        assert!(validate_not_negative(&dec!(0)).is_ok());
        assert!(validate_not_negative(&dec!(-0.01)).is_err());
        assert!(validate_positive(&dec!(0)).is_err());
        assert!(validate_positive(&dec!(0.001)).is_ok());
        assert!(validate_rate(&dec!(100)).is_ok());
        assert!(validate_rate(&dec!(100.01)).is_err());
    }

    #[test]
    fn currencies() {
        assert!(validate_currency("EUR").is_ok());
        assert!(validate_currency("eur").is_err());
        assert!(validate_currency("EURO").is_err());
    }
}
