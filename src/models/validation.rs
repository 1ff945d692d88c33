//! Custom validators used by request DTOs

use rust_decimal::Decimal;
use validator::ValidationError;

use crate::ledger::money::{to_cents, MAX_LOAN_AMOUNT, MAX_PAYMENT_AMOUNT};

/// Checked at cent precision: anything that rounds to 0.00 is not positive.
pub fn positive_loan_amount(value: &Decimal) -> Result<(), ValidationError> {
    let value = &to_cents(*value);
    if *value <= Decimal::ZERO {
        return Err(ValidationError::new("amount_not_positive"));
    }
    if *value > MAX_LOAN_AMOUNT {
        return Err(ValidationError::new("amount_too_large"));
    }
    Ok(())
}

pub fn positive_payment_amount(value: &Decimal) -> Result<(), ValidationError> {
    let value = &to_cents(*value);
    if *value <= Decimal::ZERO {
        return Err(ValidationError::new("amount_not_positive"));
    }
    if *value > MAX_PAYMENT_AMOUNT {
        return Err(ValidationError::new("amount_too_large"));
    }
    Ok(())
}

pub fn non_negative_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("amount_negative"));
    }
    Ok(())
}

/// Annual interest rate in percent, 0 to 100 inclusive.
pub fn valid_interest_rate(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("interest_rate_out_of_range"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interest_rate_bounds() {
        assert!(valid_interest_rate(&Decimal::ZERO).is_ok());
        assert!(valid_interest_rate(&Decimal::ONE_HUNDRED).is_ok());
        assert!(valid_interest_rate(&"100.01".parse().unwrap()).is_err());
        assert!(valid_interest_rate(&"-1".parse().unwrap()).is_err());
    }

    #[test]
    fn test_amount_validators() {
        assert!(positive_loan_amount(&Decimal::ZERO).is_err());
        assert!(positive_loan_amount(&"0.01".parse().unwrap()).is_ok());
        assert!(positive_payment_amount(&"100000000".parse().unwrap()).is_err());
        assert!(non_negative_amount(&Decimal::ZERO).is_ok());
        assert!(non_negative_amount(&"-0.01".parse().unwrap()).is_err());
    }

    #[test]
    fn test_sub_cent_amounts_are_not_positive() {
        assert!(positive_loan_amount(&"0.004".parse().unwrap()).is_err());
        assert!(positive_loan_amount(&"0.005".parse().unwrap()).is_ok());
        assert!(positive_payment_amount(&"0.001".parse().unwrap()).is_err());
        assert!(positive_loan_amount(&"9999999999.994".parse().unwrap()).is_ok());
        assert!(positive_loan_amount(&"9999999999.995".parse().unwrap()).is_err());
    }
}
