//! Two-decimal money helpers shared by the ledger and the request validators.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};

/// Largest amount accepted for a single payment (99,999,999.99).
pub const MAX_PAYMENT_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Largest principal accepted for a loan (9,999,999,999.99).
pub const MAX_LOAN_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Allowed gap between a payment total and the sum of its components.
pub const COMPONENT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Round to cents and pin the scale at two fraction digits.
pub fn to_cents(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// `max(0, value)` at cent precision.
pub fn clamp_non_negative(value: Decimal) -> Decimal {
    if value.is_sign_negative() {
        to_cents(Decimal::ZERO)
    } else {
        to_cents(value)
    }
}

/// Sum amounts with decimal accumulation, rounding once at the end.
pub fn sum<I>(amounts: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    to_cents(amounts.into_iter().fold(Decimal::ZERO, |acc, x| acc + x))
}

/// `serialize_with` target: always emit two fraction digits, even for a zero
/// read back from the database with scale 0.
pub fn serialize_cents<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    Serialize::serialize(&to_cents(*value), serializer)
}

pub fn serialize_cents_opt<S>(value: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    value.map(to_cents).serialize(serializer)
}
