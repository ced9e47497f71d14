//! Common helpers shared by the sizing and financial calculators.
//!
//! Money is rounded to cents and energy/power figures to two decimal places,
//! both half-up.

use rust_decimal::{Decimal, RoundingStrategy};

/// Horsepower to kilowatt conversion.
pub const HP_TO_KW: Decimal = Decimal::from_parts(746, 0, 0, false, 3);

/// Square metres to square feet conversion.
pub const SQM_TO_SQFT: Decimal = Decimal::from_parts(10764, 0, 0, false, 3);

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// Values at exactly 0.005 are rounded away from zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use quote_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    round_dp(value, 2)
}

/// Half-up rounding to an arbitrary number of decimal places.
pub fn round_dp(
    value: Decimal,
    dp: u32,
) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns the maximum of two decimal values.
pub fn max(
    a: Decimal,
    b: Decimal,
) -> Decimal {
    if a > b { a } else { b }
}

/// Returns the minimum of two decimal values.
pub fn min(
    a: Decimal,
    b: Decimal,
) -> Decimal {
    if a < b { a } else { b }
}

/// Divides `numerator` by `denominator`, returning `None` when the denominator
/// is zero or the result overflows.
///
/// ```
/// use rust_decimal_macros::dec;
/// use quote_core::calculations::common::ratio;
///
/// assert_eq!(ratio(dec!(500), dec!(200)), Some(dec!(2.5)));
/// assert_eq!(ratio(dec!(500), dec!(0)), None);
/// ```
pub fn ratio(
    numerator: Decimal,
    denominator: Decimal,
) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    numerator.checked_div(denominator)
}
