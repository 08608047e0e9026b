// 2.0: checked fixed-point helpers. token amounts are integer units, usd is Decimal.
// every conversion floors toward the pool and every op reports overflow instead of wrapping.

use crate::types::{Bps, Price, Usd, BASIS_POINTS_DIVISOR};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

// Decimal keeps 28 significant digits. anything above 10^18 per unit is not a real mint.
pub const MAX_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("Arithmetic underflow in {0}")]
    Underflow(&'static str),

    #[error("Division by zero in {0}")]
    DivisionByZero(&'static str),

    #[error("Unsupported decimals: {0}")]
    UnsupportedDecimals(u8),
}

// 2.1: a * b / denominator with a u128 intermediate. floors.
pub fn mul_div_floor(a: u64, b: u64, denominator: u64) -> Result<u64, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero("mul_div"));
    }
    let product = (a as u128) * (b as u128);
    let result = product / (denominator as u128);
    u64::try_from(result).map_err(|_| MathError::Overflow("mul_div"))
}

// fee = floor(amount * bps / 10000). returns (fee, amount - fee)
pub fn split_fee(amount: u64, bps: Bps) -> Result<(u64, u64), MathError> {
    if bps > Bps::MAX {
        return Err(MathError::Overflow("fee bps"));
    }
    let fee = mul_div_floor(amount, bps.value(), BASIS_POINTS_DIVISOR)?;
    let net = amount.checked_sub(fee).ok_or(MathError::Underflow("fee split"))?;
    Ok((fee, net))
}

pub fn pow10(decimals: u8) -> Result<Decimal, MathError> {
    if decimals > MAX_DECIMALS {
        return Err(MathError::UnsupportedDecimals(decimals));
    }
    Ok(Decimal::from(10u64.pow(decimals as u32)))
}

// 2.2: floors a non-negative Decimal into u64 units
pub fn floor_to_u64(value: Decimal) -> Result<u64, MathError> {
    if value < Decimal::ZERO {
        return Err(MathError::Underflow("decimal to units"));
    }
    value.floor().to_u64().ok_or(MathError::Overflow("decimal to units"))
}

// 2.3: units of an asset → usd. 100_000 units at 6 decimals and $1 = $0.1
pub fn units_to_usd(units: u64, decimals: u8, price: Price) -> Result<Usd, MathError> {
    let scale = pow10(decimals)?;
    let value = Decimal::from(units)
        .checked_mul(price.value())
        .ok_or(MathError::Overflow("units to usd"))?
        .checked_div(scale)
        .ok_or(MathError::Overflow("units to usd"))?;
    Ok(Usd::new(value))
}

// usd → asset units, floored. multiplies before dividing so exact results stay exact.
pub fn usd_to_units(usd: Usd, decimals: u8, price: Price) -> Result<u64, MathError> {
    if usd.is_negative() {
        return Err(MathError::Underflow("usd to units"));
    }
    let scale = pow10(decimals)?;
    let value = usd
        .value()
        .checked_mul(scale)
        .ok_or(MathError::Overflow("usd to units"))?
        .checked_div(price.value())
        .ok_or(MathError::DivisionByZero("usd to units"))?;
    floor_to_u64(value)
}

// usd * numerator / denominator for pro rata splits (pnl, reserve release)
pub fn usd_pro_rata(usd: Usd, numerator: Usd, denominator: Usd) -> Result<Usd, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero("pro rata"));
    }
    let value = usd
        .value()
        .checked_mul(numerator.value())
        .ok_or(MathError::Overflow("pro rata"))?
        .checked_div(denominator.value())
        .ok_or(MathError::Overflow("pro rata"))?;
    Ok(Usd::new(value))
}

pub fn units_pro_rata(units: u64, numerator: Usd, denominator: Usd) -> Result<u64, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero("pro rata"));
    }
    if numerator >= denominator {
        return Ok(units);
    }
    let value = Decimal::from(units)
        .checked_mul(numerator.value())
        .ok_or(MathError::Overflow("pro rata"))?
        .checked_div(denominator.value())
        .ok_or(MathError::Overflow("pro rata"))?;
    floor_to_u64(value)
}

pub fn usd_bps(usd: Usd, bps: Bps) -> Result<Usd, MathError> {
    usd.checked_mul(bps.as_fraction())
}
