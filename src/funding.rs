// 5.0: borrow funding. shorts borrow from the pool, the vault's cumulative rate
// grows with utilization each whole interval. positions pay (cumulative - entry) * size.
// 5.1 accrual, 5.2 fee owed by a position.

use crate::config::FundingParams;
use crate::math::{mul_div_floor, MathError};
use crate::types::{Timestamp, Usd};
use crate::vault::AssetVault;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const FUNDING_RATE_PRECISION: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingAccrual {
    pub intervals: u64,
    pub rate_delta: u64,
    pub cumulative_funding_rate: u64,
    pub last_funding_time: i64,
}

// timestamp rounded down to the interval grid
fn floor_to_interval(now: Timestamp, interval_secs: u64) -> i64 {
    let interval = interval_secs as i64;
    now.as_secs().div_euclid(interval) * interval
}

// 5.1: utilization scaled by FUNDING_RATE_PRECISION. zero when the pool is empty
pub fn utilization(vault: &AssetVault) -> Result<u64, MathError> {
    if vault.pool_reserves == 0 {
        return Ok(0);
    }
    mul_div_floor(vault.global_short_size, FUNDING_RATE_PRECISION, vault.pool_reserves)
}

pub fn next_rate_delta(vault: &AssetVault, params: &FundingParams, intervals: u64) -> Result<u64, MathError> {
    if vault.pool_reserves == 0 || vault.global_short_size == 0 {
        return Ok(0);
    }
    let factor = params
        .factor_for(vault.stable)
        .checked_mul(intervals)
        .ok_or(MathError::Overflow("funding factor"))?;
    mul_div_floor(factor, vault.global_short_size, vault.pool_reserves)
}

/// Advances the vault's cumulative funding rate to `now`. first touch only anchors the clock.
pub fn accrue(vault: &mut AssetVault, params: &FundingParams, now: Timestamp) -> Result<FundingAccrual, MathError> {
    if params.interval_secs == 0 {
        return Err(MathError::DivisionByZero("funding interval"));
    }

    let Some(last_funding_time) = vault.last_funding_time else {
        let anchor = floor_to_interval(now, params.interval_secs);
        vault.last_funding_time = Some(anchor);
        return Ok(FundingAccrual {
            intervals: 0,
            rate_delta: 0,
            cumulative_funding_rate: vault.cumulative_funding_rate,
            last_funding_time: anchor,
        });
    };

    let elapsed = now.secs_since(Timestamp(last_funding_time));
    let intervals = elapsed / params.interval_secs;
    if intervals == 0 {
        return Ok(FundingAccrual {
            intervals: 0,
            rate_delta: 0,
            cumulative_funding_rate: vault.cumulative_funding_rate,
            last_funding_time,
        });
    }

    let rate_delta = next_rate_delta(vault, params, intervals)?;
    let cumulative = vault
        .cumulative_funding_rate
        .checked_add(rate_delta)
        .ok_or(MathError::Overflow("cumulative funding"))?;
    let advance = intervals
        .checked_mul(params.interval_secs)
        .and_then(|s| i64::try_from(s).ok())
        .ok_or(MathError::Overflow("funding time"))?;
    let last = last_funding_time
        .checked_add(advance)
        .ok_or(MathError::Overflow("funding time"))?;

    vault.cumulative_funding_rate = cumulative;
    vault.last_funding_time = Some(last);

    Ok(FundingAccrual {
        intervals,
        rate_delta,
        cumulative_funding_rate: cumulative,
        last_funding_time: last,
    })
}

// 5.2: what a position of `size` usd owes since it snapshotted `entry_rate`
pub fn funding_fee(size: Usd, entry_rate: u64, cumulative_rate: u64) -> Result<Usd, MathError> {
    let delta = cumulative_rate.saturating_sub(entry_rate);
    if delta == 0 || size.is_zero() {
        return Ok(Usd::zero());
    }
    size.checked_mul(Decimal::from(delta))?
        .checked_div(Decimal::from(FUNDING_RATE_PRECISION))
}
