// 4.0: leveraged positions funded by the pool. size and collateral are usd,
// the pool side is tracked in asset units (reserve_amount, open_units).
// 4.1 has the pnl delta with the anti-gaming rule, 4.2 average price, 4.3 liquidation test.

use crate::math::MathError;
use crate::types::{Address, AssetId, Bps, Price, Side, Timestamp, Usd};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionKey {
    pub owner: Address,
    pub collateral_asset: AssetId,
    pub side: Side,
}

impl PositionKey {
    pub fn new(owner: Address, collateral_asset: AssetId, side: Side) -> Self {
        Self {
            owner,
            collateral_asset,
            side,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub owner: Address,
    pub collateral_asset: AssetId,
    pub side: Side,
    pub size: Usd,
    pub collateral: Usd,
    pub average_price: Option<Price>,
    pub reserve_amount: u64,
    pub open_units: u64,
    pub entry_funding_rate: u64,
    pub realized_pnl: Usd,
    pub last_increased_time: Timestamp,
}

impl Position {
    pub fn open(key: PositionKey) -> Self {
        Self {
            owner: key.owner,
            collateral_asset: key.collateral_asset,
            side: key.side,
            size: Usd::zero(),
            collateral: Usd::zero(),
            average_price: None,
            reserve_amount: 0,
            open_units: 0,
            entry_funding_rate: 0,
            realized_pnl: Usd::zero(),
            last_increased_time: Timestamp::default(),
        }
    }

    pub fn key(&self) -> PositionKey {
        PositionKey::new(self.owner, self.collateral_asset, self.side)
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_zero()
    }

    // size / collateral. None with no collateral
    pub fn leverage(&self) -> Option<Decimal> {
        if self.collateral.is_zero() || self.collateral.is_negative() {
            return None;
        }
        self.size.value().checked_div(self.collateral.value())
    }

    // what this position contributes to the vault's net protocol liabilities
    pub fn liability(&self) -> Result<Usd, MathError> {
        self.size.checked_sub(self.collateral)
    }
}

/// Signed pnl split into direction and magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PnlDelta {
    pub has_profit: bool,
    pub delta: Usd,
}

impl PnlDelta {
    pub fn flat() -> Self {
        Self {
            has_profit: false,
            delta: Usd::zero(),
        }
    }

    pub fn signed(&self) -> Decimal {
        if self.has_profit {
            self.delta.value()
        } else {
            -self.delta.value()
        }
    }
}

/// Anti-gaming thresholds. profit only counts after both are cleared.
#[derive(Debug, Clone, Copy)]
pub struct ProfitGate {
    pub min_profit_bps: Bps,
    pub min_profit_time: u64,
}

// 4.1: size * |price - avg| / avg. a profit that moved less than min_profit_bps
// or came before min_profit_time is floored to zero. losses always count.
pub fn pnl_delta(position: &Position, price: Price, now: Timestamp, gate: ProfitGate) -> Result<PnlDelta, MathError> {
    let Some(average) = position.average_price else {
        return Ok(PnlDelta::flat());
    };
    if position.size.is_zero() {
        return Ok(PnlDelta::flat());
    }

    let avg = average.value();
    let price_delta = (avg - price.value()).abs();
    let delta = position
        .size
        .checked_mul(price_delta)?
        .checked_div(avg)?;

    let has_profit = match position.side {
        Side::Long => price.value() > avg,
        Side::Short => price.value() < avg,
    };

    if has_profit {
        let too_soon = now.secs_since(position.last_increased_time) < gate.min_profit_time;
        let too_small = price_delta
            .checked_mul(Decimal::from(crate::types::BASIS_POINTS_DIVISOR))
            .ok_or(MathError::Overflow("profit gate"))?
            <= avg
                .checked_mul(Decimal::from(gate.min_profit_bps.value()))
                .ok_or(MathError::Overflow("profit gate"))?;
        if too_soon || too_small {
            return Ok(PnlDelta {
                has_profit: true,
                delta: Usd::zero(),
            });
        }
    }

    Ok(PnlDelta { has_profit, delta })
}

// 4.2: keeps size / average_price equal to units held after adding size_delta at price
pub fn next_average_price(position: &Position, price: Price, size_delta: Usd) -> Result<Price, MathError> {
    let Some(average) = position.average_price else {
        return Ok(price);
    };
    if position.size.is_zero() {
        return Ok(price);
    }

    let held_units = position
        .size
        .value()
        .checked_div(average.value())
        .ok_or(MathError::DivisionByZero("average price"))?;
    let new_units = size_delta
        .value()
        .checked_div(price.value())
        .ok_or(MathError::DivisionByZero("average price"))?;
    let next_size = position.size.checked_add(size_delta)?;
    let units = held_units
        .checked_add(new_units)
        .ok_or(MathError::Overflow("average price"))?;
    if units.is_zero() {
        return Err(MathError::DivisionByZero("average price"));
    }
    let avg = next_size
        .value()
        .checked_div(units)
        .ok_or(MathError::Overflow("average price"))?;
    Price::new(avg).ok_or(MathError::Underflow("average price"))
}

/// Result of testing a position against its collateral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidationCheck {
    pub loss: Usd,
    pub fees: Usd,
    // collateral left after the loss, before fees. never negative
    pub remaining_after_loss: Usd,
    pub liquidatable: bool,
}

// 4.3: liquidatable once losses plus fees (margin, funding, liquidator reward)
// consume all collateral. profit does not rescue a position here.
pub fn check_liquidation(
    position: &Position,
    price: Price,
    margin_fee: Usd,
    funding_fee: Usd,
    liquidation_fee: Usd,
) -> Result<LiquidationCheck, MathError> {
    let raw = pnl_delta(
        position,
        price,
        Timestamp(i64::MAX),
        ProfitGate {
            min_profit_bps: Bps::ZERO,
            min_profit_time: 0,
        },
    )?;
    let loss = if raw.has_profit { Usd::zero() } else { raw.delta };
    let fees = margin_fee.checked_add(funding_fee)?.checked_add(liquidation_fee)?;
    let remaining_after_loss = position.collateral.checked_sub(loss)?.max(Usd::zero());
    let consumed = loss.checked_add(fees)?;

    Ok(LiquidationCheck {
        loss,
        fees,
        remaining_after_loss,
        liquidatable: consumed >= position.collateral,
    })
}
