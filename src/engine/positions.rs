//! Leveraged position management. increase, decrease, close.

use super::core::{Engine, Staged};
use super::results::{EngineError, PositionResult};
use crate::events::{EventPayload, PositionClosedEvent, PositionDecreasedEvent, PositionIncreasedEvent};
use crate::funding;
use crate::ledger::TokenLedger;
use crate::math::{units_pro_rata, usd_bps, usd_pro_rata, MathError};
use crate::oracle::PriceOracle;
use crate::position::{next_average_price, pnl_delta, Position, PositionKey, ProfitGate};
use crate::types::{Address, AssetId, Bps, Leverage, Side, Usd};
use crate::vault::AssetVault;
use rust_decimal::Decimal;
use tracing::debug;

impl<O: PriceOracle, L: TokenLedger> Engine<O, L> {
    fn check_side(&self, vault: &AssetVault, side: Side) -> Result<(), EngineError> {
        let supported = match side {
            Side::Long => !vault.stable,
            Side::Short => vault.shortable,
        };
        if !supported {
            return Err(EngineError::UnsupportedSide {
                asset: vault.asset,
                side,
            });
        }
        Ok(())
    }

    // remaining positions keep collateral above the liquidation fee and leverage under the cap
    fn check_position_health(&self, position: &Position) -> Result<(), EngineError> {
        if position.collateral <= self.exchange.liquidation_fee_usd {
            return Err(EngineError::InsufficientCollateral {
                collateral: position.collateral,
                minimum: self.exchange.liquidation_fee_usd,
            });
        }
        if let Some(leverage) = position.leverage() {
            if leverage > self.exchange.max_leverage.value() {
                return Err(EngineError::InvalidLeverage(leverage));
            }
        }
        Ok(())
    }

    /// Post `amount` units of `asset` as collateral and open or grow a position at `leverage`.
    pub fn increase_position(
        &mut self,
        owner: Address,
        asset: AssetId,
        side: Side,
        amount: u64,
        leverage: Leverage,
    ) -> Result<PositionResult, EngineError> {
        if amount == 0 {
            return Err(EngineError::InvalidAmount);
        }
        let now = self.current_time;
        let mut vault = self.staged_vault(asset)?;
        self.check_side(&vault, side)?;
        if leverage > self.exchange.max_leverage {
            return Err(EngineError::InvalidLeverage(leverage.value()));
        }

        let accrual = funding::accrue(&mut vault, &self.exchange.funding, now)?;
        let price = self.price_of(&vault)?;

        let key = PositionKey::new(owner, asset, side);
        let mut position = self
            .positions
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Position::open(key));
        let liability_before = position.liability()?;

        let collateral_usd = vault.to_usd(amount, price)?;
        let size_delta = collateral_usd.checked_mul(leverage.value())?;
        let margin_fee = usd_bps(size_delta, self.exchange.fees.margin_fee())?;
        let funding_fee = funding::funding_fee(position.size, position.entry_funding_rate, vault.cumulative_funding_rate)?;
        let fee = margin_fee.checked_add(funding_fee)?;

        position.average_price = Some(next_average_price(&position, price, size_delta)?);
        position.size = position.size.checked_add(size_delta)?;
        position.collateral = position.collateral.checked_add(collateral_usd)?.checked_sub(fee)?;
        position.entry_funding_rate = vault.cumulative_funding_rate;
        position.last_increased_time = now;
        self.check_position_health(&position)?;

        let fee_units = vault.to_units(fee, price)?;
        let reserve_delta = vault.to_units(size_delta.checked_div(leverage.value())?, price)?;
        let open_units = vault.to_units(size_delta, price)?;

        vault.deposit(amount, 0)?;
        vault.collect_fee(fee_units)?;
        vault.reserve(reserve_delta)?;
        if side.is_short() {
            vault.increase_short(open_units)?;
        }
        position.reserve_amount = position
            .reserve_amount
            .checked_add(reserve_delta)
            .ok_or(MathError::Overflow("position reserve"))?;
        position.open_units = position
            .open_units
            .checked_add(open_units)
            .ok_or(MathError::Overflow("position units"))?;
        vault.adjust_liabilities(liability_before, position.liability()?)?;
        debug!(?key, %size_delta, %fee, reserve_delta, "increase staged");

        let mut staged = Staged::default();
        staged.transfer(asset.0, owner, vault.custody, amount);
        staged.vaults.push(vault);
        staged.position = Some((key, Some(position.clone())));
        staged.funding.push((asset, accrual));
        self.commit(staged)?;

        self.emit_event(EventPayload::PositionIncreased(PositionIncreasedEvent {
            key,
            collateral_delta: collateral_usd,
            size_delta,
            price,
            fee,
            size: position.size,
            collateral: position.collateral,
        }));

        Ok(PositionResult {
            key,
            price,
            fee,
            size: position.size,
            collateral: position.collateral,
            realized_pnl: Decimal::ZERO,
            payout: 0,
            closed: false,
        })
    }

    /// Shrink a position by `size_delta` usd and withdraw `collateral_delta` usd of collateral.
    /// Closing the whole size pays out all remaining collateral.
    pub fn decrease_position(
        &mut self,
        owner: Address,
        asset: AssetId,
        side: Side,
        collateral_delta: Usd,
        size_delta: Usd,
    ) -> Result<PositionResult, EngineError> {
        let key = PositionKey::new(owner, asset, side);
        let mut position = self
            .positions
            .get(&key)
            .cloned()
            .ok_or(EngineError::PositionNotFound(key))?;

        if collateral_delta.is_negative()
            || size_delta.is_negative()
            || (collateral_delta.is_zero() && size_delta.is_zero())
            || size_delta > position.size
        {
            return Err(EngineError::InvalidAmount);
        }

        let now = self.current_time;
        let mut vault = self.staged_vault(asset)?;
        let accrual = funding::accrue(&mut vault, &self.exchange.funding, now)?;
        let price = self.price_of(&vault)?;
        let liability_before = position.liability()?;
        let full_close = size_delta == position.size;

        let funding_fee = funding::funding_fee(position.size, position.entry_funding_rate, vault.cumulative_funding_rate)?;
        let margin_fee = usd_bps(size_delta, self.exchange.fees.margin_fee())?;
        let fee = funding_fee.checked_add(margin_fee)?;

        let gate = ProfitGate {
            min_profit_bps: Bps::new(vault.min_profit_basis_points),
            min_profit_time: self.exchange.min_profit_time,
        };
        let pnl = pnl_delta(&position, price, now, gate)?;
        let adjusted = if size_delta.is_zero() {
            Usd::zero()
        } else {
            usd_pro_rata(pnl.delta, size_delta, position.size)?
        };

        let mut payout = Usd::zero();
        let mut realized = Usd::zero();
        if pnl.has_profit {
            payout = adjusted;
            realized = adjusted;
        } else if !adjusted.is_zero() {
            if adjusted > position.collateral {
                return Err(EngineError::PositionLiquidatable(key));
            }
            position.collateral = position.collateral.checked_sub(adjusted)?;
            realized = Usd::zero().checked_sub(adjusted)?;
        }

        let collateral_out = if full_close { position.collateral } else { collateral_delta };
        if collateral_out > position.collateral {
            return Err(EngineError::InsufficientCollateral {
                collateral: position.collateral,
                minimum: collateral_out,
            });
        }
        payout = payout.checked_add(collateral_out)?;
        position.collateral = position.collateral.checked_sub(collateral_out)?;

        // fees come out of the payout when it covers them, else out of collateral
        if payout >= fee {
            payout = payout.checked_sub(fee)?;
        } else {
            if fee > position.collateral {
                return Err(EngineError::PositionLiquidatable(key));
            }
            position.collateral = position.collateral.checked_sub(fee)?;
        }
        position.realized_pnl = position.realized_pnl.checked_add(realized)?;

        let (reserve_release, units_release) = if full_close {
            (position.reserve_amount, position.open_units)
        } else {
            (
                units_pro_rata(position.reserve_amount, size_delta, position.size)?,
                units_pro_rata(position.open_units, size_delta, position.size)?,
            )
        };
        position.size = position.size.checked_sub(size_delta)?;
        position.reserve_amount -= reserve_release;
        position.open_units -= units_release;
        position.entry_funding_rate = vault.cumulative_funding_rate;

        let closed = position.size.is_zero();
        if !closed {
            self.check_position_health(&position)?;
        }

        let payout_units = vault.to_units(payout, price)?;
        let fee_units = vault.to_units(fee, price)?;
        vault.release(reserve_release)?;
        if side.is_short() {
            vault.decrease_short(units_release)?;
        }
        vault.collect_fee(fee_units)?;
        vault.withdraw(payout_units, 0)?;
        let liability_after = if closed { Usd::zero() } else { position.liability()? };
        vault.adjust_liabilities(liability_before, liability_after)?;
        debug!(?key, %size_delta, %fee, payout_units, closed, "decrease staged");

        let mut staged = Staged::default();
        staged.transfer(asset.0, vault.custody, owner, payout_units);
        staged.vaults.push(vault);
        staged.position = Some((key, if closed { None } else { Some(position.clone()) }));
        staged.funding.push((asset, accrual));
        self.commit(staged)?;

        if closed {
            self.emit_event(EventPayload::PositionClosed(PositionClosedEvent {
                key,
                price,
                realized_pnl: position.realized_pnl,
                payout: payout_units,
            }));
        } else {
            self.emit_event(EventPayload::PositionDecreased(PositionDecreasedEvent {
                key,
                collateral_delta,
                size_delta,
                price,
                fee,
                realized_pnl: realized.value(),
                payout: payout_units,
            }));
        }

        Ok(PositionResult {
            key,
            price,
            fee,
            size: position.size,
            collateral: position.collateral,
            realized_pnl: realized.value(),
            payout: payout_units,
            closed,
        })
    }

    pub fn close_position(&mut self, owner: Address, asset: AssetId, side: Side) -> Result<PositionResult, EngineError> {
        let key = PositionKey::new(owner, asset, side);
        let size = self
            .positions
            .get(&key)
            .map(|p| p.size)
            .ok_or(EngineError::PositionNotFound(key))?;
        self.decrease_position(owner, asset, side, Usd::zero(), size)
    }
}
