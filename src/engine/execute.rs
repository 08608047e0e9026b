//! Instruction dispatch. one entry point for callers that carry instructions as data.

use super::core::Engine;
use super::results::{BurnResult, EngineError, FundingResult, LiquidationResult, MintResult, PositionResult, SwapResult};
use crate::instruction::Instruction;
use crate::ledger::TokenLedger;
use crate::oracle::PriceOracle;
use tracing::{debug, warn};

/// What an executed instruction produced.
#[derive(Debug, Clone)]
pub enum Outcome {
    Done,
    Minted(MintResult),
    Burned(BurnResult),
    Swapped(SwapResult),
    Funding(FundingResult),
    Position(PositionResult),
    Liquidated(LiquidationResult),
}

impl<O: PriceOracle, L: TokenLedger> Engine<O, L> {
    pub fn execute(&mut self, instruction: Instruction) -> Result<Outcome, EngineError> {
        let name = instruction.name();
        debug!(instruction = name, "execute");

        let outcome = match instruction {
            Instruction::UpdateAssetWhitelist { caller, assets, oracles } => {
                self.update_asset_whitelist(caller, assets, oracles).map(|_| Outcome::Done)
            }
            Instruction::InitializeAssetVault { caller, params } => {
                self.initialize_asset_vault(caller, params).map(|_| Outcome::Done)
            }
            Instruction::UpdateFeeParams { caller, fees } => self.update_fee_params(caller, fees).map(|_| Outcome::Done),
            Instruction::WithdrawFees {
                caller,
                asset,
                amount,
                receiver,
            } => self.withdraw_fees(caller, asset, amount, receiver).map(|_| Outcome::Done),
            Instruction::Mint { caller, asset, amount } => self.mint(caller, asset, amount).map(Outcome::Minted),
            Instruction::Burn { caller, asset, shares } => self.burn(caller, asset, shares).map(Outcome::Burned),
            Instruction::Swap {
                caller,
                asset_in,
                asset_out,
                amount_in,
                min_amount_out,
            } => self
                .swap(caller, asset_in, asset_out, amount_in, min_amount_out)
                .map(Outcome::Swapped),
            Instruction::UpdateFunding { asset } => self.update_funding(asset).map(Outcome::Funding),
            Instruction::IncreasePosition {
                owner,
                asset,
                side,
                amount,
                leverage,
            } => self
                .increase_position(owner, asset, side, amount, leverage)
                .map(Outcome::Position),
            Instruction::DecreasePosition {
                owner,
                asset,
                side,
                collateral_delta,
                size_delta,
            } => self
                .decrease_position(owner, asset, side, collateral_delta, size_delta)
                .map(Outcome::Position),
            Instruction::ClosePosition { owner, asset, side } => {
                self.close_position(owner, asset, side).map(Outcome::Position)
            }
            Instruction::LiquidatePosition {
                liquidator,
                owner,
                asset,
                side,
            } => self
                .liquidate_position(liquidator, owner, asset, side)
                .map(Outcome::Liquidated),
        };

        if let Err(e) = &outcome {
            warn!(instruction = name, kind = ?e.kind(), error = %e, "instruction failed");
        }
        outcome
    }
}
