// 9.0: asset vault. one per whitelisted asset, holds the reserve counters that must
// reconcile with the custody token account: pool_reserves + fee_reserves == custody balance.
// 9.1 has the mutation rules. each one is checked and leaves the vault untouched on error.

use crate::math::{self, MathError, MAX_DECIMALS};
use crate::types::{Address, AssetId, OracleId, Price, Usd};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    #[error("Deposit of {requested} into {asset} exceeds cap {cap} (reserves {reserves})")]
    MaxAmountExceeded {
        asset: AssetId,
        requested: u64,
        reserves: u64,
        cap: u64,
    },

    #[error("Insufficient reserves in {asset}: requested {requested}, available {available}")]
    InsufficientReserves {
        asset: AssetId,
        requested: u64,
        available: u64,
    },

    #[error("Math error: {0}")]
    Math(#[from] MathError),
}

/// Everything the admin supplies when opening a vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultParams {
    pub asset: AssetId,
    pub seed: String,
    pub decimals: u8,
    pub weight: u64,
    pub min_profit_basis_points: u64,
    pub max_lptoken_amount: u64,
    pub stable: bool,
    pub shortable: bool,
    pub oracle: OracleId,
    pub backup_oracle: Option<OracleId>,
}

impl VaultParams {
    pub fn decimals_supported(&self) -> bool {
        self.decimals <= MAX_DECIMALS
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetVault {
    pub asset: AssetId,
    pub seed: String,
    pub record: Address,
    pub custody: Address,
    pub decimals: u8,
    pub weight: u64,
    pub min_profit_basis_points: u64,
    pub max_lptoken_amount: u64,
    pub stable: bool,
    pub shortable: bool,
    pub cumulative_funding_rate: u64,
    /// None until the first funding touch anchors it to the interval grid.
    pub last_funding_time: Option<i64>,
    pub oracle: OracleId,
    pub backup_oracle: Option<OracleId>,
    pub global_short_size: u64,
    pub net_protocol_liabilities: Usd,
    pub reserved_amount: u64,
    pub pool_reserves: u64,
    pub fee_reserves: u64,
}

impl AssetVault {
    pub fn new(params: VaultParams, record: Address, custody: Address) -> Self {
        Self {
            asset: params.asset,
            seed: params.seed,
            record,
            custody,
            decimals: params.decimals,
            weight: params.weight,
            min_profit_basis_points: params.min_profit_basis_points,
            max_lptoken_amount: params.max_lptoken_amount,
            stable: params.stable,
            shortable: params.shortable,
            cumulative_funding_rate: 0,
            last_funding_time: None,
            oracle: params.oracle,
            backup_oracle: params.backup_oracle,
            global_short_size: 0,
            net_protocol_liabilities: Usd::zero(),
            reserved_amount: 0,
            pool_reserves: 0,
            fee_reserves: 0,
        }
    }

    // what the custody token account must hold
    pub fn custody_total(&self) -> Result<u64, MathError> {
        self.pool_reserves
            .checked_add(self.fee_reserves)
            .ok_or(MathError::Overflow("custody total"))
    }

    // reserves not earmarked for open positions
    pub fn available_reserves(&self) -> u64 {
        self.pool_reserves.saturating_sub(self.reserved_amount)
    }

    pub fn reserves_usd(&self, price: Price) -> Result<Usd, MathError> {
        self.to_usd(self.pool_reserves, price)
    }

    pub fn to_usd(&self, units: u64, price: Price) -> Result<Usd, MathError> {
        math::units_to_usd(units, self.decimals, price)
    }

    pub fn to_units(&self, usd: Usd, price: Price) -> Result<u64, MathError> {
        math::usd_to_units(usd, self.decimals, price)
    }

    // true while the vault still carries balances or open interest
    pub fn in_use(&self) -> bool {
        self.pool_reserves > 0
            || self.fee_reserves > 0
            || self.reserved_amount > 0
            || self.global_short_size > 0
    }

    // 9.1: cap is on pool reserves after the deposit lands
    pub fn check_capacity(&self, incoming: u64) -> Result<(), VaultError> {
        let after = self
            .pool_reserves
            .checked_add(incoming)
            .ok_or(MathError::Overflow("capacity"))?;
        if after > self.max_lptoken_amount {
            return Err(VaultError::MaxAmountExceeded {
                asset: self.asset,
                requested: incoming,
                reserves: self.pool_reserves,
                cap: self.max_lptoken_amount,
            });
        }
        Ok(())
    }

    pub fn deposit(&mut self, to_pool: u64, to_fees: u64) -> Result<(), VaultError> {
        let pool = self
            .pool_reserves
            .checked_add(to_pool)
            .ok_or(MathError::Overflow("pool reserves"))?;
        let fees = self
            .fee_reserves
            .checked_add(to_fees)
            .ok_or(MathError::Overflow("fee reserves"))?;
        self.pool_reserves = pool;
        self.fee_reserves = fees;
        Ok(())
    }

    // gross leaves pool_reserves. fee stays behind in fee_reserves, the rest leaves custody.
    pub fn withdraw(&mut self, gross: u64, fee: u64) -> Result<(), VaultError> {
        if gross > self.available_reserves() {
            return Err(VaultError::InsufficientReserves {
                asset: self.asset,
                requested: gross,
                available: self.available_reserves(),
            });
        }
        if fee > gross {
            return Err(MathError::Underflow("withdraw fee").into());
        }
        let fees = self
            .fee_reserves
            .checked_add(fee)
            .ok_or(MathError::Overflow("fee reserves"))?;
        self.pool_reserves -= gross;
        self.fee_reserves = fees;
        Ok(())
    }

    // moves units from the pool side to the fee side. custody total unchanged.
    pub fn collect_fee(&mut self, units: u64) -> Result<(), VaultError> {
        self.withdraw(units, units)
    }

    pub fn withdraw_fees(&mut self, amount: u64) -> Result<(), VaultError> {
        if amount > self.fee_reserves {
            return Err(VaultError::InsufficientReserves {
                asset: self.asset,
                requested: amount,
                available: self.fee_reserves,
            });
        }
        self.fee_reserves -= amount;
        Ok(())
    }

    pub fn reserve(&mut self, units: u64) -> Result<(), VaultError> {
        if units > self.available_reserves() {
            return Err(VaultError::InsufficientReserves {
                asset: self.asset,
                requested: units,
                available: self.available_reserves(),
            });
        }
        self.reserved_amount += units;
        Ok(())
    }

    pub fn release(&mut self, units: u64) -> Result<(), VaultError> {
        self.reserved_amount = self
            .reserved_amount
            .checked_sub(units)
            .ok_or(MathError::Underflow("reserved amount"))?;
        Ok(())
    }

    pub fn increase_short(&mut self, units: u64) -> Result<(), VaultError> {
        self.global_short_size = self
            .global_short_size
            .checked_add(units)
            .ok_or(MathError::Overflow("global short size"))?;
        Ok(())
    }

    pub fn decrease_short(&mut self, units: u64) -> Result<(), VaultError> {
        self.global_short_size = self
            .global_short_size
            .checked_sub(units)
            .ok_or(MathError::Underflow("global short size"))?;
        Ok(())
    }

    // swaps one position's (size - collateral) contribution for another
    pub fn adjust_liabilities(&mut self, before: Usd, after: Usd) -> Result<(), VaultError> {
        self.net_protocol_liabilities = self
            .net_protocol_liabilities
            .checked_sub(before)?
            .checked_add(after)?;
        Ok(())
    }
}
