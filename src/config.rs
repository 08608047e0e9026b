// 7.0 config.rs: exchange level settings. fee params, funding cadence, whitelist.
// 7.1 every change goes through ExchangeConfig::transition which re-validates and bumps version.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::{Address, AssetId, Bps, Leverage, OracleId, Usd, BASIS_POINTS_DIVISOR};

pub const MAX_NAME_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Exchange name must not be empty")]
    EmptyName,

    #[error("Exchange name is {0} bytes, max 20")]
    NameTooLong(usize),

    #[error("Whitelist has {assets} assets but {oracles} oracles")]
    MisalignedWhitelist { assets: usize, oracles: usize },

    #[error("Asset {0} listed twice")]
    DuplicateAsset(AssetId),

    #[error("{field} is {value}bps, max 10000")]
    BpsOutOfRange { field: &'static str, value: u64 },

    #[error("Funding interval must be positive")]
    ZeroFundingInterval,

    #[error("Liquidation fee must not be negative")]
    NegativeLiquidationFee,

    #[error("Oracle {given} does not match whitelist slot oracle {expected}")]
    OracleMismatch { expected: OracleId, given: OracleId },

    #[error("Total weights {declared} disagree with vault weights {actual}")]
    WeightMismatch { declared: u64, actual: u64 },

    #[error("Asset seed must be 1 to 32 bytes, got {0}")]
    InvalidAssetSeed(usize),
}

/** 7.2: fee settings in bps. defaults are what initialize writes */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeParams {
    // extra bps scaled by how far an op pushes a vault off target weight
    pub tax_basis_points: u64,
    // same, for swaps between two stable assets
    pub stable_tax_basis_points: u64,
    pub mint_burn_basis_points: u64,
    pub swap_fee_basis_points: u64,
    pub stable_swap_fee_basis_points: u64,
    // charged on position size changes
    pub margin_fee_basis_points: u64,
    // added to the burn fee while the holder's last mint is inside the lockup
    pub early_withdrawal_basis_points: u64,
}

impl Default for FeeParams {
    fn default() -> Self {
        Self {
            tax_basis_points: 8,
            stable_tax_basis_points: 4,
            mint_burn_basis_points: 15,
            swap_fee_basis_points: 30,
            stable_swap_fee_basis_points: 8,
            margin_fee_basis_points: 1,
            early_withdrawal_basis_points: 60,
        }
    }
}

impl FeeParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("tax_basis_points", self.tax_basis_points),
            ("stable_tax_basis_points", self.stable_tax_basis_points),
            ("mint_burn_basis_points", self.mint_burn_basis_points),
            ("swap_fee_basis_points", self.swap_fee_basis_points),
            ("stable_swap_fee_basis_points", self.stable_swap_fee_basis_points),
            ("margin_fee_basis_points", self.margin_fee_basis_points),
            ("early_withdrawal_basis_points", self.early_withdrawal_basis_points),
        ];
        for (field, value) in fields {
            if value > BASIS_POINTS_DIVISOR {
                return Err(ConfigError::BpsOutOfRange { field, value });
            }
        }
        Ok(())
    }

    pub fn margin_fee(&self) -> Bps {
        Bps::new(self.margin_fee_basis_points)
    }

    pub fn early_withdrawal(&self) -> Bps {
        Bps::new(self.early_withdrawal_basis_points)
    }
}

/// Funding cadence. rates are fixed point over FUNDING_RATE_PRECISION.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingParams {
    pub interval_secs: u64,
    pub rate_factor: u64,
    pub stable_rate_factor: u64,
}

impl Default for FundingParams {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            rate_factor: 100,
            stable_rate_factor: 100,
        }
    }
}

impl FundingParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::ZeroFundingInterval);
        }
        Ok(())
    }

    pub fn factor_for(&self, stable: bool) -> u64 {
        if stable {
            self.stable_rate_factor
        } else {
            self.rate_factor
        }
    }
}

/// One per pool. the whitelist and oracle list are index aligned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub name: String,
    pub admin: Address,
    pub assets: Vec<AssetId>,
    pub oracles: Vec<OracleId>,
    pub fees: FeeParams,
    pub funding: FundingParams,
    pub liquidation_fee_usd: Usd,
    pub min_profit_time: u64,
    pub max_leverage: Leverage,
    pub share_lockup_secs: u64,
    pub total_weights: u64,
    pub version: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            name: "pool".to_string(),
            admin: Address::default(),
            assets: Vec::new(),
            oracles: Vec::new(),
            fees: FeeParams::default(),
            funding: FundingParams::default(),
            liquidation_fee_usd: Usd::new(dec!(40)),
            min_profit_time: 15,
            max_leverage: Leverage::new_unchecked(dec!(50)),
            share_lockup_secs: 900, // 15 min
            total_weights: 0,
            version: 0,
        }
    }
}

impl ExchangeConfig {
    // initialize defaults with a name and admin
    pub fn new(name: impl Into<String>, admin: Address) -> Self {
        Self {
            name: name.into(),
            admin,
            ..Self::default()
        }
    }

    pub fn with_fees(mut self, fees: FeeParams) -> Self {
        self.fees = fees;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.name.len() > MAX_NAME_LEN {
            return Err(ConfigError::NameTooLong(self.name.len()));
        }
        if self.assets.len() != self.oracles.len() {
            return Err(ConfigError::MisalignedWhitelist {
                assets: self.assets.len(),
                oracles: self.oracles.len(),
            });
        }
        let mut seen = HashSet::new();
        for asset in &self.assets {
            if !seen.insert(*asset) {
                return Err(ConfigError::DuplicateAsset(*asset));
            }
        }
        if self.liquidation_fee_usd.is_negative() {
            return Err(ConfigError::NegativeLiquidationFee);
        }
        self.fees.validate()?;
        self.funding.validate()?;
        Ok(())
    }

    // 7.3: clone, edit, validate, bump version. the caller commits the result.
    pub fn transition(&self, edit: impl FnOnce(&mut ExchangeConfig)) -> Result<ExchangeConfig, ConfigError> {
        let mut next = self.clone();
        edit(&mut next);
        next.version = self.version + 1;
        next.validate()?;
        Ok(next)
    }

    // name rendered to the fixed 20 byte record width
    pub fn padded_name(&self) -> [u8; MAX_NAME_LEN] {
        let mut out = [b' '; MAX_NAME_LEN];
        let bytes = self.name.as_bytes();
        let n = bytes.len().min(MAX_NAME_LEN);
        out[..n].copy_from_slice(&bytes[..n]);
        out
    }

    pub fn whitelist_index(&self, asset: &AssetId) -> Option<usize> {
        self.assets.iter().position(|a| a == asset)
    }

    pub fn is_whitelisted(&self, asset: &AssetId) -> bool {
        self.whitelist_index(asset).is_some()
    }

    pub fn oracle_for(&self, asset: &AssetId) -> Option<OracleId> {
        self.whitelist_index(asset).map(|i| self.oracles[i])
    }
}
