// 8.0.2: result types and errors for engine operations.

use crate::addressing::AddressError;
use crate::config::ConfigError;
use crate::funding::FundingAccrual;
use crate::ledger::LedgerError;
use crate::math::MathError;
use crate::oracle::OracleError;
use crate::position::PositionKey;
use crate::types::{Address, AssetId, Bps, Price, Side, Usd};
use crate::vault::VaultError;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct MintResult {
    pub shares: u64,
    pub fee: u64,
    pub fee_bps: Bps,
    pub net_amount: u64,
    pub aum: Usd,
    pub price: Price,
}

#[derive(Debug, Clone)]
pub struct BurnResult {
    pub gross: u64,
    pub fee: u64,
    pub fee_bps: Bps,
    pub payout: u64,
    pub redeem_usd: Usd,
    pub early_withdrawal: bool,
}

#[derive(Debug, Clone)]
pub struct SwapResult {
    pub amount_out_gross: u64,
    pub fee: u64,
    pub fee_bps: Bps,
    pub amount_out: u64,
    pub input_usd: Usd,
}

#[derive(Debug, Clone)]
pub struct FundingResult {
    pub asset: AssetId,
    pub accrual: FundingAccrual,
}

#[derive(Debug, Clone)]
pub struct PositionResult {
    pub key: PositionKey,
    pub price: Price,
    pub fee: Usd,
    pub size: Usd,
    pub collateral: Usd,
    pub realized_pnl: Decimal, // this call only
    pub payout: u64,
    pub closed: bool,
}

#[derive(Debug, Clone)]
pub struct LiquidationResult {
    pub key: PositionKey,
    pub price: Price,
    pub seized_collateral: Usd,
    pub loss: Usd,
    pub fees_collected: u64,
    pub liquidator_reward: u64,
    /// Lifetime realized pnl of the position, the seized collateral included.
    pub realized_pnl: Usd,
}

/// Broad class of a failure. callers retry nothing, but can route on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Oracle,
    Capacity,
    Arithmetic,
    Consistency,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Asset {0} is not whitelisted")]
    AssetNotWhitelisted(AssetId),

    #[error("Vault for {0} is not initialized")]
    VaultNotInitialized(AssetId),

    #[error("Vault for {0} is already initialized")]
    VaultAlreadyInitialized(AssetId),

    #[error("Caller {0} is not the admin")]
    Unauthorized(Address),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Address derivation failed: {0}")]
    Address(#[from] AddressError),

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Input and output asset are both {0}")]
    SameAsset(AssetId),

    #[error("{side} not supported on {asset}")]
    UnsupportedSide { asset: AssetId, side: Side },

    #[error("Leverage {0} outside 1x..max")]
    InvalidLeverage(Decimal),

    #[error("Position {0:?} not found")]
    PositionNotFound(PositionKey),

    #[error("Asset {0} still holds reserves or open interest")]
    AssetInUse(AssetId),

    #[error("Position {0:?} is not liquidatable")]
    NotLiquidatable(PositionKey),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Deposit of {requested} into {asset} exceeds cap {cap}")]
    MaxAmountExceeded { asset: AssetId, requested: u64, cap: u64 },

    #[error("Insufficient reserves in {asset}: requested {requested}, available {available}")]
    InsufficientReserves {
        asset: AssetId,
        requested: u64,
        available: u64,
    },

    #[error("Insufficient shares: requested {requested}, available {available}")]
    InsufficientShares { requested: u64, available: u64 },

    #[error("Slippage: {amount_out} out, minimum {min_amount_out}")]
    SlippageExceeded { amount_out: u64, min_amount_out: u64 },

    #[error("Insufficient collateral: {collateral}, minimum {minimum}")]
    InsufficientCollateral { collateral: Usd, minimum: Usd },

    #[error("Position {0:?} would be liquidatable")]
    PositionLiquidatable(PositionKey),

    #[error("Amount too small to mint any shares")]
    DustAmount,

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Math error: {0}")]
    Math(#[from] MathError),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::AssetNotWhitelisted(_)
            | EngineError::VaultNotInitialized(_)
            | EngineError::VaultAlreadyInitialized(_)
            | EngineError::Unauthorized(_)
            | EngineError::Config(_)
            | EngineError::Address(_)
            | EngineError::InvalidAmount
            | EngineError::SameAsset(_)
            | EngineError::UnsupportedSide { .. }
            | EngineError::InvalidLeverage(_)
            | EngineError::PositionNotFound(_)
            | EngineError::AssetInUse(_)
            | EngineError::NotLiquidatable(_) => ErrorKind::Validation,
            EngineError::Oracle(_) => ErrorKind::Oracle,
            EngineError::MaxAmountExceeded { .. }
            | EngineError::InsufficientReserves { .. }
            | EngineError::InsufficientShares { .. }
            | EngineError::SlippageExceeded { .. }
            | EngineError::InsufficientCollateral { .. }
            | EngineError::PositionLiquidatable(_)
            | EngineError::DustAmount
            | EngineError::Ledger(_) => ErrorKind::Capacity,
            EngineError::Math(_) => ErrorKind::Arithmetic,
            EngineError::InvariantViolation(_) => ErrorKind::Consistency,
        }
    }
}

impl From<VaultError> for EngineError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::MaxAmountExceeded {
                asset,
                requested,
                cap,
                ..
            } => EngineError::MaxAmountExceeded {
                asset,
                requested,
                cap,
            },
            VaultError::InsufficientReserves {
                asset,
                requested,
                available,
            } => EngineError::InsufficientReserves {
                asset,
                requested,
                available,
            },
            VaultError::Math(e) => EngineError::Math(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vault_errors_flatten() {
        let asset = AssetId(Address::repeat(1));
        let err: EngineError = VaultError::MaxAmountExceeded {
            asset,
            requested: 5,
            reserves: 10,
            cap: 12,
        }
        .into();
        assert_eq!(
            err,
            EngineError::MaxAmountExceeded {
                asset,
                requested: 5,
                cap: 12
            }
        );
        assert_eq!(err.kind(), ErrorKind::Capacity);
    }

    #[test]
    fn error_kinds() {
        assert_eq!(EngineError::InvalidAmount.kind(), ErrorKind::Validation);
        assert_eq!(EngineError::Math(MathError::Overflow("x")).kind(), ErrorKind::Arithmetic);
        assert_eq!(
            EngineError::Oracle(OracleError::Missing(crate::types::OracleId(Address::repeat(2)))).kind(),
            ErrorKind::Oracle
        );
        assert_eq!(EngineError::InvariantViolation("x".into()).kind(), ErrorKind::Consistency);
    }
}
