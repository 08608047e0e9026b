// weighted-pool-core: multi-asset weighted liquidity pool engine.
// one pool backs share minting, swaps between whitelisted assets and leveraged positions.
// all computation is deterministic; prices and token balances come from injected traits.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Address, AssetId, Side, Price, Usd, Bps, Timestamp
//   2.x  math.rs: unit/usd conversion, floor division, fee split
//   3.x  oracle.rs: oracle readings, staleness/confidence guard, mock oracle
//   4.x  position.rs: position struct, pnl, average price, liquidation test
//   5.x  funding.rs: utilization based funding accrual
//   6.x  fees.rs: imbalance fee engine
//   7.x  config.rs: exchange config, fee and funding params
//   8.x  engine/: core engine: admin, liquidity, swaps, funding, positions, liquidations
//   9.x  vault.rs: per-asset vault accounting
//   10.x shares.rs: pool share supply and pricing
//   11.x events.rs: state transition events for audit
//   12.x instruction.rs: instructions and access sets
//   13.x ledger.rs: token ledger trait, in-memory ledger
//   14.x addressing.rs: deterministic pool, vault and position addresses

// pool accounting
pub mod engine;
pub mod events;
pub mod fees;
pub mod funding;
pub mod position;
pub mod shares;
pub mod types;
pub mod vault;

// numerics and addressing
pub mod addressing;
pub mod math;

// integration modules
pub mod config;
pub mod instruction;
pub mod ledger;
pub mod oracle;

// re exports for convenience
pub use addressing::{AddressError, PoolAddresses, VaultAddresses, DEFAULT_PROGRAM_ID};
pub use config::{ConfigError, ExchangeConfig, FeeParams, FundingParams};
pub use engine::*;
pub use events::*;
pub use fees::*;
pub use funding::{FundingAccrual, FUNDING_RATE_PRECISION};
pub use instruction::{AccessSet, Instruction, Resource};
pub use ledger::{InMemoryLedger, LedgerError, LedgerOp, TokenLedger};
pub use math::MathError;
pub use oracle::{MockOracle, OracleError, OracleGuard, OracleReading, PriceOracle};
pub use position::*;
pub use shares::*;
pub use types::*;
pub use vault::*;
