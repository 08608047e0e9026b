// 8.0: pool engine. coordinates the admin surface, liquidity, swaps, funding,
// positions and liquidations over one set of vaults.
// deterministic; oracle and token ledger are injected.

mod admin;
mod config;
mod core;
mod execute;
mod funding;
mod liquidations;
mod liquidity;
mod positions;
mod results;
mod swap;

pub use config::EngineConfig;
pub use core::Engine;
pub use execute::Outcome;
pub use results::{
    BurnResult, EngineError, ErrorKind, FundingResult, LiquidationResult, MintResult, PositionResult, SwapResult,
};
