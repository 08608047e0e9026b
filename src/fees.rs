// 6.0: imbalance-aware fee engine. an op that pushes a vault further from its
// target weight pays base + tax scaled by the drift, one that restores balance
// gets base - tax scaled by how far off it started, floored at zero.

use crate::config::FeeParams;
use crate::math::{floor_to_u64, MathError};
use crate::types::{Bps, Price, Usd};
use crate::vault::AssetVault;
use rust_decimal::Decimal;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeKind {
    MintBurn,
    Swap { stable_pair: bool },
}

// 6.1: (base, tax) for the operation kind
pub fn fee_basis_points_for(params: &FeeParams, kind: FeeKind) -> (Bps, Bps) {
    match kind {
        FeeKind::MintBurn => (
            Bps::new(params.mint_burn_basis_points),
            Bps::new(params.tax_basis_points),
        ),
        FeeKind::Swap { stable_pair: true } => (
            Bps::new(params.stable_swap_fee_basis_points),
            Bps::new(params.stable_tax_basis_points),
        ),
        FeeKind::Swap { stable_pair: false } => (
            Bps::new(params.swap_fee_basis_points),
            Bps::new(params.tax_basis_points),
        ),
    }
}

/// Inputs describing one vault's position relative to its target.
#[derive(Debug, Clone, Copy)]
pub struct FeeContext {
    pub price: Price,
    pub aum: Usd,
    pub total_weights: u64,
}

// 6.2: the weighted fee. delta_usd is the usd value the op adds to (increment)
// or removes from the vault's pool reserves.
pub fn compute_basis_points(
    vault: &AssetVault,
    ctx: FeeContext,
    delta_usd: Usd,
    increment: bool,
    base: Bps,
    tax: Bps,
) -> Result<Bps, MathError> {
    if ctx.total_weights == 0 {
        return Ok(base);
    }

    let initial = vault.reserves_usd(ctx.price)?.value();
    let next = if increment {
        initial
            .checked_add(delta_usd.value())
            .ok_or(MathError::Overflow("fee next value"))?
    } else {
        (initial - delta_usd.value()).max(Decimal::ZERO)
    };

    let target = Decimal::from(vault.weight)
        .checked_mul(ctx.aum.value())
        .ok_or(MathError::Overflow("fee target"))?
        / Decimal::from(ctx.total_weights);
    if target.is_zero() {
        return Ok(base);
    }

    let initial_diff = (initial - target).abs();
    let next_diff = (next - target).abs();
    let tax_value = Decimal::from(tax.value());

    // restores balance
    if next_diff < initial_diff {
        let rebate = floor_to_u64(tax_value * initial_diff / target)?;
        let bps = Bps::new(base.value().saturating_sub(rebate));
        debug!(asset = %vault.asset, %bps, rebate, "fee rebate");
        return Ok(bps);
    }

    let average_diff = ((initial_diff + next_diff) / Decimal::TWO).min(target);
    let penalty = floor_to_u64(tax_value * average_diff / target)?;
    let bps = Bps::new(base.value() + penalty);
    debug!(asset = %vault.asset, %bps, penalty, "fee penalty");
    Ok(bps)
}

// 6.3: swaps pay the worse of the two legs
pub fn swap_basis_points(
    params: &FeeParams,
    input: (&AssetVault, FeeContext),
    output: (&AssetVault, FeeContext),
    input_usd: Usd,
) -> Result<Bps, MathError> {
    let stable_pair = input.0.stable && output.0.stable;
    let (base, tax) = fee_basis_points_for(params, FeeKind::Swap { stable_pair });
    let fee_in = compute_basis_points(input.0, input.1, input_usd, true, base, tax)?;
    let fee_out = compute_basis_points(output.0, output.1, input_usd, false, base, tax)?;
    Ok(fee_in.max(fee_out))
}
