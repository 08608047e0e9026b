// 10.0: pool share supply. one fungible share token per pool, a claim on aum.
// tracks total supply plus each holder's last mint time for the early withdrawal penalty.

use crate::math::{floor_to_u64, pow10, MathError};
use crate::types::{Address, Timestamp, Usd};
use std::collections::HashMap;

pub const SHARE_DECIMALS: u8 = 6;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolShareSupply {
    pub total_supply: u64,
    last_added_at: HashMap<Address, Timestamp>,
}

impl PoolShareSupply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.total_supply == 0
    }

    pub fn mint(&mut self, holder: Address, amount: u64, now: Timestamp) -> Result<(), MathError> {
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(MathError::Overflow("share supply"))?;
        self.last_added_at.insert(holder, now);
        Ok(())
    }

    pub fn burn(&mut self, amount: u64) -> Result<(), MathError> {
        self.total_supply = self
            .total_supply
            .checked_sub(amount)
            .ok_or(MathError::Underflow("share supply"))?;
        Ok(())
    }

    pub fn last_added_at(&self, holder: &Address) -> Option<Timestamp> {
        self.last_added_at.get(holder).copied()
    }

    // holder minted less than lockup_secs ago
    pub fn in_lockup(&self, holder: &Address, now: Timestamp, lockup_secs: u64) -> bool {
        match self.last_added_at(holder) {
            Some(at) => now.secs_since(at) < lockup_secs,
            None => false,
        }
    }
}

// 10.1: shares for a deposit. empty pool mints 1:1 against usd at SHARE_DECIMALS,
// otherwise pro rata to the deposit's share of aum.
pub fn shares_for_deposit(deposit_usd: Usd, total_supply: u64, aum: Usd) -> Result<u64, MathError> {
    if total_supply == 0 {
        let scaled = deposit_usd
            .value()
            .checked_mul(pow10(SHARE_DECIMALS)?)
            .ok_or(MathError::Overflow("bootstrap shares"))?;
        return floor_to_u64(scaled);
    }
    if aum.is_zero() {
        return Err(MathError::DivisionByZero("shares for deposit"));
    }
    let value = deposit_usd
        .value()
        .checked_mul(total_supply.into())
        .ok_or(MathError::Overflow("shares for deposit"))?
        .checked_div(aum.value())
        .ok_or(MathError::Overflow("shares for deposit"))?;
    floor_to_u64(value)
}

// 10.2: usd claim of `shares` against current aum
pub fn redeem_value(shares: u64, total_supply: u64, aum: Usd) -> Result<Usd, MathError> {
    if total_supply == 0 {
        return Err(MathError::DivisionByZero("redeem value"));
    }
    let value = aum
        .value()
        .checked_mul(shares.into())
        .ok_or(MathError::Overflow("redeem value"))?
        .checked_div(total_supply.into())
        .ok_or(MathError::Overflow("redeem value"))?;
    Ok(Usd::new(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn bootstrap_mints_one_to_one() {
        // 100_000 usdc units at $1 = $0.1
        let minted = shares_for_deposit(Usd::new(dec!(0.1)), 0, Usd::zero()).unwrap();
        assert_eq!(minted, 100_000);
    }

    #[test]
    fn second_deposit_pro_rata() {
        let minted = shares_for_deposit(Usd::new(dec!(0.0994)), 100_000, Usd::new(dec!(0.1))).unwrap();
        assert_eq!(minted, 99_400);
    }

    #[test]
    fn redeem_is_pro_rata() {
        let usd = redeem_value(50_000, 200_000, Usd::new(dec!(0.2))).unwrap();
        assert_eq!(usd.value(), dec!(0.05));
        assert!(redeem_value(1, 0, Usd::zero()).is_err());
    }

    #[test]
    fn lockup_window() {
        let mut supply = PoolShareSupply::new();
        let holder = Address::repeat(1);
        supply.mint(holder, 10, Timestamp(1_000)).unwrap();

        assert!(supply.in_lockup(&holder, Timestamp(1_500), 900));
        assert!(!supply.in_lockup(&holder, Timestamp(1_900), 900));
        assert!(!supply.in_lockup(&Address::repeat(2), Timestamp(1_000), 900));
    }

    #[test]
    fn burn_below_zero_rejected() {
        let mut supply = PoolShareSupply::new();
        supply.mint(Address::repeat(1), 10, Timestamp(0)).unwrap();
        assert!(supply.burn(11).is_err());
        assert_eq!(supply.total_supply, 10);
    }
}
