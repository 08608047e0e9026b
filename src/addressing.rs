// 14.0: deterministic addressing. every pool resource lives at a program-derived
// address computed from (pool name, role seed). bit for bit compatible with the
// on-chain derivation so addresses line up with deployed state.

use crate::types::Address;
use curve25519_dalek::edwards::CompressedEdwardsY;
use sha2::{Digest, Sha256};

pub const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";
pub const MAX_SEED_LEN: usize = 32;
pub const MAX_SEEDS: usize = 16;

pub const AUTHORITY_SEED: &[u8] = b"exchange-authority";
pub const SHARE_MINT_SEED: &[u8] = b"lp-mint";

/// Program id the pool is deployed under. Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFsLnS
pub const DEFAULT_PROGRAM_ID: Address = Address::new([
    218, 7, 92, 178, 255, 94, 198, 129, 118, 19, 222, 83, 11, 105, 42, 135, 53, 71, 119, 105, 218, 71, 67, 12,
    189, 129, 84, 51, 92, 74, 131, 39,
]);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Too many seeds: {0}, max 16")]
    TooManySeeds(usize),

    #[error("Seed {index} is {len} bytes, max 32")]
    SeedTooLong { index: usize, len: usize },

    #[error("Derived address lands on the ed25519 curve")]
    OnCurve,

    #[error("No bump seed yields an off-curve address")]
    NoViableBump,
}

// a valid compressed point means some private key could sign for it
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    CompressedEdwardsY(*bytes).decompress().is_some()
}

pub fn create_program_address(seeds: &[&[u8]], program_id: &Address) -> Result<Address, AddressError> {
    if seeds.len() > MAX_SEEDS {
        return Err(AddressError::TooManySeeds(seeds.len()));
    }
    if let Some((index, seed)) = seeds.iter().enumerate().find(|(_, s)| s.len() > MAX_SEED_LEN) {
        return Err(AddressError::SeedTooLong {
            index,
            len: seed.len(),
        });
    }

    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);
    let hash: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&hash) {
        return Err(AddressError::OnCurve);
    }
    Ok(Address::new(hash))
}

// 14.1: walks the bump down from 255 and keeps the first off-curve hit
pub fn find_program_address(seeds: &[&[u8]], program_id: &Address) -> Result<(Address, u8), AddressError> {
    if seeds.len() >= MAX_SEEDS {
        return Err(AddressError::TooManySeeds(seeds.len() + 1));
    }

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = seeds.to_vec();
        with_bump.push(&bump_seed);

        match create_program_address(&with_bump, program_id) {
            Ok(address) => return Ok((address, bump)),
            Err(AddressError::OnCurve) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(AddressError::NoViableBump)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Derived {
    pub address: Address,
    pub bump: u8,
}

impl From<(Address, u8)> for Derived {
    fn from((address, bump): (Address, u8)) -> Self {
        Self { address, bump }
    }
}

/// Pool level addresses. the exchange record, its signing authority and the share mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolAddresses {
    pub program_id: Address,
    pub exchange: Derived,
    pub authority: Derived,
    pub share_mint: Derived,
}

impl PoolAddresses {
    pub fn derive(program_id: Address, name: &str) -> Result<Self, AddressError> {
        let name = name.as_bytes();
        Ok(Self {
            program_id,
            exchange: find_program_address(&[name], &program_id)?.into(),
            authority: find_program_address(&[AUTHORITY_SEED, name], &program_id)?.into(),
            share_mint: find_program_address(&[SHARE_MINT_SEED, name], &program_id)?.into(),
        })
    }
}

/// Per-asset addresses. the vault record and the token account holding custody.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultAddresses {
    pub record: Derived,
    pub custody: Derived,
}

impl VaultAddresses {
    pub fn derive(program_id: Address, name: &str, asset_seed: &str) -> Result<Self, AddressError> {
        let name = name.as_bytes();
        let seed = asset_seed.as_bytes();
        Ok(Self {
            record: find_program_address(&[name, seed], &program_id)?.into(),
            custody: find_program_address(&[seed, name], &program_id)?.into(),
        })
    }
}

pub fn position_address(
    program_id: Address,
    name: &str,
    owner: &Address,
    vault_record: &Address,
) -> Result<Derived, AddressError> {
    find_program_address(
        &[name.as_bytes(), &owner.as_bytes()[..], &vault_record.as_bytes()[..]],
        &program_id,
    )
    .map(Derived::from)
}
