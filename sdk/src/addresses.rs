//! Address derivation utilities and PDA helpers for the lowcapfun program
//!
//! Every function here is pure: the same inputs always produce the same
//! address, so callers recompute instead of caching.

use solana_sdk::pubkey::Pubkey;

/// Seed prefix of the per-launch bonding config account
pub const CONFIG_SEED: &[u8] = b"config";

/// Seed of the program-wide state account created by `initialize`
pub const GLOBAL_SEED: &[u8] = b"global";

/// Find the bonding config PDA for a token launched by `creator`
pub fn find_config_pda(program_id: &Pubkey, creator: &Pubkey, token_mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            CONFIG_SEED,
            creator.as_ref(),
            token_mint.as_ref(),
        ],
        program_id,
    )
}

/// Find the global state PDA
pub fn find_global_pda(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[GLOBAL_SEED], program_id)
}

/// Derive the associated token account holding `mint` for `owner`
pub fn derive_associated_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    spl_associated_token_account::get_associated_token_address(owner, mint)
}

/// Derive the associated token account for a specific token program
pub fn derive_associated_address_with_program(
    owner: &Pubkey,
    mint: &Pubkey,
    token_program: &Pubkey,
) -> Pubkey {
    spl_associated_token_account::get_associated_token_address_with_program_id(
        owner,
        mint,
        token_program,
    )
}

/// Well-known program and sysvar addresses the lowcapfun instructions touch
pub mod programs {
    use solana_sdk::pubkey::Pubkey;

    pub fn token_program() -> Pubkey {
        spl_token::ID
    }

    pub fn associated_token_program() -> Pubkey {
        spl_associated_token_account::ID
    }

    pub fn system_program() -> Pubkey {
        solana_sdk::system_program::ID
    }

    pub fn rent_sysvar() -> Pubkey {
        solana_sdk::sysvar::rent::ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_pda_is_deterministic() {
        let program_id = crate::ID;
        let creator = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let (pda1, bump1) = find_config_pda(&program_id, &creator, &mint);
        let (pda2, bump2) = find_config_pda(&program_id, &creator, &mint);

        assert_eq!(pda1, pda2);
        assert_eq!(bump1, bump2);
        assert!(!pda1.is_on_curve());
    }

    #[test]
    fn test_config_pda_depends_on_seed_order() {
        let program_id = crate::ID;
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();

        assert_ne!(
            find_config_pda(&program_id, &a, &b).0,
            find_config_pda(&program_id, &b, &a).0,
        );
    }

    #[test]
    fn test_associated_address_matches_ata_program_derivation() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let (expected, _) = Pubkey::find_program_address(
            &[owner.as_ref(), spl_token::ID.as_ref(), mint.as_ref()],
            &spl_associated_token_account::ID,
        );

        assert_eq!(derive_associated_address(&owner, &mint), expected);
        assert_eq!(
            derive_associated_address_with_program(&owner, &mint, &spl_token::ID),
            expected,
        );
    }

    #[test]
    fn test_associated_address_is_byte_identical_across_calls() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let first = derive_associated_address(&owner, &mint).to_bytes();
        let second = derive_associated_address(&owner, &mint).to_bytes();
        assert_eq!(first, second);
    }
}
