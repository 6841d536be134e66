//! Statically declared procedures of the lowcapfun program.
//!
//! Each procedure has a fixed discriminator, a borsh argument layout and an
//! account list. [`crate::ProgramClient::new`] checks these declarations
//! against the loaded IDL, so a drifted deployment artifact is rejected up
//! front instead of producing malformed calls.

use anchor_lang::prelude::*;
use solana_sdk::instruction::Instruction;

use crate::addresses::{derive_associated_address, find_config_pda, programs};
use crate::error::LowcapfunResult;

/// Signature of one remote procedure as the client expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Procedure {
    pub name: &'static str,
    pub discriminator: [u8; 8],
    /// Argument names and primitive IDL types, in wire order
    pub args: &'static [(&'static str, &'static str)],
    /// Account names in wire order; `None` when accounts come from the IDL
    pub accounts: Option<&'static [&'static str]>,
}

pub const INITIALIZE: Procedure = Procedure {
    name: "initialize",
    discriminator: [175, 175, 109, 31, 13, 152, 155, 237],
    args: &[],
    accounts: None,
};

pub const LAUNCH_TOKEN: Procedure = Procedure {
    name: "launch_token",
    discriminator: [10, 128, 86, 171, 3, 137, 161, 244],
    args: &[("decimals", "u8"), ("supply", "u64"), ("curve_type", "u8")],
    accounts: Some(&[
        "token_mint",
        "creator",
        "creator_token_account",
        "mint_authority",
        "config",
        "token_program",
        "associated_token_program",
        "system_program",
        "rent",
    ]),
};

pub const BUY_TOKENS: Procedure = Procedure {
    name: "buy_tokens",
    discriminator: [189, 21, 230, 133, 247, 2, 110, 42],
    args: &[("amount", "u64")],
    accounts: Some(BUY_SELL_ACCOUNTS),
};

pub const SELL_TOKENS: Procedure = Procedure {
    name: "sell_tokens",
    discriminator: [114, 242, 25, 12, 62, 126, 92, 2],
    args: &[("amount", "u64")],
    accounts: Some(BUY_SELL_ACCOUNTS),
};

pub const NUKE_TOKEN: Procedure = Procedure {
    name: "nuke_token",
    discriminator: [144, 5, 66, 213, 252, 189, 127, 7],
    args: &[],
    accounts: Some(&["creator", "token_mint", "config", "mint_authority", "token_program"]),
};

const BUY_SELL_ACCOUNTS: &[&str] = &[
    "buyer",
    "creator",
    "buyer_token_account",
    "vault_token_account",
    "config",
    "token_program",
];

/// The full capability set of the program
pub const PROCEDURES: [Procedure; 5] = [INITIALIZE, LAUNCH_TOKEN, BUY_TOKENS, SELL_TOKENS, NUKE_TOKEN];

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchTokenArgs {
    pub decimals: u8,
    pub supply: u64,
    pub curve_type: u8,
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountArgs {
    pub amount: u64,
}

/// Encode `discriminator ++ borsh(args)`
pub fn instruction_data<A: AnchorSerialize>(procedure: &Procedure, args: &A) -> LowcapfunResult<Vec<u8>> {
    let mut data = procedure.discriminator.to_vec();
    args.serialize(&mut data)?;
    Ok(data)
}

/// Account structures for instruction contexts.
/// Fields are public so callers can override any resolved address.
pub mod accounts {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct LaunchToken {
        pub token_mint: Pubkey,
        pub creator: Pubkey,
        pub creator_token_account: Pubkey,
        pub mint_authority: Pubkey,
        pub config: Pubkey,
        pub token_program: Pubkey,
        pub associated_token_program: Pubkey,
        pub system_program: Pubkey,
        pub rent: Pubkey,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct BuySell {
        pub buyer: Pubkey,
        pub creator: Pubkey,
        pub buyer_token_account: Pubkey,
        pub vault_token_account: Pubkey,
        pub config: Pubkey,
        pub token_program: Pubkey,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct NukeToken {
        pub creator: Pubkey,
        pub token_mint: Pubkey,
        pub config: Pubkey,
        pub mint_authority: Pubkey,
        pub token_program: Pubkey,
    }
}

impl accounts::LaunchToken {
    /// The creator doubles as mint authority so the mint-to CPI is signed
    pub fn new(program_id: &Pubkey, creator: &Pubkey, token_mint: &Pubkey) -> Self {
        Self {
            token_mint: *token_mint,
            creator: *creator,
            creator_token_account: derive_associated_address(creator, token_mint),
            mint_authority: *creator,
            config: find_config_pda(program_id, creator, token_mint).0,
            token_program: programs::token_program(),
            associated_token_program: programs::associated_token_program(),
            system_program: programs::system_program(),
            rent: programs::rent_sysvar(),
        }
    }
}

impl accounts::BuySell {
    /// The vault is the creator's associated token account
    pub fn new(program_id: &Pubkey, buyer: &Pubkey, creator: &Pubkey, token_mint: &Pubkey) -> Self {
        Self {
            buyer: *buyer,
            creator: *creator,
            buyer_token_account: derive_associated_address(buyer, token_mint),
            vault_token_account: derive_associated_address(creator, token_mint),
            config: find_config_pda(program_id, creator, token_mint).0,
            token_program: programs::token_program(),
        }
    }
}

impl accounts::NukeToken {
    pub fn new(program_id: &Pubkey, creator: &Pubkey, token_mint: &Pubkey) -> Self {
        Self {
            creator: *creator,
            token_mint: *token_mint,
            config: find_config_pda(program_id, creator, token_mint).0,
            mint_authority: *creator,
            token_program: programs::token_program(),
        }
    }
}

impl ToAccountMetas for accounts::LaunchToken {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.token_mint, true),
            AccountMeta::new(self.creator, true),
            AccountMeta::new(self.creator_token_account, false),
            AccountMeta::new_readonly(self.mint_authority, false),
            AccountMeta::new(self.config, false),
            AccountMeta::new_readonly(self.token_program, false),
            AccountMeta::new_readonly(self.associated_token_program, false),
            AccountMeta::new_readonly(self.system_program, false),
            AccountMeta::new_readonly(self.rent, false),
        ]
    }
}

impl ToAccountMetas for accounts::BuySell {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.buyer, true),
            AccountMeta::new(self.creator, false),
            AccountMeta::new(self.buyer_token_account, false),
            AccountMeta::new(self.vault_token_account, false),
            AccountMeta::new(self.config, false),
            AccountMeta::new_readonly(self.token_program, false),
        ]
    }
}

impl ToAccountMetas for accounts::NukeToken {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.creator, true),
            AccountMeta::new(self.token_mint, false),
            AccountMeta::new(self.config, false),
            AccountMeta::new_readonly(self.mint_authority, false),
            AccountMeta::new_readonly(self.token_program, false),
        ]
    }
}

/// Build `initialize` from an already resolved account list
pub fn initialize(program_id: &Pubkey, accounts: Vec<AccountMeta>) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts,
        data: INITIALIZE.discriminator.to_vec(),
    }
}

pub fn launch_token(
    program_id: &Pubkey,
    accounts: &accounts::LaunchToken,
    args: LaunchTokenArgs,
) -> LowcapfunResult<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: accounts.to_account_metas(None),
        data: instruction_data(&LAUNCH_TOKEN, &args)?,
    })
}

pub fn buy_tokens(program_id: &Pubkey, accounts: &accounts::BuySell, amount: u64) -> LowcapfunResult<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: accounts.to_account_metas(None),
        data: instruction_data(&BUY_TOKENS, &AmountArgs { amount })?,
    })
}

pub fn sell_tokens(program_id: &Pubkey, accounts: &accounts::BuySell, amount: u64) -> LowcapfunResult<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: accounts.to_account_metas(None),
        data: instruction_data(&SELL_TOKENS, &AmountArgs { amount })?,
    })
}

pub fn nuke_token(program_id: &Pubkey, accounts: &accounts::NukeToken) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: accounts.to_account_metas(None),
        data: NUKE_TOKEN.discriminator.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idl::instruction_discriminator;

    #[test]
    fn test_discriminators_match_sighash() {
        for procedure in PROCEDURES {
            assert_eq!(procedure.discriminator, instruction_discriminator(procedure.name), "{}", procedure.name);
        }
    }

    #[test]
    fn test_launch_token_data_layout() {
        let creator = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let accounts = accounts::LaunchToken::new(&crate::ID, &creator, &mint);
        let args = LaunchTokenArgs { decimals: 9, supply: 1_000_000, curve_type: 3 };

        let ix = launch_token(&crate::ID, &accounts, args).unwrap();

        assert_eq!(ix.program_id, crate::ID);
        assert_eq!(&ix.data[..8], &LAUNCH_TOKEN.discriminator);
        assert_eq!(ix.data[8], 9);
        assert_eq!(&ix.data[9..17], &1_000_000u64.to_le_bytes());
        assert_eq!(ix.data[17], 3);
        assert_eq!(ix.data.len(), 18);
    }

    #[test]
    fn test_launch_token_accounts() {
        let creator = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let accounts = accounts::LaunchToken::new(&crate::ID, &creator, &mint);
        let metas = accounts.to_account_metas(None);

        assert_eq!(metas.len(), LAUNCH_TOKEN.accounts.unwrap().len());
        assert!(metas[0].is_signer && metas[0].is_writable);
        assert!(metas[1].is_signer && metas[1].is_writable);
        assert_eq!(metas[2].pubkey, derive_associated_address(&creator, &mint));
        assert_eq!(metas[3].pubkey, creator);
        assert_eq!(metas[4].pubkey, find_config_pda(&crate::ID, &creator, &mint).0);
        assert_eq!(metas[5].pubkey, spl_token::ID);
    }

    #[test]
    fn test_buy_and_sell_share_accounts_but_not_data() {
        let buyer = Pubkey::new_unique();
        let creator = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let accounts = accounts::BuySell::new(&crate::ID, &buyer, &creator, &mint);

        let buy = buy_tokens(&crate::ID, &accounts, 42).unwrap();
        let sell = sell_tokens(&crate::ID, &accounts, 42).unwrap();

        assert_eq!(buy.accounts, sell.accounts);
        assert_ne!(buy.data, sell.data);
        assert_eq!(&buy.data[8..], &42u64.to_le_bytes());
        assert_eq!(buy.accounts[3].pubkey, derive_associated_address(&creator, &mint));
    }

    #[test]
    fn test_overridden_account_is_used() {
        let creator = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let mut accounts = accounts::NukeToken::new(&crate::ID, &creator, &mint);
        accounts.mint_authority = authority;

        let ix = nuke_token(&crate::ID, &accounts);
        assert_eq!(ix.accounts[3], AccountMeta::new_readonly(authority, false));
        assert_eq!(ix.data, NUKE_TOKEN.discriminator.to_vec());
    }
}
