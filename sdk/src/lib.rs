//! Lowcapfun Rust SDK
//!
//! Client library for the lowcapfun token launch program: resolves an
//! execution context from the environment, binds the program's IDL to its
//! deployed address and issues the program's procedures as confirmed
//! transactions.
//!
//! ```no_run
//! use lowcapfun_sdk::{resolve_context, Idl, LowcapfunProgram, ProgramClient};
//!
//! # async fn run() -> lowcapfun_sdk::LowcapfunResult<()> {
//! let context = resolve_context()?;
//! let idl = Idl::bundled()?;
//! let client = ProgramClient::new(idl, lowcapfun_sdk::ID, context)?;
//! let signature = client.initialize().await?;
//! println!("Your transaction signature {signature}");
//! # Ok(())
//! # }
//! ```
pub mod addresses;
pub mod client;
pub mod context;
pub mod error;
pub mod idl;
pub mod instructions;
pub mod state;

pub use client::{create_client, LowcapfunProgram, ProgramClient};
pub use context::{resolve_context, ContextConfig, ExecutionContext};
pub use error::*;
pub use idl::Idl;
pub use instructions::{accounts, LaunchTokenArgs, Procedure, PROCEDURES};
pub use state::{BondingConfig, CurveType};

// Re-export commonly used Solana types
pub use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
};

anchor_lang::declare_id!("DMzPtouoz4k44QN7qrdLxW5K2dHMAaozLxjt1XEuPcCg");
