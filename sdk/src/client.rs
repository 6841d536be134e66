//! Program client for the lowcapfun program
//!
//! A [`ProgramClient`] binds an interface description to a program address
//! and an [`ExecutionContext`]. It is immutable after construction, so one
//! handle can serve concurrent calls; every call is a single
//! submit-and-confirm round trip with no retry.

use std::collections::HashMap;
use std::sync::Arc;

use anchor_lang::Discriminator;
use async_trait::async_trait;
use log::{debug, info, warn};
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    account::from_account,
    clock::Clock,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    sysvar,
    transaction::Transaction,
};

use crate::addresses::find_config_pda;
use crate::context::ExecutionContext;
use crate::error::{LowcapfunError, LowcapfunResult, ProgramFailure};
use crate::idl::{Idl, IdlInstruction};
use crate::instructions::{
    self, accounts, LaunchTokenArgs, Procedure, BUY_TOKENS, INITIALIZE, LAUNCH_TOKEN, NUKE_TOKEN, PROCEDURES,
    SELL_TOKENS,
};
use crate::state::BondingConfig;

/// The statically declared capability set of the lowcapfun program.
///
/// Each call returns the transaction signature once the network accepted
/// and confirmed the transaction at the context's commitment level.
#[async_trait]
pub trait LowcapfunProgram {
    /// Call `initialize`, resolving its accounts from the interface description
    async fn initialize(&self) -> LowcapfunResult<Signature>;

    /// Create the mint, mint the full supply to the creator and open the curve
    async fn launch_token(
        &self,
        token_mint: &Keypair,
        accounts: accounts::LaunchToken,
        args: LaunchTokenArgs,
    ) -> LowcapfunResult<Signature>;

    async fn buy_tokens(&self, accounts: accounts::BuySell, amount: u64) -> LowcapfunResult<Signature>;

    async fn sell_tokens(&self, accounts: accounts::BuySell, amount: u64) -> LowcapfunResult<Signature>;

    /// Close the mint of an expired time bomb launch
    async fn nuke_token(&self, accounts: accounts::NukeToken) -> LowcapfunResult<Signature>;
}

/// Handle bound to one deployed program
#[derive(Clone)]
pub struct ProgramClient {
    program_id: Pubkey,
    idl: Arc<Idl>,
    context: ExecutionContext,
    rpc: Arc<RpcClient>,
}

/// Bind `idl` to `program_id`; see [`ProgramClient::new`]
pub fn create_client(idl: Idl, program_id: Pubkey, context: ExecutionContext) -> LowcapfunResult<ProgramClient> {
    ProgramClient::new(idl, program_id, context)
}

impl ProgramClient {
    /// Create a handle after checking the interface description.
    ///
    /// Fails with `InterfaceMismatch` when the description embeds a different
    /// program address, or declares one of this client's procedures with a
    /// different discriminator, argument list or account order. Procedures
    /// the description omits fail when called.
    pub fn new(idl: Idl, program_id: Pubkey, context: ExecutionContext) -> LowcapfunResult<Self> {
        let rpc = RpcClient::new_with_commitment(context.rpc_url().to_string(), context.commitment());
        Self::with_rpc_client(idl, program_id, context, rpc)
    }

    /// Same checks as [`ProgramClient::new`], over a caller-built RPC client
    /// such as `RpcClient::new_mock`.
    pub fn with_rpc_client(
        idl: Idl,
        program_id: Pubkey,
        context: ExecutionContext,
        rpc: RpcClient,
    ) -> LowcapfunResult<Self> {
        match idl.declared_address()? {
            Some(declared) if declared != program_id => {
                return Err(LowcapfunError::interface_mismatch(format!(
                    "IDL was built for {declared}, client targets {program_id}"
                )));
            }
            Some(_) => {}
            None => warn!("IDL does not embed a program address; trusting {program_id}"),
        }

        for procedure in &PROCEDURES {
            if idl.declares(procedure.name) {
                idl.verify_procedure(procedure)?;
            } else {
                warn!("IDL does not declare `{}`; calls to it will fail", procedure.name);
            }
        }

        if let Some(declared) = idl.account_discriminator("BondingConfig") {
            if declared != BondingConfig::DISCRIMINATOR {
                return Err(LowcapfunError::interface_mismatch(
                    "BondingConfig account discriminator differs from the IDL",
                ));
            }
        }

        info!(
            "Program {} ({} v{}) bound to {}",
            program_id,
            idl.program_name().unwrap_or("unnamed"),
            idl.program_version().unwrap_or("?"),
            rpc.url(),
        );

        Ok(Self {
            program_id,
            idl: Arc::new(idl),
            context,
            rpc: Arc::new(rpc),
        })
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn idl(&self) -> &Idl {
        &self.idl
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Accounts for launching `token_mint`, with the wallet as creator
    pub fn launch_token_accounts(&self, token_mint: &Pubkey) -> accounts::LaunchToken {
        accounts::LaunchToken::new(&self.program_id, &self.context.payer_pubkey(), token_mint)
    }

    /// Accounts for trading a launch of `creator`, with the wallet as buyer/seller
    pub fn buy_sell_accounts(&self, creator: &Pubkey, token_mint: &Pubkey) -> accounts::BuySell {
        accounts::BuySell::new(&self.program_id, &self.context.payer_pubkey(), creator, token_mint)
    }

    /// Accounts for nuking a launch created by the wallet
    pub fn nuke_token_accounts(&self, token_mint: &Pubkey) -> accounts::NukeToken {
        accounts::NukeToken::new(&self.program_id, &self.context.payer_pubkey(), token_mint)
    }

    /// Call `initialize` with some accounts given explicitly by name; the
    /// rest are resolved from the interface description.
    pub async fn initialize_with_accounts(&self, known: HashMap<String, Pubkey>) -> LowcapfunResult<Signature> {
        let definition = self.require(&INITIALIZE)?;
        let metas = definition.resolve_accounts(&self.program_id, &known, Some(self.context.payer_pubkey()))?;
        let ix = instructions::initialize(&self.program_id, metas);
        self.send(&[ix], &[]).await
    }

    /// Sign with the wallet (fee payer) plus `extra_signers`, submit and
    /// wait for confirmation.
    pub async fn send(&self, instructions: &[Instruction], extra_signers: &[&Keypair]) -> LowcapfunResult<Signature> {
        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| self.classify(e))?;

        let transaction = {
            let payer: &Keypair = self.context.payer();
            let mut signers: Vec<&dyn Signer> = vec![payer];
            signers.extend(extra_signers.iter().map(|k| *k as &dyn Signer));

            let mut transaction = Transaction::new_with_payer(instructions, Some(&payer.pubkey()));
            transaction
                .try_sign(&signers, blockhash)
                .map_err(|e| LowcapfunError::configuration(format!("Failed to sign transaction: {e}")))?;
            transaction
        };

        debug!(
            "Submitting {} instruction(s) to {} with {} signer(s)",
            instructions.len(),
            self.program_id,
            extra_signers.len() + 1,
        );

        let signature = self
            .rpc
            .send_and_confirm_transaction(&transaction)
            .await
            .map_err(|e| self.classify(e))?;

        info!("Transaction confirmed: {signature}");
        Ok(signature)
    }

    /// Fetch and decode the bonding config of a launch
    pub async fn fetch_bonding_config(&self, creator: &Pubkey, token_mint: &Pubkey) -> LowcapfunResult<BondingConfig> {
        let (address, _) = find_config_pda(&self.program_id, creator, token_mint);
        let account = self
            .rpc
            .get_account_with_commitment(&address, self.context.commitment())
            .await
            .map_err(|e| self.classify(e))?
            .value
            .ok_or(LowcapfunError::AccountNotFound(address))?;

        if account.owner != self.program_id {
            return Err(LowcapfunError::AccountDecode {
                address,
                reason: format!("owned by {}, expected {}", account.owner, self.program_id),
            });
        }
        BondingConfig::decode(&address, &account.data)
    }

    /// Unix time of the cluster's `Clock` sysvar, the clock the program
    /// checks launch liveness against
    pub async fn cluster_time(&self) -> LowcapfunResult<i64> {
        let account = self
            .rpc
            .get_account(&sysvar::clock::ID)
            .await
            .map_err(|e| self.classify(e))?;
        let clock: Clock = from_account(&account).ok_or_else(|| LowcapfunError::AccountDecode {
            address: sysvar::clock::ID,
            reason: "not a Clock sysvar".to_string(),
        })?;
        Ok(clock.unix_timestamp)
    }

    /// Lamport balance of the wallet
    pub async fn balance(&self) -> LowcapfunResult<u64> {
        self.rpc
            .get_balance(&self.context.payer_pubkey())
            .await
            .map_err(|e| self.classify(e))
    }

    /// The IDL declaration of `procedure`, which construction already
    /// checked for drift when present
    fn require(&self, procedure: &Procedure) -> LowcapfunResult<&IdlInstruction> {
        self.idl.instruction(procedure.name).ok_or_else(|| {
            LowcapfunError::interface_mismatch(format!("IDL does not declare procedure `{}`", procedure.name))
        })
    }

    /// Classify a network-component failure and attach the IDL error name
    fn classify(&self, error: ClientError) -> LowcapfunError {
        let mut error = LowcapfunError::from(error);
        if let LowcapfunError::Program { failure, .. } = &mut error {
            self.annotate(failure);
            warn!("Program rejected call: {failure}");
        }
        error
    }

    /// Name a custom error code from the IDL, only when the logs show this
    /// program raised it. Codes from CPI'd programs use their own tables.
    fn annotate(&self, failure: &mut ProgramFailure) {
        let Some(code) = failure.custom_code else {
            return;
        };
        if failure.failing_program() != Some(self.program_id) {
            return;
        }
        if let Some(definition) = self.idl.error_by_code(code) {
            failure.error_name = Some(definition.name.clone());
            failure.error_msg.clone_from(&definition.msg);
        }
    }
}

#[async_trait]
impl LowcapfunProgram for ProgramClient {
    async fn initialize(&self) -> LowcapfunResult<Signature> {
        self.initialize_with_accounts(HashMap::new()).await
    }

    async fn launch_token(
        &self,
        token_mint: &Keypair,
        accounts: accounts::LaunchToken,
        args: LaunchTokenArgs,
    ) -> LowcapfunResult<Signature> {
        self.require(&LAUNCH_TOKEN)?;
        if accounts.token_mint != token_mint.pubkey() {
            return Err(LowcapfunError::invalid_input(format!(
                "mint keypair {} does not match token_mint account {}",
                token_mint.pubkey(),
                accounts.token_mint,
            )));
        }
        let ix = instructions::launch_token(&self.program_id, &accounts, args)?;
        self.send(&[ix], &[token_mint]).await
    }

    async fn buy_tokens(&self, accounts: accounts::BuySell, amount: u64) -> LowcapfunResult<Signature> {
        self.require(&BUY_TOKENS)?;
        let ix = instructions::buy_tokens(&self.program_id, &accounts, amount)?;
        self.send(&[ix], &[]).await
    }

    async fn sell_tokens(&self, accounts: accounts::BuySell, amount: u64) -> LowcapfunResult<Signature> {
        self.require(&SELL_TOKENS)?;
        let ix = instructions::sell_tokens(&self.program_id, &accounts, amount)?;
        self.send(&[ix], &[]).await
    }

    async fn nuke_token(&self, accounts: accounts::NukeToken) -> LowcapfunResult<Signature> {
        self.require(&NUKE_TOKEN)?;
        let ix = instructions::nuke_token(&self.program_id, &accounts);
        self.send(&[ix], &[]).await
    }
}
