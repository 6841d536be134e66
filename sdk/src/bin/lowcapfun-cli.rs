//! Lowcapfun CLI
//!
//! Command-line interface for the lowcapfun token launch program. The
//! execution context comes from the Anchor provider variables; flags
//! override them.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lowcapfun_sdk::addresses::{derive_associated_address, find_config_pda, find_global_pda};
use lowcapfun_sdk::context::{load_keypair, COMMITMENT_VAR, PROVIDER_URL_VAR, WALLET_VAR, WS_URL_VAR};
use lowcapfun_sdk::*;

#[derive(Parser)]
#[command(name = "lowcapfun-cli")]
#[command(about = "A command-line interface for the lowcapfun token launch program")]
#[command(version)]
struct Cli {
    /// Cluster URL or moniker (localnet, devnet, mainnet, ...)
    #[arg(long, env = PROVIDER_URL_VAR)]
    url: Option<String>,

    /// Explicit websocket endpoint
    #[arg(long, env = WS_URL_VAR)]
    ws_url: Option<String>,

    /// Path to keypair file
    #[arg(long, env = WALLET_VAR)]
    keypair: Option<String>,

    /// Commitment level
    #[arg(long, value_enum, env = COMMITMENT_VAR, default_value_t = Commitment::Processed)]
    commitment: Commitment,

    /// Path to the program IDL; the IDL compiled into the CLI when omitted
    #[arg(long, env = "LOWCAPFUN_IDL")]
    idl: Option<PathBuf>,

    /// Program address; defaults to the address embedded in the IDL
    #[arg(long)]
    program_id: Option<Pubkey>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl From<Commitment> for CommitmentConfig {
    fn from(value: Commitment) -> Self {
        match value {
            Commitment::Processed => CommitmentConfig::processed(),
            Commitment::Confirmed => CommitmentConfig::confirmed(),
            Commitment::Finalized => CommitmentConfig::finalized(),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Curve {
    Linear,
    Exponential,
    Declining,
    TimeBomb,
}

impl From<Curve> for CurveType {
    fn from(value: Curve) -> Self {
        match value {
            Curve::Linear => CurveType::Linear,
            Curve::Exponential => CurveType::Exponential,
            Curve::Declining => CurveType::Declining,
            Curve::TimeBomb => CurveType::TimeBomb,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the loaded program and wallet
    Info,
    /// Call the program's initialize procedure
    Initialize,
    /// Launch a new token on a bonding curve
    LaunchToken {
        /// Mint decimals
        #[arg(long, default_value = "9")]
        decimals: u8,
        /// Total supply in base units
        #[arg(long)]
        supply: u64,
        /// Bonding curve
        #[arg(long, value_enum, default_value_t = Curve::Linear)]
        curve: Curve,
        /// Mint keypair file; a fresh keypair is generated when omitted
        #[arg(long)]
        mint_keypair: Option<String>,
    },
    /// Buy tokens from a launch
    Buy {
        #[arg(long)]
        creator: Pubkey,
        #[arg(long)]
        mint: Pubkey,
        #[arg(long)]
        amount: u64,
    },
    /// Sell tokens back to a launch
    Sell {
        #[arg(long)]
        creator: Pubkey,
        #[arg(long)]
        mint: Pubkey,
        #[arg(long)]
        amount: u64,
    },
    /// Close the mint of an expired time bomb launch created by the wallet
    Nuke {
        #[arg(long)]
        mint: Pubkey,
    },
    /// Show the bonding config of a launch
    Config {
        #[arg(long)]
        creator: Pubkey,
        #[arg(long)]
        mint: Pubkey,
    },
    /// Derive program addresses without touching the network
    Derive {
        #[command(subcommand)]
        command: DeriveCommands,
    },
}

#[derive(Subcommand)]
enum DeriveCommands {
    /// Associated token account of an owner
    Ata {
        #[arg(long)]
        owner: Pubkey,
        #[arg(long)]
        mint: Pubkey,
    },
    /// Bonding config PDA of a launch
    Config {
        #[arg(long)]
        creator: Pubkey,
        #[arg(long)]
        mint: Pubkey,
    },
    /// Global PDA written by initialize
    Global,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let idl = match &cli.idl {
        Some(path) => Idl::from_file(path).with_context(|| format!("Failed to load IDL {}", path.display()))?,
        None => Idl::bundled()?,
    };
    let program_id = match cli.program_id {
        Some(program_id) => program_id,
        None => idl.declared_address()?.unwrap_or(lowcapfun_sdk::ID),
    };

    if let Commands::Derive { command } = &cli.command {
        derive(&program_id, command);
        return Ok(());
    }

    // clap has already merged flags with the environment
    let mut config = ContextConfig::from_lookup(|key| match key {
        PROVIDER_URL_VAR => cli.url.clone(),
        WALLET_VAR => cli.keypair.clone(),
        WS_URL_VAR => cli.ws_url.clone(),
        _ => None,
    })?;
    config.commitment = cli.commitment.into();
    let context = config.resolve()?;
    let client = ProgramClient::new(idl, program_id, context)?;

    match cli.command {
        Commands::Info => {
            println!("Program loaded: {}", client.program_id());
            println!("Wallet: {}", client.context().payer_pubkey());
            println!("Cluster: {}", client.context().rpc_url());
            match client.balance().await {
                Ok(lamports) => println!("Balance: {lamports} lamports"),
                Err(e) => println!("Balance: unavailable ({e})"),
            }
        }
        Commands::Initialize => {
            let signature = client.initialize().await?;
            println!("Your transaction signature {signature}");
        }
        Commands::LaunchToken { decimals, supply, curve, mint_keypair } => {
            let mint = match mint_keypair {
                Some(path) => load_keypair(&path)?,
                None => Keypair::new(),
            };
            let accounts = client.launch_token_accounts(&mint.pubkey());
            let config = accounts.config;
            let curve = CurveType::from(curve);
            let args = LaunchTokenArgs { decimals, supply, curve_type: curve.code() };

            let signature = client.launch_token(&mint, accounts, args).await?;
            println!("✅ Launched {curve} token");
            println!("   Mint: {}", mint.pubkey());
            println!("   Config: {config}");
            println!("   Signature: {signature}");
        }
        Commands::Buy { creator, mint, amount } => {
            let accounts = client.buy_sell_accounts(&creator, &mint);
            let signature = client.buy_tokens(accounts, amount).await?;
            println!("✅ Bought {amount} tokens: {signature}");
        }
        Commands::Sell { creator, mint, amount } => {
            let accounts = client.buy_sell_accounts(&creator, &mint);
            let signature = client.sell_tokens(accounts, amount).await?;
            println!("✅ Sold {amount} tokens: {signature}");
        }
        Commands::Nuke { mint } => {
            let accounts = client.nuke_token_accounts(&mint);
            let signature = client.nuke_token(accounts).await?;
            println!("💥 Nuked {mint}: {signature}");
        }
        Commands::Config { creator, mint } => {
            let config = client.fetch_bonding_config(&creator, &mint).await?;
            let curve = config
                .curve()
                .map_or_else(|_| format!("unknown ({})", config.curve_type), |c| c.to_string());
            println!("Bonding config for {mint}");
            println!("   Curve: {curve}");
            println!("   Total supply: {}", config.total_supply);
            println!("   Tokens sold: {} ({}%)", config.tokens_sold, config.sold_percent());
            println!("   Launched at: {}", config.launch_timestamp);
            match config.price() {
                Ok(price) => println!("   Price: {price} lamports per token"),
                Err(e) => println!("   Price: unavailable ({e})"),
            }
            if config.curve().is_ok_and(CurveType::is_time_bomb) {
                match client.cluster_time().await {
                    Ok(now) if config.is_alive(now) => println!("   Status: 💣 alive"),
                    Ok(_) => println!("   Status: 💥 expired, can be nuked"),
                    Err(e) => println!("   Status: unavailable ({e})"),
                }
            }
            println!("   Bump: {}", config.bump);
        }
        Commands::Derive { .. } => {}
    }

    Ok(())
}

fn derive(program_id: &Pubkey, command: &DeriveCommands) {
    match command {
        DeriveCommands::Ata { owner, mint } => {
            println!("{}", derive_associated_address(owner, mint));
        }
        DeriveCommands::Config { creator, mint } => {
            let (address, bump) = find_config_pda(program_id, creator, mint);
            println!("{address} (bump {bump})");
        }
        DeriveCommands::Global => {
            let (address, bump) = find_global_pda(program_id);
            println!("{address} (bump {bump})");
        }
    }
}
