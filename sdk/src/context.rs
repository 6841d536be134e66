//! Execution context resolution
//!
//! Reads the cluster endpoint, wallet and commitment level from the
//! environment, following the variable names the Anchor provider uses.
//! Resolution performs no network I/O; the resulting context is immutable
//! and shared by every call issued from it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anchor_client::Cluster;
use log::debug;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
};

use crate::config_error;
use crate::error::{LowcapfunError, LowcapfunResult};

/// Cluster endpoint: a URL or a moniker such as `localnet` or `devnet`
pub const PROVIDER_URL_VAR: &str = "ANCHOR_PROVIDER_URL";
/// Path to a Solana CLI JSON keypair file
pub const WALLET_VAR: &str = "ANCHOR_WALLET";
/// `processed`, `confirmed` or `finalized`
pub const COMMITMENT_VAR: &str = "ANCHOR_COMMITMENT";
/// Explicit websocket endpoint, otherwise derived from the provider URL
pub const WS_URL_VAR: &str = "ANCHOR_WS_URL";

/// Raw configuration, before the wallet file is read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    pub provider_url: String,
    pub ws_url: Option<String>,
    pub wallet_path: String,
    pub commitment: CommitmentConfig,
}

impl ContextConfig {
    pub fn from_env() -> LowcapfunResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> LowcapfunResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| config_error!("{key} is not set"))
        };

        let provider_url = required(PROVIDER_URL_VAR)?;
        let wallet_path = required(WALLET_VAR)?;
        let ws_url = lookup(WS_URL_VAR).filter(|v| !v.trim().is_empty());
        let commitment = match lookup(COMMITMENT_VAR) {
            Some(level) if !level.trim().is_empty() => parse_commitment(&level)?,
            // Anchor provider default
            _ => CommitmentConfig::processed(),
        };

        Ok(Self {
            provider_url,
            ws_url,
            wallet_path,
            commitment,
        })
    }

    /// Parse the cluster and load the wallet keypair
    pub fn resolve(&self) -> LowcapfunResult<ExecutionContext> {
        let cluster = parse_cluster(&self.provider_url, self.ws_url.as_deref())?;
        let wallet_path = PathBuf::from(shellexpand::tilde(&self.wallet_path).to_string());
        let payer = load_keypair(&wallet_path)?;

        debug!(
            "Resolved execution context: cluster={} wallet={} commitment={:?}",
            cluster.url(),
            payer.pubkey(),
            self.commitment.commitment,
        );

        Ok(ExecutionContext {
            cluster,
            payer: Arc::new(payer),
            commitment: self.commitment,
            wallet_path: Some(wallet_path),
        })
    }
}

/// Resolve the execution context from the process environment
pub fn resolve_context() -> LowcapfunResult<ExecutionContext> {
    ContextConfig::from_env()?.resolve()
}

/// Endpoint, signing identity and commitment shared by all calls.
///
/// Cloning is cheap and clones share the same keypair.
#[derive(Clone)]
pub struct ExecutionContext {
    cluster: Cluster,
    payer: Arc<Keypair>,
    commitment: CommitmentConfig,
    wallet_path: Option<PathBuf>,
}

impl ExecutionContext {
    /// Build a context explicitly, e.g. for a freshly generated keypair
    pub fn new(cluster: Cluster, payer: Keypair, commitment: CommitmentConfig) -> Self {
        Self {
            cluster,
            payer: Arc::new(payer),
            commitment,
            wallet_path: None,
        }
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn rpc_url(&self) -> &str {
        self.cluster.url()
    }

    pub fn ws_url(&self) -> &str {
        self.cluster.ws_url()
    }

    pub fn payer(&self) -> &Arc<Keypair> {
        &self.payer
    }

    pub fn payer_pubkey(&self) -> Pubkey {
        self.payer.pubkey()
    }

    pub fn commitment(&self) -> CommitmentConfig {
        self.commitment
    }

    /// Wallet file the signing identity was loaded from, if any
    pub fn wallet_path(&self) -> Option<&Path> {
        self.wallet_path.as_deref()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("cluster", &self.cluster.url())
            .field("payer", &self.payer.pubkey())
            .field("commitment", &self.commitment.commitment)
            .field("wallet_path", &self.wallet_path)
            .finish()
    }
}

pub fn parse_commitment(level: &str) -> LowcapfunResult<CommitmentConfig> {
    match level.trim().to_ascii_lowercase().as_str() {
        "processed" => Ok(CommitmentConfig::processed()),
        "confirmed" => Ok(CommitmentConfig::confirmed()),
        "finalized" => Ok(CommitmentConfig::finalized()),
        other => Err(config_error!("Unknown commitment level: {other}")),
    }
}

/// Parse a cluster URL or moniker, optionally pinning the websocket URL
pub fn parse_cluster(url: &str, ws_url: Option<&str>) -> LowcapfunResult<Cluster> {
    let cluster = Cluster::from_str(url)
        .map_err(|e| config_error!("Invalid cluster {url:?}: {e}"))?;
    Ok(match ws_url {
        Some(ws) => Cluster::Custom(cluster.url().to_string(), ws.trim().to_string()),
        None => cluster,
    })
}

/// Load a Solana CLI JSON keypair file (`~` is expanded)
pub fn load_keypair(path: impl AsRef<Path>) -> LowcapfunResult<Keypair> {
    let raw = path.as_ref().to_string_lossy();
    let expanded = shellexpand::tilde(&raw).to_string();
    let contents = std::fs::read_to_string(&expanded)
        .map_err(|e| config_error!("Failed to read keypair from {expanded}: {e}"))?;
    let bytes: Vec<u8> = serde_json::from_str(&contents)
        .map_err(|e| config_error!("Keypair file {expanded} is not a JSON byte array: {e}"))?;
    Keypair::try_from(bytes.as_slice())
        .map_err(|e| LowcapfunError::configuration(format!("Failed to parse keypair {expanded}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &HashMap<&'static str, String>) -> impl Fn(&str) -> Option<String> + '_ {
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_missing_provider_url() {
        let vars = HashMap::from([(WALLET_VAR, "/tmp/id.json".to_string())]);
        let err = ContextConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains(PROVIDER_URL_VAR));
    }

    #[test]
    fn test_missing_wallet() {
        let vars = HashMap::from([(PROVIDER_URL_VAR, "http://127.0.0.1:8899".to_string())]);
        let err = ContextConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains(WALLET_VAR));
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let vars = HashMap::from([
            (PROVIDER_URL_VAR, "   ".to_string()),
            (WALLET_VAR, "/tmp/id.json".to_string()),
        ]);
        assert!(ContextConfig::from_lookup(lookup(&vars)).unwrap_err().is_configuration());
    }

    #[test]
    fn test_commitment_defaults_to_processed() {
        let vars = HashMap::from([
            (PROVIDER_URL_VAR, "localnet".to_string()),
            (WALLET_VAR, "~/.config/solana/id.json".to_string()),
        ]);
        let config = ContextConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.commitment, CommitmentConfig::processed());
        assert_eq!(config.ws_url, None);
    }

    #[test]
    fn test_parse_commitment() {
        assert_eq!(parse_commitment("Confirmed").unwrap(), CommitmentConfig::confirmed());
        assert_eq!(parse_commitment("finalized").unwrap(), CommitmentConfig::finalized());
        assert!(parse_commitment("eventually").unwrap_err().is_configuration());
    }

    #[test]
    fn test_parse_cluster() {
        let local = parse_cluster("localnet", None).unwrap();
        assert_eq!(local.url(), "http://127.0.0.1:8899");

        let custom = parse_cluster("http://10.0.0.5:8899", Some("ws://10.0.0.5:9000")).unwrap();
        assert_eq!(custom.url(), "http://10.0.0.5:8899");
        assert_eq!(custom.ws_url(), "ws://10.0.0.5:9000");

        assert!(parse_cluster("not a cluster", None).unwrap_err().is_configuration());
    }

    #[test]
    fn test_load_keypair_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id.json");

        std::fs::write(&path, "not json").unwrap();
        assert!(load_keypair(&path).unwrap_err().is_configuration());

        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(load_keypair(&path).unwrap_err().is_configuration());

        assert!(load_keypair(dir.path().join("missing.json")).unwrap_err().is_configuration());
    }

    #[test]
    fn test_explicit_context_debug_hides_secret() {
        let payer = Keypair::new();
        let secret = payer.to_base58_string();
        let context = ExecutionContext::new(Cluster::Localnet, payer, CommitmentConfig::confirmed());

        let rendered = format!("{context:?}");
        assert!(rendered.contains(&context.payer_pubkey().to_string()));
        assert!(!rendered.contains(&secret));
        assert!(context.wallet_path().is_none());
    }
}
