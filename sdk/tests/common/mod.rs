#![allow(dead_code)]

use std::path::{Path, PathBuf};

use anchor_client::Cluster;
use lowcapfun_sdk::{CommitmentConfig, ExecutionContext, Idl, Keypair};

/// Nothing listens on port 1, so every request fails before reaching a node
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

/// Loads the artifact from disk, as a deployment would
pub fn bundled_idl() -> Idl {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("idl/lowcapfun.json");
    Idl::from_file(path).expect("bundled IDL should parse")
}

pub fn unreachable_context() -> ExecutionContext {
    ExecutionContext::new(
        Cluster::Custom(UNREACHABLE_URL.to_string(), "ws://127.0.0.1:1".to_string()),
        Keypair::new(),
        CommitmentConfig::confirmed(),
    )
}

/// Write `keypair` as a Solana CLI JSON keypair file
pub fn write_keypair(dir: &Path, keypair: &Keypair) -> PathBuf {
    let path = dir.join("id.json");
    let json = serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap();
    std::fs::write(&path, json).unwrap();
    path
}
