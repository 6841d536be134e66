//! Interface description (Anchor IDL) for a deployed program.
//!
//! Both the current IDL format (top-level `address`, snake_case names,
//! explicit discriminators) and the legacy format (`metadata.address`,
//! camelCase names, `isMut`/`isSigner`) are accepted. The document is
//! treated as read-only once loaded.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use solana_sdk::{instruction::AccountMeta, pubkey::Pubkey};

use crate::error::{LowcapfunError, LowcapfunResult};
use crate::instructions::Procedure;

/// Top-level IDL document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Idl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub metadata: IdlMetadata,
    /// Legacy top-level program name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Legacy top-level program version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub instructions: Vec<IdlInstruction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<IdlAccountDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<IdlErrorCode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdlMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Legacy location of the program address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// An instruction (remote procedure) in the IDL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlInstruction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Vec<u8>>,
    #[serde(default)]
    pub accounts: Vec<IdlInstructionAccount>,
    #[serde(default)]
    pub args: Vec<IdlField>,
}

/// An account expected by an instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlInstructionAccount {
    pub name: String,
    #[serde(default, alias = "isMut")]
    pub writable: bool,
    #[serde(default, alias = "isSigner")]
    pub signer: bool,
    #[serde(default, alias = "isOptional")]
    pub optional: bool,
    /// Fixed address (programs, sysvars)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pda: Option<IdlPda>,
}

/// Seeds of a program derived address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlPda {
    pub seeds: Vec<IdlSeed>,
    /// Deriving program when it is not the instruction's own program
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<IdlSeed>,
}

/// A seed component for PDA derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IdlSeed {
    Const { value: IdlConstValue },
    Account {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        account: Option<String>,
    },
    Arg { path: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlConstValue {
    Bytes(Vec<u8>),
    Text(String),
}

impl IdlConstValue {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IdlConstValue::Bytes(bytes) => bytes,
            IdlConstValue::Text(text) => text.as_bytes(),
        }
    }
}

/// A named, typed field (instruction argument or struct field).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: serde_json::Value,
}

impl IdlField {
    /// Primitive type name, if the field has one
    pub fn primitive(&self) -> Option<&str> {
        self.ty.as_str()
    }
}

/// Account type declared by the program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlAccountDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Vec<u8>>,
}

/// Error definition in the IDL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlErrorCode {
    pub code: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

/// IDL of the deployed lowcapfun program, compiled into the crate
pub const BUNDLED_IDL: &str = include_str!("../idl/lowcapfun.json");

impl Idl {
    pub fn from_json(json: &str) -> LowcapfunResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The IDL shipped with this crate
    pub fn bundled() -> LowcapfunResult<Self> {
        Self::from_json(BUNDLED_IDL)
    }

    /// Whether the document declares `name` (camelCase or snake_case)
    pub fn declares(&self, name: &str) -> bool {
        self.instruction(name).is_some()
    }

    /// Load an IDL artifact from disk (`~` is expanded).
    pub fn from_file(path: impl AsRef<Path>) -> LowcapfunResult<Self> {
        let raw = path.as_ref().to_string_lossy();
        let expanded = shellexpand::tilde(&raw).to_string();
        debug!("Loading IDL from {expanded}");
        let contents = std::fs::read_to_string(&expanded)?;
        Self::from_json(&contents)
    }

    pub fn program_name(&self) -> Option<&str> {
        self.metadata.name.as_deref().or(self.name.as_deref())
    }

    pub fn program_version(&self) -> Option<&str> {
        self.metadata.version.as_deref().or(self.version.as_deref())
    }

    /// The program address embedded in the document, if any.
    pub fn declared_address(&self) -> LowcapfunResult<Option<Pubkey>> {
        let Some(raw) = self.address.as_deref().or(self.metadata.address.as_deref()) else {
            return Ok(None);
        };
        Pubkey::from_str(raw)
            .map(Some)
            .map_err(|e| LowcapfunError::configuration(format!("IDL address {raw:?} is invalid: {e}")))
    }

    /// Look up an instruction by name; camelCase and snake_case are equivalent.
    pub fn instruction(&self, name: &str) -> Option<&IdlInstruction> {
        let wanted = to_snake_case(name);
        self.instructions
            .iter()
            .find(|ix| to_snake_case(&ix.name) == wanted)
    }

    pub fn error_by_code(&self, code: u32) -> Option<&IdlErrorCode> {
        self.errors.iter().find(|e| e.code == code)
    }

    pub fn account_discriminator(&self, name: &str) -> Option<Vec<u8>> {
        self.accounts.iter().find(|a| a.name == name).map(|a| {
            a.discriminator
                .clone()
                .unwrap_or_else(|| account_discriminator(name).to_vec())
        })
    }

    /// Check that the document declares `procedure` with the same
    /// discriminator, argument list (name and primitive type, in order) and,
    /// when the procedure has a static account list, the same account order.
    pub fn verify_procedure(&self, procedure: &Procedure) -> LowcapfunResult<()> {
        let name = procedure.name;
        let ix = self.instruction(name).ok_or_else(|| {
            LowcapfunError::interface_mismatch(format!("IDL does not declare procedure `{name}`"))
        })?;

        if ix.discriminator() != procedure.discriminator {
            return Err(LowcapfunError::interface_mismatch(format!(
                "procedure `{name}` has discriminator {:?}, expected {:?}",
                ix.discriminator(),
                procedure.discriminator,
            )));
        }

        let declared: Vec<(String, Option<&str>)> = ix
            .args
            .iter()
            .map(|a| (to_snake_case(&a.name), a.primitive()))
            .collect();
        let args_match = declared.len() == procedure.args.len()
            && declared
                .iter()
                .zip(procedure.args)
                .all(|((n, ty), (want_n, want_ty))| n == want_n && *ty == Some(*want_ty));
        if !args_match {
            return Err(LowcapfunError::interface_mismatch(format!(
                "procedure `{name}` declares arguments {declared:?}, expected {:?}",
                procedure.args,
            )));
        }

        if let Some(expected) = procedure.accounts {
            let declared: Vec<String> = ix.accounts.iter().map(|a| to_snake_case(&a.name)).collect();
            if declared.iter().map(String::as_str).ne(expected.iter().copied()) {
                return Err(LowcapfunError::interface_mismatch(format!(
                    "procedure `{name}` declares accounts {declared:?}, expected {expected:?}"
                )));
            }
        }
        Ok(())
    }
}

impl IdlInstruction {
    /// Declared discriminator, falling back to Anchor's sighash for legacy IDLs
    pub fn discriminator(&self) -> Vec<u8> {
        self.discriminator
            .clone()
            .unwrap_or_else(|| instruction_discriminator(&self.name).to_vec())
    }

    /// Resolve the account list of this instruction.
    ///
    /// Explicit `known` addresses win. Otherwise fixed addresses are used,
    /// PDAs with const/account seeds are derived against `program_id`,
    /// unresolved signers fall back to `default_signer` and missing optional
    /// accounts become `program_id`.
    pub fn resolve_accounts(
        &self,
        program_id: &Pubkey,
        known: &HashMap<String, Pubkey>,
        default_signer: Option<Pubkey>,
    ) -> LowcapfunResult<Vec<AccountMeta>> {
        let mut resolved: HashMap<&str, Pubkey> = HashMap::new();

        // PDA seeds may reference accounts declared later in the list
        loop {
            let before = resolved.len();
            for account in &self.accounts {
                if resolved.contains_key(account.name.as_str()) {
                    continue;
                }
                if let Some(address) = self.try_resolve(account, program_id, known, &resolved, default_signer)? {
                    resolved.insert(account.name.as_str(), address);
                }
            }
            if resolved.len() == before || resolved.len() == self.accounts.len() {
                break;
            }
        }

        self.accounts
            .iter()
            .map(|account| {
                let pubkey = match resolved.get(account.name.as_str()) {
                    Some(pubkey) => *pubkey,
                    None if account.optional => *program_id,
                    None => {
                        return Err(LowcapfunError::configuration(format!(
                            "cannot resolve account `{}` of `{}`",
                            account.name, self.name
                        )))
                    }
                };
                Ok(if account.writable {
                    AccountMeta::new(pubkey, account.signer)
                } else {
                    AccountMeta::new_readonly(pubkey, account.signer)
                })
            })
            .collect()
    }

    fn try_resolve(
        &self,
        account: &IdlInstructionAccount,
        program_id: &Pubkey,
        known: &HashMap<String, Pubkey>,
        resolved: &HashMap<&str, Pubkey>,
        default_signer: Option<Pubkey>,
    ) -> LowcapfunResult<Option<Pubkey>> {
        if let Some(pubkey) = known.get(&account.name).or_else(|| known.get(&to_snake_case(&account.name))) {
            return Ok(Some(*pubkey));
        }

        if let Some(address) = &account.address {
            return Pubkey::from_str(address).map(Some).map_err(|e| {
                LowcapfunError::configuration(format!(
                    "account `{}` has invalid address {address:?}: {e}",
                    account.name
                ))
            });
        }

        if let Some(pda) = &account.pda {
            let mut seeds: Vec<Vec<u8>> = Vec::with_capacity(pda.seeds.len());
            for seed in &pda.seeds {
                match seed {
                    IdlSeed::Const { value } => seeds.push(value.as_bytes().to_vec()),
                    IdlSeed::Account { path, .. } => match resolved.get(path.as_str()).or_else(|| known.get(path)) {
                        Some(pubkey) => seeds.push(pubkey.to_bytes().to_vec()),
                        // Not available yet; retried on the next pass
                        None => return Ok(None),
                    },
                    IdlSeed::Arg { path } => {
                        return Err(LowcapfunError::configuration(format!(
                            "account `{}` is derived from argument `{path}` and must be supplied",
                            account.name
                        )))
                    }
                }
            }
            let deriving_program = match &pda.program {
                None => *program_id,
                Some(IdlSeed::Const { value }) => Pubkey::try_from(value.as_bytes()).map_err(|_| {
                    LowcapfunError::configuration(format!("account `{}` has an invalid PDA program", account.name))
                })?,
                Some(IdlSeed::Account { path, .. }) => match resolved.get(path.as_str()).or_else(|| known.get(path)) {
                    Some(pubkey) => *pubkey,
                    None => return Ok(None),
                },
                Some(IdlSeed::Arg { path }) => {
                    return Err(LowcapfunError::configuration(format!(
                        "account `{}` is derived by a program taken from argument `{path}`",
                        account.name
                    )))
                }
            };
            let seed_refs: Vec<&[u8]> = seeds.iter().map(Vec::as_slice).collect();
            let (pda, _) = Pubkey::find_program_address(&seed_refs, &deriving_program);
            return Ok(Some(pda));
        }

        if account.signer {
            return Ok(default_signer);
        }

        Ok(None)
    }
}

/// Anchor instruction discriminator: `sha256("global:<snake_name>")[..8]`
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    sighash("global", &to_snake_case(name))
}

/// Anchor account discriminator: `sha256("account:<TypeName>")[..8]`
pub fn account_discriminator(name: &str) -> [u8; 8] {
    sighash("account", name)
}

fn sighash(namespace: &str, name: &str) -> [u8; 8] {
    let mut hasher = Sha256::new();
    hasher.update(format!("{namespace}:{name}").as_bytes());
    let hash = hasher.finalize();
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

/// Word boundaries follow Anchor's conversion: a run of capitals is one
/// word (`NFTMint` -> `nft_mint`).
pub(crate) fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let starts_word = match prev {
                None | Some('_') => false,
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                Some(_) => false,
            };
            if starts_word {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY_IDL: &str = r#"{
        "version": "0.1.0",
        "name": "lowcapfun",
        "instructions": [
            {
                "name": "buyTokens",
                "accounts": [
                    { "name": "buyer", "isMut": true, "isSigner": true },
                    { "name": "tokenProgram", "isMut": false, "isSigner": false }
                ],
                "args": [{ "name": "amount", "type": "u64" }]
            }
        ],
        "errors": [{ "code": 6001, "name": "InsufficientFunds", "msg": "Insufficient funds." }],
        "metadata": { "address": "DMzPtouoz4k44QN7qrdLxW5K2dHMAaozLxjt1XEuPcCg" }
    }"#;

    #[test]
    fn test_known_discriminators() {
        assert_eq!(instruction_discriminator("initialize"), [175, 175, 109, 31, 13, 152, 155, 237]);
        assert_eq!(instruction_discriminator("launchToken"), instruction_discriminator("launch_token"));
        assert_eq!(account_discriminator("BondingConfig"), [31, 47, 68, 137, 241, 173, 112, 44]);
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("launchToken"), "launch_token");
        assert_eq!(to_snake_case("launch_token"), "launch_token");
        assert_eq!(to_snake_case("initialize"), "initialize");
        assert_eq!(to_snake_case("NFTMint"), "nft_mint");
        assert_eq!(to_snake_case("mintNFT"), "mint_nft");
        assert_eq!(to_snake_case("buyV2Tokens"), "buy_v2_tokens");
        assert_eq!(to_snake_case("Already_Snake"), "already_snake");
    }

    #[test]
    fn test_acronym_names_hash_like_snake_case() {
        assert_eq!(instruction_discriminator("burnNFTMint"), instruction_discriminator("burn_nft_mint"));
    }

    #[test]
    fn test_bundled_idl_matches_declared_program() {
        let idl = Idl::bundled().unwrap();
        assert_eq!(idl.declared_address().unwrap(), Some(crate::ID));
        assert!(idl.declares("launchToken"));
        assert!(!idl.declares("mint_more"));
    }

    #[test]
    fn test_legacy_format() {
        let idl = Idl::from_json(LEGACY_IDL).unwrap();

        assert_eq!(idl.program_name(), Some("lowcapfun"));
        assert_eq!(idl.program_version(), Some("0.1.0"));
        assert_eq!(idl.declared_address().unwrap(), Some(crate::ID));

        let ix = idl.instruction("buy_tokens").unwrap();
        assert!(ix.accounts[0].writable && ix.accounts[0].signer);
        assert_eq!(ix.discriminator(), instruction_discriminator("buy_tokens").to_vec());
        let procedure = Procedure {
            name: "buy_tokens",
            discriminator: instruction_discriminator("buy_tokens"),
            args: &[("amount", "u64")],
            accounts: Some(&["buyer", "token_program"]),
        };
        idl.verify_procedure(&procedure).unwrap();

        assert_eq!(idl.error_by_code(6001).unwrap().name, "InsufficientFunds");
        assert!(idl.error_by_code(6100).is_none());
    }

    #[test]
    fn test_verify_procedure_rejects_drift() {
        let idl = Idl::from_json(LEGACY_IDL).unwrap();
        let expected = Procedure {
            name: "buy_tokens",
            discriminator: instruction_discriminator("buy_tokens"),
            args: &[("amount", "u64")],
            accounts: Some(&["buyer", "token_program"]),
        };

        let wrong_args = Procedure { args: &[("amount", "u32")], ..expected };
        assert_eq!(idl.verify_procedure(&wrong_args).unwrap_err().code(), 8010);

        let wrong_discriminator = Procedure { discriminator: [0u8; 8], ..expected };
        assert_eq!(idl.verify_procedure(&wrong_discriminator).unwrap_err().code(), 8010);

        let wrong_accounts = Procedure { accounts: Some(&["token_program", "buyer"]), ..expected };
        assert_eq!(idl.verify_procedure(&wrong_accounts).unwrap_err().code(), 8010);

        let unknown_accounts = Procedure { accounts: None, ..expected };
        idl.verify_procedure(&unknown_accounts).unwrap();

        let missing = Procedure { name: "nuke_token", discriminator: instruction_discriminator("nuke_token"), args: &[], accounts: None };
        assert_eq!(idl.verify_procedure(&missing).unwrap_err().code(), 8010);
    }

    #[test]
    fn test_invalid_embedded_address_is_configuration_error() {
        let idl = Idl::from_json(r#"{ "address": "not-a-key", "instructions": [] }"#).unwrap();
        assert!(idl.declared_address().unwrap_err().is_configuration());
    }

    #[test]
    fn test_resolve_accounts_from_seeds() {
        let idl = Idl::from_json(
            r#"{
                "address": "DMzPtouoz4k44QN7qrdLxW5K2dHMAaozLxjt1XEuPcCg",
                "instructions": [{
                    "name": "touch",
                    "discriminator": [1, 2, 3, 4, 5, 6, 7, 8],
                    "accounts": [
                        { "name": "state", "writable": true, "pda": { "seeds": [
                            { "kind": "const", "value": [115, 116] },
                            { "kind": "account", "path": "owner" }
                        ] } },
                        { "name": "owner", "writable": true, "signer": true },
                        { "name": "system_program", "address": "11111111111111111111111111111111" },
                        { "name": "extra", "optional": true }
                    ],
                    "args": []
                }]
            }"#,
        )
        .unwrap();
        let ix = idl.instruction("touch").unwrap();
        let owner = Pubkey::new_unique();

        let metas = ix.resolve_accounts(&crate::ID, &HashMap::new(), Some(owner)).unwrap();

        let (state, _) = Pubkey::find_program_address(&[b"st", owner.as_ref()], &crate::ID);
        assert_eq!(metas[0], AccountMeta::new(state, false));
        assert_eq!(metas[1], AccountMeta::new(owner, true));
        assert_eq!(metas[2], AccountMeta::new_readonly(solana_sdk::system_program::ID, false));
        assert_eq!(metas[3], AccountMeta::new_readonly(crate::ID, false));
    }

    #[test]
    fn test_resolve_accounts_reports_unresolvable() {
        let idl = Idl::from_json(
            r#"{ "instructions": [{ "name": "touch", "accounts": [{ "name": "target", "writable": true }] }] }"#,
        )
        .unwrap();
        let ix = idl.instruction("touch").unwrap();

        let err = ix.resolve_accounts(&crate::ID, &HashMap::new(), None).unwrap_err();
        assert!(err.is_configuration());

        let target = Pubkey::new_unique();
        let known = HashMap::from([("target".to_string(), target)]);
        let metas = ix.resolve_accounts(&crate::ID, &known, None).unwrap();
        assert_eq!(metas, vec![AccountMeta::new(target, false)]);
    }
}
