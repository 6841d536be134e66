//! Error types for the lowcapfun SDK
//!
//! Failures reported by the network component are classified once, when they
//! cross into the SDK, and are otherwise passed through untouched.

use std::fmt;

use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_request::{RpcError, RpcResponseErrorData};
use solana_sdk::{
    instruction::InstructionError,
    pubkey::Pubkey,
    transaction::TransactionError,
};
use thiserror::Error;

/// Diagnostic attached to a call the remote program (or runtime) rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramFailure {
    pub transaction_error: TransactionError,
    /// Custom error code raised by the failing instruction, if any
    pub custom_code: Option<u32>,
    /// Error name declared in the IDL for `custom_code`
    pub error_name: Option<String>,
    pub error_msg: Option<String>,
    /// Program logs captured by preflight simulation
    pub logs: Vec<String>,
}

impl ProgramFailure {
    pub fn new(transaction_error: TransactionError) -> Self {
        let custom_code = match &transaction_error {
            TransactionError::InstructionError(_, InstructionError::Custom(code)) => Some(*code),
            _ => None,
        };
        Self {
            transaction_error,
            custom_code,
            error_name: None,
            error_msg: None,
            logs: Vec::new(),
        }
    }

    /// Innermost program the logs report as failed.
    ///
    /// The runtime logs `Program <id> failed: <reason>` for the failing
    /// program first and then for every caller up the CPI stack.
    pub fn failing_program(&self) -> Option<Pubkey> {
        self.logs.iter().find_map(|line| {
            let rest = line.strip_prefix("Program ")?;
            let (id, reason) = rest.split_once(' ')?;
            reason.starts_with("failed").then(|| id.parse().ok()).flatten()
        })
    }
}

impl fmt::Display for ProgramFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error_name, self.custom_code) {
            (Some(name), Some(code)) => {
                write!(f, "{name} ({code})")?;
                if let Some(msg) = &self.error_msg {
                    write!(f, ": {msg}")?;
                }
                Ok(())
            }
            _ => write!(f, "{}", self.transaction_error),
        }
    }
}

/// Main error type for the lowcapfun SDK
#[derive(Error, Debug)]
pub enum LowcapfunError {
    // Validation Errors (3000-3099)
    #[error("Invalid input parameters: {0}")]
    InvalidInput(String),

    // SDK Errors (8000-8099)
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Network error: {source}")]
    Network {
        #[source]
        source: Box<ClientError>,
    },

    #[error("Program error: {failure}")]
    Program {
        failure: ProgramFailure,
        #[source]
        source: Box<ClientError>,
    },

    #[error("Account not found: {0}")]
    AccountNotFound(Pubkey),

    #[error("Failed to decode account {address}: {reason}")]
    AccountDecode { address: Pubkey, reason: String },

    #[error("Interface mismatch: {0}")]
    InterfaceMismatch(String),

    // Wrapped errors
    #[error("Anchor error: {0}")]
    Anchor(#[from] anchor_lang::error::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LowcapfunError {
    /// Get the error code for this error
    pub fn code(&self) -> u32 {
        match self {
            LowcapfunError::InvalidInput(_) => 3000,

            LowcapfunError::Configuration(_) => 8000,
            LowcapfunError::Network { .. } => 8001,
            LowcapfunError::Program { .. } => 8002,
            LowcapfunError::AccountNotFound(_) => 8003,
            LowcapfunError::AccountDecode { .. } => 8004,
            LowcapfunError::InterfaceMismatch(_) => 8010,

            LowcapfunError::Anchor(_) => 9000,
            LowcapfunError::Json(_) => 9004,
            LowcapfunError::Io(_) => 9005,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, LowcapfunError::Network { .. })
    }

    pub fn is_program(&self) -> bool {
        matches!(self, LowcapfunError::Program { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, LowcapfunError::Configuration(_))
    }

    /// The program diagnostic, when the call was rejected on-chain
    pub fn program_failure(&self) -> Option<&ProgramFailure> {
        match self {
            LowcapfunError::Program { failure, .. } => Some(failure),
            _ => None,
        }
    }

    /// Create a new configuration error
    pub fn configuration<T: fmt::Display>(msg: T) -> Self {
        LowcapfunError::Configuration(msg.to_string())
    }

    /// Create a new interface mismatch error
    pub fn interface_mismatch<T: fmt::Display>(msg: T) -> Self {
        LowcapfunError::InterfaceMismatch(msg.to_string())
    }

    /// Create a new validation error
    pub fn invalid_input<T: fmt::Display>(msg: T) -> Self {
        LowcapfunError::InvalidInput(msg.to_string())
    }
}

impl From<ClientError> for LowcapfunError {
    fn from(error: ClientError) -> Self {
        if let Some(transaction_error) = error.get_transaction_error() {
            let mut failure = ProgramFailure::new(transaction_error);
            failure.logs = simulation_logs(&error);
            return LowcapfunError::Program {
                failure,
                source: Box::new(error),
            };
        }

        if let ClientErrorKind::SigningError(signer_error) = error.kind() {
            return LowcapfunError::Configuration(format!("Signing failed: {signer_error}"));
        }

        LowcapfunError::Network {
            source: Box::new(error),
        }
    }
}

fn simulation_logs(error: &ClientError) -> Vec<String> {
    match error.kind() {
        ClientErrorKind::RpcError(RpcError::RpcResponseError {
            data: RpcResponseErrorData::SendTransactionPreflightFailure(result),
            ..
        }) => result.logs.clone().unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Result type for SDK operations
pub type LowcapfunResult<T> = std::result::Result<T, LowcapfunError>;

/// Helper macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::LowcapfunError::Configuration(format!($($arg)*))
    };
}
