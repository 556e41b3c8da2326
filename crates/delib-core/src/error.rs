use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid event or method: {name} is not a method or event of {contract}")]
    InvalidEventOrMethod { contract: String, name: String },

    #[error("Gas estimate of {gas} is greater than max gas allowed {max_gas}")]
    GasLimitExceeded { gas: u64, max_gas: u64 },

    #[error("Account index {index} is out of range ({len} accounts available)")]
    OutOfRange { index: usize, len: usize },

    #[error("Address ledger not found for contract: {0}")]
    LedgerNotFound(String),

    #[error("Could not get a valid address for contract: {0}")]
    NoValidAddress(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Bytecode has unresolved library links: {}", .0.join(", "))]
    UnlinkedBytecode(Vec<String>),

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl Error {
    pub fn invalid_method(contract: impl Into<String>, name: impl Into<String>) -> Self {
        Self::InvalidEventOrMethod {
            contract: contract.into(),
            name: name.into(),
        }
    }

    pub fn invalid_option(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Wrap any client-library failure as an opaque transport error
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}
