use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ChatError {
    /// The AI gateway rejected or failed a call
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Credentials absent or invalid — fatal to the whole app until
    /// reconfigured, distinguishable from every other failure kind
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        ChatError::Serialization(e.to_string())
    }
}
