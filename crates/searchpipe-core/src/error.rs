use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Store lookup failed: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, Error>;
