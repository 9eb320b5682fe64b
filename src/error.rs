use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("interface {name} not found")]
    InterfaceNotFound { name: String },

    #[error("interface {name} must be of type ethernet")]
    NotEthernet { name: String },

    #[error("failed to change promiscuous mode on {name}: {source}")]
    Promiscuous { name: String, source: io::Error },
}

pub type Result<T> = std::result::Result<T, Error>;
