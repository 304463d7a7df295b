use thiserror::Error;

/// Errors raised while wiring the runtime (config, logging)
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
