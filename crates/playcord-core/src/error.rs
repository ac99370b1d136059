use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("config error: {0}")]
    Config(String),

    #[error("vlcrc error: {0}")]
    Vlcrc(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
