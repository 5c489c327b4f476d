use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Language not supported: {0}")]
    UnsupportedLanguage(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Scan cancelled")]
    Cancelled,
}

impl From<toml::de::Error> for BusError {
    fn from(e: toml::de::Error) -> Self {
        BusError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BusError>;
