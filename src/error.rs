use std::path::PathBuf;

/// Central error type for deckctl.
#[derive(Debug, thiserror::Error)]
pub enum DeckError {
    #[error("config error: {0}")]
    Config(String),

    #[error("TOML parse error: {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("device error: {0}")]
    Device(String),

    #[error("no Stream Deck found")]
    NoDevice,

    #[error("found {0} Stream Decks, only one supported")]
    MultipleDevices(usize),

    #[error("render error: {0}")]
    Render(String),

    #[error("font error: {0}")]
    Font(String),

    #[error("OBS error: {0}")]
    Obs(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HID error: {0}")]
    Hid(String),
}

pub type Result<T> = std::result::Result<T, DeckError>;
