use thiserror::Error;

/// Any error type that can be raised by this library.
#[derive(Error, Debug)]
pub enum PresenceError {
    #[error("{0}")]
    GenericIO(#[from] std::io::Error),

    #[error("Failed to read replay: {0}")]
    Replay(#[from] slippi_replay::ReplayError),

    #[error("Discord IPC error: {0}")]
    Discord(String),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to parse user file: {0}")]
    UserFileParse(#[from] serde_json::Error),

    #[error("Unable to check for other running instances: {0}")]
    SingleInstance(String),
}
