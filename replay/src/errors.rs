use thiserror::Error;

/// Any error type that can be raised while reading a replay.
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("{0}")]
    GenericIO(#[from] std::io::Error),

    #[error("The file does not start with a Slippi raw element header")]
    InvalidHeader,

    #[error("Encountered event 0x{command:02x} before the event payload table")]
    MissingEventPayloads { command: u8 },

    #[error("Unknown event 0x{command:02x} at stream offset {offset}")]
    UnknownEvent { command: u8, offset: u64 },
}
