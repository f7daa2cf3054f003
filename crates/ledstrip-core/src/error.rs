use thiserror::Error;

use crate::hal::ChannelError;
use crate::strip::StripState;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("pixel index {index} out of range (pixel_count: {len})")]
    OutOfRange { index: usize, len: usize },

    #[error("operation not allowed while strip is {0}")]
    InvalidState(StripState),

    #[error("out of memory allocating {0}")]
    OutOfMemory(&'static str),

    #[error("no transmission channel or interrupt priority available")]
    ResourceExhausted,

    #[error("hardware transmit failure: {0}")]
    HardwareTransmitFailure(String),

    #[error("transmission did not complete within {waited_ms} ms")]
    Timeout { waited_ms: u64 },

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl From<ChannelError> for Error {
    fn from(e: ChannelError) -> Self {
        match e {
            ChannelError::PriorityConflict | ChannelError::NoFreeChannel => Error::ResourceExhausted,
            ChannelError::NoMemory => Error::OutOfMemory("transmission channel"),
            ChannelError::Timeout(waited) => Error::Timeout {
                waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
            },
            ChannelError::Hardware(msg) => Error::HardwareTransmitFailure(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
