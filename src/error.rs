use thiserror::Error;

pub type Result<T> = std::result::Result<T, MasterError>;

#[derive(Error, Debug)]
pub enum MasterError {
    /// Unrecognized container, extension, or sample rate
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Multi-channel audio not supported ({0} channels, max 2)")]
    TooManyChannels(usize),

    #[error("Input too long: {minutes:.1} min (max {max_minutes} min)")]
    InputTooLong { minutes: f32, max_minutes: u32 },

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Failed to encode audio: {0}")]
    Encode(String),

    /// Analysis units that missed the join deadline
    #[error("Analysis timed out for: {}", .0.join(", "))]
    AnalysisTimedOut(Vec<String>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<symphonia::core::errors::Error> for MasterError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<hound::Error> for MasterError {
    fn from(err: hound::Error) -> Self {
        Self::Encode(err.to_string())
    }
}
