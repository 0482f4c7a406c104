use thiserror::Error;

/// Bounds violations and malformed command arguments.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParameterError {
    #[error("interval must be between {min} and {max} seconds (got {actual})")]
    IntervalOutOfRange { min: u64, max: u64, actual: u64 },

    #[error("radius must be between {min} and {max} blocks (got {actual})")]
    RadiusOutOfRange { min: u32, max: u32, actual: u32 },

    #[error("player name cannot be empty")]
    PlayerNameEmpty,

    #[error("player name too long (max 16 characters, got {0})")]
    PlayerNameTooLong(usize),

    #[error("player name contains invalid characters (only alphanumeric and underscore allowed)")]
    PlayerNameInvalidChars,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackError {
    #[error("player \"{0}\" not found on the server")]
    TargetNotFound(String),

    #[error("player \"{0}\" is currently offline")]
    TargetOffline(String),

    #[error("player \"{0}\" is online but cannot be located")]
    TargetUntrackable(String),

    #[error("player lookup unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("you already have an active tracking session")]
    AlreadyActive,

    #[error("you do not have any active tracking sessions")]
    NoActiveSession,

    #[error("cannot deliver direct messages to this user")]
    NotificationUndeliverable,

    #[error("the tracker is shutting down")]
    ShuttingDown,

    #[error("{0}")]
    InvalidParameter(#[from] ParameterError),
}

pub type Result<T> = std::result::Result<T, TrackError>;
