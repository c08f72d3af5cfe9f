//! Error types for the forum curator.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Curation error: {0}")]
    Curation(#[from] CurationError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors raised by the chat-platform adapter.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Channel {id} not found")]
    ChannelNotFound { id: String },

    #[error("Request to {endpoint} failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },

    #[error("Rate limited on {endpoint}")]
    RateLimited { endpoint: String },

    #[error("Unexpected response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("Failed to update thread {thread_id}: {reason}")]
    ThreadUpdateFailed { thread_id: String, reason: String },
}

/// Curation failures, split into run-fatal and per-candidate kinds.
#[derive(Debug, thiserror::Error)]
pub enum CurationError {
    #[error("Database is not connected")]
    StorageUnavailable,

    #[error("Emoji configuration is missing")]
    MissingEmojiConfig,

    #[error("Greenlit tag '{tag}' not found in forum channel {channel_name} ({channel_id})")]
    GreenlitTagMissing {
        tag: String,
        channel_name: String,
        channel_id: String,
    },

    #[error("Forum channel {channel_id} could not be read: {source}")]
    ChannelUnavailable {
        channel_id: String,
        #[source]
        source: PlatformError,
    },

    #[error("Origin message for thread '{thread_name}' ({thread_id}) is missing")]
    MissingOriginMessage {
        thread_name: String,
        thread_id: String,
    },

    #[error("Tag update failed for thread {thread_id}: {source}")]
    TagUpdate {
        thread_id: String,
        #[source]
        source: PlatformError,
    },

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

impl CurationError {
    /// Whether this error aborts a whole run rather than a single candidate.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable
                | Self::MissingEmojiConfig
                | Self::GreenlitTagMissing { .. }
                | Self::ChannelUnavailable { .. }
        )
    }
}

/// Result type alias for the curator.
pub type Result<T> = std::result::Result<T, Error>;
