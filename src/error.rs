//! Error types for articast.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArticastError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Submission errors
    #[error("A job must reference at least one article URL")]
    EmptyJobRequest,

    #[error("Unknown job: {id}")]
    JobNotFound { id: String },

    #[error("Invalid voice name: {name}")]
    InvalidVoice { name: String },

    #[error("No model loaded for voice {voice}")]
    VoiceUnavailable { voice: String },

    // Broker errors
    #[error("Broker error: {0}")]
    Broker(#[from] redis::RedisError),

    #[error("Job store error: {message}")]
    Store { message: String },

    // Pipeline errors
    #[error("Failed to extract article {url}: {message}")]
    Extraction { url: String, message: String },

    #[error("Speech synthesis failed: {message}")]
    Synthesis { message: String },

    #[error("Audio processing failed: {message}")]
    Audio { message: String },

    #[error("Audio encoding failed: {message}")]
    Encode { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ArticastError>;
