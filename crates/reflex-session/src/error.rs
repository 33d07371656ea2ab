//! Configuration errors.

/// Errors from loading or saving a [`SessionConfig`](crate::SessionConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid TOML or has the wrong shape.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be rendered as TOML.
    #[error("cannot serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Result alias for configuration I/O.
pub type ConfigResult<T> = Result<T, ConfigError>;
