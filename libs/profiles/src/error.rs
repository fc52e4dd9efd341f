use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("profile '{0}' not found")]
    NotFound(String),

    #[error("profile '{0}' already exists")]
    Duplicate(String),

    #[error("invalid profile: {0}")]
    Invalid(String),

    #[error("profile store io ({path}): {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed profile file ({path}): {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}
