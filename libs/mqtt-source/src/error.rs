#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("invalid broker url '{0}'")]
    InvalidUrl(String),

    #[error("invalid port number: {0}")]
    InvalidPort(String),
}
