#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("{0}")]
    Source(#[from] mqtt_source::SourceError),

    #[error("{0}")]
    Profile(#[from] profiles::ProfileError),

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),
}
