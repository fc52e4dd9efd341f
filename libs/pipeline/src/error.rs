#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid batch config: {0}")]
    InvalidConfig(String),

    #[error("batcher task has stopped")]
    BatcherClosed,

    #[error("engine: {0}")]
    Engine(#[from] topic_engine::TopicError),
}
