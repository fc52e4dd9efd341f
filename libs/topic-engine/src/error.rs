#[derive(Debug, thiserror::Error)]
pub enum TopicError {
    /// A writer panicked while holding the state lock. The batch that was
    /// being applied may be partially visible; the engine should be reset.
    #[error("topic state lock poisoned")]
    Poisoned,
}

impl<T> From<std::sync::PoisonError<T>> for TopicError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        TopicError::Poisoned
    }
}
