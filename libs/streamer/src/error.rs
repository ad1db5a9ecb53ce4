use feed_api::AdapterError;

/// Невалидная конфигурация движка. Фатальна при старте.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("history capacity must be at least 1")]
    ZeroCapacity,

    #[error("poll limit must be at least 1")]
    ZeroPollLimit,

    #[error("poll limit {poll_limit} exceeds history capacity {capacity}")]
    PollLimitExceedsCapacity { poll_limit: usize, capacity: usize },

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("source ({streamer}): {source}")]
    Source { streamer: String, source: AdapterError },
}

impl StreamError {
    /// Стоит ли повторять cycle после этой ошибки.
    pub fn is_transient(&self) -> bool {
        match self {
            StreamError::Config(_) => false,
            StreamError::Source { source, .. } => source.kind().is_transient(),
        }
    }
}

/// Отказ sink'а принять один item. Восстанавливается локально:
/// логируется, item всё равно помечается как увиденный.
#[derive(Debug, thiserror::Error)]
#[error("sink rejected item '{item_id}': {source}")]
pub struct SinkError {
    pub item_id: String,
    pub source: AdapterError,
}
