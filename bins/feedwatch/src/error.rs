#[derive(Debug, thiserror::Error)]
pub enum FeedwatchError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("config: {0}")]
    Invalid(#[from] streamer::ConfigError),

    #[error("adapter: {0}")]
    Adapter(#[from] feed_api::AdapterError),

    #[error("{0}")]
    Stream(#[from] streamer::StreamError),

    #[error("task: {0}")]
    Task(#[from] tokio::task::JoinError),
}
