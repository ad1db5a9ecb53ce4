pub mod batch;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
mod task;

#[cfg(test)]
mod testing;

pub use batch::PollBatch;
pub use config::{
    PollSchedule, RestartPolicy, RetryPolicy, StreamerConfig, StreamerSettings,
    DEFAULT_HISTORY_CAPACITY,
};
pub use engine::{CycleReport, Streamer, StreamerState};
pub use error::{ConfigError, SinkError, StreamError};
pub use history::BoundedHistory;
pub use task::{run_streamer, spawn_sink_task, spawn_streamer, ChannelSink};
