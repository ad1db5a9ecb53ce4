use sink_lines::{build_sink, SinkConfig};
use source_json::build_source;

use crate::config::{Effective, StreamArgs};
use crate::error::FeedwatchError;

/// Провалидировать конфиг и собрать адаптеры, ничего не опрашивая.
pub fn run(args: StreamArgs) -> Result<(), FeedwatchError> {
    let eff = Effective::new(&args)?;
    let config = eff.settings.streamer_config()?;
    let source = build_source(&eff.source, &eff.scope)?;
    build_sink(&eff.sink)?;

    let sink = match &eff.sink {
        SinkConfig::Tcp { host, port, .. } => format!("tcp {host}:{port}"),
        SinkConfig::Stdout => "stdout".to_string(),
    };
    let schedule = eff.settings.schedule();

    println!("streamer:         {}", config.name);
    println!("scope:            {}", eff.scope);
    println!("source:           {}", source.describe());
    println!("sink:             {sink}");
    println!("history capacity: {}", config.history_capacity);
    println!("poll limit:       {}", config.poll_limit);
    println!("interval:         {:?}", schedule.interval);
    println!("max retries:      {}", schedule.retry.max_retries);
    println!("restart:          {:?}", eff.settings.restart);
    Ok(())
}
