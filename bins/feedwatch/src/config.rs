use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use sink_lines::SinkConfig;
use source_json::SourceConfig;
use streamer::StreamerSettings;

use crate::error::FeedwatchError;

#[derive(Parser)]
#[command(name = "feedwatch", about = "Поток новых элементов из источника «последних N»")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Опрашивать источник и отправлять новые элементы в sink
    Stream(StreamArgs),
    /// Проверить конфиг и вывести итоговые параметры
    Check(StreamArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct StreamArgs {
    /// Путь к TOML конфиг файлу
    #[arg(long, default_value = "feedwatch.toml", env = "FEEDWATCH_CONFIG")]
    pub config: String,

    /// Область наблюдения (подставляется в `{scope}` источника)
    #[arg(long, env = "FEEDWATCH_SCOPE")]
    pub scope: Option<String>,

    /// Ёмкость history (и максимальный размер poll batch)
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Сколько элементов запрашивать за poll (≤ capacity)
    #[arg(long)]
    pub poll_limit: Option<usize>,

    /// Пауза между циклами в мс
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

// ---- TOML Config ----

#[derive(Debug, Deserialize)]
pub struct FeedwatchConfig {
    pub scope: Option<String>,
    #[serde(default)]
    pub streamer: StreamerSettings,
    pub source: SourceConfig,
    #[serde(default)]
    pub sink: SinkConfig,
}

impl FeedwatchConfig {
    pub fn load(path: &str) -> Result<Self, FeedwatchError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FeedwatchError::Config { context: "read", detail: format!("'{path}': {e}") })?;
        Self::parse(&content)
            .map_err(|e| FeedwatchError::Config { context: "parse", detail: format!("'{path}': {e}") })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

// ---- Effective ----

/// Итоговая конфигурация после мержа: config.toml < env/CLI
#[derive(Debug)]
pub struct Effective {
    pub scope: String,
    pub settings: StreamerSettings,
    pub source: SourceConfig,
    pub sink: SinkConfig,
}

impl Effective {
    pub fn new(args: &StreamArgs) -> Result<Self, FeedwatchError> {
        let cfg = FeedwatchConfig::load(&args.config)?;
        Self::merge(cfg, args)
    }

    pub fn merge(cfg: FeedwatchConfig, args: &StreamArgs) -> Result<Self, FeedwatchError> {
        let scope = args
            .scope
            .clone()
            .or(cfg.scope)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| FeedwatchError::Config {
                context: "scope",
                detail: "no scope configured (set `scope` or --scope)".into(),
            })?;

        let mut settings = cfg.streamer;
        if let Some(capacity) = args.capacity {
            settings.history_capacity = capacity;
        }
        if let Some(poll_limit) = args.poll_limit {
            settings.poll_limit = Some(poll_limit);
        }
        if let Some(interval_ms) = args.interval_ms {
            settings.interval_ms = interval_ms;
        }

        Ok(Self {
            scope,
            settings,
            source: cfg.source,
            sink: cfg.sink,
        })
    }
}
