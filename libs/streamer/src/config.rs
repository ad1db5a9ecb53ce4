use std::time::Duration;

use serde::Deserialize;

use feed_api::OverflowPolicy;

use crate::error::ConfigError;

/// Ёмкость history (и размер poll batch) по умолчанию.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

// ═══════════════════════════════════════════════════════════════
//  StreamerConfig — провалидированная конфигурация движка
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamerConfig {
    /// Имя экземпляра для логов.
    pub name: String,
    /// Ёмкость BoundedHistory (C).
    pub history_capacity: usize,
    /// Сколько элементов запрашивать за один poll. Не больше C.
    pub poll_limit: usize,
}

impl StreamerConfig {
    /// Конфиг с `poll_limit == history_capacity`.
    pub fn new(name: impl Into<String>, history_capacity: usize) -> Self {
        Self {
            name: name.into(),
            history_capacity,
            poll_limit: history_capacity,
        }
    }

    pub fn with_poll_limit(mut self, poll_limit: usize) -> Self {
        self.poll_limit = poll_limit;
        self
    }

    /// Batch одного poll'а никогда не должен превышать то, что может
    /// удержать history: `1 ≤ poll_limit ≤ history_capacity`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity < 1 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.poll_limit < 1 {
            return Err(ConfigError::ZeroPollLimit);
        }
        if self.poll_limit > self.history_capacity {
            return Err(ConfigError::PollLimitExceedsCapacity {
                poll_limit: self.poll_limit,
                capacity: self.history_capacity,
            });
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Schedule / Retry
// ═══════════════════════════════════════════════════════════════

/// Экспоненциальный backoff на транзиентных ошибках источника.
///
/// `max_retries = 0` — первая же ошибка poll'а фатальна.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::from_millis(default_initial_backoff_ms()),
            max_backoff: Duration::from_millis(default_max_backoff_ms()),
        }
    }

    /// Задержка перед повтором номер `attempt` (начиная с 1):
    /// initial, 2×initial, 4×initial, … не больше `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .checked_mul(1u32 << shift)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Расписание run loop'а.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSchedule {
    /// Пауза между успешными циклами.
    pub interval: Duration,
    pub retry: RetryPolicy,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(default_interval_ms()),
            retry: RetryPolicy::none(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Restart policy
// ═══════════════════════════════════════════════════════════════

/// Что делать процессу после фатальной ошибки источника.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Завершиться с ошибкой.
    #[default]
    Never,
    /// Пересоздать движок с пустой history и заново выполнить priming.
    /// Последний poll может быть выдан повторно.
    Cold,
}

// ═══════════════════════════════════════════════════════════════
//  StreamerSettings — секция [streamer] конфиг-файла
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct StreamerSettings {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// None = равен history_capacity.
    #[serde(default)]
    pub poll_limit: Option<usize>,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub retry: RetrySettings,
    /// Размер канала engine → sink.
    #[serde(default = "default_buffer")]
    pub buffer: usize,
    #[serde(default)]
    pub overflow: OverflowPolicy,
    #[serde(default)]
    pub restart: RestartPolicy,
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_name() -> String {
    "feedwatch".into()
}
fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}
fn default_interval_ms() -> u64 {
    2_000
}
fn default_buffer() -> usize {
    1024
}
fn default_restart_delay_ms() -> u64 {
    5_000
}
fn default_initial_backoff_ms() -> u64 {
    500
}
fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl Default for StreamerSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            history_capacity: default_history_capacity(),
            poll_limit: None,
            interval_ms: default_interval_ms(),
            retry: RetrySettings::default(),
            buffer: default_buffer(),
            overflow: OverflowPolicy::default(),
            restart: RestartPolicy::default(),
            restart_delay_ms: default_restart_delay_ms(),
        }
    }
}

impl StreamerSettings {
    /// Провалидировать секцию и собрать конфиг движка.
    pub fn streamer_config(&self) -> Result<StreamerConfig, ConfigError> {
        if self.buffer < 1 {
            return Err(ConfigError::Invalid("streamer.buffer must be at least 1".into()));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::Invalid(format!(
                "streamer.retry.initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.retry.initial_backoff_ms, self.retry.max_backoff_ms
            )));
        }
        let cfg = StreamerConfig::new(self.name.clone(), self.history_capacity)
            .with_poll_limit(self.poll_limit.unwrap_or(self.history_capacity));
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn schedule(&self) -> PollSchedule {
        PollSchedule {
            interval: Duration::from_millis(self.interval_ms),
            retry: RetryPolicy {
                max_retries: self.retry.max_retries,
                initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
                max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
            },
        }
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_zero_capacity() {
        let cfg = StreamerConfig::new("t", 0);
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroCapacity));
    }

    #[test]
    fn validate_rejects_poll_limit_above_capacity() {
        let cfg = StreamerConfig::new("t", 10).with_poll_limit(11);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::PollLimitExceedsCapacity { poll_limit: 11, capacity: 10 })
        );
        let cfg = StreamerConfig::new("t", 10).with_poll_limit(0);
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroPollLimit));
        assert!(StreamerConfig::new("t", 10).with_poll_limit(5).validate().is_ok());
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let retry = RetryPolicy {
            max_retries: 10,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(1_000),
        };
        assert_eq!(retry.backoff(1), Duration::from_millis(100));
        assert_eq!(retry.backoff(2), Duration::from_millis(200));
        assert_eq!(retry.backoff(4), Duration::from_millis(800));
        assert_eq!(retry.backoff(5), Duration::from_millis(1_000));
        assert_eq!(retry.backoff(64), Duration::from_millis(1_000));
    }

    #[test]
    fn settings_defaults_match_documented_values() {
        let s: StreamerSettings = serde_json::from_str("{}").unwrap();
        let cfg = s.streamer_config().unwrap();
        assert_eq!(cfg.history_capacity, DEFAULT_HISTORY_CAPACITY);
        assert_eq!(cfg.poll_limit, DEFAULT_HISTORY_CAPACITY);
        assert_eq!(s.restart, RestartPolicy::Never);
        assert_eq!(s.overflow, OverflowPolicy::BackPressure);
        assert_eq!(s.schedule().retry.max_retries, 0);
    }

    #[test]
    fn settings_reject_zero_buffer() {
        let s: StreamerSettings = serde_json::from_str(r#"{"buffer": 0}"#).unwrap();
        assert!(matches!(s.streamer_config(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn settings_parse_restart_and_retry() {
        let s: StreamerSettings = serde_json::from_str(
            r#"{"restart": "cold", "poll_limit": 25, "retry": {"max_retries": 3}}"#,
        )
        .unwrap();
        assert_eq!(s.restart, RestartPolicy::Cold);
        assert_eq!(s.streamer_config().unwrap().poll_limit, 25);
        assert_eq!(s.schedule().retry.max_retries, 3);
        assert_eq!(s.schedule().retry.initial_backoff, Duration::from_millis(500));
    }
}
