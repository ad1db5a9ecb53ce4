use std::sync::Arc;

use feed_api::{ItemSink, PollSource};

use crate::batch::PollBatch;
use crate::config::StreamerConfig;
use crate::error::{ConfigError, SinkError, StreamError};
use crate::history::BoundedHistory;

// ═══════════════════════════════════════════════════════════════
//  State / Report
// ═══════════════════════════════════════════════════════════════

/// `Uninitialized → Primed → Polling ⇄ Emitting`. Терминального
/// состояния нет: движок работает до отмены снаружи.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamerState {
    Uninitialized,
    Primed,
    Polling,
    Emitting,
}

/// Итог одного цикла poll → diff → emit → update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Уникальных элементов в batch.
    pub polled: usize,
    /// Повторов `id` внутри batch.
    pub duplicates: usize,
    /// Новых (не в history) элементов.
    pub fresh: usize,
    /// Успешно принятых sink'ом.
    pub emitted: usize,
    /// Отклонённых sink'ом (помечены как увиденные).
    pub failed: usize,
}

// ═══════════════════════════════════════════════════════════════
//  Streamer
// ═══════════════════════════════════════════════════════════════

/// Движок poll-and-diff: превращает окно «последних N» источника в
/// упорядоченный поток новых элементов без повторов.
///
/// Единственный владелец history; без блокировок. Гарантия отсутствия
/// повторов вероятностная: элемент, вытесненный из history раньше, чем
/// источник перестал его отдавать, будет выдан снова. Потребителям
/// следует обрабатывать элементы идемпотентно.
pub struct Streamer {
    config: StreamerConfig,
    source: Arc<dyn PollSource>,
    history: BoundedHistory<String>,
    state: StreamerState,
}

impl Streamer {
    pub fn new(config: StreamerConfig, source: Arc<dyn PollSource>) -> Result<Self, ConfigError> {
        config.validate()?;
        let history = BoundedHistory::new(config.history_capacity)?;
        Ok(Self {
            config,
            source,
            history,
            state: StreamerState::Uninitialized,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &StreamerConfig {
        &self.config
    }

    pub fn state(&self) -> StreamerState {
        self.state
    }

    pub fn history(&self) -> &BoundedHistory<String> {
        &self.history
    }

    async fn poll_batch(&self) -> Result<PollBatch, StreamError> {
        let raw = self
            .source
            .poll(self.config.poll_limit)
            .await
            .map_err(|source| StreamError::Source {
                streamer: self.config.name.clone(),
                source,
            })?;
        let batch = PollBatch::normalize(raw, self.config.poll_limit);

        if batch.truncated() > 0 {
            tracing::warn!(
                streamer = %self.config.name,
                truncated = batch.truncated(),
                limit = self.config.poll_limit,
                "source returned more items than requested"
            );
        }
        if batch.duplicates() > 0 {
            tracing::debug!(
                streamer = %self.config.name,
                duplicates = batch.duplicates(),
                "collapsed duplicate ids in batch"
            );
        }
        Ok(batch)
    }

    /// Засеять history первым poll'ом, ничего не выдавая: «новым»
    /// считается только то, что появилось после старта наблюдения.
    /// Повторный вызов после priming — no-op.
    pub async fn prime(&mut self) -> Result<usize, StreamError> {
        if self.state != StreamerState::Uninitialized {
            return Ok(0);
        }
        let batch = self.poll_batch().await?;
        let seeded = batch.len();
        self.history
            .insert_all(batch.into_chronological().into_iter().map(|item| item.id));
        self.state = StreamerState::Primed;

        tracing::info!(
            streamer = %self.config.name,
            source = %self.source.describe(),
            seeded,
            capacity = self.history.capacity(),
            "primed"
        );
        Ok(seeded)
    }

    /// Один цикл. На неинициализированном движке выполняет priming
    /// и ничего не выдаёт.
    ///
    /// Ошибка poll'а возвращается как `StreamError::Source`. Ошибки sink'а
    /// логируются, цикл продолжается; history обновляется после всех
    /// emit'ов независимо от их исхода, так что отклонённый элемент не
    /// будет отправлен повторно.
    pub async fn cycle(&mut self, sink: &dyn ItemSink) -> Result<CycleReport, StreamError> {
        if self.state == StreamerState::Uninitialized {
            let seeded = self.prime().await?;
            return Ok(CycleReport { polled: seeded, ..CycleReport::default() });
        }

        self.state = StreamerState::Polling;
        let batch = self.poll_batch().await?;
        let fresh = batch.fresh(&self.history);

        let mut report = CycleReport {
            polled: batch.len(),
            duplicates: batch.duplicates(),
            fresh: fresh.len(),
            ..CycleReport::default()
        };

        if !fresh.is_empty() {
            self.state = StreamerState::Emitting;
            for item in &fresh {
                match sink.emit(item).await {
                    Ok(()) => report.emitted += 1,
                    Err(source) => {
                        report.failed += 1;
                        let e = SinkError { item_id: item.id.clone(), source };
                        tracing::error!(streamer = %self.config.name, error = %e, "emit error");
                    }
                }
            }
            self.history.insert_all(fresh.into_iter().map(|item| item.id));
            self.state = StreamerState::Polling;
        }

        tracing::debug!(
            streamer = %self.config.name,
            polled = report.polled,
            fresh = report.fresh,
            emitted = report.emitted,
            failed = report.failed,
            history = self.history.len(),
            "cycle complete"
        );
        Ok(report)
    }
}
