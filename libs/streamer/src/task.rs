use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use feed_api::{AdapterError, Item, ItemSink, OverflowPolicy};

use crate::config::PollSchedule;
use crate::engine::Streamer;
use crate::error::{SinkError, StreamError};

// ═══════════════════════════════════════════════════════════════
//  ChannelSink — engine → bounded mpsc
// ═══════════════════════════════════════════════════════════════

/// ItemSink поверх bounded канала: engine «выдаёт» элемент, положив его
/// в канал, а отдельная sink task доставляет его дальше в том же порядке.
pub struct ChannelSink {
    tx: mpsc::Sender<Item>,
    overflow: OverflowPolicy,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Item>, overflow: OverflowPolicy) -> Self {
        Self { tx, overflow }
    }
}

impl ItemSink for ChannelSink {
    fn emit<'a>(&'a self, item: &'a Item) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + 'a>> {
        Box::pin(async move {
            match self.overflow {
                OverflowPolicy::Drop => match self.tx.try_send(item.clone()) {
                    Ok(()) => Ok(()),
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        Err(AdapterError::io("sink channel full, item dropped"))
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        Err(AdapterError::io("sink task stopped"))
                    }
                },
                OverflowPolicy::BackPressure => self
                    .tx
                    .send(item.clone())
                    .await
                    .map_err(|_| AdapterError::io("sink task stopped")),
            }
        })
    }

    fn flush(&self) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }
}

// ═══════════════════════════════════════════════════════════════
//  Run loop
// ═══════════════════════════════════════════════════════════════

/// Крутить циклы движка до отмены или фатальной ошибки.
///
/// Между успешными циклами — `schedule.interval`. Транзиентная ошибка
/// источника повторяется с экспоненциальным backoff не более
/// `retry.max_retries` раз подряд; успешный цикл сбрасывает счётчик.
/// Отмена возвращает `Ok(())`, незавершённый poll/emit бросается.
pub async fn run_streamer(
    streamer: &mut Streamer,
    sink: &dyn ItemSink,
    schedule: &PollSchedule,
    token: &CancellationToken,
) -> Result<(), StreamError> {
    let mut failures: u32 = 0;

    loop {
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(()),
            result = streamer.cycle(sink) => result,
        };

        let delay = match result {
            Ok(report) => {
                if failures > 0 {
                    tracing::info!(streamer = %streamer.name(), failures, "source recovered");
                    failures = 0;
                }
                if report.fresh > 0 {
                    tracing::info!(
                        streamer = %streamer.name(),
                        fresh = report.fresh,
                        failed = report.failed,
                        "emitted new items"
                    );
                }
                schedule.interval
            }
            Err(e) if e.is_transient() && failures < schedule.retry.max_retries => {
                failures += 1;
                let backoff = schedule.retry.backoff(failures);
                tracing::warn!(
                    streamer = %streamer.name(),
                    error = %e,
                    attempt = failures,
                    max_retries = schedule.retry.max_retries,
                    backoff_ms = backoff.as_millis() as u64,
                    "poll failed, retrying"
                );
                backoff
            }
            Err(e) => return Err(e),
        };

        if delay.is_zero() {
            tokio::task::yield_now().await;
            continue;
        }
        tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(()),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Sink task — mpsc → sink.emit()
// ═══════════════════════════════════════════════════════════════

/// Запустить sink task: вызывает `sink.emit()` для каждого элемента из
/// канала. Ошибки логируются и не прерывают поток. Когда канал закрыт
/// и вычитан — `flush()`.
pub fn spawn_sink_task(
    sink: Arc<dyn ItemSink>,
    streamer_name: String,
    mut rx: mpsc::Receiver<Item>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(item) = rx.recv().await {
            if let Err(source) = sink.emit(&item).await {
                let e = SinkError { item_id: item.id.clone(), source };
                tracing::error!(streamer = %streamer_name, error = %e, "send error");
            }
        }
        if let Err(e) = sink.flush().await {
            tracing::error!(streamer = %streamer_name, error = ?e, "sink flush error");
        }
        tracing::info!(streamer = %streamer_name, "sink stopped");
    })
}

/// Запустить движок и sink, связанные bounded каналом размера `buffer`.
///
/// Task завершается по отмене `token` (`Ok`) или фатальной ошибке
/// источника (`Err`); перед выходом ждёт, пока sink вычитает канал.
pub fn spawn_streamer(
    mut streamer: Streamer,
    sink: Arc<dyn ItemSink>,
    schedule: PollSchedule,
    buffer: usize,
    overflow: OverflowPolicy,
    token: CancellationToken,
) -> JoinHandle<Result<(), StreamError>> {
    tokio::spawn(async move {
        let name = streamer.name().to_string();
        let (tx, rx) = mpsc::channel::<Item>(buffer.max(1));
        let sink_handle = spawn_sink_task(sink, name.clone(), rx);

        let channel = ChannelSink::new(tx, overflow);
        let result = run_streamer(&mut streamer, &channel, &schedule, &token).await;

        // Закрыть канал: sink task дочитает остаток и сделает flush.
        drop(channel);
        if let Err(e) = sink_handle.await {
            tracing::error!(streamer = %name, error = %e, "sink task failed");
        }

        match &result {
            Ok(()) => tracing::info!(streamer = %name, "finished"),
            Err(e) => tracing::error!(streamer = %name, error = %e, "stopped on fatal error"),
        }
        result
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::{RetryPolicy, StreamerConfig};
    use crate::testing::{item, RecordingSink, ScriptedSource};

    fn schedule(max_retries: u32) -> PollSchedule {
        PollSchedule {
            interval: Duration::from_millis(10),
            retry: RetryPolicy {
                max_retries,
                initial_backoff: Duration::from_millis(100),
                max_backoff: Duration::from_secs(1),
            },
        }
    }

    fn streamer(source: Arc<ScriptedSource>) -> Streamer {
        Streamer::new(StreamerConfig::new("test", 10), source).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_source_error_ends_loop() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(vec![item("a", 1)]),
            Ok(vec![item("b", 2), item("a", 1)]),
            Err(AdapterError::config("unauthorized")),
        ]));
        let sink = RecordingSink::default();
        let mut s = streamer(source);
        let err = run_streamer(&mut s, &sink, &schedule(5), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::Source { .. }));
        assert_eq!(sink.ids(), ["b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_until_exhausted() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(vec![item("a", 1)]),
            Err(AdapterError::io("timeout")),
            Err(AdapterError::io("timeout")),
            Ok(vec![item("b", 2), item("a", 1)]),
            Err(AdapterError::io("timeout")),
            Err(AdapterError::io("timeout")),
            Err(AdapterError::io("timeout")),
        ]));
        let sink = RecordingSink::default();
        let mut s = streamer(source.clone());
        let err = run_streamer(&mut s, &sink, &schedule(2), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(sink.ids(), ["b"]);
        assert_eq!(source.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_makes_first_failure_fatal() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(vec![]),
            Err(AdapterError::io("reset")),
            Ok(vec![item("z", 1)]),
        ]));
        let sink = RecordingSink::default();
        let mut s = streamer(source.clone());
        assert!(run_streamer(&mut s, &sink, &schedule(0), &CancellationToken::new()).await.is_err());
        assert_eq!(source.remaining(), 1);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_polling() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(vec![item("a", 1)])]));
        let sink = RecordingSink::default();
        let mut s = streamer(source.clone());
        let token = CancellationToken::new();
        token.cancel();
        run_streamer(&mut s, &sink, &schedule(0), &token).await.unwrap();
        assert!(source.requested_limits().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_streamer_delivers_in_order_and_flushes() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(vec![item("a", 1)]),
            Ok(vec![item("d", 4), item("c", 3), item("b", 2), item("a", 1)]),
            Ok(vec![item("e", 5), item("d", 4)]),
            Err(AdapterError::format_err("bad json")),
        ]));
        let sink = Arc::new(RecordingSink::default());
        let handle = spawn_streamer(
            streamer(source),
            sink.clone(),
            schedule(0),
            2,
            OverflowPolicy::BackPressure,
            CancellationToken::new(),
        );
        assert!(handle.await.unwrap().is_err());
        assert_eq!(sink.ids(), ["b", "c", "d", "e"]);
        assert_eq!(sink.flushes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_streamer_stops_on_cancel() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(vec![item("a", 1)])]));
        let sink = Arc::new(RecordingSink::default());
        let token = CancellationToken::new();
        let handle = spawn_streamer(
            streamer(source.clone()),
            sink.clone(),
            schedule(0),
            8,
            OverflowPolicy::BackPressure,
            token.clone(),
        );
        tokio::time::sleep(Duration::from_millis(55)).await;
        token.cancel();
        handle.await.unwrap().unwrap();
        assert!(source.requested_limits().len() >= 2);
        assert_eq!(sink.flushes(), 1);
    }

    struct PanickingSink;

    impl ItemSink for PanickingSink {
        fn emit<'a>(&'a self, _item: &'a Item) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + 'a>> {
            Box::pin(async { panic!("sink exploded") })
        }

        fn flush(&self) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_sink_does_not_mask_streamer_result() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(vec![item("a", 1)]),
            Ok(vec![item("b", 2), item("a", 1)]),
            Err(AdapterError::config("revoked")),
        ]));
        let handle = spawn_streamer(
            streamer(source),
            Arc::new(PanickingSink),
            schedule(0),
            4,
            OverflowPolicy::Drop,
            CancellationToken::new(),
        );
        let result = handle.await.expect("streamer task must not propagate sink panic");
        assert!(matches!(result, Err(StreamError::Source { .. })));
    }

    #[tokio::test]
    async fn drop_policy_rejects_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let sink = ChannelSink::new(tx, OverflowPolicy::Drop);
        sink.emit(&item("a", 1)).await.unwrap();
        let err = sink.emit(&item("b", 2)).await.unwrap_err();
        assert!(err.message().contains("full"));
        assert_eq!(rx.recv().await.unwrap().id, "a");
        drop(rx);
        assert!(sink.emit(&item("c", 3)).await.is_err());
    }
}
