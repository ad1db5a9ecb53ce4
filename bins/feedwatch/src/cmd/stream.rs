use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use feed_api::ItemSink;
use sink_lines::build_sink;
use source_json::build_source;
use streamer::{spawn_streamer, RestartPolicy, StreamError, Streamer};

use crate::config::{Effective, StreamArgs};
use crate::error::FeedwatchError;

/// Сколько ждать, пока sink вычитает канал после Ctrl+C.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run(args: StreamArgs) -> Result<(), FeedwatchError> {
    tracing::info!("feedwatch starting");

    // --- Load config ---
    let eff = Effective::new(&args)?;
    tracing::info!(config = %args.config, scope = %eff.scope, "loaded config");

    let sink = build_sink(&eff.sink)?;

    // --- CancellationToken for graceful shutdown ---
    let token = CancellationToken::new();
    tokio::spawn(cancel_on_signal(tokio::signal::ctrl_c(), token.clone()));

    supervise(&eff, sink, token).await?;

    tracing::info!("shutdown complete");
    Ok(())
}

/// Отменить `token`, когда придёт сигнал. Если обработчик сигнала не
/// установился, работаем дальше без него: отмена только по фатальной ошибке.
async fn cancel_on_signal<F>(signal: F, token: CancellationToken)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            tracing::info!("shutting down...");
            token.cancel();
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler, running without graceful shutdown");
        }
    }
}

/// Запустить движок и перезапускать его по `restart` политике.
///
/// Холодный рестарт создаёт пустую history и заново делает priming:
/// элементы последнего poll'а до сбоя могут уйти в sink повторно.
pub async fn supervise(
    eff: &Effective,
    sink: Arc<dyn ItemSink>,
    token: CancellationToken,
) -> Result<(), FeedwatchError> {
    let config = eff.settings.streamer_config()?;
    let schedule = eff.settings.schedule();
    let mut restarts: u64 = 0;

    loop {
        let source = build_source(&eff.source, &eff.scope)?;
        tracing::info!(
            streamer = %config.name,
            source = %source.describe(),
            capacity = config.history_capacity,
            poll_limit = config.poll_limit,
            restarts,
            "spawning streamer"
        );
        let streamer = Streamer::new(config.clone(), source)?;
        let mut handle = spawn_streamer(
            streamer,
            sink.clone(),
            schedule.clone(),
            eff.settings.buffer,
            eff.settings.overflow,
            token.clone(),
        );

        // Drain: после отмены ждём не дольше DRAIN_TIMEOUT
        let drain_token = token.clone();
        let joined = tokio::select! {
            joined = &mut handle => Some(joined),
            _ = async move {
                drain_token.cancelled().await;
                tokio::time::sleep(DRAIN_TIMEOUT).await;
            } => None,
        };
        let Some(joined) = joined else {
            tracing::warn!(streamer = %config.name, "drain timeout, aborting");
            handle.abort();
            return Ok(());
        };
        let result = joined?;

        let err = match result {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        if eff.settings.restart != RestartPolicy::Cold
            || matches!(err, StreamError::Config(_))
            || token.is_cancelled()
        {
            return Err(err.into());
        }

        restarts += 1;
        tracing::warn!(
            streamer = %config.name,
            error = %err,
            restarts,
            delay_ms = eff.settings.restart_delay_ms,
            "cold restart: history will be re-primed, recent items may be re-emitted"
        );
        tokio::select! {
            _ = token.cancelled() => return Ok(()),
            _ = tokio::time::sleep(eff.settings.restart_delay()) => {}
        }
    }
}
