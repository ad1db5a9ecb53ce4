mod tcp;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use feed_api::{AdapterError, Item, ItemSink};

pub use tcp::TcpLinesSink;

/// Закодировать item как одну JSON-строку с `\n` в конце.
pub fn encode_line(item: &Item, buf: &mut Vec<u8>) -> Result<(), AdapterError> {
    serde_json::to_writer(&mut *buf, item)?;
    buf.push(b'\n');
    Ok(())
}

// ═══════════════════════════════════════════════════════════════
//  StdoutSink
// ═══════════════════════════════════════════════════════════════

/// JSON lines в stdout через `tokio::io::stdout`.
///
/// Один handle на sink: записи уходят в порядке emit, `flush()` ждёт
/// завершения последней.
pub struct StdoutSink {
    out: Mutex<tokio::io::Stdout>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self { out: Mutex::new(tokio::io::stdout()) }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemSink for StdoutSink {
    fn emit<'a>(&'a self, item: &'a Item) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + 'a>> {
        Box::pin(async move {
            let mut buf = Vec::with_capacity(256);
            encode_line(item, &mut buf)?;
            self.out.lock().await.write_all(&buf).await?;
            Ok(())
        })
    }

    fn flush(&self) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>> {
        Box::pin(async move {
            self.out.lock().await.flush().await?;
            Ok(())
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  Config
// ═══════════════════════════════════════════════════════════════

/// Секция `[sink]`: вид sink'а задаётся полем `kind`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    Tcp {
        host: String,
        port: u16,
        #[serde(default = "default_connect_timeout_ms")]
        connect_timeout_ms: u64,
    },
    #[default]
    Stdout,
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

pub fn build_sink(cfg: &SinkConfig) -> Result<Arc<dyn ItemSink>, AdapterError> {
    Ok(match cfg {
        SinkConfig::Tcp { host, port, connect_timeout_ms } => {
            if host.is_empty() {
                return Err(AdapterError::config("sink.host is empty"));
            }
            Arc::new(TcpLinesSink::new(host, *port, Duration::from_millis(*connect_timeout_ms)))
        }
        SinkConfig::Stdout => Arc::new(StdoutSink::new()),
    })
}
