use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use feed_api::{AdapterError, Item, ItemSink};

use crate::encode_line;

/// JSON lines поверх одного исходящего TCP-соединения.
///
/// Подключается лениво при первом emit. После ошибки записи соединение
/// сбрасывается, следующий emit переподключается; упавший item не
/// повторяется.
pub struct TcpLinesSink {
    addr: String,
    connect_timeout: Duration,
    stream: Mutex<Option<TcpStream>>,
}

impl TcpLinesSink {
    pub fn new(host: &str, port: u16, connect_timeout: Duration) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            connect_timeout,
            stream: Mutex::new(None),
        }
    }

    async fn connect(&self) -> Result<TcpStream, AdapterError> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| AdapterError::io(format!("TCP connect to {}: timed out", self.addr)))?
            .map_err(|e| AdapterError::io(format!("TCP connect to {}: {e}", self.addr)))?;
        stream.set_nodelay(true).ok();
        tracing::info!(addr = %self.addr, "tcp sink connected");
        Ok(stream)
    }

    async fn send(&self, item: &Item) -> Result<(), AdapterError> {
        let mut buf = Vec::with_capacity(256);
        encode_line(item, &mut buf)?;

        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let Some(stream) = guard.as_mut() else {
            return Err(AdapterError::new("tcp sink not connected"));
        };
        if let Err(e) = stream.write_all(&buf).await {
            *guard = None;
            tracing::warn!(addr = %self.addr, error = %e, "tcp sink write failed, dropping connection");
            return Err(AdapterError::io(format!("TCP write to {}: {e}", self.addr)));
        }
        Ok(())
    }
}

impl ItemSink for TcpLinesSink {
    fn emit<'a>(&'a self, item: &'a Item) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + 'a>> {
        Box::pin(self.send(item))
    }

    fn flush(&self) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>> {
        Box::pin(async move {
            let mut guard = self.stream.lock().await;
            if let Some(stream) = guard.as_mut() {
                stream.flush().await?;
            }
            Ok(())
        })
    }
}
