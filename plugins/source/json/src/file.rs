use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

use feed_api::{AdapterError, Item, PollSource};

use crate::layout::ItemLayout;

#[derive(Debug, Clone, Deserialize)]
pub struct FileSourceConfig {
    /// Путь к JSON-файлу, допускается `{scope}`.
    pub path: String,
    #[serde(default)]
    pub layout: ItemLayout,
}

/// Перечитывает JSON-файл на каждом poll'е. Для локальной отладки и
/// воспроизведения сохранённых ответов.
pub struct FileJsonSource {
    path: String,
    layout: ItemLayout,
}

impl FileJsonSource {
    pub fn new(cfg: &FileSourceConfig, scope: &str) -> Result<Self, AdapterError> {
        if cfg.path.is_empty() {
            return Err(AdapterError::config("source.path is empty"));
        }
        Ok(Self {
            path: cfg.path.replace("{scope}", scope),
            layout: cfg.layout.clone(),
        })
    }

    async fn read(&self, limit: usize) -> Result<Vec<Item>, AdapterError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| AdapterError::io(format!("read '{}': {e}", self.path)))?;
        let doc: serde_json::Value = serde_json::from_str(&content)?;
        self.layout.extract(&doc, limit)
    }
}

impl PollSource for FileJsonSource {
    fn poll(&self, limit: usize) -> Pin<Box<dyn Future<Output = Result<Vec<Item>, AdapterError>> + Send + '_>> {
        Box::pin(self.read(limit))
    }

    fn describe(&self) -> String {
        format!("file {}", self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_api::ErrorKind;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("feedwatch-{}-{name}.json", std::process::id()))
    }

    #[tokio::test]
    async fn rereads_file_on_each_poll() {
        let path = temp_path("reread");
        std::fs::write(&path, r#"[{"id":"a","created_utc":1}]"#).unwrap();
        let cfg = FileSourceConfig {
            path: path.to_string_lossy().replace("reread", "{scope}"),
            layout: ItemLayout::default(),
        };
        let source = FileJsonSource::new(&cfg, "reread").unwrap();

        let first = source.poll(10).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].created_ms, 1_000);

        std::fs::write(&path, r#"[{"id":"b","created_utc":2},{"id":"a","created_utc":1}]"#).unwrap();
        let second = source.poll(10).await.unwrap();
        let ids: Vec<_> = second.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let cfg = FileSourceConfig {
            path: temp_path("missing").to_string_lossy().to_string(),
            layout: ItemLayout::default(),
        };
        let source = FileJsonSource::new(&cfg, "x").unwrap();
        assert_eq!(source.poll(1).await.unwrap_err().kind(), ErrorKind::Io);
    }
}
