mod file;
mod http;
pub mod layout;

use std::sync::Arc;

use serde::Deserialize;

use feed_api::{AdapterError, PollSource};

pub use file::{FileJsonSource, FileSourceConfig};
pub use http::{HttpJsonSource, HttpSourceConfig};
pub use layout::{ItemLayout, TsUnit};

/// Секция `[source]`: вид источника задаётся полем `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    Http(HttpSourceConfig),
    File(FileSourceConfig),
}

/// Собрать источник для `scope` (e.g. имя сообщества/канала).
pub fn build_source(cfg: &SourceConfig, scope: &str) -> Result<Arc<dyn PollSource>, AdapterError> {
    if scope.is_empty() {
        return Err(AdapterError::config("source scope is empty"));
    }
    Ok(match cfg {
        SourceConfig::Http(c) => Arc::new(HttpJsonSource::new(c, scope)?),
        SourceConfig::File(c) => Arc::new(FileJsonSource::new(c, scope)?),
    })
}
