use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Deserialize;

use feed_api::{AdapterError, Item, PollSource};

use crate::layout::ItemLayout;

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSourceConfig {
    /// URL с подстановками `{scope}` и `{limit}`,
    /// e.g. `https://www.reddit.com/r/{scope}/new.json?limit={limit}`.
    pub url: String,
    /// Дополнительные заголовки (e.g. `Authorization`).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub layout: ItemLayout,
}

fn default_user_agent() -> String {
    concat!("feedwatch/", env!("CARGO_PKG_VERSION")).into()
}
fn default_timeout_ms() -> u64 {
    10_000
}

/// Poll-источник поверх HTTP GET, отдающего JSON со списком последних
/// элементов.
///
/// 429 и 5xx — `Io` (можно повторить), остальные не-2xx — `Config`
/// (неверный scope, нет доступа): повтор не поможет.
pub struct HttpJsonSource {
    http: reqwest::Client,
    url_template: String,
    scope: String,
    headers: BTreeMap<String, String>,
    layout: ItemLayout,
}

impl HttpJsonSource {
    pub fn new(cfg: &HttpSourceConfig, scope: &str) -> Result<Self, AdapterError> {
        if cfg.url.is_empty() {
            return Err(AdapterError::config("source.url is empty"));
        }
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| AdapterError::config(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            url_template: cfg.url.clone(),
            scope: scope.to_string(),
            headers: cfg.headers.clone(),
            layout: cfg.layout.clone(),
        })
    }

    fn url(&self, limit: usize) -> String {
        self.url_template
            .replace("{scope}", &self.scope)
            .replace("{limit}", &limit.to_string())
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<Item>, AdapterError> {
        let url = self.url(limit);
        let mut req = self.http.get(&url);
        for (name, value) in &self.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| AdapterError::io(format!("GET {url}: {e}")))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| AdapterError::io(format!("GET {url} read: {e}")))?;

        if !status.is_success() {
            let msg = format!("GET {url}: HTTP {status}");
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                AdapterError::io(msg)
            } else {
                AdapterError::config(msg)
            });
        }

        let doc: serde_json::Value = serde_json::from_str(&body)?;
        self.layout.extract(&doc, limit)
    }
}

impl PollSource for HttpJsonSource {
    fn poll(&self, limit: usize) -> Pin<Box<dyn Future<Output = Result<Vec<Item>, AdapterError>> + Send + '_>> {
        Box::pin(self.fetch(limit))
    }

    fn describe(&self) -> String {
        format!("http {}", self.url_template.replace("{scope}", &self.scope))
    }
}
