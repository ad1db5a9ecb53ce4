use serde::Deserialize;

use feed_api::{AdapterError, Item};

/// Единица измерения поля времени создания.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TsUnit {
    /// Unix секунды, допускается дробная часть (e.g. `1700000000.0`).
    #[default]
    Seconds,
    /// Unix миллисекунды.
    Millis,
}

/// Где в JSON-ответе лежат элементы и их поля.
///
/// Все пути — dot-notation относительно документа / элемента;
/// пустая строка означает сам узел.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemLayout {
    /// Путь к массиву элементов (e.g. `"data.children"`).
    #[serde(default)]
    pub items_path: String,
    /// Путь к полю идентификатора внутри элемента.
    #[serde(default = "default_id_field")]
    pub id_field: String,
    /// Путь к полю времени создания внутри элемента.
    #[serde(default = "default_ts_field")]
    pub ts_field: String,
    #[serde(default)]
    pub ts_unit: TsUnit,
    /// Какую часть элемента отдавать как payload. Пусто — весь элемент.
    #[serde(default)]
    pub payload_path: String,
}

fn default_id_field() -> String {
    "id".into()
}
fn default_ts_field() -> String {
    "created_utc".into()
}

impl Default for ItemLayout {
    fn default() -> Self {
        Self {
            items_path: String::new(),
            id_field: default_id_field(),
            ts_field: default_ts_field(),
            ts_unit: TsUnit::default(),
            payload_path: String::new(),
        }
    }
}

/// Resolve a dot-notation path in a `serde_json::Value`.
///
/// - `""` → the value itself
/// - `"data.children"` → `value["data"]["children"]`
///
/// Returns `None` if any segment is missing.
pub fn resolve_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    if path.is_empty() {
        return Some(value);
    }
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

impl ItemLayout {
    /// Извлечь не более `limit` элементов в порядке документа.
    ///
    /// Отсутствие массива по `items_path` — ошибка формата всего ответа.
    /// Отдельные элементы без id или времени пропускаются с warning.
    pub fn extract(&self, doc: &serde_json::Value, limit: usize) -> Result<Vec<Item>, AdapterError> {
        let entries = resolve_path(doc, &self.items_path)
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                AdapterError::format_err(format!("expected array at '{}'", self.items_path))
            })?;

        let mut items = Vec::with_capacity(entries.len().min(limit));
        for (index, entry) in entries.iter().enumerate() {
            if items.len() >= limit {
                break;
            }
            match self.extract_one(entry) {
                Ok(item) => items.push(item),
                Err(e) => {
                    tracing::warn!(index, error = %e, "bad item, skipping");
                }
            }
        }
        Ok(items)
    }

    fn extract_one(&self, entry: &serde_json::Value) -> Result<Item, AdapterError> {
        let id = resolve_path(entry, &self.id_field)
            .and_then(id_to_string)
            .ok_or_else(|| AdapterError::format_err(format!("missing id field '{}'", self.id_field)))?;
        let created_ms = resolve_path(entry, &self.ts_field)
            .and_then(|v| ts_to_ms(v, self.ts_unit))
            .ok_or_else(|| {
                AdapterError::format_err(format!("missing or invalid ts field '{}' for '{id}'", self.ts_field))
            })?;
        let payload = resolve_path(entry, &self.payload_path)
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        Ok(Item { id, created_ms, payload })
    }
}

fn id_to_string(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn ts_to_ms(v: &serde_json::Value, unit: TsUnit) -> Option<i64> {
    let raw = match v {
        serde_json::Value::Number(n) => {
            if let (TsUnit::Millis, Some(ms)) = (unit, n.as_i64()) {
                return Some(ms);
            }
            n.as_f64()?
        }
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    let ms = match unit {
        TsUnit::Seconds => (raw * 1000.0).round(),
        TsUnit::Millis => raw.round(),
    };
    Some(ms as i64)
}
