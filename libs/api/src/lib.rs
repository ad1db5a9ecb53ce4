pub mod error;

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

pub use error::{AdapterError, ErrorKind};

// ════════════════════════════════════════════════════════════════
//  Overflow Policy
// ════════════════════════════════════════════════════════════════

/// Стратегия поведения при переполнении bounded канала к sink'у.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// try_send(): если канал полон — отклонить item, залогировать.
    Drop,
    /// .send().await: ждать пока появится место.
    #[default]
    #[serde(alias = "backpressure")]
    BackPressure,
}

// ════════════════════════════════════════════════════════════════
//  Item
// ════════════════════════════════════════════════════════════════

/// Одно внешнее событие.
///
/// Идентичность определяется только `id`: два Item с одинаковым `id`
/// считаются одним логическим событием, даже если payload отличается
/// между опросами (источник может отдавать разные снимки изменяемого
/// объекта).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Item {
    /// Стабильный непрозрачный идентификатор.
    pub id: String,
    /// Время создания в миллисекундах (Unix epoch). Возможны совпадения.
    pub created_ms: i64,
    /// Данные, передаются без изменений.
    pub payload: serde_json::Value,
}

impl Item {
    pub fn new(id: impl Into<String>, created_ms: i64, payload: serde_json::Value) -> Self {
        Self { id: id.into(), created_ms, payload }
    }
}

// ════════════════════════════════════════════════════════════════
//  Adapter Traits
// ════════════════════════════════════════════════════════════════

/// Источник, отдающий только последние N элементов (без курсора).
///
/// Контракт: результат упорядочен от новых к старым, длина ≤ `limit`,
/// элементы, ещё не вытесненные из окна источника, возвращаются
/// с тем же `id` при повторных вызовах. Таймауты — на стороне адаптера.
pub trait PollSource: Send + Sync {
    /// Получить последние `limit` элементов.
    fn poll(&self, limit: usize) -> Pin<Box<dyn Future<Output = Result<Vec<Item>, AdapterError>> + Send + '_>>;

    /// Человекочитаемое имя для логов.
    fn describe(&self) -> String;
}

/// Sink — принимает новые элементы в порядке подачи и сохраняет этот
/// порядок дальше. Не имеет доступа к history движка.
pub trait ItemSink: Send + Sync {
    /// Отправить один элемент. Ошибка — локально восстановимая.
    fn emit<'a>(&'a self, item: &'a Item) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + 'a>>;

    /// Flush буферов (при graceful shutdown).
    fn flush(&self) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>>;
}
