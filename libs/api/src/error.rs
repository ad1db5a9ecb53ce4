/// Категория ошибки адаптера; от неё зависит реакция движка.
///
/// Неудачный poll с `Io` повторяется с экспоненциальным backoff, пока не
/// исчерпан `retry.max_retries`. Любая другая категория сразу завершает
/// текущий экземпляр движка; дальше решает `restart` политика. Для
/// sink'а категория только логируется: item в любом случае считается
/// обработанным.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Неверная конфигурация или отказ в доступе — повтор не поможет.
    Config,
    /// Сеть, таймаут, rate limit — можно повторить.
    Io,
    /// Ответ не удалось разобрать.
    Format,
    /// Прочее.
    Logic,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
            ErrorKind::Format => "format",
            ErrorKind::Logic => "logic",
        }
    }

    /// Повторяет ли движок poll после такой ошибки.
    pub fn is_transient(self) -> bool {
        self == ErrorKind::Io
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ошибка, которую source/sink адаптер возвращает движку.
///
/// `kind()` решает, будет ли повтор (см. [`ErrorKind`]); сообщение
/// попадает в лог и в `StreamError`. `Display` — только сообщение,
/// `Debug` — `[kind] message`.
#[derive(Clone, PartialEq, Eq)]
pub struct AdapterError {
    kind: ErrorKind,
    message: String,
}

impl AdapterError {
    pub fn with_kind(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self { kind, message: msg.into() }
    }

    pub fn new(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Logic, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Config, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Io, msg)
    }

    pub fn format_err(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Format, msg)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Debug for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AdapterError {}

impl From<String> for AdapterError {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for AdapterError {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<std::io::Error> for AdapterError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(e: serde_json::Error) -> Self {
        Self::format_err(e.to_string())
    }
}
