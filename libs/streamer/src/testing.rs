//! Test doubles for the engine and run loop.

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use feed_api::{AdapterError, Item, ItemSink, PollSource};

pub fn item(id: &str, created_ms: i64) -> Item {
    Item::new(id, created_ms, serde_json::json!({ "id": id }))
}

/// Отдаёт заранее заданные ответы по очереди; после конца сценария
/// возвращает пустые batch'и.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Vec<Item>, AdapterError>>>,
    limits: Mutex<Vec<usize>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<Vec<Item>, AdapterError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            limits: Mutex::new(Vec::new()),
        }
    }

    pub fn requested_limits(&self) -> Vec<usize> {
        self.limits.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

impl PollSource for ScriptedSource {
    fn poll(&self, limit: usize) -> Pin<Box<dyn Future<Output = Result<Vec<Item>, AdapterError>> + Send + '_>> {
        self.limits.lock().unwrap().push(limit);
        let next = self.script.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()));
        Box::pin(async move { next })
    }

    fn describe(&self) -> String {
        "scripted".into()
    }
}

/// Запоминает принятые и все попытки; отклоняет заданные ids.
#[derive(Default)]
pub struct RecordingSink {
    accepted: Mutex<Vec<String>>,
    attempts: Mutex<Vec<String>>,
    fail: HashSet<String>,
    flushed: Mutex<usize>,
}

impl RecordingSink {
    pub fn failing_on(ids: &[&str]) -> Self {
        Self {
            fail: ids.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.accepted.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn flushes(&self) -> usize {
        *self.flushed.lock().unwrap()
    }
}

impl ItemSink for RecordingSink {
    fn emit<'a>(&'a self, item: &'a Item) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + 'a>> {
        Box::pin(async move {
            self.attempts.lock().unwrap().push(item.id.clone());
            if self.fail.contains(&item.id) {
                return Err(AdapterError::io(format!("rejected {}", item.id)));
            }
            self.accepted.lock().unwrap().push(item.id.clone());
            Ok(())
        })
    }

    fn flush(&self) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>> {
        Box::pin(async move {
            *self.flushed.lock().unwrap() += 1;
            Ok(())
        })
    }
}
