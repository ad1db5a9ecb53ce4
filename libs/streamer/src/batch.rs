use std::collections::HashSet;

use feed_api::Item;

use crate::history::BoundedHistory;

/// Результат одного poll'а, уникальный по `id`.
///
/// Порядок источника (от новых к старым) сохраняется; при повторе `id`
/// внутри batch остаётся первое вхождение — различия payload между
/// снимками одного объекта не значимы.
#[derive(Debug, Clone, Default)]
pub struct PollBatch {
    items: Vec<Item>,
    duplicates: usize,
    truncated: usize,
}

impl PollBatch {
    /// Нормализовать сырой ответ источника. Всё, что сверх `limit`,
    /// отбрасывается: batch не может превышать ёмкость history.
    pub fn normalize(mut raw: Vec<Item>, limit: usize) -> Self {
        let truncated = raw.len().saturating_sub(limit);
        raw.truncate(limit);

        let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());
        let mut items = Vec::with_capacity(raw.len());
        let mut duplicates = 0;
        for item in raw {
            if seen.insert(item.id.clone()) {
                items.push(item);
            } else {
                duplicates += 1;
            }
        }

        Self { items, duplicates, truncated }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Сколько повторов `id` схлопнуто.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Сколько элементов сверх лимита отброшено.
    pub fn truncated(&self) -> usize {
        self.truncated
    }

    /// Элементы, которых нет в history, по возрастанию `created_ms`.
    /// Сортировка стабильная: при равных временах сохраняется порядок batch.
    pub fn fresh(&self, history: &BoundedHistory<String>) -> Vec<Item> {
        let mut fresh: Vec<Item> = self
            .items
            .iter()
            .filter(|item| !history.contains(&item.id))
            .cloned()
            .collect();
        fresh.sort_by_key(|item| item.created_ms);
        fresh
    }

    /// Все элементы от старых к новым (для priming).
    pub fn into_chronological(self) -> Vec<Item> {
        let mut items = self.items;
        items.sort_by_key(|item| item.created_ms);
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(id: &str, created_ms: i64) -> Item {
        Item::new(id, created_ms, json!({ "id": id }))
    }

    #[test]
    fn collapses_duplicate_ids_keeping_first() {
        let raw = vec![
            Item::new("b", 2, json!({ "rev": 2 })),
            item("a", 1),
            Item::new("b", 2, json!({ "rev": 1 })),
        ];
        let batch = PollBatch::normalize(raw, 10);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.duplicates(), 1);
        assert_eq!(batch.items()[0].payload["rev"], 2);
    }

    #[test]
    fn truncates_to_limit() {
        let raw = vec![item("c", 3), item("b", 2), item("a", 1)];
        let batch = PollBatch::normalize(raw, 2);
        assert_eq!(batch.truncated(), 1);
        let ids: Vec<_> = batch.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["c", "b"]);
    }

    #[test]
    fn fresh_is_filtered_and_chronological() {
        let mut history = BoundedHistory::new(10).unwrap();
        history.insert("b".to_string());
        let raw = vec![item("d", 40), item("c", 30), item("b", 20), item("a", 10)];
        let batch = PollBatch::normalize(raw, 10);
        let ids: Vec<_> = batch.fresh(&history).into_iter().map(|i| i.id).collect();
        assert_eq!(ids, ["a", "c", "d"]);
    }

    #[test]
    fn fresh_ties_keep_batch_order() {
        let history = BoundedHistory::new(10).unwrap();
        let raw = vec![item("y", 5), item("x", 5), item("w", 1)];
        let batch = PollBatch::normalize(raw, 10);
        let ids: Vec<_> = batch.fresh(&history).into_iter().map(|i| i.id).collect();
        assert_eq!(ids, ["w", "y", "x"]);
    }

    #[test]
    fn chronological_reverses_newest_first() {
        let batch = PollBatch::normalize(vec![item("c", 3), item("b", 2), item("a", 1)], 3);
        let ids: Vec<_> = batch.into_chronological().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
