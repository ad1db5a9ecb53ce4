use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

use crate::error::ConfigError;

/// Множество идентификаторов фиксированной ёмкости с FIFO-вытеснением.
///
/// Элементы вставляются один раз в хронологическом порядке и больше не
/// «трогаются», поэтому порядок вставки совпадает с порядком давности и
/// LRU ничего не дал бы. `len() ≤ capacity` всегда.
#[derive(Debug, Clone)]
pub struct BoundedHistory<K> {
    order: VecDeque<K>,
    members: HashSet<K>,
    capacity: usize,
}

impl<K: Eq + Hash + Clone> BoundedHistory<K> {
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity < 1 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(Self {
            order: VecDeque::with_capacity(capacity.min(65536)),
            members: HashSet::with_capacity(capacity.min(65536)),
            capacity,
        })
    }

    pub fn contains(&self, id: &K) -> bool {
        self.members.contains(id)
    }

    /// Вставить один id. Повторная вставка не меняет его позицию.
    /// Возвращает вытесненный id, если он был.
    pub fn insert(&mut self, id: K) -> Option<K> {
        if !self.members.insert(id.clone()) {
            return None;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity {
            let evicted = self.order.pop_front()?;
            self.members.remove(&evicted);
            return Some(evicted);
        }
        None
    }

    /// Вставить ids в заданном порядке. Возвращает число вытесненных.
    pub fn insert_all<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = K>,
    {
        ids.into_iter()
            .filter_map(|id| self.insert(id))
            .count()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
