//! Two-list picker state used when building a worksheet: request items move
//! between "available" and "selected".
//!
//! Items keep their relative order in both lists. An item removed from the
//! selection returns to its original place among the available items, and no
//! item is ever in both lists.

use payloads::{TestRequestItemId, responses::TestRequestItem};

/// Items with a stable identity.
pub trait Transferable: Clone {
    type Key: Clone + PartialEq;

    fn key(&self) -> Self::Key;
}

impl Transferable for TestRequestItem {
    type Key = TestRequestItemId;

    fn key(&self) -> TestRequestItemId {
        self.uuid
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferList<T: Transferable> {
    available: Vec<T>,
    selected: Vec<T>,
    /// Keys in the order items were first offered; restores positions.
    order: Vec<T::Key>,
    checked_available: Vec<T::Key>,
    checked_selected: Vec<T::Key>,
}

impl<T: Transferable> TransferList<T> {
    /// Anything in `selected` is left out of the available list.
    pub fn new(available: Vec<T>, selected: Vec<T>) -> Self {
        let mut order: Vec<T::Key> = Vec::new();
        for item in available.iter().chain(&selected) {
            let key = item.key();
            if !order.contains(&key) {
                order.push(key);
            }
        }
        let mut deduped: Vec<T> = Vec::with_capacity(selected.len());
        for item in selected {
            if !deduped.iter().any(|s| s.key() == item.key()) {
                deduped.push(item);
            }
        }
        let available = available
            .into_iter()
            .filter(|item| !deduped.iter().any(|s| s.key() == item.key()))
            .collect();
        Self {
            available,
            selected: deduped,
            order,
            checked_available: Vec::new(),
            checked_selected: Vec::new(),
        }
    }

    pub fn available(&self) -> &[T] {
        &self.available
    }

    pub fn selected(&self) -> &[T] {
        &self.selected
    }

    pub fn selected_keys(&self) -> Vec<T::Key> {
        self.selected.iter().map(Transferable::key).collect()
    }

    pub fn is_checked(&self, key: &T::Key) -> bool {
        self.checked_available.contains(key) || self.checked_selected.contains(key)
    }

    /// Toggle the check mark on an item in either list.
    pub fn toggle(&mut self, key: &T::Key) {
        if self.available.iter().any(|item| &item.key() == key) {
            toggle_in(&mut self.checked_available, key);
        } else if self.selected.iter().any(|item| &item.key() == key) {
            toggle_in(&mut self.checked_selected, key);
        }
    }

    /// Move the checked available items to the end of the selection.
    pub fn move_checked(&mut self) {
        let checked = std::mem::take(&mut self.checked_available);
        let (moving, staying): (Vec<T>, Vec<T>) =
            std::mem::take(&mut self.available)
                .into_iter()
                .partition(|item| checked.contains(&item.key()));
        self.available = staying;
        self.selected.extend(moving);
    }

    pub fn move_all(&mut self) {
        self.checked_available.clear();
        let moving = std::mem::take(&mut self.available);
        self.selected.extend(moving);
    }

    /// Return the checked selected items to the available list.
    pub fn remove_checked(&mut self) {
        let checked = std::mem::take(&mut self.checked_selected);
        let (returning, staying): (Vec<T>, Vec<T>) =
            std::mem::take(&mut self.selected)
                .into_iter()
                .partition(|item| checked.contains(&item.key()));
        self.selected = staying;
        self.restore(returning);
    }

    pub fn remove_all(&mut self) {
        self.checked_selected.clear();
        let returning = std::mem::take(&mut self.selected);
        self.restore(returning);
    }

    fn restore(&mut self, items: Vec<T>) {
        self.available.extend(items);
        let position = |item: &T| {
            let key = item.key();
            self.order
                .iter()
                .position(|k| *k == key)
                .unwrap_or(usize::MAX)
        };
        let mut indexed: Vec<(usize, T)> = std::mem::take(&mut self.available)
            .into_iter()
            .map(|item| (position(&item), item))
            .collect();
        indexed.sort_by_key(|(index, _)| *index);
        self.available = indexed.into_iter().map(|(_, item)| item).collect();
    }
}

fn toggle_in<K: PartialEq + Clone>(keys: &mut Vec<K>, key: &K) {
    match keys.iter().position(|k| k == key) {
        Some(index) => {
            keys.remove(index);
        }
        None => keys.push(key.clone()),
    }
}
