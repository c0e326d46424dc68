//! Client-side mirror of subscribed tables.
//!
//! The connection layer feeds row inserts, updates and deletes into a
//! `TableCache`; UI state reads rows by primary key and listens for changes.
//! Subscriptions themselves are opened through the `TableSubscriber` port.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

use crate::remote::{ListenerId, ListenerSet};

pub trait TableRow: Clone + Send + 'static {
    type Key: Eq + Hash + Clone + Send + std::fmt::Debug;

    fn primary_key(&self) -> Self::Key;
}

#[derive(Clone, Debug, PartialEq)]
pub enum RowChange<R> {
    Inserted(R),
    Updated { old: R, new: R },
    Deleted(R),
}

impl<R> RowChange<R> {
    /// The row as it stands after the change (the removed row for deletes).
    pub fn row(&self) -> &R {
        match self {
            RowChange::Inserted(r) | RowChange::Deleted(r) => r,
            RowChange::Updated { new, .. } => new,
        }
    }
}

pub type RowListener<R> = Box<dyn FnMut(&RowChange<R>) + Send>;

pub struct TableCache<R: TableRow> {
    rows: Mutex<HashMap<R::Key, R>>,
    listeners: Mutex<ListenerSet<RowListener<R>>>,
}

impl<R: TableRow> Default for TableCache<R> {
    fn default() -> Self {
        TableCache { rows: Mutex::new(HashMap::new()), listeners: Mutex::new(ListenerSet::default()) }
    }
}

impl<R: TableRow> TableCache<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, key: &R::Key) -> Option<R> {
        self.rows.lock().ok().and_then(|rows| rows.get(key).cloned())
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies an insert or update coming from the store.
    pub fn upsert(&self, row: R) {
        let previous = match self.rows.lock() {
            Ok(mut rows) => rows.insert(row.primary_key(), row.clone()),
            Err(_) => return,
        };
        let change = match previous {
            Some(old) => RowChange::Updated { old, new: row },
            None => RowChange::Inserted(row),
        };
        self.notify(&change);
    }

    /// Stands in for an update whose change notification never arrived.
    #[cfg(test)]
    pub(crate) fn upsert_without_notifying(&self, row: R) {
        if let Ok(mut rows) = self.rows.lock() {
            rows.insert(row.primary_key(), row);
        }
    }

    /// Applies a delete coming from the store. Unknown keys are ignored.
    pub fn delete(&self, key: &R::Key) {
        let removed = match self.rows.lock() {
            Ok(mut rows) => rows.remove(key),
            Err(_) => return,
        };
        if let Some(row) = removed {
            self.notify(&RowChange::Deleted(row));
        }
    }

    pub fn on_change(&self, listener: RowListener<R>) -> ListenerId {
        let id = ListenerId::next();
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.insert(id, listener);
        }
        id
    }

    /// Safe to call from inside a listener, including for itself.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        match self.listeners.lock() {
            Ok(mut listeners) => listeners.remove(id),
            Err(_) => false,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Listeners run outside the lock so they may register or remove others.
    fn notify(&self, change: &RowChange<R>) {
        let taken = match self.listeners.lock() {
            Ok(mut listeners) => listeners.take_matching(|_| true),
            Err(_) => return,
        };
        let delivered: Vec<_> = taken
            .into_iter()
            .map(|(id, mut listener)| {
                listener(change);
                (id, Some(listener))
            })
            .collect();
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.restore(delivered);
        }
    }
}

/// Opens filtered subscriptions on the remote store.
pub trait TableSubscriber: Send + Sync {
    fn subscribe(&self, query: &str) -> Box<dyn SubscriptionHandle>;
}

pub trait SubscriptionHandle: Send {
    fn unsubscribe(self: Box<Self>);
}
