//! Keyed subscriber lists shared by every observable store.
//!
//! A [`Subscribers`] registry maps a key (parameter id, channel, control tag)
//! to the callbacks observing it. Notifying key `K` only ever touches `K`'s
//! callbacks.
//!
//! Callbacks run outside of any internal borrow: [`Subscribers::notify`]
//! snapshots the callback list first, so a callback may subscribe,
//! unsubscribe or write back into the store that is notifying it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::{Rc, Weak};

/// Shared callback type.
pub type Callback<V> = Rc<dyn Fn(&V)>;

struct Registry<K, V: ?Sized> {
    next_id: u64,
    listeners: HashMap<K, Vec<(u64, Callback<V>)>>,
}

impl<K: Eq + Hash, V: ?Sized> Registry<K, V> {
    fn remove(&mut self, key: &K, id: u64) {
        if let Some(list) = self.listeners.get_mut(key) {
            list.retain(|(listener, _)| *listener != id);
            if list.is_empty() {
                self.listeners.remove(key);
            }
        }
    }
}

/// Per-key subscriber registry.
pub struct Subscribers<K, V: ?Sized> {
    registry: Rc<RefCell<Registry<K, V>>>,
}

impl<K, V> Subscribers<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: ?Sized + 'static,
{
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                listeners: HashMap::new(),
            })),
        }
    }

    /// Register `callback` for `key`.
    ///
    /// The callback stays registered until the returned [`Subscription`] is
    /// dropped or [`Subscription::unsubscribe`] is called.
    pub fn subscribe(&self, key: K, callback: impl Fn(&V) + 'static) -> Subscription {
        let callback: Callback<V> = Rc::new(callback);
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry
                .listeners
                .entry(key.clone())
                .or_default()
                .push((id, callback));
            id
        };

        let weak: Weak<RefCell<Registry<K, V>>> = Rc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = weak.upgrade() {
                registry.borrow_mut().remove(&key, id);
            }
        })
    }

    /// Invoke every callback registered for `key`.
    ///
    /// Callbacks registered while notifying are not called for this value.
    pub fn notify(&self, key: &K, value: &V) {
        for callback in self.snapshot(key) {
            callback(value);
        }
    }

    /// Number of callbacks registered for `key`.
    pub fn count(&self, key: &K) -> usize {
        self.registry
            .borrow()
            .listeners
            .get(key)
            .map_or(0, Vec::len)
    }

    /// Whether anyone observes `key`.
    pub fn is_observed(&self, key: &K) -> bool {
        self.count(key) > 0
    }

    fn snapshot(&self, key: &K) -> Vec<Callback<V>> {
        self.registry
            .borrow()
            .listeners
            .get(key)
            .map(|list| list.iter().map(|(_, callback)| Rc::clone(callback)).collect())
            .unwrap_or_default()
    }
}

impl<K, V> Default for Subscribers<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: ?Sized + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a registered callback.
///
/// Dropping the handle unsubscribes. Call [`Subscription::detach`] to keep
/// the callback registered for the lifetime of the store.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Remove the callback now.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Keep the callback registered and drop the handle.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
