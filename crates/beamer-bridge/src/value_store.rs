//! Observable register of normalized values.
//!
//! [`ValueStore`] holds one normalized value per key and notifies only the
//! observers of a key when that key's value actually changes. It backs the
//! parameter values (keyed by [`ParameterId`]) and the engine's control
//! values (keyed by [`ControlTag`]).
//!
//! # Change detection
//!
//! A write whose clamped value is bit-identical to the stored one is a
//! no-op: nothing is stored and nobody is notified. Every fan-out decision
//! downstream relies on this.
//!
//! # Batches
//!
//! [`ValueStore::set_many`] writes every entry before notifying anyone, so
//! an observer reading other keys from its callback always sees the whole
//! batch applied.

use std::cell::RefCell;
use std::collections::HashSet;
use std::hash::Hash;

use beamer_bridge_core::{
    clamp_normalized, ControlTag, NormalizedValue, ParameterId, MAX_PARAMETER_COUNT,
};

use crate::subscription::{Subscribers, Subscription};

/// Upper bound on the number of slots a store will allocate.
///
/// Keys beyond this bound are ignored with a warning instead of letting a
/// corrupt id allocate gigabytes. Parameter tables reject ids at or above
/// the same bound, so every declared parameter has a slot.
pub const MAX_STORE_CAPACITY: usize = MAX_PARAMETER_COUNT;

/// Key types usable in a [`ValueStore`].
pub trait StoreKey: Copy + Eq + Hash + std::fmt::Debug + 'static {
    /// Dense slot index, or `None` if the key has no slot.
    fn slot(self) -> Option<usize>;
}

impl StoreKey for ParameterId {
    #[inline]
    fn slot(self) -> Option<usize> {
        Some(self as usize)
    }
}

impl StoreKey for ControlTag {
    #[inline]
    fn slot(self) -> Option<usize> {
        usize::try_from(self).ok()
    }
}

/// Observable per-key register of normalized values.
pub struct ValueStore<K: StoreKey = ParameterId> {
    values: RefCell<Vec<NormalizedValue>>,
    subscribers: Subscribers<K, NormalizedValue>,
}

impl<K: StoreKey> ValueStore<K> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a store with `capacity` zeroed slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: RefCell::new(vec![0.0; capacity.min(MAX_STORE_CAPACITY)]),
            subscribers: Subscribers::new(),
        }
    }

    /// Number of allocated slots.
    pub fn capacity(&self) -> usize {
        self.values.borrow().len()
    }

    /// Write startup values without notifying anyone.
    pub fn initialize(&self, defaults: impl IntoIterator<Item = (K, NormalizedValue)>) {
        let mut values = self.values.borrow_mut();
        for (key, value) in defaults {
            if let Some(index) = Self::slot_for(&mut values, key) {
                values[index] = clamp_normalized(value);
            }
        }
    }

    /// Current value of `key`, 0.0 if it was never written.
    pub fn get(&self, key: K) -> NormalizedValue {
        key.slot()
            .and_then(|index| self.values.borrow().get(index).copied())
            .unwrap_or(0.0)
    }

    /// Store a value and notify the key's observers if it changed.
    ///
    /// Returns whether the stored value changed.
    pub fn set(&self, key: K, value: NormalizedValue) -> bool {
        let value = clamp_normalized(value);
        {
            let mut values = self.values.borrow_mut();
            let Some(index) = Self::slot_for(&mut values, key) else {
                return false;
            };
            if values[index].to_bits() == value.to_bits() {
                return false;
            }
            values[index] = value;
        }
        self.subscribers.notify(&key, &value);
        true
    }

    /// Apply a batch of writes, then notify.
    ///
    /// Every entry is stored before the first callback runs. If a key occurs
    /// more than once the last write wins. A key rewritten by an earlier
    /// callback of the same batch is not notified again with the batch value.
    /// Returns the keys whose value changed, in first-seen order.
    pub fn set_many(&self, entries: impl IntoIterator<Item = (K, NormalizedValue)>) -> Vec<K> {
        let mut touched: Vec<(K, u64)> = Vec::new();
        let mut seen: HashSet<K> = HashSet::new();

        {
            let mut values = self.values.borrow_mut();
            for (key, value) in entries {
                let Some(index) = Self::slot_for(&mut values, key) else {
                    continue;
                };
                if seen.insert(key) {
                    touched.push((key, values[index].to_bits()));
                }
                values[index] = clamp_normalized(value);
            }
        }

        let changed: Vec<(K, NormalizedValue)> = touched
            .into_iter()
            .filter_map(|(key, original)| {
                let current = self.get(key);
                (current.to_bits() != original).then_some((key, current))
            })
            .collect();

        for (key, value) in &changed {
            // Rewritten by an earlier callback, which already notified
            if self.get(*key).to_bits() != value.to_bits() {
                continue;
            }
            self.subscribers.notify(key, value);
        }
        changed.into_iter().map(|(key, _)| key).collect()
    }

    /// Observe changes of `key`.
    pub fn subscribe(&self, key: K, callback: impl Fn(&NormalizedValue) + 'static) -> Subscription {
        self.subscribers.subscribe(key, callback)
    }

    /// Whether anyone currently observes `key`.
    pub fn is_observed(&self, key: K) -> bool {
        self.subscribers.is_observed(&key)
    }

    /// Resolve the slot for `key`, growing the backing storage if needed.
    fn slot_for(values: &mut Vec<NormalizedValue>, key: K) -> Option<usize> {
        let Some(index) = key.slot() else {
            log::debug!("Ignoring write to unslotted key {:?}", key);
            return None;
        };
        if index >= MAX_STORE_CAPACITY {
            log::warn!(
                "Ignoring write to key {:?}: beyond store capacity {}",
                key,
                MAX_STORE_CAPACITY
            );
            return None;
        }
        if index >= values.len() {
            let grown = (values.len() * 2).max(index + 1).min(MAX_STORE_CAPACITY);
            values.resize(grown, 0.0);
        }
        Some(index)
    }
}

impl<K: StoreKey> Default for ValueStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: StoreKey> std::fmt::Debug for ValueStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueStore")
            .field("capacity", &self.capacity())
            .finish()
    }
}
