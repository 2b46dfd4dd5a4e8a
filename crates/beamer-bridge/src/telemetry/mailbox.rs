//! Tagged mailbox for telemetry the bridge does not model itself.
//!
//! Spectra, envelope followers and custom scopes all arrive as opaque byte
//! buffers; the mailbox keeps the latest one per tag and leaves decoding to
//! the observer.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::subscription::{Subscribers, Subscription};

/// Latest opaque buffer per tag.
#[derive(Default)]
pub struct Mailbox {
    messages: RefCell<HashMap<i32, Rc<[u8]>>>,
    subscribers: Subscribers<i32, [u8]>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a buffer and notify the tag's observers.
    pub fn set(&self, tag: i32, data: impl Into<Rc<[u8]>>) {
        let data: Rc<[u8]> = data.into();
        self.messages.borrow_mut().insert(tag, Rc::clone(&data));
        self.subscribers.notify(&tag, &data);
    }

    /// Latest buffer for a tag.
    pub fn get(&self, tag: i32) -> Option<Rc<[u8]>> {
        self.messages.borrow().get(&tag).cloned()
    }

    /// Observe one tag.
    pub fn subscribe(&self, tag: i32, callback: impl Fn(&[u8]) + 'static) -> Subscription {
        self.subscribers.subscribe(tag, callback)
    }
}
