//! Latest sample buffer per stream (oscilloscope, LFO display).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use beamer_bridge_core::ControlTag;

use crate::subscription::{Subscribers, Subscription};

/// One buffer of samples received for a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    pub ctrl_tag: ControlTag,
    pub samples: Vec<f32>,
    /// When the buffer was stored.
    pub timestamp: Instant,
}

/// Keeps only the newest buffer of each stream; there is no history.
#[derive(Default)]
pub struct WaveformStore {
    buffers: RefCell<HashMap<ControlTag, Rc<SampleBuffer>>>,
    subscribers: Subscribers<ControlTag, SampleBuffer>,
}

impl WaveformStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stream's buffer and notify its observers.
    pub fn update(&self, ctrl_tag: ControlTag, samples: Vec<f32>) {
        let buffer = Rc::new(SampleBuffer {
            ctrl_tag,
            samples,
            timestamp: Instant::now(),
        });
        self.buffers
            .borrow_mut()
            .insert(ctrl_tag, Rc::clone(&buffer));
        self.subscribers.notify(&ctrl_tag, &buffer);
    }

    /// Newest buffer of a stream.
    pub fn latest(&self, ctrl_tag: ControlTag) -> Option<Rc<SampleBuffer>> {
        self.buffers.borrow().get(&ctrl_tag).cloned()
    }

    /// Observe one stream.
    pub fn subscribe(
        &self,
        ctrl_tag: ControlTag,
        callback: impl Fn(&SampleBuffer) + 'static,
    ) -> Subscription {
        self.subscribers.subscribe(ctrl_tag, callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_keeps_latest_only() {
        let store = WaveformStore::new();
        store.update(4, vec![0.0, 1.0]);
        store.update(4, vec![0.5]);
        let latest = store.latest(4).unwrap();
        assert_eq!(latest.samples, vec![0.5]);
        assert_eq!(latest.ctrl_tag, 4);
        assert!(store.latest(5).is_none());
    }

    #[test]
    fn test_per_tag_subscription() {
        let store = WaveformStore::new();
        let lengths = Rc::new(Cell::new(0));
        let l = Rc::clone(&lengths);
        let _sub = store.subscribe(1, move |buffer| l.set(buffer.samples.len()));

        store.update(2, vec![0.0; 8]);
        assert_eq!(lengths.get(), 0);
        store.update(1, vec![0.0; 64]);
        assert_eq!(lengths.get(), 64);
    }
}
