//! Stereo peak/RMS meter store.

use std::cell::RefCell;

use crate::codec::MeterFrame;
use crate::subscription::{Subscribers, Subscription};

/// Meter channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Channel {
    #[default]
    Left = 0,
    Right = 1,
}

impl Channel {
    /// Channel for a wire index (0 = left, 1 = right).
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Left),
            1 => Some(Self::Right),
            _ => None,
        }
    }

    #[inline]
    fn slot(self) -> usize {
        self as usize
    }
}

/// One channel's meter values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeterReading {
    pub channel: Channel,
    /// Peak level, never negative.
    pub peak: f32,
    /// RMS level, never negative.
    pub rms: f32,
}

impl MeterReading {
    /// Create a reading. Negative and NaN levels read as 0.
    pub fn new(channel: Channel, peak: f32, rms: f32) -> Self {
        Self {
            channel,
            peak: sanitize_level(peak),
            rms: sanitize_level(rms),
        }
    }

    fn same_levels(&self, other: &Self) -> bool {
        self.peak.to_bits() == other.peak.to_bits() && self.rms.to_bits() == other.rms.to_bits()
    }
}

#[inline]
fn sanitize_level(level: f32) -> f32 {
    if level.is_nan() || level <= 0.0 {
        0.0
    } else {
        level
    }
}

/// Latest readings of one stereo meter stream.
///
/// Observers subscribe per channel: a left-channel update never reaches
/// right-channel observers.
pub struct MeterStore {
    readings: RefCell<[MeterReading; 2]>,
    subscribers: Subscribers<Channel, MeterReading>,
}

impl MeterStore {
    /// Create a store reading silence on both channels.
    pub fn new() -> Self {
        Self {
            readings: RefCell::new([
                MeterReading::new(Channel::Left, 0.0, 0.0),
                MeterReading::new(Channel::Right, 0.0, 0.0),
            ]),
            subscribers: Subscribers::new(),
        }
    }

    /// Store a channel's levels. Returns whether they changed.
    pub fn update(&self, channel: Channel, peak: f32, rms: f32) -> bool {
        let reading = MeterReading::new(channel, peak, rms);
        {
            let mut readings = self.readings.borrow_mut();
            let slot = &mut readings[channel.slot()];
            if slot.same_levels(&reading) {
                return false;
            }
            *slot = reading;
        }
        self.subscribers.notify(&channel, &reading);
        true
    }

    /// Apply both channels of a decoded frame.
    pub fn apply_frame(&self, frame: &MeterFrame) {
        for reading in frame.readings() {
            self.update(reading.channel, reading.peak, reading.rms);
        }
    }

    /// Latest reading of a channel.
    pub fn get(&self, channel: Channel) -> MeterReading {
        self.readings.borrow()[channel.slot()]
    }

    /// Observe one channel.
    pub fn subscribe(
        &self,
        channel: Channel,
        callback: impl Fn(&MeterReading) + 'static,
    ) -> Subscription {
        self.subscribers.subscribe(channel, callback)
    }
}

impl Default for MeterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_channel_isolation() {
        let store = MeterStore::new();
        let left = Rc::new(Cell::new(0));
        let right = Rc::new(Cell::new(0));

        let l = Rc::clone(&left);
        let _l = store.subscribe(Channel::Left, move |_| l.set(l.get() + 1));
        let r = Rc::clone(&right);
        let _r = store.subscribe(Channel::Right, move |_| r.set(r.get() + 1));

        assert!(store.update(Channel::Left, 0.9, 0.4));
        assert_eq!(left.get(), 1);
        assert_eq!(right.get(), 0);
        assert_eq!(store.get(Channel::Left).peak, 0.9);
        assert_eq!(store.get(Channel::Right).peak, 0.0);
    }

    #[test]
    fn test_identical_update_is_silent() {
        let store = MeterStore::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let _sub = store.subscribe(Channel::Right, move |_| h.set(h.get() + 1));

        store.update(Channel::Right, 0.5, 0.25);
        store.update(Channel::Right, 0.5, 0.25);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_apply_frame() {
        let store = MeterStore::new();
        store.apply_frame(&MeterFrame {
            left_peak: 1.0,
            left_rms: 0.5,
            right_peak: 0.8,
            right_rms: 0.4,
        });
        assert_eq!(
            store.get(Channel::Left),
            MeterReading::new(Channel::Left, 1.0, 0.5)
        );
        assert_eq!(
            store.get(Channel::Right),
            MeterReading::new(Channel::Right, 0.8, 0.4)
        );
    }

    #[test]
    fn test_negative_levels_read_zero() {
        let reading = MeterReading::new(Channel::Left, -1.0, f32::NAN);
        assert_eq!(reading.peak, 0.0);
        assert_eq!(reading.rms, 0.0);
        assert_eq!(Channel::from_index(1), Some(Channel::Right));
        assert_eq!(Channel::from_index(2), None);
    }
}
