//! Observable stores for engine telemetry.
//!
//! - [`MeterStore`] - Peak/RMS pairs, one store per meter stream
//! - [`WaveformStore`] - Latest sample buffer per stream
//! - [`MidiNoteStore`] - Active-note set
//! - [`Mailbox`] - Opaque buffers for everything else
//!
//! Streams are created lazily on their first message and overwritten in
//! place afterwards.

pub mod mailbox;
pub mod meter;
pub mod midi;
pub mod waveform;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use beamer_bridge_core::ControlTag;

pub use mailbox::Mailbox;
pub use meter::{Channel, MeterReading, MeterStore};
pub use midi::{MidiNote, MidiNoteStore, NoteEvent};
pub use waveform::{SampleBuffer, WaveformStore};

/// All telemetry stores of one bridge.
#[derive(Default)]
pub struct Telemetry {
    meters: RefCell<HashMap<ControlTag, Rc<MeterStore>>>,
    waveforms: WaveformStore,
    notes: MidiNoteStore,
    mailbox: Mailbox,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Meter store for a stream, created on first use.
    pub fn meter(&self, ctrl_tag: ControlTag) -> Rc<MeterStore> {
        let mut meters = self.meters.borrow_mut();
        let store = meters.entry(ctrl_tag).or_insert_with(|| {
            log::debug!("Created meter stream for control tag {}", ctrl_tag);
            Rc::new(MeterStore::new())
        });
        Rc::clone(store)
    }

    /// Sample-buffer streams.
    pub fn waveforms(&self) -> &WaveformStore {
        &self.waveforms
    }

    /// Active MIDI notes.
    pub fn notes(&self) -> &MidiNoteStore {
        &self.notes
    }

    /// Opaque tagged buffers.
    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }
}
