//! Active-note tracking for the on-screen keyboard.
//!
//! [`MidiNoteStore`] parses raw MIDI 1.0 channel messages and maintains the
//! set of sounding notes. Observers are only notified when that set (or a
//! held note's velocity) actually changes, so unrelated MIDI traffic never
//! reaches the keyboard display.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::subscription::{Subscribers, Subscription};

/// Note-off status (high nibble).
pub const NOTE_OFF: u8 = 0x80;
/// Note-on status (high nibble).
pub const NOTE_ON: u8 = 0x90;

/// A sounding note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MidiNote {
    /// Note number (0-127, where 60 = middle C).
    pub note_number: u8,
    /// Velocity (1-127).
    pub velocity: u8,
}

/// Change to the active-note set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEvent {
    /// A note started, or a held note changed velocity.
    On(MidiNote),
    /// A held note was released.
    Off(u8),
}

impl NoteEvent {
    /// Note number the event refers to.
    pub fn note_number(&self) -> u8 {
        match self {
            NoteEvent::On(note) => note.note_number,
            NoteEvent::Off(note_number) => *note_number,
        }
    }
}

/// Active-note set with change-gated notification.
#[derive(Default)]
pub struct MidiNoteStore {
    active: RefCell<BTreeMap<u8, u8>>,
    subscribers: Subscribers<(), NoteEvent>,
}

impl MidiNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one MIDI message.
    ///
    /// Note-on with velocity > 0 starts a note, note-off (any velocity) or
    /// note-on with velocity 0 ends one. Everything else is ignored. Returns
    /// the event observers were notified with, if any.
    pub fn handle_message(&self, status: u8, data1: u8, data2: u8) -> Option<NoteEvent> {
        let note_number = data1 & 0x7F;
        let velocity = data2 & 0x7F;

        let event = match status & 0xF0 {
            NOTE_ON if velocity > 0 => self.note_on(note_number, velocity),
            NOTE_ON | NOTE_OFF => self.note_off(note_number),
            _ => None,
        }?;

        self.subscribers.notify(&(), &event);
        Some(event)
    }

    fn note_on(&self, note_number: u8, velocity: u8) -> Option<NoteEvent> {
        let previous = self.active.borrow_mut().insert(note_number, velocity);
        if previous == Some(velocity) {
            return None;
        }
        Some(NoteEvent::On(MidiNote {
            note_number,
            velocity,
        }))
    }

    fn note_off(&self, note_number: u8) -> Option<NoteEvent> {
        self.active
            .borrow_mut()
            .remove(&note_number)
            .map(|_| NoteEvent::Off(note_number))
    }

    /// Whether a note is sounding.
    pub fn is_active(&self, note_number: u8) -> bool {
        self.active.borrow().contains_key(&note_number)
    }

    /// Sounding notes, lowest first.
    pub fn active_notes(&self) -> Vec<MidiNote> {
        self.active
            .borrow()
            .iter()
            .map(|(&note_number, &velocity)| MidiNote {
                note_number,
                velocity,
            })
            .collect()
    }

    /// Observe changes to the active-note set.
    pub fn subscribe(&self, callback: impl Fn(&NoteEvent) + 'static) -> Subscription {
        self.subscribers.subscribe((), callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counted(store: &MidiNoteStore) -> (Rc<Cell<usize>>, Subscription) {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let sub = store.subscribe(move |_| h.set(h.get() + 1));
        (hits, sub)
    }

    #[test]
    fn test_repeated_note_on_notifies_once() {
        let store = MidiNoteStore::new();
        let (hits, _sub) = counted(&store);

        store.handle_message(0x90, 60, 100);
        store.handle_message(0x90, 60, 100);
        assert_eq!(hits.get(), 1);
        assert!(store.is_active(60));
    }

    #[test]
    fn test_velocity_change_notifies() {
        let store = MidiNoteStore::new();
        let (hits, _sub) = counted(&store);

        store.handle_message(0x90, 60, 100);
        let event = store.handle_message(0x90, 60, 64);
        assert_eq!(hits.get(), 2);
        assert_eq!(
            event,
            Some(NoteEvent::On(MidiNote {
                note_number: 60,
                velocity: 64
            }))
        );
    }

    #[test]
    fn test_note_off_for_inactive_note_is_silent() {
        let store = MidiNoteStore::new();
        let (hits, _sub) = counted(&store);

        assert_eq!(store.handle_message(0x80, 61, 0), None);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_note_on_velocity_zero_is_note_off() {
        let store = MidiNoteStore::new();
        store.handle_message(0x90, 64, 90);
        let event = store.handle_message(0x90, 64, 0);
        assert_eq!(event, Some(NoteEvent::Off(64)));
        assert!(!store.is_active(64));
    }

    #[test]
    fn test_channel_nibble_is_ignored() {
        let store = MidiNoteStore::new();
        store.handle_message(0x93, 48, 80);
        assert!(store.is_active(48));
        store.handle_message(0x8F, 48, 12);
        assert!(!store.is_active(48));
    }

    #[test]
    fn test_other_messages_are_ignored() {
        let store = MidiNoteStore::new();
        let (hits, _sub) = counted(&store);

        store.handle_message(0xB0, 1, 64); // mod wheel
        store.handle_message(0xE0, 0, 64); // pitch bend
        store.handle_message(0xA0, 60, 30); // poly pressure
        assert_eq!(hits.get(), 0);
        assert!(store.active_notes().is_empty());
    }

    #[test]
    fn test_active_notes_sorted() {
        let store = MidiNoteStore::new();
        store.handle_message(0x90, 67, 10);
        store.handle_message(0x90, 60, 20);
        let notes: Vec<u8> = store.active_notes().iter().map(|n| n.note_number).collect();
        assert_eq!(notes, vec![60, 67]);
    }
}
