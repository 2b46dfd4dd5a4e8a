//! # beamer-bridge
//!
//! Parameter and telemetry bridge between a DSP engine and a WebView UI.
//!
//! The engine owns the audio state; the UI mirrors it. This crate keeps the
//! mirror consistent in both directions without feedback loops: user edits
//! are written locally and forwarded to the engine, engine updates are
//! applied to observable stores without being echoed back.
//!
//! ## Main Types
//!
//! - [`Bridge`] - Owns the stores and routes every message
//! - [`ValueStore`] - Change-gated normalized values with per-key observers
//! - [`Telemetry`] - Meter, waveform, MIDI note and mailbox stores
//! - [`TransportAdapter`] - Raw engine messages ↔ typed handler calls
//! - [`BridgeConfig`] - Control tag → stream kind table and timing
//!
//! ## Codec
//!
//! - [`MeterFrame`] - Stereo peak/RMS frame
//! - [`StateDump`] - Full parameter state frame
//! - [`FrameReader`] - Little-endian cursor shared by all frame kinds
//!
//! Parameter metadata and normalization live in [`beamer_bridge_core`].

pub mod automation;
pub mod bridge;
pub mod codec;
pub mod config;
pub mod echo;
pub mod error;
pub mod subscription;
pub mod telemetry;
pub mod transport;
pub mod value_store;

// Re-exports for convenience
pub use automation::AutomationBracket;
pub use bridge::{Bridge, ParameterGesture, NO_CTRL_TAG, STATE_DUMP_MSG_TAG, SYSEX_MAILBOX_TAG};
pub use codec::{decode_samples, encode_samples, FrameError, FrameReader, FrameResult, MeterFrame, StateDump};
pub use config::{BridgeConfig, StreamKind};
pub use echo::{EchoSuppression, TickQueue};
pub use error::{TransportError, TransportResult};
pub use subscription::Subscription;
pub use telemetry::{
    Channel, Mailbox, MeterReading, MeterStore, MidiNote, MidiNoteStore, NoteEvent, SampleBuffer,
    Telemetry, WaveformStore,
};
pub use transport::{
    EngineLink, InboundHandler, InboundMessage, OutboundMessage, RawArg, RawMessage,
    TransportAdapter,
};
pub use value_store::{StoreKey, ValueStore};

pub use beamer_bridge_core::{
    ControlTag, NormalizedValue, ParameterId, ParameterMetadata, ParameterShape, ParameterTable,
};
