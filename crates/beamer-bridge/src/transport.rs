//! Transport adapter between the bridge and the engine.
//!
//! The engine and the UI exchange named messages with positional scalar
//! arguments; binary payloads travel as base64 strings with a declared
//! byte length. This module is the only code that knows those names.
//! Everything above it works with the typed [`InboundMessage`] and
//! [`OutboundMessage`] enums.
//!
//! # Engine → UI
//!
//! | Name             | Arguments                                  |
//! |------------------|--------------------------------------------|
//! | `SPVFD`          | parameter id, normalized value             |
//! | `SCVFD`          | control tag, normalized value              |
//! | `SCMFD`          | control tag, message tag, byte length, data |
//! | `SAMFD`          | message tag, byte length, data             |
//! | `SMMFD`          | status, data1, data2                       |
//! | `SSMFD`          | byte length, data                          |
//! | `StartIdleTimer` | none                                       |
//!
//! # UI → engine
//!
//! | Name     | Arguments                                         |
//! |----------|---------------------------------------------------|
//! | `SPVFUI` | parameter id, normalized value                    |
//! | `BPCFUI` | parameter id                                      |
//! | `EPCFUI` | parameter id                                      |
//! | `SAMFUI` | message tag, control tag, byte length, data       |
//! | `SMMFUI` | status, data1, data2                              |
//! | `TICK`   | none                                              |

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use beamer_bridge_core::{ControlTag, NormalizedValue, ParameterId};

use crate::error::{TransportError, TransportResult};

mod names {
    pub const PARAMETER_VALUE: &str = "SPVFD";
    pub const CONTROL_VALUE: &str = "SCVFD";
    pub const CONTROL_MESSAGE: &str = "SCMFD";
    pub const ARBITRARY_MESSAGE: &str = "SAMFD";
    pub const MIDI_MESSAGE: &str = "SMMFD";
    pub const SYSEX_MESSAGE: &str = "SSMFD";
    pub const START_IDLE_TIMER: &str = "StartIdleTimer";

    pub const SEND_PARAMETER_VALUE: &str = "SPVFUI";
    pub const BEGIN_PARAMETER_CHANGE: &str = "BPCFUI";
    pub const END_PARAMETER_CHANGE: &str = "EPCFUI";
    pub const SEND_ARBITRARY_MESSAGE: &str = "SAMFUI";
    pub const SEND_MIDI_MESSAGE: &str = "SMMFUI";
    pub const TICK: &str = "TICK";
}

// =============================================================================
// Raw messages
// =============================================================================

/// One positional message argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawArg {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for RawArg {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for RawArg {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for RawArg {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A message as it crosses the process boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(rename = "msg")]
    pub name: String,
    #[serde(default)]
    pub args: Vec<RawArg>,
}

impl RawMessage {
    pub fn new(name: impl Into<String>, args: Vec<RawArg>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// Positional argument reader for one inbound message.
struct Args<'a> {
    message: &'static str,
    args: &'a [RawArg],
}

impl<'a> Args<'a> {
    fn get(&self, index: usize) -> TransportResult<&'a RawArg> {
        self.args.get(index).ok_or(TransportError::MissingArgument {
            message: self.message,
            index,
        })
    }

    fn invalid(&self, index: usize, expected: &'static str) -> TransportError {
        TransportError::InvalidArgument {
            message: self.message,
            index,
            expected,
        }
    }

    fn int(&self, index: usize) -> TransportResult<i64> {
        match self.get(index)? {
            RawArg::Int(value) => Ok(*value),
            // JavaScript numbers have no integer type
            RawArg::Float(value) if value.fract() == 0.0 && value.abs() < i64::MAX as f64 => {
                Ok(*value as i64)
            }
            _ => Err(self.invalid(index, "an integer")),
        }
    }

    fn number(&self, index: usize) -> TransportResult<f64> {
        match self.get(index)? {
            RawArg::Int(value) => Ok(*value as f64),
            RawArg::Float(value) => Ok(*value),
            RawArg::Text(_) => Err(self.invalid(index, "a number")),
        }
    }

    fn text(&self, index: usize) -> TransportResult<&'a str> {
        match self.get(index)? {
            RawArg::Text(value) => Ok(value),
            _ => Err(self.invalid(index, "a string")),
        }
    }

    fn byte(&self, index: usize) -> TransportResult<u8> {
        u8::try_from(self.int(index)?).map_err(|_| self.invalid(index, "a byte"))
    }

    fn tag(&self, index: usize) -> TransportResult<i32> {
        i32::try_from(self.int(index)?).map_err(|_| self.invalid(index, "a 32-bit tag"))
    }

    fn parameter_id(&self, index: usize) -> TransportResult<ParameterId> {
        ParameterId::try_from(self.int(index)?)
            .map_err(|_| self.invalid(index, "a non-negative parameter id"))
    }

    /// Base64 payload at `data_index` with its declared length at `size_index`.
    fn payload(&self, size_index: usize, data_index: usize) -> TransportResult<Vec<u8>> {
        let declared = usize::try_from(self.int(size_index)?)
            .map_err(|_| self.invalid(size_index, "a byte length"))?;
        let data = BASE64.decode(self.text(data_index)?)?;
        if data.len() != declared {
            return Err(TransportError::LengthMismatch {
                declared,
                actual: data.len(),
            });
        }
        Ok(data)
    }
}

fn payload_args(data: &[u8]) -> [RawArg; 2] {
    [
        RawArg::Int(data.len() as i64),
        RawArg::Text(BASE64.encode(data)),
    ]
}

// =============================================================================
// Typed messages
// =============================================================================

/// Engine → UI message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    ParameterValue {
        id: ParameterId,
        value: NormalizedValue,
    },
    ControlValue {
        ctrl_tag: ControlTag,
        value: NormalizedValue,
    },
    /// Framed telemetry for the stream identified by `ctrl_tag`.
    ControlMessage {
        ctrl_tag: ControlTag,
        msg_tag: i32,
        data: Vec<u8>,
    },
    ArbitraryMessage {
        msg_tag: i32,
        data: Vec<u8>,
    },
    Midi {
        status: u8,
        data1: u8,
        data2: u8,
    },
    Sysex {
        data: Vec<u8>,
    },
    StartIdleTimer,
}

impl InboundMessage {
    /// Decode a raw engine message.
    pub fn decode(raw: &RawMessage) -> TransportResult<Self> {
        let args = |message: &'static str| Args {
            message,
            args: raw.args.as_slice(),
        };
        let message = match raw.name.as_str() {
            names::PARAMETER_VALUE => {
                let a = args(names::PARAMETER_VALUE);
                Self::ParameterValue {
                    id: a.parameter_id(0)?,
                    value: a.number(1)?,
                }
            }
            names::CONTROL_VALUE => {
                let a = args(names::CONTROL_VALUE);
                Self::ControlValue {
                    ctrl_tag: a.tag(0)?,
                    value: a.number(1)?,
                }
            }
            names::CONTROL_MESSAGE => {
                let a = args(names::CONTROL_MESSAGE);
                Self::ControlMessage {
                    ctrl_tag: a.tag(0)?,
                    msg_tag: a.tag(1)?,
                    data: a.payload(2, 3)?,
                }
            }
            names::ARBITRARY_MESSAGE => {
                let a = args(names::ARBITRARY_MESSAGE);
                Self::ArbitraryMessage {
                    msg_tag: a.tag(0)?,
                    data: a.payload(1, 2)?,
                }
            }
            names::MIDI_MESSAGE => {
                let a = args(names::MIDI_MESSAGE);
                Self::Midi {
                    status: a.byte(0)?,
                    data1: a.byte(1)?,
                    data2: a.byte(2)?,
                }
            }
            names::SYSEX_MESSAGE => Self::Sysex {
                data: args(names::SYSEX_MESSAGE).payload(0, 1)?,
            },
            names::START_IDLE_TIMER => Self::StartIdleTimer,
            other => return Err(TransportError::UnknownMessage(other.to_string())),
        };
        Ok(message)
    }
}

/// UI → engine message.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    ParameterValue {
        id: ParameterId,
        value: NormalizedValue,
    },
    BeginParameterChange {
        id: ParameterId,
    },
    EndParameterChange {
        id: ParameterId,
    },
    ArbitraryMessage {
        msg_tag: i32,
        ctrl_tag: ControlTag,
        data: Vec<u8>,
    },
    Midi {
        status: u8,
        data1: u8,
        data2: u8,
    },
    Tick,
}

impl OutboundMessage {
    /// Encode into the raw wire form.
    pub fn encode(&self) -> RawMessage {
        match self {
            Self::ParameterValue { id, value } => RawMessage::new(
                names::SEND_PARAMETER_VALUE,
                vec![RawArg::Int(i64::from(*id)), RawArg::Float(*value)],
            ),
            Self::BeginParameterChange { id } => RawMessage::new(
                names::BEGIN_PARAMETER_CHANGE,
                vec![RawArg::Int(i64::from(*id))],
            ),
            Self::EndParameterChange { id } => RawMessage::new(
                names::END_PARAMETER_CHANGE,
                vec![RawArg::Int(i64::from(*id))],
            ),
            Self::ArbitraryMessage {
                msg_tag,
                ctrl_tag,
                data,
            } => {
                let mut args = vec![
                    RawArg::Int(i64::from(*msg_tag)),
                    RawArg::Int(i64::from(*ctrl_tag)),
                ];
                args.extend(payload_args(data));
                RawMessage::new(names::SEND_ARBITRARY_MESSAGE, args)
            }
            Self::Midi {
                status,
                data1,
                data2,
            } => RawMessage::new(
                names::SEND_MIDI_MESSAGE,
                vec![
                    RawArg::Int(i64::from(*status)),
                    RawArg::Int(i64::from(*data1)),
                    RawArg::Int(i64::from(*data2)),
                ],
            ),
            Self::Tick => RawMessage::new(names::TICK, Vec::new()),
        }
    }
}

// =============================================================================
// Adapter
// =============================================================================

/// Outbound half of the transport: whatever carries messages to the engine.
pub trait EngineLink {
    /// Whether the engine is attached and can receive messages.
    fn is_attached(&self) -> bool {
        true
    }

    /// Deliver one message to the engine.
    fn post(&self, message: RawMessage);
}

/// Typed receiver for engine messages.
///
/// All methods default to ignoring the message.
#[allow(unused_variables)]
pub trait InboundHandler {
    fn on_parameter_value(&self, id: ParameterId, value: NormalizedValue) {}

    fn on_control_value(&self, ctrl_tag: ControlTag, value: NormalizedValue) {}

    fn on_control_message(&self, ctrl_tag: ControlTag, msg_tag: i32, data: &[u8]) {}

    fn on_arbitrary_message(&self, msg_tag: i32, data: &[u8]) {}

    fn on_midi_message(&self, status: u8, data1: u8, data2: u8) {}

    fn on_sysex_message(&self, data: &[u8]) {}

    fn on_start_idle_timer(&self) {}
}

/// Translates between raw engine messages and typed handler calls.
///
/// A link may attach or detach the adapter from inside
/// [`EngineLink::post`]; the new state applies to the next send.
pub struct TransportAdapter {
    link: RefCell<Option<Rc<dyn EngineLink>>>,
    handler: Weak<dyn InboundHandler>,
}

impl TransportAdapter {
    /// Create an adapter delivering inbound messages to `handler`.
    ///
    /// `link` may be `None` until the engine attaches.
    pub fn new(link: Option<Box<dyn EngineLink>>, handler: Weak<dyn InboundHandler>) -> Self {
        Self {
            link: RefCell::new(link.map(Rc::from)),
            handler,
        }
    }

    /// Attach the engine link, replacing any previous one.
    pub fn attach(&self, link: Box<dyn EngineLink>) {
        *self.link.borrow_mut() = Some(Rc::from(link));
    }

    /// Detach the engine link.
    pub fn detach(&self) -> Option<Rc<dyn EngineLink>> {
        self.link.borrow_mut().take()
    }

    /// Whether outbound messages currently reach the engine.
    pub fn is_attached(&self) -> bool {
        self.link
            .borrow()
            .as_ref()
            .is_some_and(|link| link.is_attached())
    }

    /// Send a message to the engine.
    ///
    /// Returns `false` and logs a warning if no engine is attached.
    pub fn send(&self, message: OutboundMessage) -> bool {
        let link = self.link.borrow().clone();
        match link {
            Some(link) if link.is_attached() => {
                link.post(message.encode());
                true
            }
            _ => {
                log::warn!("Engine not attached, dropping {:?}", message);
                false
            }
        }
    }

    /// Decode a raw engine message and dispatch it.
    ///
    /// Malformed messages are logged and dropped; the error is returned for
    /// callers that want to count them.
    pub fn receive(&self, raw: &RawMessage) -> TransportResult<()> {
        match InboundMessage::decode(raw) {
            Ok(message) => {
                self.dispatch(message);
                Ok(())
            }
            Err(err) => {
                log::warn!("Dropping engine message '{}': {}", raw.name, err);
                Err(err)
            }
        }
    }

    /// Parse a JSON-encoded engine message (`{"msg": ..., "args": [...]}`)
    /// and dispatch it.
    pub fn receive_json(&self, json: &str) -> TransportResult<()> {
        let raw: RawMessage = serde_json::from_str(json).map_err(|err| {
            log::warn!("Dropping unparsable engine message: {}", err);
            TransportError::from(err)
        })?;
        self.receive(&raw)
    }

    /// Deliver a typed message to the handler.
    pub fn dispatch(&self, message: InboundMessage) {
        let Some(handler) = self.handler.upgrade() else {
            log::debug!("Inbound handler gone, dropping {:?}", message);
            return;
        };
        match message {
            InboundMessage::ParameterValue { id, value } => handler.on_parameter_value(id, value),
            InboundMessage::ControlValue { ctrl_tag, value } => {
                handler.on_control_value(ctrl_tag, value)
            }
            InboundMessage::ControlMessage {
                ctrl_tag,
                msg_tag,
                data,
            } => handler.on_control_message(ctrl_tag, msg_tag, &data),
            InboundMessage::ArbitraryMessage { msg_tag, data } => {
                handler.on_arbitrary_message(msg_tag, &data)
            }
            InboundMessage::Midi {
                status,
                data1,
                data2,
            } => handler.on_midi_message(status, data1, data2),
            InboundMessage::Sysex { data } => handler.on_sysex_message(&data),
            InboundMessage::StartIdleTimer => handler.on_start_idle_timer(),
        }
    }
}

impl std::fmt::Debug for TransportAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportAdapter")
            .field("attached", &self.is_attached())
            .finish()
    }
}
