//! The bridge between a DSP engine and its UI.
//!
//! [`Bridge`] owns every store and routes traffic in both directions:
//!
//! ```text
//! engine ──► TransportAdapter ──► InboundHandler for Bridge
//!                                   ├─ parameter value ──► ValueStore (echo suppressed)
//!                                   ├─ control value   ──► control ValueStore
//!                                   ├─ control message ──► meter / waveform / mailbox
//!                                   ├─ arbitrary       ──► state dump or mailbox
//!                                   └─ midi / sysex    ──► notes / mailbox
//!
//! UI ──► Bridge::set_value ──► ValueStore (optimistic) ──► TransportAdapter ──► engine
//! ```
//!
//! The bridge is single-threaded. The host drives it with three calls:
//! [`Bridge::receive`] for each engine message, [`Bridge::flush`] at the end
//! of each scheduling turn, and [`Bridge::on_idle_tick`] on the idle timer.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use beamer_bridge_core::{clamp_normalized, ControlTag, NormalizedValue, ParameterId, ParameterTable};

use crate::automation::AutomationBracket;
use crate::codec::{decode_samples, MeterFrame, StateDump};
use crate::config::{BridgeConfig, StreamKind};
use crate::echo::{EchoSuppression, TickQueue};
use crate::error::TransportResult;
use crate::subscription::Subscription;
use crate::telemetry::Telemetry;
use crate::transport::{EngineLink, InboundHandler, OutboundMessage, RawMessage, TransportAdapter};
use crate::value_store::ValueStore;

/// Message tag of the state request and of the engine's state-dump reply.
pub const STATE_DUMP_MSG_TAG: i32 = -2;

/// Control tag for messages not tied to a control.
pub const NO_CTRL_TAG: ControlTag = -1;

/// Mailbox tag under which inbound sysex payloads are stored.
pub const SYSEX_MAILBOX_TAG: i32 = i32::MIN;

/// Parameter and telemetry bridge.
pub struct Bridge {
    config: BridgeConfig,
    parameters: ParameterTable,
    values: ValueStore,
    controls: ValueStore<ControlTag>,
    telemetry: Telemetry,
    echo: EchoSuppression,
    ticks: TickQueue,
    automation: AutomationBracket,
    transport: TransportAdapter,
    mounted: Cell<bool>,
    idle_timer: Cell<bool>,
}

impl Bridge {
    /// Create a bridge. The value store starts at the parameters' defaults.
    ///
    /// `link` may be `None` until the engine attaches; see
    /// [`TransportAdapter::attach`].
    pub fn new(
        config: BridgeConfig,
        parameters: ParameterTable,
        link: Option<Box<dyn EngineLink>>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|bridge: &Weak<Self>| {
            let handler: Weak<dyn InboundHandler> = bridge.clone();
            let values = ValueStore::with_capacity(parameters.id_span());
            values.initialize(parameters.defaults());
            Self {
                config,
                parameters,
                values,
                controls: ValueStore::new(),
                telemetry: Telemetry::new(),
                echo: EchoSuppression::new(),
                ticks: TickQueue::new(),
                automation: AutomationBracket::new(),
                transport: TransportAdapter::new(link, handler),
                mounted: Cell::new(false),
                idle_timer: Cell::new(false),
            }
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn parameters(&self) -> &ParameterTable {
        &self.parameters
    }

    /// Normalized parameter values.
    pub fn values(&self) -> &ValueStore {
        &self.values
    }

    /// Control values keyed by control tag.
    pub fn controls(&self) -> &ValueStore<ControlTag> {
        &self.controls
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn transport(&self) -> &TransportAdapter {
        &self.transport
    }

    pub fn echo(&self) -> &EchoSuppression {
        &self.echo
    }

    pub fn automation(&self) -> &AutomationBracket {
        &self.automation
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Called once the UI is shown. Requests a full state dump the first
    /// time.
    pub fn mount(&self) {
        if self.mounted.replace(true) || !self.config.request_state_on_mount {
            return;
        }
        log::debug!("Requesting state dump from engine");
        self.transport.send(OutboundMessage::ArbitraryMessage {
            msg_tag: STATE_DUMP_MSG_TAG,
            ctrl_tag: NO_CTRL_TAG,
            data: Vec::new(),
        });
    }

    /// Called when the UI goes away. Closes any open automation bracket.
    pub fn unmount(&self) {
        for id in self.automation.end_all() {
            self.send_end(id);
        }
        self.mounted.set(false);
        self.idle_timer.set(false);
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    /// Feed one raw engine message.
    pub fn receive(&self, raw: &RawMessage) -> TransportResult<()> {
        self.transport.receive(raw)
    }

    /// Run work deferred to the end of the current turn, including the echo
    /// suppression reset. Returns the number of tasks run.
    pub fn flush(&self) -> usize {
        self.ticks.run_pending()
    }

    /// Idle timer callback: flushes, then ticks the engine once the engine
    /// has asked for idle processing.
    pub fn on_idle_tick(&self) {
        self.flush();
        if self.idle_timer.get() {
            self.transport.send(OutboundMessage::Tick);
        }
    }

    /// Whether the engine has started the idle timer.
    pub fn is_idle_timer_running(&self) -> bool {
        self.idle_timer.get()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current normalized value of a parameter (0 for unknown ids).
    pub fn value(&self, id: ParameterId) -> NormalizedValue {
        self.values.get(id)
    }

    /// Current physical value of a parameter.
    pub fn actual(&self, id: ParameterId) -> f64 {
        self.parameters.to_actual(id, self.values.get(id))
    }

    /// Current value formatted for display.
    pub fn display(&self, id: ParameterId) -> String {
        self.parameters.format(id, self.values.get(id))
    }

    /// Observe a parameter.
    pub fn subscribe(
        &self,
        id: ParameterId,
        callback: impl Fn(&NormalizedValue) + 'static,
    ) -> Subscription {
        self.values.subscribe(id, callback)
    }

    // =========================================================================
    // UI edits
    // =========================================================================

    /// Set a parameter from the UI.
    ///
    /// The local store is written first; the engine is told only if the
    /// value changed and no engine update is being applied. Controls that
    /// write their value back from a subscription therefore never send it
    /// twice. Returns whether a message was sent.
    pub fn set_value(&self, id: ParameterId, normalized: NormalizedValue) -> bool {
        let value = clamp_normalized(normalized);
        if !self.values.set(id, value) {
            return false;
        }
        self.send_edit(OutboundMessage::ParameterValue { id, value })
    }

    /// Set a parameter from a physical value.
    pub fn set_actual(&self, id: ParameterId, actual: f64) -> bool {
        self.set_value(id, self.parameters.to_normalized(id, actual))
    }

    /// Set a parameter from display text. Returns `false` if the text does
    /// not parse.
    pub fn set_text(&self, id: ParameterId, text: &str) -> bool {
        match self.parameters.parse(id, text) {
            Some(normalized) => self.set_value(id, normalized),
            None => false,
        }
    }

    /// Open the automation bracket of a parameter.
    ///
    /// A repeated begin is a no-op, as is a begin during an engine update.
    pub fn begin_change(&self, id: ParameterId) {
        if self.echo.is_active() || !self.automation.begin_change(id) {
            return;
        }
        if self.parameters.is_automatable(id) {
            self.send_edit(OutboundMessage::BeginParameterChange { id });
        }
    }

    /// Close the automation bracket of a parameter. No-op if not open.
    pub fn end_change(&self, id: ParameterId) {
        if self.automation.end_change(id) {
            self.send_end(id);
        }
    }

    /// Discrete edit (toggle, menu): begin, set and end back-to-back.
    pub fn set_discrete(&self, id: ParameterId, normalized: NormalizedValue) {
        self.begin_change(id);
        self.set_value(id, normalized);
        self.end_change(id);
    }

    /// Continuous edit (drag): the bracket stays open until the returned
    /// gesture is dropped.
    pub fn gesture(&self, id: ParameterId) -> ParameterGesture<'_> {
        self.begin_change(id);
        ParameterGesture { bridge: self, id }
    }

    /// Send an arbitrary message to the engine.
    pub fn send_arbitrary_message(&self, msg_tag: i32, ctrl_tag: ControlTag, data: &[u8]) -> bool {
        self.transport.send(OutboundMessage::ArbitraryMessage {
            msg_tag,
            ctrl_tag,
            data: data.to_vec(),
        })
    }

    /// Send a MIDI message to the engine (on-screen keyboard).
    pub fn send_midi(&self, status: u8, data1: u8, data2: u8) -> bool {
        self.transport.send(OutboundMessage::Midi {
            status,
            data1,
            data2,
        })
    }

    // Not echo-gated: the matching begin was sent
    fn send_end(&self, id: ParameterId) {
        if self.parameters.is_automatable(id) {
            self.transport.send(OutboundMessage::EndParameterChange { id });
        }
    }

    fn send_edit(&self, message: OutboundMessage) -> bool {
        if self.echo.is_active() {
            log::debug!("Suppressed echo of {:?}", message);
            return false;
        }
        self.transport.send(message)
    }

    // =========================================================================
    // Engine updates
    // =========================================================================

    /// Apply a parameter value received from the engine.
    pub fn apply_parameter_value(&self, id: ParameterId, value: NormalizedValue) -> bool {
        self.echo.apply(&self.ticks, || self.values.set(id, value))
    }

    /// Apply a state dump atomically. Returns the ids that changed.
    pub fn apply_state_dump(&self, dump: &StateDump) -> Vec<ParameterId> {
        let entries = dump
            .entries
            .iter()
            .map(|&(id, value)| (id, NormalizedValue::from(value)));
        self.echo.apply(&self.ticks, || self.values.set_many(entries))
    }

    fn route_control_message(&self, ctrl_tag: ControlTag, data: &[u8]) {
        match self.config.stream_kind(ctrl_tag) {
            Some(StreamKind::Meter) => match MeterFrame::decode(data) {
                Ok(frame) => self.telemetry.meter(ctrl_tag).apply_frame(&frame),
                Err(err) => log::warn!("Dropping meter frame for tag {}: {}", ctrl_tag, err),
            },
            Some(StreamKind::Waveform) => match decode_samples(data) {
                Ok(samples) => self.telemetry.waveforms().update(ctrl_tag, samples),
                Err(err) => log::warn!("Dropping sample frame for tag {}: {}", ctrl_tag, err),
            },
            Some(StreamKind::Mailbox) => self.telemetry.mailbox().set(ctrl_tag, data),
            None => log::debug!("No stream configured for control tag {}", ctrl_tag),
        }
    }
}

impl InboundHandler for Bridge {
    fn on_parameter_value(&self, id: ParameterId, value: NormalizedValue) {
        self.apply_parameter_value(id, value);
    }

    fn on_control_value(&self, ctrl_tag: ControlTag, value: NormalizedValue) {
        self.controls.set(ctrl_tag, value);
    }

    fn on_control_message(&self, ctrl_tag: ControlTag, _msg_tag: i32, data: &[u8]) {
        self.route_control_message(ctrl_tag, data);
    }

    fn on_arbitrary_message(&self, msg_tag: i32, data: &[u8]) {
        if msg_tag == STATE_DUMP_MSG_TAG {
            self.apply_state_dump(&StateDump::decode(data));
        } else {
            self.telemetry.mailbox().set(msg_tag, data);
        }
    }

    fn on_midi_message(&self, status: u8, data1: u8, data2: u8) {
        self.telemetry.notes().handle_message(status, data1, data2);
    }

    fn on_sysex_message(&self, data: &[u8]) {
        self.telemetry.mailbox().set(SYSEX_MAILBOX_TAG, data);
    }

    fn on_start_idle_timer(&self) {
        if !self.idle_timer.replace(true) {
            log::debug!(
                "Engine started idle timer ({} ms)",
                self.config.idle_interval().as_millis()
            );
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("parameters", &self.parameters)
            .field("mounted", &self.mounted.get())
            .field("echo", &self.echo)
            .field("transport", &self.transport)
            .finish()
    }
}

// =============================================================================
// ParameterGesture
// =============================================================================

/// An open automation bracket for a continuous edit.
///
/// Created by [`Bridge::gesture`]; the bracket closes when the gesture is
/// dropped.
#[must_use = "dropping the gesture ends it immediately"]
pub struct ParameterGesture<'a> {
    bridge: &'a Bridge,
    id: ParameterId,
}

impl ParameterGesture<'_> {
    pub fn id(&self) -> ParameterId {
        self.id
    }

    /// Set the normalized value.
    pub fn set(&self, normalized: NormalizedValue) -> bool {
        self.bridge.set_value(self.id, normalized)
    }

    /// Set the physical value.
    pub fn set_actual(&self, actual: f64) -> bool {
        self.bridge.set_actual(self.id, actual)
    }

    /// End the gesture.
    pub fn end(self) {}
}

impl Drop for ParameterGesture<'_> {
    fn drop(&mut self) {
        self.bridge.end_change(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use beamer_bridge_core::{ParameterMetadata, ParameterShape, MAX_PARAMETER_COUNT};

    use crate::codec::{encode_samples, METER_FRAME_SIZE};
    use crate::telemetry::Channel;
    use crate::transport::RawArg;

    const GAIN: ParameterId = 0;
    const CUTOFF: ParameterId = 1;
    const BYPASS: ParameterId = 2;
    const FREEZE: ParameterId = 3;

    const METER_TAG: ControlTag = 10;
    const SCOPE_TAG: ControlTag = 11;
    const SPECTRUM_TAG: ControlTag = 12;

    const EPS: f64 = 1e-9;

    type Sent = Rc<RefCell<Vec<RawMessage>>>;

    struct RecordingLink {
        sent: Sent,
    }

    impl EngineLink for RecordingLink {
        fn post(&self, message: RawMessage) {
            self.sent.borrow_mut().push(message);
        }
    }

    fn parameters() -> ParameterTable {
        ParameterTable::from_metadata([
            ParameterMetadata::new(GAIN, "Gain")
                .with_range(-60.0, 12.0)
                .with_unit("dB")
                .with_default(0.0),
            ParameterMetadata::new(CUTOFF, "Cutoff")
                .with_range(20.0, 20000.0)
                .with_unit("Hz")
                .with_shape(ParameterShape::Exponential, 1.0)
                .with_default(1000.0),
            ParameterMetadata::toggle(BYPASS, "Bypass"),
            ParameterMetadata::toggle(FREEZE, "Freeze").without_automation(),
        ])
        .unwrap()
    }

    fn config() -> BridgeConfig {
        BridgeConfig::new()
            .with_stream(METER_TAG, StreamKind::Meter)
            .with_stream(SCOPE_TAG, StreamKind::Waveform)
            .with_stream(SPECTRUM_TAG, StreamKind::Mailbox)
    }

    fn bridge_with(config: BridgeConfig) -> (Rc<Bridge>, Sent) {
        let sent: Sent = Rc::default();
        let link = RecordingLink {
            sent: Rc::clone(&sent),
        };
        (Bridge::new(config, parameters(), Some(Box::new(link))), sent)
    }

    fn bridge() -> (Rc<Bridge>, Sent) {
        bridge_with(config())
    }

    fn names(sent: &Sent) -> Vec<String> {
        sent.borrow().iter().map(|m| m.name.clone()).collect()
    }

    fn engine_value(id: ParameterId, value: f64) -> RawMessage {
        RawMessage::new("SPVFD", vec![RawArg::Int(id as i64), RawArg::Float(value)])
    }

    fn payload(data: &[u8]) -> [RawArg; 2] {
        [RawArg::Int(data.len() as i64), RawArg::Text(BASE64.encode(data))]
    }

    fn control_message(ctrl_tag: ControlTag, data: &[u8]) -> RawMessage {
        let mut args = vec![RawArg::Int(ctrl_tag as i64), RawArg::Int(0)];
        args.extend(payload(data));
        RawMessage::new("SCMFD", args)
    }

    fn arbitrary_message(msg_tag: i32, data: &[u8]) -> RawMessage {
        let mut args = vec![RawArg::Int(msg_tag as i64)];
        args.extend(payload(data));
        RawMessage::new("SAMFD", args)
    }

    #[test]
    fn test_starts_at_defaults_without_notifying() {
        let (bridge, sent) = bridge();
        assert!((bridge.value(GAIN) - 60.0 / 72.0).abs() < EPS);
        assert!((bridge.actual(CUTOFF) - 1000.0).abs() < 1e-6);
        assert_eq!(bridge.value(BYPASS), 0.0);
        assert_eq!(bridge.display(GAIN), "0.00 dB");
        assert!(sent.borrow().is_empty());
    }

    #[test]
    fn test_unknown_parameter_defaults_to_zero() {
        let (bridge, _) = bridge();
        assert_eq!(bridge.value(99), 0.0);
        assert_eq!(bridge.actual(99), 0.0);
    }

    #[test]
    fn test_mount_requests_state_once() {
        let (bridge, sent) = bridge();
        bridge.mount();
        bridge.mount();
        assert!(bridge.is_mounted());
        let sent = sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].name, "SAMFUI");
        assert_eq!(
            sent[0].args,
            vec![
                RawArg::Int(STATE_DUMP_MSG_TAG as i64),
                RawArg::Int(NO_CTRL_TAG as i64),
                RawArg::Int(0),
                RawArg::Text(String::new()),
            ]
        );
    }

    #[test]
    fn test_mount_without_state_request() {
        let (bridge, sent) = bridge_with(config().without_state_request());
        bridge.mount();
        assert!(sent.borrow().is_empty());
    }

    #[test]
    fn test_set_value_writes_locally_and_sends() {
        let (bridge, sent) = bridge();
        assert!(bridge.set_value(GAIN, 1.5));
        assert_eq!(bridge.value(GAIN), 1.0);
        let sent = sent.borrow();
        assert_eq!(sent[0].name, "SPVFUI");
        assert_eq!(sent[0].args, vec![RawArg::Int(0), RawArg::Float(1.0)]);
    }

    #[test]
    fn test_set_actual_and_text() {
        let (bridge, _) = bridge();
        bridge.set_actual(GAIN, -24.0);
        assert!((bridge.value(GAIN) - 0.5).abs() < EPS);
        assert!(bridge.set_text(CUTOFF, "20k Hz"));
        assert_eq!(bridge.value(CUTOFF), 1.0);
        assert!(!bridge.set_text(CUTOFF, "bright"));
    }

    #[test]
    fn test_inbound_value_is_not_echoed() {
        let (bridge, sent) = bridge();

        // A control that pushes its value back whenever the store changes
        let weak = Rc::downgrade(&bridge);
        let _control = bridge.subscribe(GAIN, move |value| {
            if let Some(bridge) = weak.upgrade() {
                bridge.set_value(GAIN, *value);
            }
        });

        bridge.receive(&engine_value(GAIN, 0.25)).unwrap();
        assert_eq!(bridge.value(GAIN), 0.25);
        assert!(sent.borrow().is_empty());

        // Same turn: still suppressed
        assert!(!bridge.set_value(GAIN, 0.3));
        assert!(sent.borrow().is_empty());

        // Next tick: user edits go out again
        bridge.flush();
        assert!(bridge.set_value(GAIN, 0.4));
        assert_eq!(names(&sent), vec!["SPVFUI"]);

        // Unchanged value: nothing to tell the engine
        assert!(!bridge.set_value(GAIN, 0.4));
        assert_eq!(sent.borrow().len(), 1);
    }

    #[test]
    fn test_highest_parameter_id_keeps_local_write() {
        let last = (MAX_PARAMETER_COUNT - 1) as ParameterId;
        let table = ParameterTable::from_metadata([ParameterMetadata::new(last, "Last")]).unwrap();
        let bridge = Bridge::new(config(), table, None);
        bridge.set_value(last, 0.5);
        assert_eq!(bridge.value(last), 0.5);
    }

    #[test]
    fn test_echo_state_is_per_bridge() {
        let (first, _) = bridge();
        let (second, second_sent) = bridge();
        first.receive(&engine_value(GAIN, 0.25)).unwrap();
        assert!(first.echo().is_active());
        assert!(!second.echo().is_active());
        assert!(second.set_value(GAIN, 0.25));
        assert_eq!(second_sent.borrow().len(), 1);
    }

    #[test]
    fn test_inbound_nan_is_clamped() {
        let (bridge, _) = bridge();
        bridge.apply_parameter_value(GAIN, f64::NAN);
        assert_eq!(bridge.value(GAIN), 0.0);
    }

    #[test]
    fn test_state_dump_applies_atomically() {
        let (bridge, sent) = bridge();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let weak = Rc::downgrade(&bridge);
        let record = Rc::clone(&seen);
        let _observer = bridge.subscribe(GAIN, move |_| {
            if let Some(bridge) = weak.upgrade() {
                record
                    .borrow_mut()
                    .push((bridge.value(GAIN), bridge.value(CUTOFF)));
            }
        });

        let dump = StateDump::encode(&[(GAIN, 0.5), (CUTOFF, 0.25)]);
        bridge
            .receive(&arbitrary_message(STATE_DUMP_MSG_TAG, &dump))
            .unwrap();

        assert_eq!(*seen.borrow(), vec![(0.5, 0.25)]);
        assert!(sent.borrow().is_empty());
    }

    #[test]
    fn test_truncated_state_dump_applies_decoded_entries() {
        let (bridge, _) = bridge();
        let mut dump = StateDump::encode(&[(GAIN, 0.5), (CUTOFF, 0.25)]);
        dump.truncate(dump.len() - 3);
        bridge
            .receive(&arbitrary_message(STATE_DUMP_MSG_TAG, &dump))
            .unwrap();
        assert_eq!(bridge.value(GAIN), 0.5);
        assert!((bridge.actual(CUTOFF) - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_control_value() {
        let (bridge, _) = bridge();
        bridge
            .receive(&RawMessage::new(
                "SCVFD",
                vec![RawArg::Int(5), RawArg::Float(0.75)],
            ))
            .unwrap();
        assert_eq!(bridge.controls().get(5), 0.75);
    }

    #[test]
    fn test_meter_routing() {
        let (bridge, _) = bridge();
        let mut frame = vec![0u8; METER_FRAME_SIZE];
        for (index, value) in [1.0f32, 0.5, 0.8, 0.4].iter().enumerate() {
            let offset = 12 + index * 4;
            frame[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }
        bridge.receive(&control_message(METER_TAG, &frame)).unwrap();

        let meter = bridge.telemetry().meter(METER_TAG);
        assert_eq!(meter.get(Channel::Left).peak, 1.0);
        assert_eq!(meter.get(Channel::Left).rms, 0.5);
        assert_eq!(meter.get(Channel::Right).peak, 0.8);
        assert_eq!(meter.get(Channel::Right).rms, 0.4);
    }

    #[test]
    fn test_short_meter_frame_is_dropped() {
        let (bridge, _) = bridge();
        bridge
            .receive(&control_message(METER_TAG, &[0u8; 16]))
            .unwrap();
        assert_eq!(bridge.telemetry().meter(METER_TAG).get(Channel::Left).peak, 0.0);
    }

    #[test]
    fn test_waveform_and_mailbox_routing() {
        let (bridge, _) = bridge();
        let frame = encode_samples(&[0.0, 0.5, -0.5]);
        bridge.receive(&control_message(SCOPE_TAG, &frame)).unwrap();
        bridge
            .receive(&control_message(SPECTRUM_TAG, &[1, 2, 3]))
            .unwrap();
        bridge.receive(&control_message(99, &[9])).unwrap();

        let buffer = bridge.telemetry().waveforms().latest(SCOPE_TAG).unwrap();
        assert_eq!(buffer.samples, vec![0.0, 0.5, -0.5]);
        assert_eq!(
            bridge.telemetry().mailbox().get(SPECTRUM_TAG).as_deref(),
            Some(&[1u8, 2, 3][..])
        );
        assert!(bridge.telemetry().mailbox().get(99).is_none());
    }

    #[test]
    fn test_arbitrary_and_sysex_go_to_mailbox() {
        let (bridge, _) = bridge();
        bridge.receive(&arbitrary_message(42, &[7, 7])).unwrap();
        let mut args = Vec::new();
        args.extend(payload(&[0xF0, 0xF7]));
        bridge.receive(&RawMessage::new("SSMFD", args)).unwrap();

        let mailbox = bridge.telemetry().mailbox();
        assert_eq!(mailbox.get(42).as_deref(), Some(&[7u8, 7][..]));
        assert_eq!(
            mailbox.get(SYSEX_MAILBOX_TAG).as_deref(),
            Some(&[0xF0u8, 0xF7][..])
        );
    }

    #[test]
    fn test_midi_notes() {
        let (bridge, _) = bridge();
        let events = Rc::new(Cell::new(0));
        let counter = Rc::clone(&events);
        let _keyboard = bridge
            .telemetry()
            .notes()
            .subscribe(move |_| counter.set(counter.get() + 1));

        let note_on = RawMessage::new(
            "SMMFD",
            vec![RawArg::Int(0x90), RawArg::Int(60), RawArg::Int(100)],
        );
        bridge.receive(&note_on).unwrap();
        bridge.receive(&note_on).unwrap();
        assert!(bridge.telemetry().notes().is_active(60));
        assert_eq!(events.get(), 1);
    }

    #[test]
    fn test_set_discrete_brackets_one_change() {
        let (bridge, sent) = bridge();
        bridge.set_discrete(BYPASS, 1.0);
        assert_eq!(names(&sent), vec!["BPCFUI", "SPVFUI", "EPCFUI"]);
        assert!(!bridge.automation().is_changing(BYPASS));
        assert_eq!(bridge.actual(BYPASS), 1.0);
    }

    #[test]
    fn test_gesture_brackets_whole_drag() {
        let (bridge, sent) = bridge();
        {
            let gesture = bridge.gesture(GAIN);
            gesture.set(0.1);
            // Nested begin is a no-op
            bridge.begin_change(GAIN);
            gesture.set(0.2);
            gesture.set(0.3);
            assert!(bridge.automation().is_changing(GAIN));
        }
        assert_eq!(
            names(&sent),
            vec!["BPCFUI", "SPVFUI", "SPVFUI", "SPVFUI", "EPCFUI"]
        );
        // Stray end is a no-op
        bridge.end_change(GAIN);
        assert_eq!(sent.borrow().len(), 5);
    }

    #[test]
    fn test_non_automatable_has_no_bracket_messages() {
        let (bridge, sent) = bridge();
        bridge.set_discrete(FREEZE, 1.0);
        assert_eq!(names(&sent), vec!["SPVFUI"]);
    }

    #[test]
    fn test_discrete_edit_during_engine_update_is_silent() {
        let (bridge, sent) = bridge();
        let weak = Rc::downgrade(&bridge);
        let _control = bridge.subscribe(BYPASS, move |value| {
            if let Some(bridge) = weak.upgrade() {
                bridge.set_discrete(BYPASS, *value);
            }
        });
        bridge.receive(&engine_value(BYPASS, 1.0)).unwrap();
        assert!(sent.borrow().is_empty());
        assert!(!bridge.automation().is_changing(BYPASS));
    }

    #[test]
    fn test_unmount_closes_open_brackets() {
        let (bridge, sent) = bridge();
        bridge.begin_change(CUTOFF);
        bridge.unmount();
        assert_eq!(names(&sent), vec!["BPCFUI", "EPCFUI"]);
        assert!(!bridge.is_mounted());
    }

    #[test]
    fn test_idle_tick() {
        let (bridge, sent) = bridge();
        bridge.on_idle_tick();
        assert!(sent.borrow().is_empty());

        bridge
            .receive(&RawMessage::new("StartIdleTimer", Vec::new()))
            .unwrap();
        assert!(bridge.is_idle_timer_running());
        bridge.on_idle_tick();
        assert_eq!(names(&sent), vec!["TICK"]);
    }

    #[test]
    fn test_idle_tick_lifts_echo_suppression() {
        let (bridge, _) = bridge();
        bridge.receive(&engine_value(GAIN, 0.5)).unwrap();
        assert!(bridge.echo().is_active());
        bridge.on_idle_tick();
        assert!(!bridge.echo().is_active());
    }

    #[test]
    fn test_detached_engine_keeps_local_state() {
        let bridge = Bridge::new(config(), parameters(), None);
        assert!(!bridge.set_value(GAIN, 0.5));
        assert_eq!(bridge.value(GAIN), 0.5);

        let sent: Sent = Rc::default();
        bridge.transport().attach(Box::new(RecordingLink {
            sent: Rc::clone(&sent),
        }));
        assert!(bridge.set_value(GAIN, 0.6));
        assert_eq!(sent.borrow().len(), 1);
    }

    #[test]
    fn test_outbound_midi_and_arbitrary() {
        let (bridge, sent) = bridge();
        bridge.send_midi(0x90, 64, 90);
        bridge.send_arbitrary_message(7, METER_TAG, &[1]);
        assert_eq!(names(&sent), vec!["SMMFUI", "SAMFUI"]);
    }
}
