//! Command-class decoders.
//!
//! Every class implements `CommandClassHandler`; `CommandClass` is the closed
//! set the node stores, built from a class id by `CommandClass::create`.

pub mod alarm;
pub mod basic;
pub mod battery;
pub mod central_scene;
pub mod crc16_encap;
pub mod sensor_multilevel;
pub mod switch_binary;
pub mod version;

use bitflags::bitflags;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::config;
use crate::error::ZWaveError;
use crate::msg::Msg;
use crate::node::NodeData;
use crate::queue::{QueuePriority, SendQueue};
use crate::registry;
use crate::value::{Decimal, Value};

pub use alarm::Alarm;
pub use basic::Basic;
pub use battery::Battery;
pub use central_scene::CentralScene;
pub use crc16_encap::Crc16Encap;
pub use sensor_multilevel::SensorMultilevel;
pub use switch_binary::SwitchBinary;
pub use version::Version;

bitflags! {
    /// Which request pass is running.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RequestFlags: u8 {
        /// One-time capability and version discovery.
        const STATIC = 1 << 0;
        /// Once per session (after wake-up or restart).
        const SESSION = 1 << 1;
        /// Recurring value refresh.
        const DYNAMIC = 1 << 2;
    }
}

bitflags! {
    /// Discovery queries still outstanding for one class instance.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StaticRequests: u8 {
        const INSTANCES = 1 << 0;
        const VALUES = 1 << 1;
        const VERSION = 1 << 2;
    }
}

/// Outcome of `handle_msg`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Handled {
    /// Decoded and applied.
    Consumed,
    /// Sub-command not known to this class.
    No,
    /// Malformed or failed integrity check; nothing was changed.
    Rejected,
    /// Verified encapsulation: dispatch `payload` to `class_id`.
    Forward { class_id: u8, payload: Vec<u8> },
    /// The node reported the version it implements for `class_id`.
    Negotiated { class_id: u8, version: u8 },
}

/// State shared by every class instance.
#[derive(Clone, Debug)]
pub struct CcState {
    version: u8,
    static_requests: StaticRequests,
    get_supported: bool,
    instances: BTreeSet<u8>,
    attempts: BTreeMap<u8, u8>,
}

impl Default for CcState {
    fn default() -> Self {
        Self {
            version: 1,
            static_requests: StaticRequests::empty(),
            get_supported: true,
            instances: BTreeSet::from([1]),
            attempts: BTreeMap::new(),
        }
    }
}

impl CcState {
    #[must_use]
    pub const fn version(&self) -> u8 {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: u8) {
        self.version = version;
    }

    #[must_use]
    pub const fn static_requests(&self) -> StaticRequests {
        self.static_requests
    }

    #[must_use]
    pub const fn has_static_request(&self, request: StaticRequests) -> bool {
        self.static_requests.contains(request)
    }

    pub fn set_static_request(&mut self, request: StaticRequests) {
        self.static_requests.insert(request);
    }

    /// Called when the matching report arrives.
    pub fn clear_static_request(&mut self, request: StaticRequests) {
        self.static_requests.remove(request);
        self.attempts.remove(&request.bits());
    }

    pub(crate) fn restore_static_requests(&mut self, requests: StaticRequests) {
        self.static_requests = requests;
        self.attempts.clear();
    }

    /// Account for one more issue of the `request` discovery query.
    ///
    /// Returns false when the request is not outstanding, or when it has hit
    /// the configured attempt limit; in the latter case the flag is dropped.
    pub fn take_static_attempt(&mut self, request: StaticRequests, class_name: &str) -> bool {
        if !self.has_static_request(request) {
            return false;
        }
        let limit = config().zwave_static_request_attempts;
        let used = self.attempts.entry(request.bits()).or_insert(0);
        if limit != 0 && *used >= limit {
            log::warn!(
                "{class_name}: no answer to {request:?} after {limit} attempts, giving up"
            );
            self.clear_static_request(request);
            return false;
        }
        *used += 1;
        true
    }

    #[must_use]
    pub const fn is_get_supported(&self) -> bool {
        self.get_supported
    }

    /// Mark the class set-only for devices that never answer Get.
    pub fn set_get_supported(&mut self, supported: bool) {
        self.get_supported = supported;
    }

    pub fn instances(&self) -> impl Iterator<Item = u8> + '_ {
        self.instances.iter().copied()
    }

    pub fn add_instance(&mut self, instance: u8) {
        self.instances.insert(instance);
    }
}

/// Decoder and request builder for one command class.
pub trait CommandClassHandler {
    fn id(&self) -> u8;
    fn name(&self) -> &'static str;

    /// Highest version this decoder understands.
    fn max_version(&self) -> u8 {
        1
    }

    /// Whether the node should be asked which version of this class it runs.
    fn wants_version(&self) -> bool {
        self.max_version() > 1
    }

    fn state(&self) -> &CcState;
    fn state_mut(&mut self) -> &mut CcState;

    /// Queue whatever the given pass needs. Returns true when anything was sent.
    fn request_state(
        &mut self,
        _flags: RequestFlags,
        _instance: u8,
        _node: &NodeData,
        _queue: &mut dyn SendQueue,
    ) -> bool {
        false
    }

    /// Queue one Get for the value at `index` (0 asks for the class' default report).
    fn request_value(
        &mut self,
        _flags: RequestFlags,
        _index: u8,
        _instance: u8,
        _node: &NodeData,
        _queue: &mut dyn SendQueue,
    ) -> bool {
        false
    }

    /// Decode one inbound payload. `data[0]` is the sub-command.
    fn handle_msg(&mut self, data: &[u8], instance: u8, node: &mut NodeData) -> Handled;

    /// Create the values this class always has.
    fn create_vars(&mut self, _instance: u8, _node: &mut NodeData) {}

    /// Queue the Set for a value whose target was just recorded.
    fn set_value(&mut self, _value: &Value, _node: &NodeData, _queue: &mut dyn SendQueue) -> bool {
        false
    }
}

/// Every class this engine can decode.
#[derive(Debug)]
pub enum CommandClass {
    Alarm(Alarm),
    Basic(Basic),
    Battery(Battery),
    CentralScene(CentralScene),
    Crc16Encap(Crc16Encap),
    SensorMultilevel(SensorMultilevel),
    SwitchBinary(SwitchBinary),
    Version(Version),
}

impl CommandClass {
    /// Registration table.
    #[must_use]
    pub fn create(id: u8) -> Option<Self> {
        Some(match id {
            alarm::ID => Self::Alarm(Alarm::new()),
            basic::ID => Self::Basic(Basic::new()),
            battery::ID => Self::Battery(Battery::new()),
            central_scene::ID => Self::CentralScene(CentralScene::new()),
            crc16_encap::ID => Self::Crc16Encap(Crc16Encap::new()),
            sensor_multilevel::ID => Self::SensorMultilevel(SensorMultilevel::new()),
            switch_binary::ID => Self::SwitchBinary(SwitchBinary::new()),
            version::ID => Self::Version(Version::new()),
            _ => return None,
        })
    }

    /// Class ids `create` accepts.
    pub const SUPPORTED: [u8; 8] = [
        basic::ID,
        switch_binary::ID,
        sensor_multilevel::ID,
        crc16_encap::ID,
        central_scene::ID,
        alarm::ID,
        battery::ID,
        version::ID,
    ];

    #[must_use]
    pub fn handler(&self) -> &dyn CommandClassHandler {
        match self {
            Self::Alarm(c) => c,
            Self::Basic(c) => c,
            Self::Battery(c) => c,
            Self::CentralScene(c) => c,
            Self::Crc16Encap(c) => c,
            Self::SensorMultilevel(c) => c,
            Self::SwitchBinary(c) => c,
            Self::Version(c) => c,
        }
    }

    pub fn handler_mut(&mut self) -> &mut dyn CommandClassHandler {
        match self {
            Self::Alarm(c) => c,
            Self::Basic(c) => c,
            Self::Battery(c) => c,
            Self::CentralScene(c) => c,
            Self::Crc16Encap(c) => c,
            Self::SensorMultilevel(c) => c,
            Self::SwitchBinary(c) => c,
            Self::Version(c) => c,
        }
    }

    #[must_use]
    pub fn id(&self) -> u8 {
        self.handler().id()
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.handler().name()
    }

    #[must_use]
    pub fn version(&self) -> u8 {
        self.handler().state().version()
    }

    /// Clamp a negotiated version to what the decoder understands.
    pub fn set_version(&mut self, version: u8) {
        let decoder_max = self.handler().max_version();
        let max = registry::class_info(self.id())
            .and_then(|c| c.max_version)
            .map_or(decoder_max, |m| m.min(decoder_max));
        let v = version.clamp(1, max);
        if v != version {
            log::info!(
                "{}: node reports version {version}, using {v}",
                self.name()
            );
        }
        self.handler_mut().state_mut().set_version(v);
    }

    #[must_use]
    pub fn state(&self) -> &CcState {
        self.handler().state()
    }

    pub fn state_mut(&mut self) -> &mut CcState {
        self.handler_mut().state_mut()
    }

    pub fn request_state(
        &mut self,
        flags: RequestFlags,
        instance: u8,
        node: &NodeData,
        queue: &mut dyn SendQueue,
    ) -> bool {
        self.handler_mut().request_state(flags, instance, node, queue)
    }

    /// Guarded by `is_get_supported`.
    pub fn request_value(
        &mut self,
        flags: RequestFlags,
        index: u8,
        instance: u8,
        node: &NodeData,
        queue: &mut dyn SendQueue,
    ) -> bool {
        if !self.state().is_get_supported() {
            log::debug!(
                "node {}: {} Get not supported, not requesting index {index}",
                node.node_id(),
                self.name()
            );
            return false;
        }
        self.handler_mut()
            .request_value(flags, index, instance, node, queue)
    }

    pub fn handle_msg(&mut self, data: &[u8], instance: u8, node: &mut NodeData) -> Handled {
        if data.is_empty() {
            log::warn!("node {}: empty {} payload", node.node_id(), self.name());
            return Handled::Rejected;
        }
        self.handler_mut().handle_msg(data, instance, node)
    }

    pub fn create_vars(&mut self, instance: u8, node: &mut NodeData) {
        self.handler_mut().create_vars(instance, node);
    }

    pub fn set_value(&mut self, value: &Value, node: &NodeData, queue: &mut dyn SendQueue) -> bool {
        self.handler_mut().set_value(value, node, queue)
    }
}

/// Enqueue `msg`; a closed queue is logged and reported as not sent.
pub(crate) fn send(queue: &mut dyn SendQueue, msg: Msg, priority: QueuePriority) -> bool {
    let label = msg.label().to_string();
    match queue.send_msg(msg, priority) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("{label}: {e}");
            false
        }
    }
}

/// Fail with `Truncated` unless `data` holds at least `needed` bytes.
pub(crate) fn require_len(data: &[u8], needed: usize) -> Result<(), ZWaveError> {
    if data.len() < needed {
        return Err(ZWaveError::Truncated {
            command: data.first().copied().unwrap_or(0),
            needed,
            actual: data.len(),
        });
    }
    Ok(())
}

const PRECISION_SHIFT: u8 = 5;
const PRECISION_MASK: u8 = 0xE0;
const SCALE_SHIFT: u8 = 3;
const SCALE_MASK: u8 = 0x18;
const SIZE_MASK: u8 = 0x07;

/// Decode `[precision|scale|size][value..]` starting at `data[0]`.
///
/// Returns the decimal, its scale and the number of bytes consumed.
pub fn extract_decimal(data: &[u8]) -> Result<(Decimal, u8, usize), ZWaveError> {
    let header = *data
        .first()
        .ok_or_else(|| ZWaveError::Protocol("missing decimal header".into()))?;
    let precision = (header & PRECISION_MASK) >> PRECISION_SHIFT;
    let scale = (header & SCALE_MASK) >> SCALE_SHIFT;
    let size = usize::from(header & SIZE_MASK);
    if !matches!(size, 1 | 2 | 4) {
        return Err(ZWaveError::Protocol(format!("invalid decimal size {size}")));
    }
    let bytes = data.get(1..=size).ok_or(ZWaveError::Truncated {
        command: header,
        needed: size + 1,
        actual: data.len(),
    })?;
    let raw = bytes
        .iter()
        .fold(0i64, |acc, &b| (acc << 8) | i64::from(b));
    // sign-extend from the field width
    let bits = 8 * size as u32;
    let raw = (raw << (64 - bits)) >> (64 - bits);
    let value = raw as f64 / 10f64.powi(i32::from(precision));
    Ok((Decimal::new(value, precision), scale, size + 1))
}

/// Encode with the smallest of 1, 2 or 4 bytes that holds the value.
pub fn append_decimal(out: &mut Vec<u8>, value: Decimal, scale: u8) -> Result<(), ZWaveError> {
    if value.precision > 7 || scale > 3 {
        return Err(ZWaveError::Protocol(format!(
            "cannot encode precision {} scale {scale}",
            value.precision
        )));
    }
    let scaled = (value.value * 10f64.powi(i32::from(value.precision))).round();
    if !scaled.is_finite() || scaled < f64::from(i32::MIN) || scaled > f64::from(i32::MAX) {
        return Err(ZWaveError::Protocol(format!("{value} does not fit 32 bits")));
    }
    let raw = scaled as i32;
    let size: usize = if i8::try_from(raw).is_ok() {
        1
    } else if i16::try_from(raw).is_ok() {
        2
    } else {
        4
    };
    out.push((value.precision << PRECISION_SHIFT) | (scale << SCALE_SHIFT) | size as u8);
    out.extend_from_slice(&raw.to_be_bytes()[4 - size..]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_decodes_signed_big_endian() {
        // precision 1, scale 0, size 2, 0x00FA = 250 -> 25.0
        let (d, scale, used) = extract_decimal(&[0x22, 0x00, 0xFA]).expect("decode");
        assert_eq!(d, Decimal::new(25.0, 1));
        assert_eq!((scale, used), (0, 3));

        // precision 2, scale 1, size 2, 0xFF38 = -200 -> -2.00
        let (d, scale, _) = extract_decimal(&[0x4A, 0xFF, 0x38]).expect("decode");
        assert_eq!(d, Decimal::new(-2.0, 2));
        assert_eq!(scale, 1);
    }

    #[test]
    fn decimal_rejects_bad_size_and_short_input() {
        assert!(extract_decimal(&[0x03, 0, 0, 0]).is_err());
        assert!(extract_decimal(&[0x04, 0, 0]).is_err());
        assert!(extract_decimal(&[]).is_err());
    }

    #[test]
    fn decimal_encoding_picks_smallest_width() {
        let mut out = Vec::new();
        append_decimal(&mut out, Decimal::new(21.5, 1), 0).expect("encode");
        assert_eq!(out, vec![0x22, 0x00, 0xD7]);

        out.clear();
        append_decimal(&mut out, Decimal::new(-1.0, 0), 2).expect("encode");
        assert_eq!(out, vec![0x11, 0xFF]);

        out.clear();
        append_decimal(&mut out, Decimal::new(70000.0, 0), 0).expect("encode");
        assert_eq!(out, vec![0x04, 0x00, 0x01, 0x11, 0x70]);
    }

    #[test]
    fn static_attempts_are_bounded() {
        let mut st = CcState::default();
        st.set_static_request(StaticRequests::VALUES);
        let limit = config().zwave_static_request_attempts;
        if limit == 0 {
            return;
        }
        for _ in 0..limit {
            assert!(st.take_static_attempt(StaticRequests::VALUES, "Test"));
        }
        assert!(!st.take_static_attempt(StaticRequests::VALUES, "Test"));
        assert!(!st.has_static_request(StaticRequests::VALUES));
    }

    #[test]
    fn answered_request_resets_attempts() {
        let mut st = CcState::default();
        st.set_static_request(StaticRequests::VERSION);
        assert!(st.take_static_attempt(StaticRequests::VERSION, "Test"));
        st.clear_static_request(StaticRequests::VERSION);
        assert!(!st.take_static_attempt(StaticRequests::VERSION, "Test"));
    }

    #[test]
    fn registration_table_covers_supported_ids() {
        for id in CommandClass::SUPPORTED {
            let cc = CommandClass::create(id).expect("registered");
            assert_eq!(cc.id(), id);
        }
        assert!(CommandClass::create(0x99).is_none());
    }
}
