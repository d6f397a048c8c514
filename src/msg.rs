use std::fmt;
use std::sync::atomic::{AtomicU16, Ordering};

use crate::config::{config, hex_dump};
use crate::error::ZWaveError;

// Sequence number for log correlation only; replies are matched by
// command class and sub-command.
static SEQUENCE: AtomicU16 = AtomicU16::new(1);

fn next_sequence() -> u16 {
    match SEQUENCE.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
        Some(if v == 0xFFFF { 1 } else { v + 1 })
    }) {
        Ok(prev) | Err(prev) => prev,
    }
}

/// Outgoing command-class request.
///
/// Built with `Msg::new(...).append(..)`, serialized by `build()` into
/// `[node_id][payload_len][class_id][sub_command][args..][transmit_options]`.
#[derive(Clone, PartialEq, Eq)]
pub struct Msg {
    label: String,
    node_id: u8,
    instance: u8,
    class_id: u8,
    payload: Vec<u8>,
    expected_reply: Option<u8>,
    transmit_options: u8,
    sequence: u16,
}

impl Msg {
    #[must_use]
    pub fn new(label: impl Into<String>, node_id: u8, class_id: u8) -> Self {
        Self {
            label: label.into(),
            node_id,
            instance: 1,
            class_id,
            payload: Vec::new(),
            expected_reply: None,
            transmit_options: config().zwave_transmit_options,
            sequence: next_sequence(),
        }
    }

    /// Append one payload byte (sub-command first, then arguments).
    #[must_use]
    pub fn append(mut self, byte: u8) -> Self {
        self.payload.push(byte);
        self
    }

    #[must_use]
    pub fn extend<B: AsRef<[u8]>>(mut self, bytes: B) -> Self {
        self.payload.extend_from_slice(bytes.as_ref());
        self
    }

    /// Report sub-command that answers this request.
    #[must_use]
    pub const fn with_expected_reply(mut self, sub_command: u8) -> Self {
        self.expected_reply = Some(sub_command);
        self
    }

    #[must_use]
    pub const fn with_instance(mut self, instance: u8) -> Self {
        self.instance = instance;
        self
    }

    #[must_use]
    pub const fn with_transmit_options(mut self, options: u8) -> Self {
        self.transmit_options = options;
        self
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
    #[must_use]
    pub const fn node_id(&self) -> u8 {
        self.node_id
    }
    #[must_use]
    pub const fn instance(&self) -> u8 {
        self.instance
    }
    #[must_use]
    pub const fn class_id(&self) -> u8 {
        self.class_id
    }
    #[must_use]
    pub fn sub_command(&self) -> Option<u8> {
        self.payload.first().copied()
    }
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
    #[must_use]
    pub const fn expected_reply(&self) -> Option<u8> {
        self.expected_reply
    }
    #[must_use]
    pub const fn sequence(&self) -> u16 {
        self.sequence
    }

    /// True when `class_id`/`sub_command` is the report this message waits for.
    #[must_use]
    pub fn is_answered_by(&self, class_id: u8, sub_command: u8) -> bool {
        self.class_id == class_id && self.expected_reply == Some(sub_command)
    }

    /// Serialize to the request frame. Fails when the payload does not fit the
    /// one-byte length field.
    pub fn build(&self) -> Result<Vec<u8>, ZWaveError> {
        let len = self
            .payload
            .len()
            .checked_add(1)
            .and_then(|n| u8::try_from(n).ok())
            .ok_or_else(|| ZWaveError::Protocol(format!("{}: payload too large", self.label)))?;
        let mut out = Vec::with_capacity(usize::from(len) + 3);
        out.push(self.node_id);
        out.push(len);
        out.push(self.class_id);
        out.extend_from_slice(&self.payload);
        out.push(self.transmit_options);
        if config().zwave_log_frames {
            log::debug!("[MSG#{}] {} -> {}", self.sequence, self.label, hex_dump(&out));
        }
        Ok(out)
    }
}

impl fmt::Debug for Msg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Msg")
            .field("label", &self.label)
            .field("node_id", &self.node_id)
            .field("instance", &self.instance)
            .field("class_id", &format_args!("0x{:02X}", self.class_id))
            .field("payload", &format_args!("[{}]", hex_dump(&self.payload)))
            .field("expected_reply", &self.expected_reply)
            .finish()
    }
}
