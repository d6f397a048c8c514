//! CRC-16 Encapsulation (0x56).
//!
//! Payload layout: `[0x01][inner class][inner payload..][crc hi][crc lo]`.
//! The checksum covers every byte before the trailing two.

use super::{require_len, CcState, CommandClassHandler, Handled};
use crate::config::{config, hex_dump};
use crate::crc16::crc16;
use crate::error::ZWaveError;
use crate::msg::Msg;
use crate::node::NodeData;

pub const ID: u8 = 0x56;
const NAME: &str = "COMMAND_CLASS_CRC_16_ENCAP";

const ENCAP: u8 = 0x01;

/// Sub-command, inner class id, one inner byte, two checksum bytes.
const MIN_LEN: usize = 5;

/// Check the trailing CRC and split out the inner class id and payload.
pub fn unwrap(data: &[u8]) -> Result<(u8, &[u8]), ZWaveError> {
    require_len(data, MIN_LEN)?;
    let (body, tail) = data.split_at(data.len() - 2);
    let expected = u16::from_be_bytes([tail[0], tail[1]]);
    let actual = crc16(body);
    if expected != actual {
        return Err(ZWaveError::CrcMismatch { expected, actual });
    }
    Ok((body[1], &body[2..]))
}

/// Wrap an outgoing request in a CRC-16 envelope.
#[must_use]
pub fn encapsulate(msg: &Msg) -> Msg {
    let mut body = Vec::with_capacity(msg.payload().len() + 2);
    body.push(ENCAP);
    body.push(msg.class_id());
    body.extend_from_slice(msg.payload());
    let crc = crc16(&body);
    let mut out = Msg::new(
        format!("{} (CRC16)", msg.label()),
        msg.node_id(),
        ID,
    )
    .with_instance(msg.instance())
    .extend(body)
    .extend(crc.to_be_bytes());
    if let Some(reply) = msg.expected_reply() {
        out = out.with_expected_reply(reply);
    }
    out
}

#[derive(Debug, Default)]
pub struct Crc16Encap {
    state: CcState,
}

impl Crc16Encap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandClassHandler for Crc16Encap {
    fn id(&self) -> u8 {
        ID
    }
    fn name(&self) -> &'static str {
        NAME
    }
    fn state(&self) -> &CcState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut CcState {
        &mut self.state
    }
    fn wants_version(&self) -> bool {
        false
    }

    fn handle_msg(&mut self, data: &[u8], _instance: u8, node: &mut NodeData) -> Handled {
        if data[0] != ENCAP {
            return Handled::No;
        }
        match unwrap(data) {
            Ok((class_id, payload)) => {
                if config().zwave_log_frames {
                    log::debug!(
                        "node {}: CRC16 ok, inner 0x{class_id:02X} [{}]",
                        node.node_id(),
                        hex_dump(payload)
                    );
                }
                Handled::Forward {
                    class_id,
                    payload: payload.to_vec(),
                }
            }
            Err(e) => {
                log::warn!("node {}: dropping CRC16 frame: {e}", node.node_id());
                Handled::Rejected
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_frame_unwraps() {
        // Basic Get wrapped: 56 01 20 02 4D 26
        let (class_id, payload) = unwrap(&[0x01, 0x20, 0x02, 0x4D, 0x26]).expect("crc ok");
        assert_eq!(class_id, 0x20);
        assert_eq!(payload, &[0x02]);
    }

    #[test]
    fn corrupted_frame_is_refused() {
        let err = unwrap(&[0x01, 0x20, 0x03, 0x4D, 0x26]).unwrap_err();
        assert!(matches!(err, ZWaveError::CrcMismatch { expected: 0x4D26, .. }));
        assert!(matches!(
            unwrap(&[0x01, 0x20, 0x4D, 0x26]),
            Err(ZWaveError::Truncated { .. })
        ));
    }

    #[test]
    fn encapsulated_message_carries_valid_crc() {
        let inner = Msg::new("BasicCmd_Get", 7, 0x20)
            .append(0x02)
            .with_expected_reply(0x03);
        let outer = encapsulate(&inner);
        assert_eq!(outer.class_id(), ID);
        assert_eq!(outer.payload(), &[0x01, 0x20, 0x02, 0x4D, 0x26]);
        assert_eq!(outer.expected_reply(), Some(0x03));
        let (class_id, payload) = unwrap(outer.payload()).expect("round trip");
        assert_eq!((class_id, payload), (0x20, &[0x02][..]));
    }
}
