//! Alarm (0x71): type/level reports, v2 source node and per-type levels.

use super::{require_len, send, CcState, CommandClassHandler, Handled, RequestFlags, StaticRequests};
use crate::error::ZWaveError;
use crate::msg::Msg;
use crate::node::NodeData;
use crate::queue::{QueuePriority, SendQueue};
use crate::value::{Value, ValueData};
use crate::value_id::{Genre, ValueType};

pub const ID: u8 = 0x71;
const NAME: &str = "COMMAND_CLASS_ALARM";

const GET: u8 = 0x04;
const REPORT: u8 = 0x05;
const SUPPORTED_GET: u8 = 0x07;
const SUPPORTED_REPORT: u8 = 0x08;

pub const INDEX_TYPE: u8 = 0;
pub const INDEX_LEVEL: u8 = 1;
pub const INDEX_SOURCE_NODE_ID: u8 = 2;
/// Value index of alarm type 0; type `n` lives at `n + TYPE_INDEX_BASE`.
pub const TYPE_INDEX_BASE: u8 = 3;

pub const ALARM_TYPE_NAMES: [&str; 11] = [
    "General",
    "Smoke",
    "Carbon Monoxide",
    "Carbon Dioxide",
    "Heat",
    "Flood",
    "Access Control",
    "Burglar",
    "Power Management",
    "System",
    "Emergency",
];

#[must_use]
pub fn alarm_type_name(alarm_type: u8) -> Option<&'static str> {
    ALARM_TYPE_NAMES.get(usize::from(alarm_type)).copied()
}

/// Decoded Alarm Report. The v2 fields are only read when the node runs
/// version 2 and the frame is long enough to carry them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlarmReport {
    V1 {
        alarm_type: u8,
        level: u8,
    },
    V2 {
        alarm_type: u8,
        level: u8,
        source_node_id: u8,
        zwave_type: u8,
        zwave_level: u8,
    },
}

impl AlarmReport {
    pub fn parse(data: &[u8], version: u8) -> Result<Self, ZWaveError> {
        require_len(data, 3)?;
        if version > 1 && data.len() >= 7 {
            return Ok(Self::V2 {
                alarm_type: data[1],
                level: data[2],
                source_node_id: data[4],
                zwave_type: data[5],
                zwave_level: data[6],
            });
        }
        Ok(Self::V1 {
            alarm_type: data[1],
            level: data[2],
        })
    }
}

/// Alarm types flagged in a Supported Report bitmap.
pub fn parse_supported(data: &[u8]) -> Result<Vec<u8>, ZWaveError> {
    require_len(data, 2)?;
    let num_bytes = usize::from(data[1] & 0x1F);
    require_len(data, 2 + num_bytes)?;
    let mut types = Vec::new();
    for (byte_idx, &bits) in data[2..2 + num_bytes].iter().enumerate() {
        for bit in 0..8 {
            if bits & (1 << bit) != 0 {
                if let Ok(t) = u8::try_from(byte_idx * 8 + bit) {
                    types.push(t);
                }
            }
        }
    }
    Ok(types)
}

#[derive(Debug, Default)]
pub struct Alarm {
    state: CcState,
}

impl Alarm {
    #[must_use]
    pub fn new() -> Self {
        let mut state = CcState::default();
        state.set_static_request(StaticRequests::VALUES);
        Self { state }
    }

    fn create_type_value(node: &mut NodeData, instance: u8, alarm_type: u8) -> bool {
        let Some(name) = alarm_type_name(alarm_type) else {
            log::warn!(
                "node {}: unknown alarm type {alarm_type}, skipping",
                node.node_id()
            );
            return false;
        };
        let id = node.value_id(
            Genre::User,
            ID,
            instance,
            alarm_type + TYPE_INDEX_BASE,
            ValueType::Byte,
        );
        node.create_value(Value::new(id, name).with_read_only(true));
        true
    }

    fn create_source_node_value(node: &mut NodeData, instance: u8) {
        let id = node.value_id(Genre::User, ID, instance, INDEX_SOURCE_NODE_ID, ValueType::Byte);
        node.create_value(Value::new(id, "SourceNodeId").with_read_only(true));
    }

    fn supported_types(node: &NodeData, instance: u8) -> Vec<u8> {
        (0..ALARM_TYPE_NAMES.len() as u8)
            .filter(|t| node.find_value(ID, instance, t + TYPE_INDEX_BASE).is_some())
            .collect()
    }

    fn apply_report(&mut self, report: AlarmReport, instance: u8, node: &mut NodeData) {
        let (alarm_type, level) = match report {
            AlarmReport::V1 { alarm_type, level } | AlarmReport::V2 { alarm_type, level, .. } => {
                (alarm_type, level)
            }
        };
        log::info!(
            "node {}: alarm report type={alarm_type} level={level}",
            node.node_id()
        );
        node.refresh_value(ID, instance, INDEX_TYPE, ValueData::Byte(alarm_type));
        node.refresh_value(ID, instance, INDEX_LEVEL, ValueData::Byte(level));

        if let AlarmReport::V2 {
            source_node_id,
            zwave_type,
            zwave_level,
            ..
        } = report
        {
            Self::create_source_node_value(node, instance);
            node.refresh_value(ID, instance, INDEX_SOURCE_NODE_ID, ValueData::Byte(source_node_id));
            if Self::create_type_value(node, instance, zwave_type) {
                node.refresh_value(
                    ID,
                    instance,
                    zwave_type + TYPE_INDEX_BASE,
                    ValueData::Byte(zwave_level),
                );
            }
        }
    }
}

impl CommandClassHandler for Alarm {
    fn id(&self) -> u8 {
        ID
    }
    fn name(&self) -> &'static str {
        NAME
    }
    fn max_version(&self) -> u8 {
        2
    }
    fn state(&self) -> &CcState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut CcState {
        &mut self.state
    }

    fn request_state(
        &mut self,
        flags: RequestFlags,
        instance: u8,
        node: &NodeData,
        queue: &mut dyn SendQueue,
    ) -> bool {
        let mut sent = false;
        if flags.contains(RequestFlags::STATIC)
            && self.state.version() > 1
            && self.state.take_static_attempt(StaticRequests::VALUES, NAME)
        {
            let msg = Msg::new("AlarmCmd_SupportedGet", node.node_id(), ID)
                .with_instance(instance)
                .append(SUPPORTED_GET)
                .with_expected_reply(SUPPORTED_REPORT);
            sent |= send(queue, msg, QueuePriority::Query);
        }
        if flags.contains(RequestFlags::DYNAMIC) && self.state.is_get_supported() {
            sent |= self.request_value(flags, 0, instance, node, queue);
        }
        sent
    }

    fn request_value(
        &mut self,
        _flags: RequestFlags,
        index: u8,
        instance: u8,
        node: &NodeData,
        queue: &mut dyn SendQueue,
    ) -> bool {
        if self.state.version() == 1 {
            let msg = Msg::new("AlarmCmd_Get", node.node_id(), ID)
                .with_instance(instance)
                .append(GET)
                .with_expected_reply(REPORT);
            return send(queue, msg, QueuePriority::Send);
        }
        let types = if index >= TYPE_INDEX_BASE {
            vec![index - TYPE_INDEX_BASE]
        } else {
            Self::supported_types(node, instance)
        };
        let mut sent = false;
        for t in types {
            let msg = Msg::new("AlarmCmd_Get", node.node_id(), ID)
                .with_instance(instance)
                .append(GET)
                .append(0x00)
                .append(t)
                .with_expected_reply(REPORT);
            sent |= send(queue, msg, QueuePriority::Send);
        }
        sent
    }

    fn handle_msg(&mut self, data: &[u8], instance: u8, node: &mut NodeData) -> Handled {
        match data[0] {
            REPORT => match AlarmReport::parse(data, self.state.version()) {
                Ok(report) => {
                    self.apply_report(report, instance, node);
                    Handled::Consumed
                }
                Err(e) => {
                    log::warn!("node {}: alarm report: {e}", node.node_id());
                    Handled::Rejected
                }
            },
            SUPPORTED_REPORT => match parse_supported(data) {
                Ok(types) => {
                    Self::create_source_node_value(node, instance);
                    for t in types {
                        if Self::create_type_value(node, instance, t) {
                            log::info!(
                                "node {}: supports alarm type {}",
                                node.node_id(),
                                ALARM_TYPE_NAMES[usize::from(t)]
                            );
                        }
                    }
                    self.state.clear_static_request(StaticRequests::VALUES);
                    Handled::Consumed
                }
                Err(e) => {
                    log::warn!("node {}: alarm supported report: {e}", node.node_id());
                    Handled::Rejected
                }
            },
            _ => Handled::No,
        }
    }

    fn create_vars(&mut self, instance: u8, node: &mut NodeData) {
        let type_id = node.value_id(Genre::User, ID, instance, INDEX_TYPE, ValueType::Byte);
        node.create_value(Value::new(type_id, "Alarm Type").with_read_only(true));
        let level_id = node.value_id(Genre::User, ID, instance, INDEX_LEVEL, ValueType::Byte);
        node.create_value(Value::new(level_id, "Alarm Level").with_read_only(true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_layout_depends_on_version_and_length() {
        let frame = [0x05, 0x01, 0x63, 0x00, 0x05, 0x03, 0x50];
        assert_eq!(
            AlarmReport::parse(&frame, 1).expect("v1"),
            AlarmReport::V1 {
                alarm_type: 1,
                level: 0x63
            }
        );
        assert_eq!(
            AlarmReport::parse(&frame, 2).expect("v2"),
            AlarmReport::V2 {
                alarm_type: 1,
                level: 0x63,
                source_node_id: 5,
                zwave_type: 3,
                zwave_level: 0x50
            }
        );
        // v2 node sending a short frame falls back to the v1 fields
        assert!(matches!(
            AlarmReport::parse(&frame[..3], 2),
            Ok(AlarmReport::V1 { .. })
        ));
        assert!(matches!(
            AlarmReport::parse(&frame[..2], 2),
            Err(ZWaveError::Truncated { needed: 3, .. })
        ));
    }

    #[test]
    fn supported_bitmap_lists_set_bits() {
        assert_eq!(
            parse_supported(&[0x08, 0x01, 0b1000_0101]).expect("parse"),
            vec![0, 2, 7]
        );
        assert_eq!(
            parse_supported(&[0x08, 0x02, 0x00, 0b0000_1000]).expect("parse"),
            vec![11]
        );
        assert!(parse_supported(&[0x08, 0x02, 0x01]).is_err());
    }

    #[test]
    fn type_names_cover_eleven_entries() {
        assert_eq!(alarm_type_name(0), Some("General"));
        assert_eq!(alarm_type_name(7), Some("Burglar"));
        assert_eq!(alarm_type_name(10), Some("Emergency"));
        assert_eq!(alarm_type_name(11), None);
    }
}
