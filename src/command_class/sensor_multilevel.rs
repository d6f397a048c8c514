//! Multilevel Sensor (0x31). One Decimal value per sensor type, indexed by
//! the type number and created when the type is first seen.

use super::{
    extract_decimal, require_len, send, CcState, CommandClassHandler, Handled, RequestFlags,
    StaticRequests,
};
use crate::error::ZWaveError;
use crate::msg::Msg;
use crate::node::NodeData;
use crate::queue::{QueuePriority, SendQueue};
use crate::value::{Decimal, Value, ValueData};
use crate::value_id::{Genre, ValueType};

pub const ID: u8 = 0x31;
const NAME: &str = "COMMAND_CLASS_SENSOR_MULTILEVEL";

const SUPPORTED_GET: u8 = 0x01;
const SUPPORTED_REPORT: u8 = 0x02;
const GET: u8 = 0x04;
const REPORT: u8 = 0x05;

/// Label and per-scale units for the common sensor types.
const SENSOR_TYPES: &[(u8, &str, [&str; 4])] = &[
    (1, "Temperature", ["C", "F", "", ""]),
    (2, "General", ["%", "", "", ""]),
    (3, "Luminance", ["%", "lux", "", ""]),
    (4, "Power", ["W", "BTU/h", "", ""]),
    (5, "Relative Humidity", ["%", "g/m3", "", ""]),
    (6, "Velocity", ["m/s", "mph", "", ""]),
    (7, "Direction", ["", "", "", ""]),
    (8, "Atmospheric Pressure", ["kPa", "inHg", "", ""]),
    (9, "Barometric Pressure", ["kPa", "inHg", "", ""]),
    (10, "Solar Radiation", ["W/m2", "", "", ""]),
    (11, "Dew Point", ["C", "F", "", ""]),
    (12, "Rain Rate", ["mm/h", "in/h", "", ""]),
    (13, "Tide Level", ["m", "ft", "", ""]),
    (14, "Weight", ["kg", "lb", "", ""]),
    (15, "Voltage", ["V", "mV", "", ""]),
    (16, "Current", ["A", "mA", "", ""]),
    (17, "CO2 Level", ["ppm", "", "", ""]),
];

#[must_use]
pub fn sensor_label(sensor_type: u8) -> String {
    SENSOR_TYPES
        .iter()
        .find(|(t, _, _)| *t == sensor_type)
        .map_or_else(|| format!("Sensor {sensor_type}"), |(_, label, _)| (*label).to_string())
}

#[must_use]
pub fn sensor_units(sensor_type: u8, scale: u8) -> &'static str {
    SENSOR_TYPES
        .iter()
        .find(|(t, _, _)| *t == sensor_type)
        .and_then(|(_, _, units)| units.get(usize::from(scale)).copied())
        .unwrap_or("")
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorReport {
    pub sensor_type: u8,
    pub scale: u8,
    pub value: Decimal,
}

impl SensorReport {
    pub fn parse(data: &[u8]) -> Result<Self, ZWaveError> {
        require_len(data, 4)?;
        let (value, scale, _) = extract_decimal(&data[2..])?;
        Ok(Self {
            sensor_type: data[1],
            scale,
            value,
        })
    }
}

#[derive(Debug, Default)]
pub struct SensorMultilevel {
    state: CcState,
}

impl SensorMultilevel {
    #[must_use]
    pub fn new() -> Self {
        let mut state = CcState::default();
        state.set_static_request(StaticRequests::VALUES);
        Self { state }
    }

    fn create_sensor_value(node: &mut NodeData, instance: u8, sensor_type: u8, scale: u8) {
        let id = node.value_id(Genre::User, ID, instance, sensor_type, ValueType::Decimal);
        node.create_value(
            Value::new(id, sensor_label(sensor_type))
                .with_units(sensor_units(sensor_type, scale))
                .with_read_only(true),
        );
    }
}

impl CommandClassHandler for SensorMultilevel {
    fn id(&self) -> u8 {
        ID
    }
    fn name(&self) -> &'static str {
        NAME
    }
    fn max_version(&self) -> u8 {
        5
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
        if flags.contains(RequestFlags::STATIC) {
            if self.state.version() < 5 {
                // nothing to discover before v5; types appear with their reports
                self.state.clear_static_request(StaticRequests::VALUES);
            } else if self.state.take_static_attempt(StaticRequests::VALUES, NAME) {
                let msg = Msg::new("SensorMultilevelCmd_SupportedGet", node.node_id(), ID)
                    .with_instance(instance)
                    .append(SUPPORTED_GET)
                    .with_expected_reply(SUPPORTED_REPORT);
                sent |= send(queue, msg, QueuePriority::Query);
            }
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
        let mut msg = Msg::new("SensorMultilevelCmd_Get", node.node_id(), ID)
            .with_instance(instance)
            .append(GET)
            .with_expected_reply(REPORT);
        if self.state.version() >= 5 && index != 0 {
            msg = msg.append(index);
        }
        send(queue, msg, QueuePriority::Send)
    }

    fn handle_msg(&mut self, data: &[u8], instance: u8, node: &mut NodeData) -> Handled {
        match data[0] {
            REPORT => match SensorReport::parse(data) {
                Ok(report) => {
                    Self::create_sensor_value(node, instance, report.sensor_type, report.scale);
                    if let Some(v) = node.find_value_mut(ID, instance, report.sensor_type) {
                        v.set_units(sensor_units(report.sensor_type, report.scale));
                    }
                    node.refresh_value(
                        ID,
                        instance,
                        report.sensor_type,
                        ValueData::Decimal(report.value),
                    );
                    Handled::Consumed
                }
                Err(e) => {
                    log::warn!("node {}: sensor report: {e}", node.node_id());
                    Handled::Rejected
                }
            },
            SUPPORTED_REPORT => {
                for (byte_idx, &bits) in data[1..].iter().enumerate() {
                    for bit in 0..8u8 {
                        if bits & (1 << bit) == 0 {
                            continue;
                        }
                        match u8::try_from(byte_idx * 8 + usize::from(bit) + 1) {
                            Ok(sensor_type) => {
                                Self::create_sensor_value(node, instance, sensor_type, 0);
                            }
                            Err(_) => log::warn!(
                                "node {}: sensor bitmap too long, ignoring rest",
                                node.node_id()
                            ),
                        }
                    }
                }
                self.state.clear_static_request(StaticRequests::VALUES);
                Handled::Consumed
            }
            _ => Handled::No,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_decodes_type_scale_and_value() {
        // temperature, precision 1, scale 1 (F), size 2, 0x02EE = 750 -> 75.0
        let r = SensorReport::parse(&[0x05, 0x01, 0x2A, 0x02, 0xEE]).expect("parse");
        assert_eq!(r.sensor_type, 1);
        assert_eq!(r.scale, 1);
        assert_eq!(r.value, Decimal::new(75.0, 1));
        assert_eq!(sensor_units(r.sensor_type, r.scale), "F");
    }

    #[test]
    fn short_report_is_refused() {
        assert!(SensorReport::parse(&[0x05, 0x01, 0x2A, 0x02]).is_err());
        assert!(SensorReport::parse(&[0x05, 0x01]).is_err());
    }

    #[test]
    fn unknown_type_gets_generic_label() {
        assert_eq!(sensor_label(3), "Luminance");
        assert_eq!(sensor_label(200), "Sensor 200");
        assert_eq!(sensor_units(200, 0), "");
    }
}
