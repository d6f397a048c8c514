//! Battery (0x80).

use super::{require_len, send, CcState, CommandClassHandler, Handled, RequestFlags};
use crate::msg::Msg;
use crate::node::NodeData;
use crate::queue::{QueuePriority, SendQueue};
use crate::value::{Value, ValueData};
use crate::value_id::{Genre, ValueType};

pub const ID: u8 = 0x80;
const NAME: &str = "COMMAND_CLASS_BATTERY";

const GET: u8 = 0x02;
const REPORT: u8 = 0x03;

/// Level byte meaning "battery low".
const LOW_BATTERY_WARNING: u8 = 0xFF;

#[derive(Debug, Default)]
pub struct Battery {
    state: CcState,
}

impl Battery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandClassHandler for Battery {
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

    fn request_state(
        &mut self,
        flags: RequestFlags,
        instance: u8,
        node: &NodeData,
        queue: &mut dyn SendQueue,
    ) -> bool {
        if flags.contains(RequestFlags::DYNAMIC) && self.state.is_get_supported() {
            return self.request_value(flags, 0, instance, node, queue);
        }
        false
    }

    fn request_value(
        &mut self,
        _flags: RequestFlags,
        _index: u8,
        instance: u8,
        node: &NodeData,
        queue: &mut dyn SendQueue,
    ) -> bool {
        let msg = Msg::new("BatteryCmd_Get", node.node_id(), ID)
            .with_instance(instance)
            .append(GET)
            .with_expected_reply(REPORT);
        send(queue, msg, QueuePriority::Poll)
    }

    fn handle_msg(&mut self, data: &[u8], instance: u8, node: &mut NodeData) -> Handled {
        if data[0] != REPORT {
            return Handled::No;
        }
        if let Err(e) = require_len(data, 2) {
            log::warn!("node {}: battery report: {e}", node.node_id());
            return Handled::Rejected;
        }
        let mut level = data[1];
        if level == LOW_BATTERY_WARNING {
            log::warn!("node {}: low battery warning", node.node_id());
            level = 0;
        }
        node.refresh_value(ID, instance, 0, ValueData::Byte(level));
        Handled::Consumed
    }

    fn create_vars(&mut self, instance: u8, node: &mut NodeData) {
        let id = node.value_id(Genre::User, ID, instance, 0, ValueType::Byte);
        node.create_value(
            Value::new(id, "Battery Level")
                .with_units("%")
                .with_read_only(true),
        );
    }
}
