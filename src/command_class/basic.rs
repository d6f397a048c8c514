//! Basic (0x20).

use super::{require_len, send, CcState, CommandClassHandler, Handled, RequestFlags};
use crate::msg::Msg;
use crate::node::NodeData;
use crate::queue::{QueuePriority, SendQueue};
use crate::value::{Value, ValueContent, ValueData};
use crate::value_id::{Genre, ValueType};

pub const ID: u8 = 0x20;
const NAME: &str = "COMMAND_CLASS_BASIC";

const SET: u8 = 0x01;
const GET: u8 = 0x02;
const REPORT: u8 = 0x03;

#[derive(Debug, Default)]
pub struct Basic {
    state: CcState,
}

impl Basic {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandClassHandler for Basic {
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
        let msg = Msg::new("BasicCmd_Get", node.node_id(), ID)
            .with_instance(instance)
            .append(GET)
            .with_expected_reply(REPORT);
        send(queue, msg, QueuePriority::Send)
    }

    fn handle_msg(&mut self, data: &[u8], instance: u8, node: &mut NodeData) -> Handled {
        if data[0] != REPORT {
            return Handled::No;
        }
        if let Err(e) = require_len(data, 2) {
            log::warn!("node {}: basic report: {e}", node.node_id());
            return Handled::Rejected;
        }
        node.refresh_value(ID, instance, 0, ValueData::Byte(data[1]));
        Handled::Consumed
    }

    fn create_vars(&mut self, instance: u8, node: &mut NodeData) {
        let id = node.value_id(Genre::Basic, ID, instance, 0, ValueType::Byte);
        node.create_value(Value::new(id, "Basic"));
    }

    fn set_value(&mut self, value: &Value, node: &NodeData, queue: &mut dyn SendQueue) -> bool {
        let ValueContent::Byte(v) = value.content() else {
            return false;
        };
        let level = v.target().copied().unwrap_or(*v.get());
        let instance = value.id().instance();
        let set = Msg::new("BasicCmd_Set", node.node_id(), ID)
            .with_instance(instance)
            .append(SET)
            .append(level);
        let sent = send(queue, set, QueuePriority::Command);
        if sent && self.state.is_get_supported() {
            self.request_value(RequestFlags::DYNAMIC, 0, instance, node, queue);
        }
        sent
    }
}
