//! Version (0x86): node firmware versions and per-class version negotiation.

use super::{require_len, send, CcState, CommandClassHandler, Handled, RequestFlags, StaticRequests};
use crate::msg::Msg;
use crate::node::NodeData;
use crate::queue::{QueuePriority, SendQueue};
use crate::value::{Value, ValueData};
use crate::value_id::{Genre, ValueType};

pub const ID: u8 = 0x86;
const NAME: &str = "COMMAND_CLASS_VERSION";

const GET: u8 = 0x11;
const REPORT: u8 = 0x12;
const COMMAND_CLASS_GET: u8 = 0x13;
const COMMAND_CLASS_REPORT: u8 = 0x14;

pub const INDEX_LIBRARY: u8 = 0;
pub const INDEX_PROTOCOL: u8 = 1;
pub const INDEX_APPLICATION: u8 = 2;

#[derive(Debug, Default)]
pub struct Version {
    state: CcState,
}

impl Version {
    #[must_use]
    pub fn new() -> Self {
        let mut state = CcState::default();
        state.set_static_request(StaticRequests::VALUES);
        Self { state }
    }

    /// Ask which version of `class_id` the node implements.
    pub fn request_command_class_version(
        &self,
        class_id: u8,
        node: &NodeData,
        queue: &mut dyn SendQueue,
    ) -> bool {
        let msg = Msg::new("VersionCmd_CommandClassGet", node.node_id(), ID)
            .append(COMMAND_CLASS_GET)
            .append(class_id)
            .with_expected_reply(COMMAND_CLASS_REPORT);
        send(queue, msg, QueuePriority::Query)
    }
}

impl CommandClassHandler for Version {
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

    fn request_state(
        &mut self,
        flags: RequestFlags,
        instance: u8,
        node: &NodeData,
        queue: &mut dyn SendQueue,
    ) -> bool {
        if flags.contains(RequestFlags::STATIC)
            && self.state.take_static_attempt(StaticRequests::VALUES, NAME)
        {
            return self.request_value(flags, INDEX_LIBRARY, instance, node, queue);
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
        if instance != 1 {
            return false;
        }
        let msg = Msg::new("VersionCmd_Get", node.node_id(), ID)
            .append(GET)
            .with_expected_reply(REPORT);
        send(queue, msg, QueuePriority::Query)
    }

    fn handle_msg(&mut self, data: &[u8], instance: u8, node: &mut NodeData) -> Handled {
        match data[0] {
            REPORT => {
                if let Err(e) = require_len(data, 6) {
                    log::warn!("node {}: version report: {e}", node.node_id());
                    return Handled::Rejected;
                }
                let library = data[1].to_string();
                let protocol = format!("{}.{:02}", data[2], data[3]);
                let application = format!("{}.{:02}", data[4], data[5]);
                log::info!(
                    "node {}: library={library} protocol={protocol} application={application}",
                    node.node_id()
                );
                node.refresh_value(ID, instance, INDEX_LIBRARY, ValueData::String(library));
                node.refresh_value(ID, instance, INDEX_PROTOCOL, ValueData::String(protocol));
                node.refresh_value(ID, instance, INDEX_APPLICATION, ValueData::String(application));
                self.state.clear_static_request(StaticRequests::VALUES);
                Handled::Consumed
            }
            COMMAND_CLASS_REPORT => {
                if let Err(e) = require_len(data, 3) {
                    log::warn!("node {}: command class version report: {e}", node.node_id());
                    return Handled::Rejected;
                }
                Handled::Negotiated {
                    class_id: data[1],
                    version: data[2],
                }
            }
            _ => Handled::No,
        }
    }

    fn create_vars(&mut self, instance: u8, node: &mut NodeData) {
        if instance != 1 {
            return;
        }
        for (index, label) in [
            (INDEX_LIBRARY, "Library Version"),
            (INDEX_PROTOCOL, "Protocol Version"),
            (INDEX_APPLICATION, "Application Version"),
        ] {
            let id = node.value_id(Genre::System, ID, instance, index, ValueType::String);
            node.create_value(Value::new(id, label).with_read_only(true));
        }
    }
}
