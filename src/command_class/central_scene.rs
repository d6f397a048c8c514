//! Central Scene (0x5B): scene discovery and scene activation events.

use super::{require_len, send, CcState, CommandClassHandler, Handled, RequestFlags, StaticRequests};
use crate::error::ZWaveError;
use crate::msg::Msg;
use crate::node::NodeData;
use crate::queue::{QueuePriority, SendQueue};
use crate::value::{Value, ValueData};
use crate::value_id::{Genre, ValueType};

pub const ID: u8 = 0x5B;
const NAME: &str = "COMMAND_CLASS_CENTRAL_SCENE";

const CAPABILITY_GET: u8 = 0x01;
const CAPABILITY_REPORT: u8 = 0x02;
const SET: u8 = 0x03;

pub const INDEX_SCENE_COUNT: u8 = 0;

/// Seconds encoded by a scene duration byte.
#[must_use]
pub const fn decode_duration(byte: u8) -> u32 {
    match byte {
        0x00 | 0xFF => 0,
        0x01..=0x7F => byte as u32,
        _ => 60 * byte as u32,
    }
}

/// Scene activation: which scene and how long it was held.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneActivation {
    pub scene: u8,
    pub duration_secs: u32,
}

impl SceneActivation {
    pub fn parse(data: &[u8]) -> Result<Self, ZWaveError> {
        require_len(data, 4)?;
        Ok(Self {
            duration_secs: decode_duration(data[2]),
            scene: data[3],
        })
    }
}

#[derive(Debug, Default)]
pub struct CentralScene {
    state: CcState,
    /// Scene count from configuration; wins over the device's report.
    configured_scene_count: Option<u8>,
}

impl CentralScene {
    #[must_use]
    pub fn new() -> Self {
        let mut state = CcState::default();
        state.set_static_request(StaticRequests::VALUES);
        Self {
            state,
            configured_scene_count: None,
        }
    }

    #[must_use]
    pub const fn configured_scene_count(&self) -> Option<u8> {
        self.configured_scene_count
    }

    pub fn set_configured_scene_count(&mut self, count: Option<u8>) {
        self.configured_scene_count = count;
    }

    fn create_scenes(node: &mut NodeData, instance: u8, count: u8) {
        for scene in 1..=count {
            let id = node.value_id(Genre::User, ID, instance, scene, ValueType::Int);
            // every activation is a real event; never hold one back for confirmation
            node.create_value(
                Value::new(id, format!("Scene {scene}"))
                    .with_read_only(true)
                    .with_units("s")
                    .with_verify_changes(false),
            );
        }
    }
}

impl CommandClassHandler for CentralScene {
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
        if flags.contains(RequestFlags::STATIC)
            && self.state.take_static_attempt(StaticRequests::VALUES, NAME)
        {
            return self.request_value(flags, INDEX_SCENE_COUNT, instance, node, queue);
        }
        false
    }

    fn request_value(
        &mut self,
        _flags: RequestFlags,
        index: u8,
        instance: u8,
        node: &NodeData,
        queue: &mut dyn SendQueue,
    ) -> bool {
        if index != INDEX_SCENE_COUNT {
            // scene values only change on activation; there is nothing to Get
            return false;
        }
        let msg = Msg::new("CentralSceneCmd_Capability_Get", node.node_id(), ID)
            .with_instance(instance)
            .append(CAPABILITY_GET)
            .with_expected_reply(CAPABILITY_REPORT);
        send(queue, msg, QueuePriority::Query)
    }

    fn handle_msg(&mut self, data: &[u8], instance: u8, node: &mut NodeData) -> Handled {
        match data[0] {
            CAPABILITY_REPORT => {
                if let Err(e) = require_len(data, 2) {
                    log::warn!("node {}: central scene capability: {e}", node.node_id());
                    return Handled::Rejected;
                }
                let reported = data[1];
                let count = match self.configured_scene_count {
                    Some(configured) if configured != reported => {
                        log::info!(
                            "node {}: device reports {reported} scenes, using configured {configured}",
                            node.node_id()
                        );
                        configured
                    }
                    _ => reported,
                };
                node.refresh_value(ID, instance, INDEX_SCENE_COUNT, ValueData::Int(i32::from(count)));
                Self::create_scenes(node, instance, count);
                self.state.clear_static_request(StaticRequests::VALUES);
                Handled::Consumed
            }
            SET => {
                let activation = match SceneActivation::parse(data) {
                    Ok(a) => a,
                    Err(e) => {
                        log::warn!("node {}: central scene set: {e}", node.node_id());
                        return Handled::Rejected;
                    }
                };
                if activation.scene == INDEX_SCENE_COUNT
                    || node.find_value(ID, instance, activation.scene).is_none()
                {
                    log::warn!(
                        "node {}: activation of unknown scene {}",
                        node.node_id(),
                        activation.scene
                    );
                    return Handled::Rejected;
                }
                log::info!(
                    "node {}: scene {} activated for {}s",
                    node.node_id(),
                    activation.scene,
                    activation.duration_secs
                );
                let secs = i32::try_from(activation.duration_secs).unwrap_or(i32::MAX);
                node.refresh_value(ID, instance, activation.scene, ValueData::Int(secs));
                Handled::Consumed
            }
            _ => Handled::No,
        }
    }

    fn create_vars(&mut self, instance: u8, node: &mut NodeData) {
        let id = node.value_id(Genre::User, ID, instance, INDEX_SCENE_COUNT, ValueType::Int);
        node.create_value(Value::new(id, "Scene Count").with_read_only(true));
        if let Some(count) = self.configured_scene_count {
            Self::create_scenes(node, instance, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_bands() {
        assert_eq!(decode_duration(0x00), 0);
        assert_eq!(decode_duration(0x01), 1);
        assert_eq!(decode_duration(0x7F), 127);
        assert_eq!(decode_duration(0x80), 60 * 0x80);
        assert_eq!(decode_duration(0xFE), 15_240);
        assert_eq!(decode_duration(0xFF), 0);
    }

    #[test]
    fn activation_needs_four_bytes() {
        assert_eq!(
            SceneActivation::parse(&[0x03, 0x11, 0x05, 0x02]).expect("parse"),
            SceneActivation {
                scene: 2,
                duration_secs: 5
            }
        );
        assert!(SceneActivation::parse(&[0x03, 0x11, 0x05]).is_err());
    }
}
