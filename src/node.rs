//! Per-node command classes and values.
//!
//! `Node` splits into the command-class table and `NodeData` so a handler can
//! borrow itself mutably while it updates the node's values.

use std::collections::{BTreeMap, VecDeque};

use crate::command_class::{central_scene, version, CommandClassHandler};
use crate::command_class::{CommandClass, Handled, RequestFlags, StaticRequests};
use crate::config::{config, hex_dump};
use crate::error::ZWaveError;
use crate::notification::Notification;
use crate::queue::SendQueue;
use crate::registry;
use crate::value::{RefreshOutcome, Value, ValueData};
use crate::value_id::{Genre, ValueId, ValueType};
use crate::value_store::ValueStore;

/// Nested encapsulations deeper than this are dropped.
const MAX_ENCAP_DEPTH: usize = 2;

/// Node state handed to command-class handlers.
#[derive(Debug)]
pub struct NodeData {
    home_id: u32,
    node_id: u8,
    values: ValueStore,
    notifications: VecDeque<Notification>,
    rerequests: Vec<ValueId>,
}

impl NodeData {
    fn new(home_id: u32, node_id: u8) -> Self {
        Self {
            home_id,
            node_id,
            values: ValueStore::new(),
            notifications: VecDeque::new(),
            rerequests: Vec::new(),
        }
    }

    #[must_use]
    pub const fn home_id(&self) -> u32 {
        self.home_id
    }

    #[must_use]
    pub const fn node_id(&self) -> u8 {
        self.node_id
    }

    #[must_use]
    pub const fn value_id(
        &self,
        genre: Genre,
        command_class_id: u8,
        instance: u8,
        index: u8,
        value_type: ValueType,
    ) -> ValueId {
        ValueId::new(
            self.home_id,
            self.node_id,
            genre,
            command_class_id,
            instance,
            index,
            value_type,
        )
    }

    #[must_use]
    pub const fn values(&self) -> &ValueStore {
        &self.values
    }

    /// Add `value` unless its slot is taken; either way return the id that
    /// occupies the slot.
    pub fn create_value(&mut self, value: Value) -> ValueId {
        let id = value.id();
        if let Some(existing) = self
            .values
            .find(id.command_class_id(), id.instance(), id.index())
        {
            return existing.id();
        }
        match self.values.add(value) {
            Ok(id) => {
                log::debug!("node {}: created {id}", self.node_id);
                self.notifications.push_back(Notification::ValueAdded(id));
                id
            }
            Err(e) => {
                log::warn!("node {}: cannot add {id}: {e}", self.node_id);
                id
            }
        }
    }

    pub fn remove_value(&mut self, id: &ValueId) -> Option<Value> {
        let v = self.values.remove(id)?;
        self.notifications.push_back(Notification::ValueRemoved(*id));
        Some(v)
    }

    #[must_use]
    pub fn find_value(&self, command_class_id: u8, instance: u8, index: u8) -> Option<&Value> {
        self.values.find(command_class_id, instance, index)
    }

    pub fn find_value_mut(&mut self, command_class_id: u8, instance: u8, index: u8) -> Option<&mut Value> {
        self.values.find_mut(command_class_id, instance, index)
    }

    /// Feed a decoded sample to the value in the given slot and raise the
    /// matching notification. Returns `None` when no such value exists.
    pub fn refresh_value(
        &mut self,
        command_class_id: u8,
        instance: u8,
        index: u8,
        sample: ValueData,
    ) -> Option<RefreshOutcome> {
        let Some(value) = self.values.find_mut(command_class_id, instance, index) else {
            log::debug!(
                "node {}: no value at class 0x{command_class_id:02X} instance {instance} index {index}",
                self.node_id
            );
            return None;
        };
        let id = value.id();
        match value.on_value_refreshed(sample) {
            Ok(outcome) => {
                match outcome {
                    RefreshOutcome::Changed => {
                        self.notifications.push_back(Notification::ValueChanged(id));
                    }
                    RefreshOutcome::Unchanged => {
                        self.notifications.push_back(Notification::ValueRefreshed(id));
                    }
                    RefreshOutcome::Pending => {
                        log::debug!("node {}: change on {id} awaits confirmation", self.node_id);
                        self.rerequests.push(id);
                    }
                    RefreshOutcome::Noise => {
                        log::debug!("node {}: discarding noisy sample for {id}", self.node_id);
                    }
                }
                Some(outcome)
            }
            Err(e) => {
                log::warn!("node {}: {e}", self.node_id);
                None
            }
        }
    }

    /// Commit a locally decided sample without verification.
    pub(crate) fn force_value(&mut self, command_class_id: u8, instance: u8, index: u8, sample: ValueData) {
        let Some(value) = self.values.find_mut(command_class_id, instance, index) else {
            return;
        };
        let id = value.id();
        match value.force_data(sample) {
            Ok(true) => self.notifications.push_back(Notification::ValueChanged(id)),
            Ok(false) => {}
            Err(e) => log::warn!("node {}: {e}", self.node_id),
        }
    }

    fn take_rerequests(&mut self) -> Vec<ValueId> {
        std::mem::take(&mut self.rerequests)
    }
}

/// One device: its command classes and the values they maintain.
#[derive(Debug)]
pub struct Node {
    command_classes: BTreeMap<u8, CommandClass>,
    data: NodeData,
}

impl Node {
    #[must_use]
    pub fn new(home_id: u32, node_id: u8) -> Self {
        Self {
            command_classes: BTreeMap::new(),
            data: NodeData::new(home_id, node_id),
        }
    }

    #[must_use]
    pub const fn home_id(&self) -> u32 {
        self.data.home_id
    }

    #[must_use]
    pub const fn node_id(&self) -> u8 {
        self.data.node_id
    }

    #[must_use]
    pub const fn data(&self) -> &NodeData {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut NodeData {
        &mut self.data
    }

    /// Instantiate a supported class and create its fixed values.
    pub fn add_command_class(&mut self, class_id: u8) -> Result<&mut CommandClass, ZWaveError> {
        if self.command_classes.contains_key(&class_id) {
            return Err(ZWaveError::AlreadyRegistered);
        }
        let mut cc = CommandClass::create(class_id).ok_or(ZWaveError::UnknownCommandClass(class_id))?;
        if cc.handler().wants_version() {
            cc.state_mut().set_static_request(StaticRequests::VERSION);
        }
        if let Some(info) = registry::class_info(class_id) {
            if !info.get_supported {
                cc.state_mut().set_get_supported(false);
            }
        }
        let instances: Vec<u8> = cc.state().instances().collect();
        for instance in instances {
            cc.create_vars(instance, &mut self.data);
        }
        log::info!("node {}: added {}", self.data.node_id, cc.name());
        Ok(self.command_classes.entry(class_id).or_insert(cc))
    }

    /// Drop a class and every value it owns.
    pub fn remove_command_class(&mut self, class_id: u8) -> bool {
        let Some(cc) = self.command_classes.remove(&class_id) else {
            return false;
        };
        for id in self.data.values.remove_command_class(class_id) {
            self.data.notifications.push_back(Notification::ValueRemoved(id));
        }
        log::info!("node {}: removed {}", self.data.node_id, cc.name());
        true
    }

    #[must_use]
    pub fn command_class(&self, class_id: u8) -> Option<&CommandClass> {
        self.command_classes.get(&class_id)
    }

    pub fn command_class_mut(&mut self, class_id: u8) -> Option<&mut CommandClass> {
        self.command_classes.get_mut(&class_id)
    }

    pub fn command_classes(&self) -> impl Iterator<Item = &CommandClass> {
        self.command_classes.values()
    }

    /// Add another instance of a class and create its values.
    pub fn add_instance(&mut self, class_id: u8, instance: u8) -> Result<(), ZWaveError> {
        let cc = self
            .command_classes
            .get_mut(&class_id)
            .ok_or(ZWaveError::UnknownCommandClass(class_id))?;
        cc.state_mut().add_instance(instance);
        cc.create_vars(instance, &mut self.data);
        Ok(())
    }

    /// Fix the Central Scene scene count, overriding what the device reports,
    /// and create the scene values right away.
    pub fn set_scene_count(&mut self, count: u8) -> Result<(), ZWaveError> {
        let Some(CommandClass::CentralScene(cs)) = self.command_classes.get_mut(&central_scene::ID)
        else {
            return Err(ZWaveError::UnknownCommandClass(central_scene::ID));
        };
        cs.set_configured_scene_count(Some(count));
        let instances: Vec<u8> = cs.state().instances().collect();
        for instance in instances {
            cs.create_vars(instance, &mut self.data);
            self.data.force_value(
                central_scene::ID,
                instance,
                central_scene::INDEX_SCENE_COUNT,
                ValueData::Int(i32::from(count)),
            );
        }
        Ok(())
    }

    #[must_use]
    pub const fn values(&self) -> &ValueStore {
        &self.data.values
    }

    #[must_use]
    pub fn value(&self, id: &ValueId) -> Option<&Value> {
        self.data.values.get(id)
    }

    /// For metadata edits (label, units, poll intensity, verification).
    pub fn value_mut(&mut self, id: &ValueId) -> Option<&mut Value> {
        self.data.values.get_mut(id)
    }

    #[must_use]
    pub fn get_value(&self, command_class_id: u8, instance: u8, index: u8) -> Option<&Value> {
        self.data.find_value(command_class_id, instance, index)
    }

    /// Take every pending notification, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.data.notifications.drain(..).collect()
    }

    /// Dispatch an inbound application frame: `frame[0]` is the class id.
    pub fn handle_frame(&mut self, frame: &[u8], instance: u8, queue: &mut dyn SendQueue) -> Handled {
        if config().zwave_log_frames {
            log::debug!("node {}: <- {}", self.data.node_id, hex_dump(frame));
        }
        let Some((&class_id, payload)) = frame.split_first() else {
            log::warn!("node {}: empty frame", self.data.node_id);
            return Handled::Rejected;
        };
        let handled = self.dispatch(class_id, payload, instance, 0);
        for id in self.data.take_rerequests() {
            self.refresh_value(&id, queue);
        }
        handled
    }

    fn dispatch(&mut self, class_id: u8, payload: &[u8], instance: u8, depth: usize) -> Handled {
        let Some(cc) = self.command_classes.get_mut(&class_id) else {
            log::warn!(
                "node {}: frame for unsupported class {}",
                self.data.node_id,
                registry::class_name(class_id)
            );
            return Handled::No;
        };
        match cc.handle_msg(payload, instance, &mut self.data) {
            Handled::Forward { class_id, payload } => {
                if depth >= MAX_ENCAP_DEPTH {
                    log::warn!("node {}: encapsulation nested too deep", self.data.node_id);
                    return Handled::Rejected;
                }
                self.dispatch(class_id, &payload, instance, depth + 1)
            }
            Handled::Negotiated { class_id, version } => {
                self.apply_version(class_id, version);
                Handled::Negotiated { class_id, version }
            }
            Handled::No => {
                log::debug!(
                    "node {}: {} ignored sub-command 0x{:02X}",
                    self.data.node_id,
                    cc_name(&self.command_classes, class_id),
                    payload.first().copied().unwrap_or(0)
                );
                Handled::No
            }
            other => other,
        }
    }

    fn apply_version(&mut self, class_id: u8, version: u8) {
        if version == 0 {
            log::info!(
                "node {}: class 0x{class_id:02X} reported unsupported",
                self.data.node_id
            );
            self.remove_command_class(class_id);
            return;
        }
        match self.command_classes.get_mut(&class_id) {
            Some(cc) => {
                cc.set_version(version);
                cc.state_mut().clear_static_request(StaticRequests::VERSION);
                log::info!(
                    "node {}: {} is version {}",
                    self.data.node_id,
                    cc.name(),
                    cc.version()
                );
            }
            None => log::debug!(
                "node {}: version for unknown class 0x{class_id:02X}",
                self.data.node_id
            ),
        }
    }

    /// Run a request pass over every class and instance.
    ///
    /// While class versions are still being negotiated, other static
    /// discovery waits so that it is issued against the right version.
    pub fn request_state(&mut self, flags: RequestFlags, queue: &mut dyn SendQueue) -> bool {
        let mut sent = false;
        let mut class_flags = flags;
        if flags.contains(RequestFlags::STATIC) {
            let pending = self.take_version_queries();
            if !pending.is_empty() {
                if let Some(CommandClass::Version(v)) = self.command_classes.get(&version::ID) {
                    for class_id in &pending {
                        sent |= v.request_command_class_version(*class_id, &self.data, queue);
                    }
                }
                class_flags.remove(RequestFlags::STATIC);
            }
        }
        for (id, cc) in &mut self.command_classes {
            let f = if *id == version::ID { flags } else { class_flags };
            let instances: Vec<u8> = cc.state().instances().collect();
            for instance in instances {
                sent |= cc.request_state(f, instance, &self.data, queue);
            }
        }
        sent
    }

    fn take_version_queries(&mut self) -> Vec<u8> {
        let has_version = self.command_classes.contains_key(&version::ID);
        let mut pending = Vec::new();
        for cc in self.command_classes.values_mut() {
            if !cc.state().has_static_request(StaticRequests::VERSION) {
                continue;
            }
            if !has_version {
                // without the Version class every class stays at version 1
                cc.state_mut().clear_static_request(StaticRequests::VERSION);
                continue;
            }
            let name = cc.name();
            if cc.state_mut().take_static_attempt(StaticRequests::VERSION, name) {
                pending.push(cc.id());
            }
        }
        pending
    }

    /// Record a new target for `id` and queue the class' Set.
    pub fn set_value(&mut self, id: &ValueId, data: ValueData, queue: &mut dyn SendQueue) -> Result<(), ZWaveError> {
        let class_id = id.command_class_id();
        if !self.command_classes.contains_key(&class_id) {
            return Err(ZWaveError::UnknownCommandClass(class_id));
        }
        let value = self
            .data
            .values
            .get_mut(id)
            .ok_or_else(|| ZWaveError::Protocol(format!("no such value: {id}")))?;
        let before = value.content().clone();
        value.set(data)?;
        let sent = self.send_set(id, queue);
        if sent.is_err() {
            // nothing went out, so there is no target to confirm
            if let Some(value) = self.data.values.get_mut(id) {
                value.restore_content(before);
            }
        }
        sent
    }

    /// `set_value` from text, parsed per the value's type.
    pub fn set_value_from_string(&mut self, id: &ValueId, s: &str, queue: &mut dyn SendQueue) -> Result<(), ZWaveError> {
        let data = self
            .data
            .values
            .get(id)
            .ok_or_else(|| ZWaveError::Protocol(format!("no such value: {id}")))?
            .parse_data(s)?;
        self.set_value(id, data, queue)
    }

    pub fn press_button(&mut self, id: &ValueId, queue: &mut dyn SendQueue) -> Result<(), ZWaveError> {
        self.set_value(id, ValueData::Button(true), queue)
    }

    pub fn release_button(&mut self, id: &ValueId, queue: &mut dyn SendQueue) -> Result<(), ZWaveError> {
        self.set_value(id, ValueData::Button(false), queue)
    }

    fn send_set(&mut self, id: &ValueId, queue: &mut dyn SendQueue) -> Result<(), ZWaveError> {
        let class_id = id.command_class_id();
        let cc = self
            .command_classes
            .get_mut(&class_id)
            .ok_or(ZWaveError::UnknownCommandClass(class_id))?;
        let value = self
            .data
            .values
            .get(id)
            .ok_or_else(|| ZWaveError::Protocol(format!("no such value: {id}")))?;
        if cc.set_value(value, &self.data, queue) {
            Ok(())
        } else {
            Err(ZWaveError::Protocol(format!("{} cannot set {id}", cc.name())))
        }
    }

    /// Queue a Get for one value.
    pub fn refresh_value(&mut self, id: &ValueId, queue: &mut dyn SendQueue) -> bool {
        match self.command_classes.get_mut(&id.command_class_id()) {
            Some(cc) => cc.request_value(
                RequestFlags::DYNAMIC,
                id.index(),
                id.instance(),
                &self.data,
                queue,
            ),
            None => false,
        }
    }

    /// Request every value whose poll intensity divides `cycle`. Returns the
    /// number of requests queued.
    pub fn poll(&mut self, cycle: u32, queue: &mut dyn SendQueue) -> usize {
        let due: Vec<ValueId> = self
            .data
            .values
            .iter()
            .filter(|v| {
                let n = u32::from(v.poll_intensity());
                n > 0 && cycle % n == 0
            })
            .map(Value::id)
            .collect();
        due.iter()
            .filter(|id| self.refresh_value(id, queue))
            .count()
    }
}

fn cc_name(classes: &BTreeMap<u8, CommandClass>, class_id: u8) -> &'static str {
    classes.get(&class_id).map_or("?", CommandClass::name)
}
