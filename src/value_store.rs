use std::collections::{BTreeMap, HashMap};

use crate::error::ZWaveError;
use crate::value::Value;
use crate::value_id::ValueId;

/// Per-node value collection.
///
/// Values are keyed by full `ValueId`; a secondary index resolves
/// `(command_class, instance, index)` because decoders address values without
/// knowing genre or type.
#[derive(Debug, Default)]
pub struct ValueStore {
    values: BTreeMap<ValueId, Value>,
    by_slot: HashMap<(u8, u8, u8), ValueId>,
}

impl ValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. A value already occupying the same id or slot is left
    /// in place and `AlreadyRegistered` is returned.
    pub fn add(&mut self, value: Value) -> Result<ValueId, ZWaveError> {
        let id = value.id();
        let slot = (id.command_class_id(), id.instance(), id.index());
        if self.values.contains_key(&id) || self.by_slot.contains_key(&slot) {
            return Err(ZWaveError::AlreadyRegistered);
        }
        self.by_slot.insert(slot, id);
        self.values.insert(id, value);
        Ok(id)
    }

    pub fn remove(&mut self, id: &ValueId) -> Option<Value> {
        let v = self.values.remove(id)?;
        self.by_slot
            .remove(&(id.command_class_id(), id.instance(), id.index()));
        Some(v)
    }

    /// Drop every value of one command class, returning the removed ids.
    pub fn remove_command_class(&mut self, command_class_id: u8) -> Vec<ValueId> {
        let ids: Vec<ValueId> = self
            .values
            .keys()
            .filter(|id| id.command_class_id() == command_class_id)
            .copied()
            .collect();
        for id in &ids {
            self.remove(id);
        }
        ids
    }

    #[must_use]
    pub fn get(&self, id: &ValueId) -> Option<&Value> {
        self.values.get(id)
    }

    pub fn get_mut(&mut self, id: &ValueId) -> Option<&mut Value> {
        self.values.get_mut(id)
    }

    #[must_use]
    pub fn find(&self, command_class_id: u8, instance: u8, index: u8) -> Option<&Value> {
        self.by_slot
            .get(&(command_class_id, instance, index))
            .and_then(|id| self.values.get(id))
    }

    pub fn find_mut(&mut self, command_class_id: u8, instance: u8, index: u8) -> Option<&mut Value> {
        let id = *self.by_slot.get(&(command_class_id, instance, index))?;
        self.values.get_mut(&id)
    }

    #[must_use]
    pub fn contains(&self, id: &ValueId) -> bool {
        self.values.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate in `ValueId` order.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.values.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_id::{Genre, ValueType};

    fn value(cc: u8, index: u8) -> Value {
        Value::new(
            ValueId::new(9, 4, Genre::User, cc, 1, index, ValueType::Byte),
            format!("v{index}"),
        )
    }

    #[test]
    fn slot_lookup_follows_adds_and_removes() {
        let mut store = ValueStore::new();
        let id = store.add(value(0x71, 3)).expect("add");
        assert_eq!(store.find(0x71, 1, 3).map(Value::id), Some(id));
        assert!(store.find(0x71, 1, 4).is_none());
        assert!(store.remove(&id).is_some());
        assert!(store.find(0x71, 1, 3).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn duplicate_slot_is_rejected() {
        let mut store = ValueStore::new();
        store.add(value(0x71, 3)).expect("first add");
        let clash = Value::new(
            ValueId::new(9, 4, Genre::System, 0x71, 1, 3, ValueType::Bool),
            "other",
        );
        assert!(matches!(store.add(clash), Err(ZWaveError::AlreadyRegistered)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_command_class_only_touches_that_class() {
        let mut store = ValueStore::new();
        store.add(value(0x71, 0)).expect("add");
        store.add(value(0x71, 1)).expect("add");
        store.add(value(0x25, 0)).expect("add");
        let removed = store.remove_command_class(0x71);
        assert_eq!(removed.len(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.find(0x25, 1, 0).is_some());
    }
}
