//! Node state as TOML.
//!
//! Saving always writes every value's text form. Loading is lenient about
//! individual records: a bad class or value entry is logged and skipped, and a
//! value whose `value` field is missing or unparsable keeps its default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::command_class::{CommandClass, StaticRequests};
use crate::error::ZWaveError;
use crate::node::Node;
use crate::toml_helpers::toml_error;
use crate::value::Value;
use crate::value_id::{Genre, ValueType};

const FILE_NAME: &str = "node state";

#[derive(Debug, Serialize, Deserialize)]
struct NodeFile {
    home_id: u32,
    node_id: u8,
    #[serde(rename = "class", default)]
    classes: Vec<ClassRecord>,
    #[serde(rename = "value", default)]
    values: Vec<ValueRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClassRecord {
    id: u8,
    #[serde(default = "default_version")]
    version: u8,
    #[serde(default)]
    static_requests: u8,
    #[serde(default = "default_true")]
    get_supported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    scene_count: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ValueRecord {
    genre: String,
    class: u8,
    instance: u8,
    index: u8,
    #[serde(rename = "type")]
    value_type: String,
    label: String,
    #[serde(default)]
    units: String,
    #[serde(default)]
    read_only: bool,
    #[serde(default)]
    write_only: bool,
    #[serde(default)]
    poll_intensity: u8,
    #[serde(default = "default_true")]
    verify_changes: bool,
    value: Option<String>,
}

const fn default_version() -> u8 {
    1
}

const fn default_true() -> bool {
    true
}

/// Serialize a node's classes and values.
pub fn save_node(node: &Node) -> Result<String, ZWaveError> {
    let classes = node
        .command_classes()
        .map(|cc| ClassRecord {
            id: cc.id(),
            version: cc.version(),
            static_requests: cc.state().static_requests().bits(),
            get_supported: cc.state().is_get_supported(),
            scene_count: match cc {
                CommandClass::CentralScene(cs) => cs.configured_scene_count(),
                _ => None,
            },
        })
        .collect();
    let values = node
        .values()
        .iter()
        .map(|v| {
            let id = v.id();
            ValueRecord {
                genre: id.genre().as_str().to_string(),
                class: id.command_class_id(),
                instance: id.instance(),
                index: id.index(),
                value_type: id.value_type().as_str().to_string(),
                label: v.label().to_string(),
                units: v.units().to_string(),
                read_only: v.is_read_only(),
                write_only: v.is_write_only(),
                poll_intensity: v.poll_intensity(),
                verify_changes: v.verify_changes(),
                value: Some(v.get_as_string()),
            }
        })
        .collect();
    let file = NodeFile {
        home_id: node.home_id(),
        node_id: node.node_id(),
        classes,
        values,
    };
    toml::to_string(&file).map_err(|e| ZWaveError::Protocol(format!("serialize node: {e}")))
}

pub fn save_node_to_path(node: &Node, path: &Path) -> Result<(), ZWaveError> {
    fs::write(path, save_node(node)?)?;
    Ok(())
}

/// Rebuild a node from `save_node` output.
pub fn load_node(s: &str) -> Result<Node, ZWaveError> {
    let file: NodeFile = toml::from_str(s).map_err(|e| toml_error(FILE_NAME, &e))?;
    let mut node = Node::new(file.home_id, file.node_id);

    for rec in &file.classes {
        if let Err(e) = restore_class(&mut node, rec) {
            tracing::warn!(node = file.node_id, class = rec.id, "skipping class: {e}");
        }
    }
    for rec in &file.values {
        restore_value(&mut node, rec);
    }
    Ok(node)
}

pub fn load_node_from_path(path: &Path) -> Result<Node, ZWaveError> {
    let s = fs::read_to_string(path)?;
    load_node(&s)
}

fn restore_class(node: &mut Node, rec: &ClassRecord) -> Result<(), ZWaveError> {
    let cc = node.add_command_class(rec.id)?;
    cc.set_version(rec.version);
    cc.state_mut()
        .restore_static_requests(StaticRequests::from_bits_truncate(rec.static_requests));
    cc.state_mut().set_get_supported(rec.get_supported);
    if let Some(count) = rec.scene_count {
        node.set_scene_count(count)?;
    }
    Ok(())
}

fn restore_value(node: &mut Node, rec: &ValueRecord) {
    let node_id = node.node_id();
    let (Some(genre), Some(value_type)) = (
        Genre::from_str(&rec.genre),
        ValueType::from_str(&rec.value_type),
    ) else {
        tracing::warn!(
            node = node_id,
            genre = %rec.genre,
            value_type = %rec.value_type,
            "skipping value with unknown genre or type"
        );
        return;
    };
    if node.command_class(rec.class).is_none() {
        tracing::warn!(node = node_id, class = rec.class, "skipping value of absent class");
        return;
    }
    let id = node
        .data()
        .value_id(genre, rec.class, rec.instance, rec.index, value_type);

    let existing = node
        .data()
        .find_value(rec.class, rec.instance, rec.index)
        .map(Value::id);
    let id = match existing {
        Some(found) if found != id => {
            tracing::warn!(node = node_id, %found, "stored value does not match live value, skipping");
            return;
        }
        Some(found) => found,
        None => node.data_mut().create_value(
            Value::new(id, rec.label.clone())
                .with_read_only(rec.read_only)
                .with_write_only(rec.write_only),
        ),
    };
    let Some(value) = node.value_mut(&id) else {
        return;
    };
    value.set_label(rec.label.clone());
    value.set_units(rec.units.clone());
    value.set_poll_intensity(rec.poll_intensity);
    value.set_change_verified(rec.verify_changes);

    match rec.value.as_deref() {
        None => tracing::warn!(node = node_id, %id, "no stored value, keeping default"),
        Some(text) => {
            if let Err(e) = value.restore_from_string(text) {
                tracing::warn!(node = node_id, %id, "stored value '{text}' not restored: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_value_field_keeps_default() {
        let s = r#"
home_id = 1
node_id = 2

[[class]]
id = 128

[[value]]
genre = "user"
class = 128
instance = 1
index = 0
type = "byte"
label = "Battery Level"
units = "%"
"#;
        let node = load_node(s).expect("load");
        let v = node.get_value(0x80, 1, 0).expect("battery value");
        assert_eq!(v.as_byte(), Some(0));
        assert!(!v.is_set());
    }

    #[test]
    fn unparsable_value_keeps_default() {
        let s = r#"
home_id = 1
node_id = 2

[[class]]
id = 37

[[value]]
genre = "user"
class = 37
instance = 1
index = 0
type = "bool"
label = "Switch"
value = "maybe"
"#;
        let node = load_node(s).expect("load");
        assert_eq!(node.get_value(0x25, 1, 0).and_then(Value::as_bool), Some(false));
    }

    #[test]
    fn malformed_toml_reports_position() {
        let err = load_node("home_id = \nnode_id = 1").err().expect("must fail");
        assert!(err.to_string().contains("parse error"));
    }
}
