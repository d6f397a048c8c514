//! Command-class metadata loaded from TOML.
//!
//! The embedded `command_classes.toml` is installed by `init_defaults()`.
//! Applications can merge their own file on top (for example to mark a class
//! set-only for a device that never answers Get).

use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use crate::error::ZWaveError;
use crate::toml_helpers::toml_error;

const FILE_NAME: &str = "command_classes.toml";

#[derive(Debug, Deserialize)]
struct ClassFile {
    #[serde(rename = "class", default)]
    classes: Vec<ClassEntryRaw>,
}

#[derive(Debug, Deserialize, Clone)]
struct ClassEntryRaw {
    #[serde(deserialize_with = "parse_hex_or_int")]
    id: u8,
    name: String,
    max_version: Option<u8>,
    get_supported: Option<bool>,
    description: Option<String>,
}

// Accept `0x5B`-style strings as well as plain integers.
fn parse_hex_or_int<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct V;
    impl serde::de::Visitor<'_> for V {
        type Value = u8;
        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "class id as integer or \"0xNN\" string")
        }
        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<u8, E> {
            u8::try_from(v).map_err(|_| E::custom(format!("class id out of range: {v}")))
        }
        fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<u8, E> {
            u8::try_from(v).map_err(|_| E::custom(format!("class id out of range: {v}")))
        }
        fn visit_str<E: serde::de::Error>(self, s: &str) -> Result<u8, E> {
            let s = s.trim();
            match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(h) => u8::from_str_radix(h, 16).map_err(|e| E::custom(format!("parse hex: {e}"))),
                None => s.parse().map_err(|e| E::custom(format!("parse int: {e}"))),
            }
        }
    }
    deserializer.deserialize_any(V)
}

/// Registered metadata for one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub id: u8,
    pub name: String,
    pub max_version: Option<u8>,
    pub get_supported: bool,
    pub description: Option<String>,
}

impl From<&ClassEntryRaw> for ClassInfo {
    fn from(e: &ClassEntryRaw) -> Self {
        Self {
            id: e.id,
            name: e.name.clone(),
            max_version: e.max_version,
            get_supported: e.get_supported.unwrap_or(true),
            description: e.description.clone(),
        }
    }
}

static CLASS_REGISTRY: OnceCell<RwLock<BTreeMap<u8, ClassInfo>>> = OnceCell::new();

/// Parsed class file, not yet installed.
pub struct CommandClassRegistry {
    classes: Vec<ClassEntryRaw>,
}

impl CommandClassRegistry {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ZWaveError> {
        let file: ClassFile = toml::from_str(s).map_err(|e| toml_error(FILE_NAME, &e))?;
        Ok(Self {
            classes: file.classes,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, ZWaveError> {
        let s = fs::read_to_string(path)?;
        s.parse()
    }

    /// The definitions compiled into the crate.
    pub fn embedded() -> Result<Self, ZWaveError> {
        Self::from_str(include_str!("command_classes.toml"))
    }

    /// Syntax plus semantic checks: unique ids, non-empty names, versions >= 1.
    pub fn validate_str(s: &str) -> Result<(), ZWaveError> {
        let reg = Self::from_str(s)?;
        let mut seen = HashSet::new();
        for c in &reg.classes {
            if !seen.insert(c.id) {
                return Err(ZWaveError::Protocol(format!(
                    "duplicate class id 0x{:02X}",
                    c.id
                )));
            }
            if c.name.trim().is_empty() {
                return Err(ZWaveError::Protocol(format!(
                    "class 0x{:02X}: name is empty",
                    c.id
                )));
            }
            if c.max_version == Some(0) {
                return Err(ZWaveError::Protocol(format!(
                    "class 0x{:02X}: max_version must be at least 1",
                    c.id
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    fn to_map(&self) -> BTreeMap<u8, ClassInfo> {
        self.classes.iter().map(|e| (e.id, ClassInfo::from(e))).collect()
    }

    /// Install as the process-wide registry. Fails if one is already set.
    pub fn set_global(&self) -> Result<(), ZWaveError> {
        CLASS_REGISTRY
            .set(RwLock::new(self.to_map()))
            .map_err(|_| ZWaveError::AlreadyRegistered)
    }

    /// Install, or overwrite matching ids in the existing registry.
    pub fn register_or_merge(&self) -> Result<(), ZWaveError> {
        if CLASS_REGISTRY.set(RwLock::new(self.to_map())).is_ok() {
            return Ok(());
        }
        let cell = CLASS_REGISTRY
            .get()
            .ok_or_else(|| ZWaveError::Protocol("class registry inconsistent state".into()))?;
        let mut map = cell
            .write()
            .map_err(|_| ZWaveError::Protocol("class registry poisoned".into()))?;
        for e in &self.classes {
            if map.insert(e.id, ClassInfo::from(e)).is_some() {
                tracing::debug!(id = e.id, name = %e.name, "class registry entry replaced");
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for CommandClassRegistry {
    type Err = ZWaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str(s)
    }
}

/// Registered metadata for `id`, if any registry is installed.
#[must_use]
pub fn class_info(id: u8) -> Option<ClassInfo> {
    CLASS_REGISTRY
        .get()
        .and_then(|rw| rw.read().ok())
        .and_then(|map| map.get(&id).cloned())
}

/// Display name for a class id, falling back to hex.
#[must_use]
pub fn class_name(id: u8) -> String {
    class_info(id).map_or_else(|| format!("0x{id:02X}"), |c| c.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_file_is_valid() {
        CommandClassRegistry::validate_str(include_str!("command_classes.toml"))
            .expect("embedded registry validates");
        let reg = CommandClassRegistry::embedded().expect("parse");
        assert!(reg.len() >= 8);
    }

    #[test]
    fn ids_accept_hex_and_integer() {
        let reg = CommandClassRegistry::from_str(
            "[[class]]\nid = \"0x71\"\nname = \"A\"\n[[class]]\nid = 134\nname = \"V\"\n",
        )
        .expect("parse");
        let map = reg.to_map();
        assert!(map.contains_key(&0x71));
        assert!(map.contains_key(&0x86));
        assert!(map[&0x71].get_supported);
    }

    #[test]
    fn validation_catches_duplicates_and_zero_versions() {
        let dup = "[[class]]\nid = 1\nname = \"a\"\n[[class]]\nid = \"0x01\"\nname = \"b\"\n";
        assert!(CommandClassRegistry::validate_str(dup).is_err());
        let zero = "[[class]]\nid = 1\nname = \"a\"\nmax_version = 0\n";
        assert!(CommandClassRegistry::validate_str(zero).is_err());
        let blank = "[[class]]\nid = 1\nname = \" \"\n";
        assert!(CommandClassRegistry::validate_str(blank).is_err());
    }

    #[test]
    fn parse_error_names_position() {
        let err = CommandClassRegistry::from_str("[[class]]\nid = \nname = 1\n")
            .err()
            .expect("must fail");
        assert!(err.to_string().contains(FILE_NAME));
        let err = CommandClassRegistry::from_str("[[class]]\nid = 300\nname = \"x\"\n")
            .err()
            .expect("out of range");
        assert!(err.to_string().contains("out of range"));
    }
}
