use serde::{Deserialize, Serialize};
use std::fmt;

/// UI classification of a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum Genre {
    Basic,
    User,
    Config,
    System,
}

impl Genre {
    /// Parse a genre name ("basic", "User", ...). Case-insensitive.
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Some(Self::Basic),
            "user" => Some(Self::User),
            "config" => Some(Self::Config),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::User => "user",
            Self::Config => "config",
            Self::System => "system",
        }
    }
}

impl std::str::FromStr for Genre {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str(s).ok_or(())
    }
}

/// Content type of a value. Fixed for the lifetime of a `ValueId`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum ValueType {
    Bool,
    Byte,
    Decimal,
    Int,
    List,
    Schedule,
    Short,
    String,
    Button,
    Raw,
}

impl ValueType {
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bool" => Some(Self::Bool),
            "byte" => Some(Self::Byte),
            "decimal" => Some(Self::Decimal),
            "int" => Some(Self::Int),
            "list" => Some(Self::List),
            "schedule" => Some(Self::Schedule),
            "short" => Some(Self::Short),
            "string" => Some(Self::String),
            "button" => Some(Self::Button),
            "raw" => Some(Self::Raw),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Byte => "byte",
            Self::Decimal => "decimal",
            Self::Int => "int",
            Self::List => "list",
            Self::Schedule => "schedule",
            Self::Short => "short",
            Self::String => "string",
            Self::Button => "button",
            Self::Raw => "raw",
        }
    }
}

impl std::str::FromStr for ValueType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str(s).ok_or(())
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite key of a single device property.
///
/// Equality and ordering cover all seven fields, in declaration order, so the
/// key works in both hashed and ordered containers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct ValueId {
    home_id: u32,
    node_id: u8,
    genre: Genre,
    command_class_id: u8,
    instance: u8,
    index: u8,
    value_type: ValueType,
}

impl ValueId {
    #[must_use]
    pub const fn new(
        home_id: u32,
        node_id: u8,
        genre: Genre,
        command_class_id: u8,
        instance: u8,
        index: u8,
        value_type: ValueType,
    ) -> Self {
        Self {
            home_id,
            node_id,
            genre,
            command_class_id,
            instance,
            index,
            value_type,
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
    pub const fn genre(&self) -> Genre {
        self.genre
    }
    #[must_use]
    pub const fn command_class_id(&self) -> u8 {
        self.command_class_id
    }
    #[must_use]
    pub const fn instance(&self) -> u8 {
        self.instance
    }
    #[must_use]
    pub const fn index(&self) -> u8 {
        self.index
    }
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.value_type
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HomeId=0x{:08X} Node={} Genre={} CC=0x{:02X} Instance={} Index={} Type={}",
            self.home_id,
            self.node_id,
            self.genre.as_str(),
            self.command_class_id,
            self.instance,
            self.index,
            self.value_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashSet};

    fn id(index: u8, value_type: ValueType) -> ValueId {
        ValueId::new(0x0102_0304, 5, Genre::User, 0x71, 1, index, value_type)
    }

    #[test]
    fn equality_requires_every_field() {
        let a = id(3, ValueType::Byte);
        assert_eq!(a, id(3, ValueType::Byte));
        assert_ne!(a, id(4, ValueType::Byte));
        assert_ne!(a, id(3, ValueType::Int));
        let other_genre = ValueId::new(0x0102_0304, 5, Genre::System, 0x71, 1, 3, ValueType::Byte);
        assert_ne!(a, other_genre);
    }

    #[test]
    fn ordering_is_lexicographic_over_fields() {
        let low_node = ValueId::new(1, 2, Genre::System, 0xFF, 9, 9, ValueType::Raw);
        let high_node = ValueId::new(1, 3, Genre::Basic, 0x00, 0, 0, ValueType::Bool);
        assert!(low_node < high_node);

        let mut set = BTreeSet::new();
        set.insert(id(10, ValueType::Byte));
        set.insert(id(3, ValueType::Byte));
        set.insert(id(5, ValueType::Byte));
        let indices: Vec<u8> = set.iter().map(ValueId::index).collect();
        assert_eq!(indices, vec![3, 5, 10]);
    }

    #[test]
    fn usable_as_hash_key() {
        let mut set = HashSet::new();
        assert!(set.insert(id(1, ValueType::Bool)));
        assert!(!set.insert(id(1, ValueType::Bool)));
        assert!(set.insert(id(2, ValueType::Bool)));
    }

    #[test]
    fn genre_and_type_names_parse_back() {
        assert_eq!(Genre::from_str("USER"), Some(Genre::User));
        assert_eq!(Genre::from_str("nope"), None);
        assert_eq!("decimal".parse::<ValueType>(), Ok(ValueType::Decimal));
        assert_eq!(ValueType::from_str(ValueType::Schedule.as_str()), Some(ValueType::Schedule));
    }
}
