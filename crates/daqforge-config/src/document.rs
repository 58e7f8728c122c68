//! Hierarchical configuration documents.
//!
//! A document is an ordered tree: contexts (one per physical process), each
//! holding an ordered list of applications with a class tag, an instance
//! number and a typed property bag. Documents are built incrementally by the
//! synthesizer, serialized once, and read-only afterwards.
//!
//! # TOML Format
//!
//! ```toml
//! title = "readout unit 2"
//!
//! [[contexts]]
//! role = "RU"
//! instance = 2
//! url = "http://RU2_CONTROL_HOST_NAME:RU2_CONTROL_PORT"
//!
//! [[contexts.applications]]
//! class = "evb::RU"
//! instance = 2
//! [contexts.applications.properties]
//! FED_SOURCE_IDS = [1004, 1005]
//! MAX_FRAGMENT_BYTES = 65536
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::DocumentError;

/// A typed value in an application property bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Integer value.
    Integer(i64),
    /// Boolean value.
    Boolean(bool),
    /// Text value.
    Text(String),
    /// List of integers (e.g. FED id lists).
    Integers(Vec<i64>),
    /// List of text values (e.g. peer endpoint tokens).
    Texts(Vec<String>),
}

impl PropertyValue {
    /// The integer inside, if this is an integer value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// The text inside, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// The integer list inside, if this is an integer list.
    pub fn as_integers(&self) -> Option<&[i64]> {
        match self {
            PropertyValue::Integers(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Integer(v) => v.fmt(f),
            PropertyValue::Boolean(v) => v.fmt(f),
            PropertyValue::Text(v) => v.fmt(f),
            PropertyValue::Integers(v) => {
                let items: Vec<String> = v.iter().map(|i| i.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            PropertyValue::Texts(v) => write!(f, "[{}]", v.join(", ")),
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Integer(v)
    }
}

impl From<u32> for PropertyValue {
    fn from(v: u32) -> Self {
        PropertyValue::Integer(i64::from(v))
    }
}

impl From<u64> for PropertyValue {
    fn from(v: u64) -> Self {
        // Pool sizes fit comfortably; clamp rather than wrap on the edge.
        PropertyValue::Integer(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Boolean(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Text(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Text(v)
    }
}

impl From<Vec<i64>> for PropertyValue {
    fn from(v: Vec<i64>) -> Self {
        PropertyValue::Integers(v)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(v: Vec<String>) -> Self {
        PropertyValue::Texts(v)
    }
}

/// One application inside a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationNode {
    /// Application class tag (e.g. `evb::RU`, `pt::ibv::Application`).
    pub class: String,
    /// Instance number.
    pub instance: u32,
    /// Property bag, ordered by name for deterministic output.
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl ApplicationNode {
    /// Create an application with an empty property bag.
    pub fn new(class: impl Into<String>, instance: u32) -> Self {
        Self {
            class: class.into(),
            instance,
            properties: BTreeMap::new(),
        }
    }

    /// Add a property, consuming self.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Look up a property by name.
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Overwrite a property that already exists.
    ///
    /// Returns `false` when the property is absent, so callers can turn
    /// that into a missing-property error naming the fragment.
    pub fn patch_property(&mut self, name: &str, value: impl Into<PropertyValue>) -> bool {
        match self.properties.get_mut(name) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }
}

/// One context (physical process) inside a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextNode {
    /// Role tag (`EVM`, `RU`, `BU`, `FEROL`).
    pub role: String,
    /// Dense instance number within the role.
    pub instance: u32,
    /// Context URL; endpoint tokens are resolved by the symbol map, not
    /// here.
    pub url: String,
    /// Applications hosted by this context, in order.
    #[serde(default)]
    pub applications: Vec<ApplicationNode>,
}

impl ContextNode {
    /// First application with the given class tag.
    pub fn application(&self, class: &str) -> Option<&ApplicationNode> {
        self.applications.iter().find(|a| a.class == class)
    }

    /// Mutable access to the first application with the given class tag.
    pub fn application_mut(&mut self, class: &str) -> Option<&mut ApplicationNode> {
        self.applications.iter_mut().find(|a| a.class == class)
    }
}

/// A complete configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationDocument {
    /// Document title.
    pub title: String,
    /// Contexts in enumeration order.
    #[serde(default)]
    pub contexts: Vec<ContextNode>,
}

impl ConfigurationDocument {
    /// Create an empty document.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            contexts: Vec::new(),
        }
    }

    /// Parse a document from a TOML string.
    pub fn from_toml(text: &str) -> Result<Self, DocumentError> {
        Ok(toml::from_str(text)?)
    }

    /// Serialize the document to a TOML string.
    pub fn to_toml(&self) -> Result<String, DocumentError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load a document from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| DocumentError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Save the document to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| DocumentError::create_dir(parent, e))?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| DocumentError::write_file(path, e))?;
        Ok(())
    }

    /// Context with the given role tag and instance.
    pub fn context(&self, role: &str, instance: u32) -> Option<&ContextNode> {
        self.contexts
            .iter()
            .find(|c| c.role == role && c.instance == instance)
    }

    /// Contexts with the given role tag, in order.
    pub fn contexts_with_role<'a>(
        &'a self,
        role: &'a str,
    ) -> impl Iterator<Item = &'a ContextNode> {
        self.contexts.iter().filter(move |c| c.role == role)
    }
}
