//! The declared configuration schema and name resolution against it.

pub mod decoder;
pub mod values;

use serde::{Deserialize, Serialize};

pub use decoder::{KotsConfigDecoder, SchemaDecoder, locate_schema};
pub use values::{project_values, render_values};

/// Ordered set of option groups, loaded once per run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSchema {
    #[serde(default)]
    pub groups: Vec<ConfigGroup>,
}

/// A named group of options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigGroup {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub items: Vec<ConfigItem>,
}

/// A single option: name, declared type and default value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub name: String,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_yaml::Value>,
}

impl ConfigItem {
    pub fn semantic_type(&self) -> SemanticType {
        SemanticType::from_item_type(&self.item_type)
    }
}

/// How comparisons against an option's stored value are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticType {
    String,
    Password,
    Bool,
    /// Any other declared type (`text`, `select_one`, `file`, ...)
    Other(String),
}

impl SemanticType {
    /// Map a declared item type; an unset type is a string
    pub fn from_item_type(item_type: &str) -> Self {
        match item_type {
            "" | "string" => Self::String,
            "password" => Self::Password,
            "bool" | "boolean" => Self::Bool,
            other => Self::Other(other.to_string()),
        }
    }

    /// String and password values compare as quoted strings
    pub fn is_quoted_string(&self) -> bool {
        matches!(self, Self::String | Self::Password)
    }
}

/// Where an option lives in the generated values document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Dotted `group.item` path
    pub path: String,
    pub semantic_type: SemanticType,
}

impl ResolvedPath {
    /// Reference to the option from a Helm template
    pub fn values_ref(&self) -> String {
        format!(".Values.{}", self.path)
    }
}

impl ConfigSchema {
    /// Look an option up by item name.
    ///
    /// Groups and items are searched in declaration order and the first
    /// match wins, so an item name shared by two groups always resolves to
    /// the earlier group.
    pub fn resolve(&self, name: &str) -> Option<ResolvedPath> {
        self.groups.iter().find_map(|group| {
            group.items.iter().find(|item| item.name == name).map(|item| ResolvedPath {
                path: format!("{}.{}", group.name, item.name),
                semantic_type: item.semantic_type(),
            })
        })
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|group| group.items.is_empty())
    }

    pub fn item_count(&self) -> usize {
        self.groups.iter().map(|group| group.items.len()).sum()
    }
}
