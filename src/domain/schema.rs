use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::domain::model::{CREATED_AT, UPDATED_AT};

/// JSON-schema-like description of a resource's records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    /// `Some(false)` means only declared properties may be persisted.
    #[serde(
        rename = "additionalProperties",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
}

impl PropertyType {
    pub fn is_numeric(self) -> bool {
        matches!(self, PropertyType::Number | PropertyType::Integer)
    }
}

impl PropertySchema {
    pub fn of(kind: PropertyType) -> Self {
        Self {
            kind,
            default: None,
        }
    }

    pub fn string() -> Self {
        Self::of(PropertyType::String)
    }

    pub fn number() -> Self {
        Self::of(PropertyType::Number)
    }

    pub fn integer() -> Self {
        Self::of(PropertyType::Integer)
    }

    pub fn boolean() -> Self {
        Self::of(PropertyType::Boolean)
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(mut self, name: impl Into<String>, property: PropertySchema) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    pub fn require(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn property_type(&self, name: &str) -> Option<PropertyType> {
        self.properties.get(name).map(|p| p.kind)
    }

    pub fn is_strict(&self) -> bool {
        self.additional_properties == Some(false)
    }

    /// Deep merge: properties of `other` replace same-named ones here,
    /// `required` lists are unioned, and `other`'s flag wins when set.
    pub fn merged_with(&self, other: &Schema) -> Schema {
        let mut merged = self.clone();
        for (name, property) in &other.properties {
            merged.properties.insert(name.clone(), property.clone());
        }
        for name in &other.required {
            if !merged.required.contains(name) {
                merged.required.push(name.clone());
            }
        }
        if other.additional_properties.is_some() {
            merged.additional_properties = other.additional_properties;
        }
        merged
    }

    /// Adds the `created_at`/`updated_at` string properties.
    pub fn with_timestamps(&self) -> Schema {
        self.merged_with(
            &Schema::new()
                .property(CREATED_AT, PropertySchema::string().with_default(""))
                .property(UPDATED_AT, PropertySchema::string().with_default("")),
        )
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
