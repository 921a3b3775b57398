//! Core data model: [`Record`] and [`FieldOrder`].
//!
//! A record is an ordered sequence of `(name, value)` pairs. Column order is part of the data:
//! it decides output column order, so it is never stored in a hashed map.

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{PipelineError, PipelineResult};

/// One row of tabular data: an ordered mapping from field name to string value.
///
/// Names are non-empty and unique within a record. Missing values are empty strings, never
/// missing keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(name, value)` pairs, keeping their order.
    ///
    /// Fails on empty or duplicated names.
    pub fn try_from_pairs<I, K, V>(pairs: I) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields: Vec<(String, String)> = Vec::new();
        for (name, value) in pairs {
            let name = name.into();
            if name.is_empty() {
                return Err(PipelineError::config("field names must be non-empty"));
            }
            if fields.iter().any(|(n, _)| *n == name) {
                return Err(PipelineError::DuplicateField { name });
            }
            fields.push((name, value.into()));
        }
        Ok(Self { fields })
    }

    /// Build a record whose names are already known to be unique and non-empty.
    pub(crate) fn from_validated(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    /// Value of `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Position of `name` within the record, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(n, _)| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Iterate values in field order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, v)| v.as_str())
    }

    /// Iterate `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// The record's natural field ordering.
    pub fn field_order(&self) -> FieldOrder {
        FieldOrder {
            names: self.fields.iter().map(|(n, _)| n.clone()).collect(),
        }
    }

    /// A copy of this record with `name` set to `value`.
    ///
    /// An existing field is overwritten in place; a new one is appended.
    pub fn with_field(&self, name: impl Into<String>, value: impl Into<String>) -> PipelineResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(PipelineError::config("field names must be non-empty"));
        }
        let mut fields = self.fields.clone();
        match fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value.into(),
            None => fields.push((name, value.into())),
        }
        Ok(Self { fields })
    }

    pub(crate) fn available_names(&self) -> Vec<String> {
        self.fields.iter().map(|(n, _)| n.clone()).collect()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A sequence of unique, non-empty field names controlling column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOrder {
    names: Vec<String>,
}

impl FieldOrder {
    /// Create an ordering, rejecting empty and duplicated names.
    pub fn new<I, S>(names: I) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if name.is_empty() {
                return Err(PipelineError::config("field ordering contains an empty name"));
            }
            if out.contains(&name) {
                return Err(PipelineError::config(format!(
                    "field ordering lists '{name}' more than once"
                )));
            }
            out.push(name);
        }
        Ok(Self { names: out })
    }

    /// Parse a comma-separated list such as `"producto,precio"`.
    pub fn parse_list(list: &str) -> PipelineResult<Self> {
        Self::new(list.split(',').map(str::trim))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl fmt::Display for FieldOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names.join(","))
    }
}
