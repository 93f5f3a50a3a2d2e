//! Core types shared across the engine
//!
//! `XType` is the structural type model attached to every port. It is
//! metadata for tooling and the validator; the engine never checks values
//! against it. `Flow` is what a runner produces per output key: either a
//! value that propagates along edges, or a stop marker that prunes them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Unique identifier for a node within a program
pub type NodeId = String;

/// Argument record passed to a function (input key -> value)
pub type Args = HashMap<String, serde_json::Value>;

/// Plain value record (external outputs, callback results)
pub type Values = HashMap<String, serde_json::Value>;

/// Result record returned by a function (output key -> flow)
pub type Outputs = HashMap<String, Flow>;

/// Shape of a value, with an optional symbolic name
///
/// The name correlates `auto` occurrences within one signature, e.g. the
/// item type `I` of `array.map`'s input and its callback's `item` input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XType {
    #[serde(flatten)]
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The closed set of type tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "subType", rename_all = "camelCase")]
pub enum TypeKind {
    String,
    Num,
    Bool,
    Nil,
    Any,
    /// "No value flows" marker type
    Stop,
    /// Type variable, unified by name within a signature
    Auto,
    Array { item: Box<XType> },
    Object { value: Box<XType> },
    Or { left: Box<XType>, right: Box<XType> },
}

impl XType {
    fn of(kind: TypeKind) -> Self {
        Self { kind, name: None }
    }

    pub fn string() -> Self {
        Self::of(TypeKind::String)
    }

    pub fn num() -> Self {
        Self::of(TypeKind::Num)
    }

    pub fn bool() -> Self {
        Self::of(TypeKind::Bool)
    }

    pub fn nil() -> Self {
        Self::of(TypeKind::Nil)
    }

    pub fn any() -> Self {
        Self::of(TypeKind::Any)
    }

    pub fn stop() -> Self {
        Self::of(TypeKind::Stop)
    }

    /// A named type variable
    pub fn auto(name: impl Into<String>) -> Self {
        Self::of(TypeKind::Auto).named(name)
    }

    pub fn array(item: XType) -> Self {
        Self::of(TypeKind::Array {
            item: Box::new(item),
        })
    }

    pub fn object(value: XType) -> Self {
        Self::of(TypeKind::Object {
            value: Box::new(value),
        })
    }

    pub fn or(left: XType, right: XType) -> Self {
        Self::of(TypeKind::Or {
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Attach a symbolic name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The tag of this type as written in programs
    pub fn tag(&self) -> &'static str {
        match self.kind {
            TypeKind::String => "string",
            TypeKind::Num => "num",
            TypeKind::Bool => "bool",
            TypeKind::Nil => "nil",
            TypeKind::Any => "any",
            TypeKind::Stop => "stop",
            TypeKind::Auto => "auto",
            TypeKind::Array { .. } => "array",
            TypeKind::Object { .. } => "object",
            TypeKind::Or { .. } => "or",
        }
    }

    /// Check whether a value of type `self` may feed a port of type `other`
    ///
    /// Tags are compared shallowly. `any` and `auto` on either side match
    /// everything; an `or` on either side matches if one of its branches does.
    pub fn is_compatible(&self, other: &XType) -> bool {
        if matches!(self.kind, TypeKind::Any | TypeKind::Auto)
            || matches!(other.kind, TypeKind::Any | TypeKind::Auto)
        {
            return true;
        }

        if let TypeKind::Or { left, right } = &self.kind {
            return left.is_compatible(other) || right.is_compatible(other);
        }
        if let TypeKind::Or { left, right } = &other.kind {
            return self.is_compatible(left) || self.is_compatible(right);
        }

        self.tag() == other.tag()
    }
}

impl std::fmt::Display for XType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            TypeKind::Array { item } => write!(f, "array<{}>", item)?,
            TypeKind::Object { value } => write!(f, "object<{}>", value)?,
            TypeKind::Or { left, right } => write!(f, "{} | {}", left, right)?,
            _ => write!(f, "{}", self.tag())?,
        }
        if let Some(name) = &self.name {
            write!(f, " ({})", name)?;
        }
        Ok(())
    }
}

/// One output of a firing: a value, or the explicit "does not flow" marker
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Value(serde_json::Value),
    Stop,
}

impl Flow {
    /// The flowing value, if any
    pub fn value(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Stop => None,
        }
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop)
    }
}

impl From<serde_json::Value> for Flow {
    fn from(value: serde_json::Value) -> Self {
        Self::Value(value)
    }
}
