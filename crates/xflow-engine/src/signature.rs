//! Function signatures
//!
//! A signature is the single source of truth for what a function exposes to
//! the graph: its inputs, its outputs, and the callbacks it invokes.
//!
//! Callback keys live in the same namespace as the function's own keys, seen
//! from the node's side of the wire:
//!
//! - a callback **input** is something the node *emits* into the closure
//!   body, so edges leave the node from it (like an output);
//! - a callback **output** is something the node *receives* back from the
//!   closure body, so edges arrive at the node on it (like an input).

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::types::XType;

/// A named, typed parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: XType,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: XType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Signature of a callback parameter, from the closure body's perspective
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallbackSignature {
    /// Values the closure body receives
    pub input: Vec<Param>,
    /// Values the closure body must produce
    pub output: Vec<Param>,
}

impl CallbackSignature {
    pub fn new(input: Vec<Param>, output: Vec<Param>) -> Self {
        Self { input, output }
    }
}

/// Complete signature of a catalog function
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub input: Vec<Param>,
    pub output: Vec<Param>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cb: BTreeMap<String, CallbackSignature>,
}

impl Signature {
    /// Create a signature without callbacks
    pub fn new(input: Vec<Param>, output: Vec<Param>) -> Self {
        Self {
            input,
            output,
            cb: BTreeMap::new(),
        }
    }

    /// Add a callback parameter
    pub fn with_callback(mut self, name: impl Into<String>, callback: CallbackSignature) -> Self {
        self.cb.insert(name.into(), callback);
        self
    }

    pub fn has_input(&self, key: &str) -> bool {
        self.input.iter().any(|p| p.name == key)
    }

    pub fn has_output(&self, key: &str) -> bool {
        self.output.iter().any(|p| p.name == key)
    }

    /// Whether `key` names a value some callback emits back into the node
    pub fn has_callback_output(&self, key: &str) -> bool {
        self.cb
            .values()
            .any(|c| c.output.iter().any(|p| p.name == key))
    }

    /// Whether `key` names a value the node hands to some callback
    pub fn has_callback_input(&self, key: &str) -> bool {
        self.cb
            .values()
            .any(|c| c.input.iter().any(|p| p.name == key))
    }

    /// Whether an edge may arrive at this function on `key`
    pub fn accepts(&self, key: &str) -> bool {
        self.has_input(key) || self.has_callback_output(key)
    }

    /// Whether an edge may leave this function from `key`
    pub fn provides(&self, key: &str) -> bool {
        self.has_output(key) || self.has_callback_input(key)
    }

    pub fn input_names(&self) -> Vec<&str> {
        self.input.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn output_names(&self) -> Vec<&str> {
        self.output.iter().map(|p| p.name.as_str()).collect()
    }

    /// Check the signature for name collisions
    ///
    /// Callback outputs share the input namespace and callback inputs share
    /// the output namespace, so a collision there would make an edge key
    /// ambiguous. Returns one message per violation.
    pub fn check_consistency(&self) -> Vec<String> {
        let mut messages = Vec::new();
        let mut input_names: HashSet<&str> = HashSet::new();
        let mut output_names: HashSet<&str> = HashSet::new();

        for param in &self.input {
            if !input_names.insert(&param.name) {
                messages.push(format!("input {} is duplicated", param.name));
            }
        }
        for param in &self.output {
            if !output_names.insert(&param.name) {
                messages.push(format!("output {} is duplicated", param.name));
            }
        }

        for callback in self.cb.values() {
            for param in &callback.output {
                if !input_names.insert(&param.name) {
                    messages.push(format!(
                        "cb output {} is duplicated with input {}",
                        param.name, param.name
                    ));
                }
            }
            for param in &callback.input {
                if !output_names.insert(&param.name) {
                    messages.push(format!(
                        "cb input {} is duplicated with output {}",
                        param.name, param.name
                    ));
                }
            }
        }

        messages
    }
}
