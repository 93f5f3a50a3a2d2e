//! Program (graph) representation
//!
//! A program is a set of nodes keyed by id, plus the bindings that connect
//! caller-supplied values to node inputs and node results to caller-visible
//! outputs. The serialized form is plain JSON so hosts can save and share
//! programs losslessly:
//!
//! ```json
//! {
//!   "input":  [{"name": "it", "mapKey": {"id": "0", "key": "str"}, "type": {"type": "string"}}],
//!   "output": [{"name": "out", "mapKey": {"id": "1", "key": "str"}, "type": {"type": "string"}}],
//!   "data": {
//!     "0": {"functionName": "str.split", "next": [{"id": "1", "fromKey": "arr", "toKey": "arr"}]},
//!     "1": {"functionName": "str.join", "next": [], "defaultValues": {"sep": " "}}
//!   }
//! }
//! ```

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::signature::{Param, Signature};
use crate::types::{NodeId, XType};

/// A directed edge from one of a node's keys to another node's key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Target node ID
    #[serde(rename = "id")]
    pub target: NodeId,
    /// Key on the source node (an output or a callback input)
    #[serde(rename = "fromKey")]
    pub from_key: String,
    /// Key on the target node (an input or a callback output)
    #[serde(rename = "toKey")]
    pub to_key: String,
}

impl Edge {
    pub fn new(
        target: impl Into<String>,
        from_key: impl Into<String>,
        to_key: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            from_key: from_key.into(),
            to_key: to_key.into(),
        }
    }
}

/// A node instance bound to a catalog function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Catalog key of the function this node runs
    pub function_name: String,
    /// Outgoing edges
    #[serde(default)]
    pub next: Vec<Edge>,
    /// Literal values for inputs that receive no edge
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub default_values: HashMap<String, serde_json::Value>,
}

impl Node {
    pub fn new(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            next: Vec::new(),
            default_values: HashMap::new(),
        }
    }

    pub fn has_default(&self, key: &str) -> bool {
        self.default_values.contains_key(key)
    }
}

/// A (node, key) address inside a program
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapKey {
    pub id: NodeId,
    pub key: String,
}

/// External input or output of a program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    /// Name visible to the caller
    pub name: String,
    /// Node and key this binding feeds (inputs) or reads (outputs)
    pub map_key: MapKey,
    #[serde(rename = "type")]
    pub ty: XType,
}

impl Binding {
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        key: impl Into<String>,
        ty: XType,
    ) -> Self {
        Self {
            name: name.into(),
            map_key: MapKey {
                id: id.into(),
                key: key.into(),
            },
            ty,
        }
    }
}

/// A complete program
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub input: Vec<Binding>,
    #[serde(default)]
    pub output: Vec<Binding>,
    /// Nodes keyed by id, in insertion order
    pub data: IndexMap<NodeId, Node>,
}

impl Program {
    /// Create an empty program
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a node by ID
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.data.get(id)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate all edges as `(source_id, index, edge)`
    pub fn edges(&self) -> impl Iterator<Item = (&str, usize, &Edge)> + '_ {
        self.data.iter().flat_map(|(id, node)| {
            node.next
                .iter()
                .enumerate()
                .map(move |(index, edge)| (id.as_str(), index, edge))
        })
    }

    /// Get edges coming into a node as `(source_id, edge)`
    pub fn incoming_edges<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a Edge)> + 'a {
        self.edges()
            .filter(move |(_, _, e)| e.target == node_id)
            .map(|(source, _, e)| (source, e))
    }

    /// Nodes that are never the target of any edge, in program order
    ///
    /// These can fire with an empty frame (literals, zero-input sources).
    pub fn head_nodes(&self) -> Vec<&str> {
        let targeted: HashSet<&str> = self.edges().map(|(_, _, e)| e.target.as_str()).collect();
        self.data
            .keys()
            .map(|id| id.as_str())
            .filter(|id| !targeted.contains(id))
            .collect()
    }

    /// Output bindings that read from `node_id`
    pub fn outputs_of<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Binding> + 'a {
        self.output.iter().filter(move |b| b.map_key.id == node_id)
    }

    /// Derive the catalog signature this program exposes when registered
    ///
    /// Several bindings may share a name (one value feeding many nodes); the
    /// signature lists each name once.
    pub fn signature(&self) -> Signature {
        fn params(bindings: &[Binding]) -> Vec<Param> {
            let mut seen = HashSet::new();
            bindings
                .iter()
                .filter(|b| seen.insert(b.name.as_str()))
                .map(|b| Param::new(b.name.clone(), b.ty.clone()))
                .collect()
        }
        Signature::new(params(&self.input), params(&self.output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn split_join() -> Program {
        serde_json::from_value(json!({
            "input": [
                {"name": "it", "mapKey": {"id": "0", "key": "str"}, "type": {"type": "string"}},
                {"name": "sep", "mapKey": {"id": "1", "key": "sep"}, "type": {"type": "string"}}
            ],
            "output": [
                {"name": "out", "mapKey": {"id": "1", "key": "str"}, "type": {"type": "string"}}
            ],
            "data": {
                "0": {"functionName": "str.split", "next": [{"id": "1", "fromKey": "arr", "toKey": "arr"}]},
                "1": {"functionName": "str.join", "next": []}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_program() {
        let program = split_join();
        assert_eq!(program.len(), 2);
        assert_eq!(program.node("0").unwrap().function_name, "str.split");
        assert_eq!(program.node("0").unwrap().next[0], Edge::new("1", "arr", "arr"));
        assert_eq!(program.input[1].map_key.key, "sep");
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let program = split_join();
        let text = serde_json::to_string(&program).unwrap();
        let back: Program = serde_json::from_str(&text).unwrap();
        assert_eq!(back, program);
        let keys: Vec<&String> = back.data.keys().collect();
        assert_eq!(keys, vec!["0", "1"]);
    }

    #[test]
    fn test_head_nodes() {
        let program = split_join();
        assert_eq!(program.head_nodes(), vec!["0"]);
        let incoming: Vec<&str> = program.incoming_edges("1").map(|(s, _)| s).collect();
        assert_eq!(incoming, vec!["0"]);
    }

    #[test]
    fn test_derived_signature() {
        let mut program = split_join();
        program
            .input
            .push(Binding::new("it", "1", "str", XType::string()));
        let sig = program.signature();
        assert_eq!(sig.input_names(), vec!["it", "sep"]);
        assert_eq!(sig.output_names(), vec!["out"]);
    }
}
