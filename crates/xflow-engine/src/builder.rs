//! Fluent builder for programs
//!
//! Provides a fluent API for constructing programs in code.

use serde_json::Value;

use crate::program::{Binding, Edge, Node, Program};
use crate::types::{NodeId, XType};

/// Fluent builder for constructing programs
///
/// # Example
///
/// ```ignore
/// let program = ProgramBuilder::new()
///     .add_node("0", "str.split")
///     .add_node("1", "str.join")
///     .with_default("sep", json!(" "))
///     .connect("0", "arr", "1", "arr")
///     .input("it", "0", "str", XType::string())
///     .output("out", "1", "str", XType::string())
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
    last: Option<NodeId>,
    edges: Vec<(NodeId, Edge)>,
}

impl ProgramBuilder {
    /// Create a new program builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node running `function`
    pub fn add_node(mut self, id: impl Into<String>, function: impl Into<String>) -> Self {
        let id = id.into();
        self.program.data.insert(id.clone(), Node::new(function));
        self.last = Some(id);
        self
    }

    /// Set a default value on the most recently added node
    ///
    /// Must be called after `add_node`.
    pub fn with_default(mut self, key: impl Into<String>, value: Value) -> Self {
        if let Some(node) = self.last.as_ref().and_then(|id| self.program.data.get_mut(id)) {
            node.default_values.insert(key.into(), value);
        }
        self
    }

    /// Add an edge from `source.from_key` to `target.to_key`
    ///
    /// The source node may be added later; edges attach on `build`.
    pub fn connect(
        mut self,
        source: impl Into<String>,
        from_key: impl Into<String>,
        target: impl Into<String>,
        to_key: impl Into<String>,
    ) -> Self {
        self.edges
            .push((source.into(), Edge::new(target, from_key, to_key)));
        self
    }

    /// Bind an external input to a node key
    pub fn input(
        mut self,
        name: impl Into<String>,
        id: impl Into<String>,
        key: impl Into<String>,
        ty: XType,
    ) -> Self {
        self.program.input.push(Binding::new(name, id, key, ty));
        self
    }

    /// Bind a node result to an external output
    pub fn output(
        mut self,
        name: impl Into<String>,
        id: impl Into<String>,
        key: impl Into<String>,
        ty: XType,
    ) -> Self {
        self.program.output.push(Binding::new(name, id, key, ty));
        self
    }

    /// Build the program without validation
    ///
    /// Edges whose source node was never added are dropped.
    pub fn build(self) -> Program {
        let mut program = self.program;
        for (source, edge) in self.edges {
            match program.data.get_mut(&source) {
                Some(node) => node.next.push(edge),
                None => log::warn!("Dropping edge from unknown node '{}'", source),
            }
        }
        program
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let program = ProgramBuilder::new()
            .connect("a", "y", "b", "x")
            .add_node("a", "inc")
            .with_default("x", json!(1))
            .add_node("b", "inc")
            .connect("ghost", "y", "b", "x")
            .output("r", "b", "y", XType::num())
            .build();

        assert_eq!(program.len(), 2);
        assert_eq!(program.node("a").unwrap().next, vec![Edge::new("b", "y", "x")]);
        assert!(program.node("a").unwrap().has_default("x"));
        assert!(program.node("b").unwrap().next.is_empty());
        assert_eq!(program.head_nodes(), vec!["a"]);
        assert_eq!(program.output[0].map_key.id, "b");
    }
}
