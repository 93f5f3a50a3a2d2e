//! Program validation
//!
//! [`validate`] checks a program against a catalog before it runs and
//! reports every problem it finds, each with the location path of the
//! offending field (e.g. `data.3.next.0.id`). Unknown function names are
//! reported on their own: nothing else can be checked without signatures.
//!
//! [`detect_cycles`] is a separate, opt-in lint. Cyclic graphs are legal
//! programs; the step budget bounds them at run time.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::catalog::Catalog;
use crate::program::Program;
use crate::signature::Signature;

/// Validation error kinds
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValidationError {
    /// A node names a function the catalog does not have
    #[serde(rename_all = "camelCase")]
    UnknownFunction { function: String },
    /// A binding or edge references a node id that does not exist
    #[serde(rename_all = "camelCase")]
    UnknownNode { node_id: String },
    /// A key that the function cannot accept as an input
    #[serde(rename_all = "camelCase")]
    UnknownInputKey {
        key: String,
        function: String,
        available: Vec<String>,
    },
    /// A key that the function cannot produce
    #[serde(rename_all = "camelCase")]
    UnknownOutputKey {
        key: String,
        function: String,
        available: Vec<String>,
    },
    /// Declared inputs with no binding, incoming edge or default value
    #[serde(rename_all = "camelCase")]
    MissingInputs { function: String, keys: Vec<String> },
    /// Nodes that sit on (or downstream of) a data cycle
    #[serde(rename_all = "camelCase")]
    CycleDetected { node_ids: Vec<String> },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownFunction { function } => write!(f, "function {} not found", function),
            Self::UnknownNode { node_id } => write!(f, "id {} not found", node_id),
            Self::UnknownInputKey {
                key,
                function,
                available,
            }
            | Self::UnknownOutputKey {
                key,
                function,
                available,
            } => write!(
                f,
                "key {} not found in function {} only {}",
                key,
                function,
                available.join(", ")
            ),
            Self::MissingInputs { function, keys } => {
                write!(f, "{} input key not has {}", function, keys.join(", "))
            }
            Self::CycleDetected { node_ids } => {
                write!(f, "cycle detected through {}", node_ids.join(", "))
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// A validation error with the path of the field it concerns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    #[serde(flatten)]
    pub error: ValidationError,
    pub path: Vec<String>,
}

impl Diagnostic {
    fn new(error: ValidationError, path: &[&str]) -> Self {
        Self {
            error,
            path: path.iter().map(|segment| segment.to_string()).collect(),
        }
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }

    /// Location path joined with dots
    pub fn location(&self) -> String {
        self.path.join(".")
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (at {})", self.error, self.location())
    }
}

/// Validate a program against a catalog
///
/// Returns all diagnostics found; an empty list means the program is valid.
pub fn validate(program: &Program, catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    validate_functions(program, catalog, &mut diagnostics);
    if !diagnostics.is_empty() {
        return diagnostics;
    }

    validate_bindings(program, catalog, &mut diagnostics);
    validate_nodes(program, catalog, &mut diagnostics);
    validate_completeness(program, catalog, &mut diagnostics);

    diagnostics
}

fn validate_functions(program: &Program, catalog: &Catalog, diagnostics: &mut Vec<Diagnostic>) {
    for (id, node) in &program.data {
        if !catalog.contains(&node.function_name) {
            diagnostics.push(Diagnostic::new(
                ValidationError::UnknownFunction {
                    function: node.function_name.clone(),
                },
                &["data", id.as_str(), "functionName"],
            ));
        }
    }
}

/// Signature of the function behind node `id`, if both exist
fn node_signature<'c>(program: &Program, catalog: &'c Catalog, id: &str) -> Option<(&'c Signature, String)> {
    let node = program.node(id)?;
    Some((catalog.signature(&node.function_name)?, node.function_name.clone()))
}

fn check_input_key(
    signature: &Signature,
    function: &str,
    key: &str,
    path: &[&str],
    diagnostics: &mut Vec<Diagnostic>,
) {
    if !signature.accepts(key) {
        diagnostics.push(Diagnostic::new(
            ValidationError::UnknownInputKey {
                key: key.to_string(),
                function: function.to_string(),
                available: names(signature.input_names()),
            },
            path,
        ));
    }
}

fn check_output_key(
    signature: &Signature,
    function: &str,
    key: &str,
    path: &[&str],
    diagnostics: &mut Vec<Diagnostic>,
) {
    if !signature.provides(key) {
        diagnostics.push(Diagnostic::new(
            ValidationError::UnknownOutputKey {
                key: key.to_string(),
                function: function.to_string(),
                available: names(signature.output_names()),
            },
            path,
        ));
    }
}

fn names(list: Vec<&str>) -> Vec<String> {
    list.into_iter().map(str::to_string).collect()
}

fn validate_bindings(program: &Program, catalog: &Catalog, diagnostics: &mut Vec<Diagnostic>) {
    for (n, binding) in program.input.iter().enumerate() {
        let index = n.to_string();
        let Some((signature, function)) = node_signature(program, catalog, &binding.map_key.id) else {
            diagnostics.push(Diagnostic::new(
                ValidationError::UnknownNode {
                    node_id: binding.map_key.id.clone(),
                },
                &["input", index.as_str(), "mapKey", "id"],
            ));
            continue;
        };
        check_input_key(
            signature,
            &function,
            &binding.map_key.key,
            &["input", index.as_str(), "mapKey", "key"],
            diagnostics,
        );
    }

    for (n, binding) in program.output.iter().enumerate() {
        let index = n.to_string();
        let Some((signature, function)) = node_signature(program, catalog, &binding.map_key.id) else {
            diagnostics.push(Diagnostic::new(
                ValidationError::UnknownNode {
                    node_id: binding.map_key.id.clone(),
                },
                &["output", index.as_str(), "mapKey", "id"],
            ));
            continue;
        };
        check_output_key(
            signature,
            &function,
            &binding.map_key.key,
            &["output", index.as_str(), "mapKey", "key"],
            diagnostics,
        );
    }
}

fn validate_nodes(program: &Program, catalog: &Catalog, diagnostics: &mut Vec<Diagnostic>) {
    for (id, node) in &program.data {
        let Some(signature) = catalog.signature(&node.function_name) else {
            continue;
        };

        for key in node.default_values.keys() {
            check_input_key(
                signature,
                &node.function_name,
                key,
                &["data", id.as_str(), "defaultValues", key.as_str()],
                diagnostics,
            );
        }

        for (i, edge) in node.next.iter().enumerate() {
            let index = i.to_string();
            check_output_key(
                signature,
                &node.function_name,
                &edge.from_key,
                &["data", id.as_str(), "next", index.as_str(), "fromKey"],
                diagnostics,
            );
            let Some((target, function)) = node_signature(program, catalog, &edge.target) else {
                diagnostics.push(Diagnostic::new(
                    ValidationError::UnknownNode {
                        node_id: edge.target.clone(),
                    },
                    &["data", id.as_str(), "next", index.as_str(), "id"],
                ));
                continue;
            };
            check_input_key(
                target,
                &function,
                &edge.to_key,
                &["data", id.as_str(), "next", index.as_str(), "toKey"],
                diagnostics,
            );
        }
    }
}

fn validate_completeness(program: &Program, catalog: &Catalog, diagnostics: &mut Vec<Diagnostic>) {
    let mut supplied: HashMap<&str, HashSet<&str>> = HashMap::new();
    for binding in &program.input {
        supplied
            .entry(&binding.map_key.id)
            .or_default()
            .insert(&binding.map_key.key);
    }
    for (_, _, edge) in program.edges() {
        supplied.entry(&edge.target).or_default().insert(&edge.to_key);
    }

    for (id, node) in &program.data {
        let Some(signature) = catalog.signature(&node.function_name) else {
            continue;
        };
        let keys = supplied.get(id.as_str());
        let missing: Vec<String> = signature
            .input
            .iter()
            .filter(|param| {
                !node.has_default(&param.name)
                    && !keys.is_some_and(|keys| keys.contains(param.name.as_str()))
            })
            .map(|param| param.name.clone())
            .collect();
        if !missing.is_empty() {
            diagnostics.push(Diagnostic::new(
                ValidationError::MissingInputs {
                    function: node.function_name.clone(),
                    keys: missing,
                },
                &["data", id.as_str()],
            ));
        }
    }
}

/// Report nodes caught in data cycles
///
/// Uses Kahn's algorithm over the data edges. Edges that enter a callback
/// body or return from one to its call site are ignored, so map/filter
/// loops are not flagged; recursion through the catalog is not a graph
/// cycle either.
pub fn detect_cycles(program: &Program, catalog: &Catalog) -> Vec<Diagnostic> {
    let is_data_edge = |source: &str, from_key: &str, target: &str, to_key: &str| {
        let entering = node_signature(program, catalog, source)
            .is_some_and(|(sig, _)| sig.has_callback_input(from_key));
        let returning = node_signature(program, catalog, target)
            .is_some_and(|(sig, _)| sig.has_callback_output(to_key));
        !entering && !returning && program.node(target).is_some()
    };

    let edges: Vec<(&str, &str)> = program
        .edges()
        .filter(|(source, _, edge)| {
            is_data_edge(*source, edge.from_key.as_str(), edge.target.as_str(), edge.to_key.as_str())
        })
        .map(|(source, _, edge)| (source, edge.target.as_str()))
        .collect();

    let mut in_degree: HashMap<&str, usize> = program.data.keys().map(|id| (id.as_str(), 0)).collect();
    for (_, target) in &edges {
        if let Some(degree) = in_degree.get_mut(target) {
            *degree += 1;
        }
    }

    let mut queue: VecDeque<&str> = program
        .data
        .keys()
        .map(|id| id.as_str())
        .filter(|id| in_degree.get(id) == Some(&0))
        .collect();

    while let Some(id) = queue.pop_front() {
        for (source, target) in &edges {
            if *source != id {
                continue;
            }
            if let Some(degree) = in_degree.get_mut(target) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(*target);
                }
            }
        }
    }

    let stuck: Vec<String> = program
        .data
        .keys()
        .filter(|id| in_degree.get(id.as_str()).is_some_and(|degree| *degree > 0))
        .cloned()
        .collect();

    if stuck.is_empty() {
        Vec::new()
    } else {
        vec![Diagnostic::new(
            ValidationError::CycleDetected { node_ids: stuck },
            &["data"],
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::Callbacks;
    use crate::catalog::NativeFunction;
    use crate::error::Result;
    use crate::program::{Binding, Edge, Node};
    use crate::signature::{CallbackSignature, Param};
    use crate::types::{Args, Outputs, XType};

    fn noop(_args: &Args, _cb: &mut Callbacks<'_, '_>) -> Result<Outputs> {
        Ok(Outputs::new())
    }

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.register_native(NativeFunction::new(
            "add",
            Signature::new(
                vec![Param::new("a", XType::num()), Param::new("b", XType::num())],
                vec![Param::new("result", XType::num())],
            ),
            noop,
        ));
        catalog.register_native(NativeFunction::new(
            "each",
            Signature::new(
                vec![Param::new("arr", XType::array(XType::any()))],
                vec![Param::new("arr", XType::array(XType::any()))],
            )
            .with_callback(
                "cb",
                CallbackSignature::new(
                    vec![Param::new("item", XType::any())],
                    vec![Param::new("callback", XType::any())],
                ),
            ),
            noop,
        ));
        catalog
    }

    fn adder() -> Program {
        let mut program = Program::new();
        let mut x = Node::new("add");
        x.next.push(Edge::new("y", "result", "a"));
        let mut y = Node::new("add");
        y.default_values.insert("b".to_string(), serde_json::json!(1));
        program.data.insert("x".to_string(), x);
        program.data.insert("y".to_string(), y);
        program.input.push(Binding::new("p", "x", "a", XType::num()));
        program.input.push(Binding::new("q", "x", "b", XType::num()));
        program.output.push(Binding::new("r", "y", "result", XType::num()));
        program
    }

    #[test]
    fn test_valid_program() {
        assert!(validate(&adder(), &catalog()).is_empty());
        assert!(detect_cycles(&adder(), &catalog()).is_empty());
    }

    #[test]
    fn test_unknown_function_short_circuits() {
        let mut program = adder();
        program.data.get_mut("y").unwrap().function_name = "nope".to_string();
        program.output[0].map_key.id = "missing".to_string();

        let diagnostics = validate(&program, &catalog());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message(), "function nope not found");
        assert_eq!(diagnostics[0].location(), "data.y.functionName");
    }

    #[test]
    fn test_edge_to_missing_node() {
        let mut program = adder();
        program.data.get_mut("x").unwrap().next[0].target = "ghost".to_string();

        let diagnostics = validate(&program, &catalog());
        assert!(diagnostics
            .iter()
            .any(|d| d.location() == "data.x.next.0.id" && d.message() == "id ghost not found"));
        // "y" lost its only source for "a"
        assert!(diagnostics
            .iter()
            .any(|d| d.location() == "data.y" && d.message() == "add input key not has a"));
    }

    #[test]
    fn test_bad_keys() {
        let mut program = adder();
        program.input[1].map_key.key = "c".to_string();
        program.output[0].map_key.key = "sum".to_string();
        program
            .data
            .get_mut("y")
            .unwrap()
            .default_values
            .insert("z".to_string(), serde_json::json!(0));

        let locations: Vec<String> = validate(&program, &catalog())
            .iter()
            .map(Diagnostic::location)
            .collect();
        assert!(locations.contains(&"input.1.mapKey.key".to_string()));
        assert!(locations.contains(&"output.0.mapKey.key".to_string()));
        assert!(locations.contains(&"data.y.defaultValues.z".to_string()));
        // "b" of "x" is no longer bound
        assert!(locations.contains(&"data.x".to_string()));
    }

    #[test]
    fn test_bad_edge_keys() {
        let mut program = adder();
        program.data.get_mut("x").unwrap().next[0] = Edge::new("y", "sum", "c");
        let diagnostics = validate(&program, &catalog());
        let at = |loc: &str| diagnostics.iter().find(|d| d.location() == loc).cloned();

        assert_eq!(
            at("data.x.next.0.fromKey").unwrap().message(),
            "key sum not found in function add only result"
        );
        assert_eq!(
            at("data.x.next.0.toKey").unwrap().message(),
            "key c not found in function add only a, b"
        );
    }

    #[test]
    fn test_callback_keys_are_accepted() {
        let mut program = Program::new();
        let mut each = Node::new("each");
        each.next.push(Edge::new("m", "item", "a"));
        let mut m = Node::new("add");
        m.default_values.insert("b".to_string(), serde_json::json!(2));
        m.next.push(Edge::new("e", "result", "callback"));
        program.data.insert("e".to_string(), each);
        program.data.insert("m".to_string(), m);
        program.input.push(Binding::new("arr", "e", "arr", XType::any()));
        program.output.push(Binding::new("arr", "e", "arr", XType::any()));

        assert!(validate(&program, &catalog()).is_empty());
        // the callback loop e -> m -> e is not a data cycle
        assert!(detect_cycles(&program, &catalog()).is_empty());
    }

    #[test]
    fn test_detect_cycles() {
        let mut program = adder();
        program
            .data
            .get_mut("y")
            .unwrap()
            .next
            .push(Edge::new("x", "result", "b"));

        let diagnostics = detect_cycles(&program, &catalog());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].error,
            ValidationError::CycleDetected {
                node_ids: vec!["x".to_string(), "y".to_string()]
            }
        );
    }

    #[test]
    fn test_diagnostic_wire_format() {
        let diagnostic = Diagnostic::new(
            ValidationError::UnknownNode {
                node_id: "9".to_string(),
            },
            &["data", "1", "next", "0", "id"],
        );
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["kind"], "unknownNode");
        assert_eq!(json["nodeId"], "9");
        assert_eq!(json["path"][4], "id");
        assert_eq!(diagnostic.to_string(), "id 9 not found (at data.1.next.0.id)");
    }
}
