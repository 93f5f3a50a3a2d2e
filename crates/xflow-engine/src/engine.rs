//! Frame-driven interpreter
//!
//! A run pops the oldest pending frame, fires its node if every declared
//! input is present (from the frame or a default value), and otherwise
//! re-queues the frame at the tail. Firing slices out callback bodies,
//! invokes the runner (through the memoization cache when enabled),
//! discards the frames the callback bodies consumed and forwards results
//! along outgoing edges. A stop value prunes its edge. Each run gets a
//! step budget of `node count + slack` pops.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::cache::MemoCache;
use crate::callback::{self, Callbacks};
use crate::catalog::{Catalog, CatalogEntry};
use crate::error::{EngineError, Result};
use crate::events::{EventSink, RunEvent};
use crate::frame::{Frame, FrameQueue};
use crate::program::{Edge, Node, Program};
use crate::signature::Signature;
use crate::types::{Args, Flow, Outputs, Values};

/// Shared state for one top-level run and everything it calls
pub(crate) struct Runtime<'e> {
    pub(crate) catalog: &'e Catalog,
    pub(crate) cache: Option<&'e mut MemoCache>,
    pub(crate) events: &'e dyn EventSink,
    pub(crate) budget_slack: usize,
    pub(crate) execution_id: String,
}

impl Runtime<'_> {
    pub(crate) fn emit(&self, event: RunEvent) {
        if let Err(e) = self.events.send(event) {
            log::warn!("Dropping run event: {}", e);
        }
    }
}

/// Run a program with bound inputs, seeding every head node
pub(crate) fn run_program(
    rt: &mut Runtime<'_>,
    program: &Program,
    inputs: &Values,
    caller: &str,
) -> Result<Values> {
    let mut frames = FrameQueue::new();
    for binding in &program.input {
        let value = inputs
            .get(&binding.name)
            .ok_or_else(|| EngineError::MissingInput {
                name: binding.name.clone(),
            })?;
        frames.add(&binding.map_key.id, &binding.map_key.key, value.clone());
    }
    for id in program.head_nodes() {
        frames.ensure(id);
    }
    execute(rt, program, frames, caller)
}

/// Drain `frames` against `program` until outputs are complete, the queue
/// empties, or the step budget runs out
pub(crate) fn execute(
    rt: &mut Runtime<'_>,
    program: &Program,
    mut frames: FrameQueue,
    caller: &str,
) -> Result<Values> {
    let catalog = rt.catalog;
    let expected: HashSet<&str> = program.output.iter().map(|b| b.name.as_str()).collect();
    let mut outputs = Values::new();
    let mut budget = program.len() + rt.budget_slack;

    while let Some((node_id, frame)) = frames.pop() {
        budget = budget.saturating_sub(1);
        if budget == 0 {
            let mut pending: Vec<String> = vec![node_id.clone()];
            pending.extend(frames.pending().into_iter().map(str::to_string));
            log::error!(
                "Step budget exhausted in '{}' with {} frame(s) pending",
                caller,
                pending.len()
            );
            rt.emit(RunEvent::BudgetExhausted {
                execution_id: rt.execution_id.clone(),
                caller: caller.to_string(),
                pending,
            });
            break;
        }

        let Some(node) = program.node(&node_id) else {
            log::warn!("Dropping frame for unknown node '{}'", node_id);
            continue;
        };
        let entry = catalog
            .get(&node.function_name)
            .ok_or_else(|| EngineError::FunctionNotFound {
                name: node.function_name.clone(),
            })?;
        let signature = entry.signature();

        if !is_ready(signature, node, &frame) {
            log::trace!("Node '{}' not ready, re-queued", node_id);
            frames.defer(node_id, frame);
            continue;
        }

        let results = fire(rt, program, &node_id, node, entry, &frame, &mut frames, caller)?;

        for binding in program.outputs_of(&node_id) {
            if let Some(Flow::Value(value)) = results.get(&binding.map_key.key) {
                outputs.insert(binding.name.clone(), value.clone());
            }
        }
        if !expected.is_empty() && expected.iter().all(|name| outputs.contains_key(*name)) {
            break;
        }
    }

    Ok(outputs)
}

/// Every declared input is in the frame or has a default
fn is_ready(signature: &Signature, node: &Node, frame: &Frame) -> bool {
    signature
        .input
        .iter()
        .all(|param| frame.contains_key(&param.name) || node.has_default(&param.name))
}

#[allow(clippy::too_many_arguments)]
fn fire(
    rt: &mut Runtime<'_>,
    program: &Program,
    node_id: &str,
    node: &Node,
    entry: &CatalogEntry,
    frame: &Frame,
    frames: &mut FrameQueue,
    caller: &str,
) -> Result<Outputs> {
    let signature = entry.signature();
    let extraction = callback::extract(program, node_id, signature, frames)?;

    let args: Args = signature
        .input
        .iter()
        .filter_map(|param| {
            frame
                .get(&param.name)
                .or_else(|| node.default_values.get(&param.name))
                .map(|value| (param.name.clone(), value.clone()))
        })
        .collect();

    log::debug!("Firing '{}' ({}) in '{}'", node_id, node.function_name, caller);
    rt.emit(RunEvent::NodeFired {
        execution_id: rt.execution_id.clone(),
        caller: caller.to_string(),
        node_id: node_id.to_string(),
        function: node.function_name.clone(),
    });

    let results = invoke_cached(rt, &node.function_name, entry, &args, &extraction.closures, caller)?;

    for id in &extraction.consumed {
        frames.remove(id);
    }

    for edge in &node.next {
        if signature.has_output(&edge.from_key) {
            forward(rt, node_id, edge, &results, frames);
        } else if !signature.has_callback_input(&edge.from_key) {
            log::warn!(
                "Edge from '{}' uses unknown key '{}', ignored",
                node_id,
                edge.from_key
            );
        }
    }

    Ok(results)
}

fn forward(rt: &Runtime<'_>, node_id: &str, edge: &Edge, results: &Outputs, frames: &mut FrameQueue) {
    match results.get(&edge.from_key) {
        Some(Flow::Value(value)) => frames.add(&edge.target, &edge.to_key, value.clone()),
        Some(Flow::Stop) => {
            log::info!("Stop at '{}' key '{}'", node_id, edge.from_key);
            rt.emit(RunEvent::BranchStopped {
                execution_id: rt.execution_id.clone(),
                node_id: node_id.to_string(),
                key: edge.from_key.clone(),
            });
        }
        None => log::warn!(
            "Node '{}' produced no '{}', edge to '{}' not followed",
            node_id,
            edge.from_key,
            edge.target
        ),
    }
}

fn invoke_cached(
    rt: &mut Runtime<'_>,
    function: &str,
    entry: &CatalogEntry,
    args: &Args,
    closures: &HashMap<String, callback::Closure>,
    caller: &str,
) -> Result<Outputs> {
    let key = match rt.cache.as_deref() {
        Some(cache) if cache.is_cacheable(function) => {
            let bodies = closures
                .iter()
                .map(|(name, closure)| Ok((name.as_str(), closure.fingerprint()?)))
                .collect::<Result<BTreeMap<_, _>>>()?;
            Some(MemoCache::key(function, args, &bodies)?)
        }
        _ => None,
    };

    if let (Some(key), Some(cache)) = (&key, rt.cache.as_deref_mut()) {
        if let Some(hit) = cache.lookup(key) {
            log::info!("Cache hit {}", key);
            rt.emit(RunEvent::CacheHit {
                execution_id: rt.execution_id.clone(),
                key: key.clone(),
            });
            return Ok(hit);
        }
    }

    let results = invoke(rt, function, entry, args, closures, caller)?;

    if let (Some(key), Some(cache)) = (key, rt.cache.as_deref_mut()) {
        cache.insert(key, results.clone());
    }
    Ok(results)
}

fn invoke(
    rt: &mut Runtime<'_>,
    function: &str,
    entry: &CatalogEntry,
    args: &Args,
    closures: &HashMap<String, callback::Closure>,
    caller: &str,
) -> Result<Outputs> {
    match entry {
        CatalogEntry::Native { runner, .. } => {
            let mut callbacks = Callbacks::new(rt, closures, caller);
            runner.invoke(args, &mut callbacks)
        }
        CatalogEntry::Program { program, .. } => {
            let values = run_program(rt, program, args, function)?;
            Ok(values
                .into_iter()
                .map(|(key, value)| (key, Flow::Value(value)))
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::catalog::NativeFunction;
    use crate::events::VecEventSink;
    use crate::program::Binding;
    use crate::signature::Param;
    use crate::types::XType;
    use serde_json::json;

    fn num_out(key: &str, value: serde_json::Value) -> Outputs {
        let mut outputs = Outputs::new();
        outputs.insert(key.to_string(), Flow::Value(value));
        outputs
    }

    fn test_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.register_native(NativeFunction::new(
            "inc",
            Signature::new(
                vec![Param::new("x", XType::num())],
                vec![Param::new("y", XType::num())],
            ),
            |args: &Args, _cb: &mut Callbacks<'_, '_>| {
                let x = args["x"].as_i64().ok_or_else(|| EngineError::invalid("x", "num"))?;
                Ok(num_out("y", json!(x + 1)))
            },
        ));
        catalog.register_native(NativeFunction::new(
            "gate",
            Signature::new(
                vec![Param::new("x", XType::num())],
                vec![Param::new("pass", XType::num()), Param::new("block", XType::num())],
            ),
            |args: &Args, _cb: &mut Callbacks<'_, '_>| {
                let mut outputs = num_out("pass", args["x"].clone());
                outputs.insert("block".to_string(), Flow::Stop);
                Ok(outputs)
            },
        ));
        catalog.register_native(NativeFunction::new(
            "seven",
            Signature::new(vec![], vec![Param::new("y", XType::num())]),
            |_args: &Args, _cb: &mut Callbacks<'_, '_>| Ok(num_out("y", json!(7))),
        ));
        catalog
    }

    fn chain() -> Program {
        let mut program = Program::new();
        let mut a = Node::new("inc");
        a.next.push(Edge::new("b", "y", "x"));
        program.data.insert("a".to_string(), a);
        program.data.insert("b".to_string(), Node::new("inc"));
        program.input.push(Binding::new("n", "a", "x", XType::num()));
        program.output.push(Binding::new("r", "b", "y", XType::num()));
        program
    }

    fn run_with(
        catalog: &Catalog,
        cache: Option<&mut MemoCache>,
        sink: &VecEventSink,
        program: &Program,
        inputs: &Values,
    ) -> Result<Values> {
        let mut rt = Runtime {
            catalog,
            cache,
            events: sink,
            budget_slack: 10,
            execution_id: "test".to_string(),
        };
        run_program(&mut rt, program, inputs, "main")
    }

    fn inputs(pairs: &[(&str, serde_json::Value)]) -> Values {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_linear_chain() {
        let catalog = test_catalog();
        let sink = VecEventSink::new();
        let out = run_with(&catalog, None, &sink, &chain(), &inputs(&[("n", json!(1))])).unwrap();
        assert_eq!(out["r"], json!(3));
        assert_eq!(
            sink.fired(),
            vec![
                ("main".to_string(), "a".to_string()),
                ("main".to_string(), "b".to_string())
            ]
        );
    }

    #[test]
    fn test_missing_input() {
        let catalog = test_catalog();
        let sink = VecEventSink::new();
        let err = run_with(&catalog, None, &sink, &chain(), &Values::new()).unwrap_err();
        assert!(matches!(err, EngineError::MissingInput { name } if name == "n"));
    }

    #[test]
    fn test_null_input_is_present() {
        let catalog = test_catalog();
        let sink = VecEventSink::new();
        let err = run_with(&catalog, None, &sink, &chain(), &inputs(&[("n", json!(null))]))
            .unwrap_err();
        // the runner rejects the value, the engine does not
        assert!(matches!(err, EngineError::InvalidArgument { .. }));
    }

    #[test]
    fn test_default_value_fires_head() {
        let mut program = Program::new();
        let mut a = Node::new("inc");
        a.default_values.insert("x".to_string(), json!(41));
        program.data.insert("a".to_string(), a);
        program.output.push(Binding::new("r", "a", "y", XType::num()));

        let catalog = test_catalog();
        let sink = VecEventSink::new();
        let out = run_with(&catalog, None, &sink, &program, &Values::new()).unwrap();
        assert_eq!(out["r"], json!(42));
    }

    #[test]
    fn test_stop_prunes_branch() {
        let mut program = Program::new();
        let mut g = Node::new("gate");
        g.next.push(Edge::new("p", "pass", "x"));
        g.next.push(Edge::new("q", "block", "x"));
        program.data.insert("g".to_string(), g);
        program.data.insert("p".to_string(), Node::new("inc"));
        program.data.insert("q".to_string(), Node::new("inc"));
        program.input.push(Binding::new("n", "g", "x", XType::num()));
        program.output.push(Binding::new("p", "p", "y", XType::num()));
        program.output.push(Binding::new("q", "q", "y", XType::num()));

        let catalog = test_catalog();
        let sink = VecEventSink::new();
        let out = run_with(&catalog, None, &sink, &program, &inputs(&[("n", json!(1))])).unwrap();
        assert_eq!(out.get("p"), Some(&json!(2)));
        assert!(!out.contains_key("q"));
        assert!(!sink.fired().iter().any(|(_, id)| id == "q"));
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, RunEvent::BranchStopped { key, .. } if key == "block")));
    }

    #[test]
    fn test_budget_stops_unsatisfiable_node() {
        // "b" waits on an input nothing ever supplies
        let mut program = Program::new();
        program.data.insert("b".to_string(), Node::new("inc"));
        program.output.push(Binding::new("r", "b", "y", XType::num()));

        let catalog = test_catalog();
        let sink = VecEventSink::new();
        let out = run_with(&catalog, None, &sink, &program, &Values::new()).unwrap();
        assert!(out.is_empty());
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, RunEvent::BudgetExhausted { pending, .. } if pending == &vec!["b".to_string()])));
    }

    #[test]
    fn test_stops_once_outputs_complete() {
        let mut program = Program::new();
        program.data.insert("s".to_string(), Node::new("seven"));
        program.data.insert("t".to_string(), Node::new("seven"));
        program.output.push(Binding::new("r", "s", "y", XType::num()));

        let catalog = test_catalog();
        let sink = VecEventSink::new();
        let out = run_with(&catalog, None, &sink, &program, &Values::new()).unwrap();
        assert_eq!(out["r"], json!(7));
        assert_eq!(sink.fired().len(), 1);
    }

    #[test]
    fn test_unknown_function_fails() {
        let mut program = Program::new();
        program.data.insert("a".to_string(), Node::new("nope"));

        let catalog = test_catalog();
        let sink = VecEventSink::new();
        let err = run_with(&catalog, None, &sink, &program, &Values::new()).unwrap_err();
        assert!(matches!(err, EngineError::FunctionNotFound { name } if name == "nope"));
    }

    #[test]
    fn test_program_entry_and_cache() {
        let mut catalog = test_catalog();
        catalog.register_program("inc2", chain());

        let mut program = Program::new();
        let mut a = Node::new("inc2");
        a.next.push(Edge::new("b", "r", "n"));
        program.data.insert("a".to_string(), a);
        program.data.insert("b".to_string(), Node::new("inc2"));
        program.input.push(Binding::new("n", "a", "n", XType::num()));
        program.output.push(Binding::new("r", "b", "r", XType::num()));

        let mut cache = MemoCache::new(&CacheConfig::new(8));
        cache.allow("inc2");
        let sink = VecEventSink::new();
        let out = run_with(&catalog, Some(&mut cache), &sink, &program, &inputs(&[("n", json!(0))]))
            .unwrap();
        assert_eq!(out["r"], json!(4));
        assert_eq!(cache.len(), 2);
        assert!(sink.fired().contains(&("inc2".to_string(), "a".to_string())));

        sink.clear();
        let again = run_with(&catalog, Some(&mut cache), &sink, &program, &inputs(&[("n", json!(0))]))
            .unwrap();
        assert_eq!(again["r"], json!(4));
        // both calls are served from the cache, so no nested node fires
        assert!(sink.fired().iter().all(|(caller, _)| caller == "main"));
        assert_eq!(cache.stats().hits, 2);
    }
}
