//! Callback closures
//!
//! Edges leaving a node through a callback input key mark the entry points
//! of a callback body; edges coming back into the node through a callback
//! output key mark its exits. Firing such a node slices the body out of the
//! enclosing program (breadth-first from the entry targets, stopping at the
//! call site), turns it into a nested program and hands the runner one
//! closure per declared callback. A closure starts from a copy of the
//! enclosing frames restricted to the sliced nodes, so values that were
//! already delivered to the body from outside stay visible inside it.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::engine::{self, Runtime};
use crate::error::{CallbackSide, EngineError, Result};
use crate::frame::FrameQueue;
use crate::program::{Binding, Edge, Program};
use crate::signature::Signature;
use crate::types::{NodeId, Values};

/// Handle a native runner uses to invoke its callbacks
pub struct Callbacks<'r, 'e> {
    runtime: &'r mut Runtime<'e>,
    closures: &'r HashMap<String, Closure>,
    caller: &'r str,
}

impl<'r, 'e> Callbacks<'r, 'e> {
    pub(crate) fn new(
        runtime: &'r mut Runtime<'e>,
        closures: &'r HashMap<String, Closure>,
        caller: &'r str,
    ) -> Self {
        Self {
            runtime,
            closures,
            caller,
        }
    }

    /// Invoke callback `name` with `args`, returning its outputs
    pub fn call(&mut self, name: &str, args: Values) -> Result<Values> {
        let closures = self.closures;
        let closure = closures
            .get(name)
            .ok_or_else(|| EngineError::UnknownCallback {
                name: name.to_string(),
            })?;
        closure.invoke(self.runtime, &args, self.caller)
    }

    /// Invoke callback `name` and take a single output value
    pub fn call_for(&mut self, name: &str, args: Values, output: &str) -> Result<serde_json::Value> {
        self.call(name, args)?.remove(output).ok_or_else(|| {
            EngineError::failed(format!("callback '{}' produced no '{}'", name, output))
        })
    }

    /// Names of the callbacks available to this invocation
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.closures.keys().map(|name| name.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// A callback body ready to run
pub(crate) struct Closure {
    name: String,
    program: Program,
    seed: FrameQueue,
}

impl Closure {
    fn invoke(&self, rt: &mut Runtime<'_>, args: &Values, caller: &str) -> Result<Values> {
        let mut frames = self.seed.clone();
        for binding in &self.program.input {
            let value = args
                .get(&binding.name)
                .ok_or_else(|| EngineError::MissingCallbackInput {
                    callback: self.name.clone(),
                    name: binding.name.clone(),
                })?;
            frames.add(&binding.map_key.id, &binding.map_key.key, value.clone());
        }
        engine::execute(rt, &self.program, frames, caller)
    }

    /// Canonical JSON of the body and its copied frames, for cache keys
    pub(crate) fn fingerprint(&self) -> Result<serde_json::Value> {
        let frames: Vec<(&str, BTreeMap<&String, &serde_json::Value>)> = self
            .seed
            .pending()
            .into_iter()
            .filter_map(|id| Some((id, self.seed.get(id)?.iter().collect())))
            .collect();
        Ok(serde_json::json!({
            "program": serde_json::to_value(&self.program)?,
            "frames": serde_json::to_value(frames)?,
        }))
    }
}

/// Closures for one firing plus the node ids their bodies cover
#[derive(Default)]
pub(crate) struct Extraction {
    pub(crate) closures: HashMap<String, Closure>,
    pub(crate) consumed: Vec<NodeId>,
}

/// Slice the callback bodies hanging off `call_site`
pub(crate) fn extract(
    program: &Program,
    call_site: &str,
    signature: &Signature,
    frames: &FrameQueue,
) -> Result<Extraction> {
    let Some(node) = program.node(call_site) else {
        return Ok(Extraction::default());
    };
    let feeding: Vec<&Edge> = node
        .next
        .iter()
        .filter(|edge| signature.has_callback_input(&edge.from_key))
        .collect();
    if signature.cb.is_empty() && feeding.is_empty() {
        return Ok(Extraction::default());
    }

    let (body, exits) = slice(program, call_site, &feeding);
    let data = body
        .iter()
        .filter_map(|id| {
            let mut node = program.node(id)?.clone();
            node.next.retain(|edge| edge.target != call_site);
            Some((id.to_string(), node))
        })
        .collect::<indexmap::IndexMap<_, _>>();
    let ids: HashSet<&str> = body.iter().copied().collect();
    let seed = frames.restricted(&ids);

    let mut closures = HashMap::new();
    for (name, callback) in &signature.cb {
        let mut input = Vec::new();
        for param in &callback.input {
            let before = input.len();
            input.extend(
                feeding
                    .iter()
                    .filter(|edge| edge.from_key == param.name)
                    .map(|edge| Binding::new(&param.name, &edge.target, &edge.to_key, param.ty.clone())),
            );
            if input.len() == before {
                return Err(EngineError::CallbackWiring {
                    callback: name.clone(),
                    key: param.name.clone(),
                    side: CallbackSide::Input,
                });
            }
        }

        let mut output = Vec::new();
        for param in &callback.output {
            let exit = exits.iter().find_map(|id| {
                program.node(id)?.next.iter().find_map(|edge| {
                    (edge.target == call_site && edge.to_key == param.name)
                        .then(|| Binding::new(&param.name, *id, &edge.from_key, param.ty.clone()))
                })
            });
            output.push(exit.ok_or_else(|| EngineError::CallbackWiring {
                callback: name.clone(),
                key: param.name.clone(),
                side: CallbackSide::Output,
            })?);
        }

        let program = Program {
            input,
            output,
            data: data.clone(),
        };
        closures.insert(
            name.clone(),
            Closure {
                name: name.clone(),
                program,
                seed: seed.clone(),
            },
        );
    }

    Ok(Extraction {
        closures,
        consumed: body.iter().map(|id| id.to_string()).collect(),
    })
}

/// Breadth-first walk from the feeding edge targets, never entering the
/// call site. Returns the visited ids and the ids with an edge back into it.
fn slice<'p>(program: &'p Program, call_site: &str, feeding: &[&'p Edge]) -> (Vec<&'p str>, Vec<&'p str>) {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    let mut body = Vec::new();
    let mut exits = Vec::new();

    for edge in feeding {
        let target = edge.target.as_str();
        if target != call_site && visited.insert(target) {
            queue.push_back(target);
        }
    }

    while let Some(id) = queue.pop_front() {
        body.push(id);
        let Some(node) = program.node(id) else {
            continue;
        };
        for edge in &node.next {
            let target = edge.target.as_str();
            if target == call_site {
                if !exits.contains(&id) {
                    exits.push(id);
                }
            } else if visited.insert(target) {
                queue.push_back(target);
            }
        }
    }

    (body, exits)
}
