//! xflow engine - dataflow graph interpreter
//!
//! Programs are graphs of nodes, each bound to a named function from a
//! catalog. Values travel along edges into per-node frames; a node fires
//! once its frame holds every declared input (or a default for it).
//!
//! - Frame-driven FIFO scheduling with a per-run step budget
//! - Higher-order functions: callback bodies are sliced out of the graph
//!   and handed to the runner as closures
//! - Programs registered as functions, recursion included
//! - Stop values that prune a branch
//! - Optional memoization cache keyed by function and arguments
//! - Static validation with location paths
//!
//! # Example
//!
//! ```ignore
//! use xflow_engine::{Catalog, Environment, ProgramBuilder, XType};
//!
//! let program = ProgramBuilder::new()
//!     .add_node("0", "str.split")
//!     .add_node("1", "str.join")
//!     .with_default("sep", json!(" "))
//!     .connect("0", "arr", "1", "arr")
//!     .input("it", "0", "str", XType::string())
//!     .output("out", "1", "str", XType::string())
//!     .build();
//!
//! let mut env = Environment::new(Catalog::with_builtins());
//! let outputs = env.run(&program, &inputs)?;
//! ```

pub mod builder;
pub mod cache;
pub mod callback;
pub mod catalog;
mod engine;
pub mod environment;
pub mod error;
pub mod events;
pub mod frame;
pub mod program;
pub mod signature;
pub mod types;
pub mod validation;

// Re-export key types
pub use builder::ProgramBuilder;
pub use cache::{CacheConfig, CacheStats, MemoCache};
pub use callback::Callbacks;
pub use catalog::{Catalog, CatalogEntry, NativeFn, NativeFunction, NativeRunner};
pub use environment::{Environment, EnvironmentConfig, MAIN};
pub use error::{CallbackSide, EngineError, Result};
pub use events::{EventError, EventSink, FnEventSink, NullEventSink, RunEvent, VecEventSink};
pub use frame::{Frame, FrameQueue};
pub use program::{Binding, Edge, MapKey, Node, Program};
pub use signature::{CallbackSignature, Param, Signature};
pub use types::{Args, Flow, NodeId, Outputs, TypeKind, Values, XType};
pub use validation::{detect_cycles, validate, Diagnostic, ValidationError};
