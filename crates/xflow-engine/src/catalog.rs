//! Function catalog
//!
//! Maps function names to either a native runner or a nested program.
//! Native built-ins register themselves at link time through
//! [`inventory`]; [`Catalog::with_builtins`] collects them.
//!
//! # Usage
//!
//! ```ignore
//! use xflow_engine::{Catalog, NativeFunction, Signature};
//!
//! let mut catalog = Catalog::with_builtins();
//! catalog.register_native(NativeFunction::new("my.fn", signature, my_runner));
//! catalog.register_program("fib", fib_program);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::callback::Callbacks;
use crate::error::Result;
use crate::program::Program;
use crate::signature::Signature;
use crate::types::{Args, Outputs};

/// Synchronous runner behind a native function
///
/// Implemented for every `Fn(&Args, &mut Callbacks) -> Result<Outputs>`,
/// so plain functions and closures can be registered directly.
pub trait NativeRunner: Send + Sync {
    fn invoke(&self, args: &Args, callbacks: &mut Callbacks<'_, '_>) -> Result<Outputs>;
}

impl<F> NativeRunner for F
where
    F: Fn(&Args, &mut Callbacks<'_, '_>) -> Result<Outputs> + Send + Sync,
{
    fn invoke(&self, args: &Args, callbacks: &mut Callbacks<'_, '_>) -> Result<Outputs> {
        self(args, callbacks)
    }
}

/// A named native function: signature plus runner
#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub signature: Signature,
    pub runner: Arc<dyn NativeRunner>,
}

impl NativeFunction {
    pub fn new<F>(name: impl Into<String>, signature: Signature, runner: F) -> Self
    where
        F: Fn(&Args, &mut Callbacks<'_, '_>) -> Result<Outputs> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature,
            runner: Arc::new(runner),
        }
    }
}

impl std::fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Link-time registration hook for native built-ins
///
/// ```ignore
/// fn add() -> NativeFunction { ... }
/// inventory::submit!(xflow_engine::NativeFn(add));
/// ```
pub struct NativeFn(pub fn() -> NativeFunction);

inventory::collect!(NativeFn);

/// What a catalog name resolves to
#[derive(Clone)]
pub enum CatalogEntry {
    /// Host-language runner
    Native {
        signature: Signature,
        runner: Arc<dyn NativeRunner>,
    },
    /// A program invoked as a function (user-defined or recursive)
    Program {
        signature: Signature,
        program: Arc<Program>,
    },
}

impl CatalogEntry {
    pub fn signature(&self) -> &Signature {
        match self {
            Self::Native { signature, .. } | Self::Program { signature, .. } => signature,
        }
    }

    pub fn is_program(&self) -> bool {
        matches!(self, Self::Program { .. })
    }
}

impl std::fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native { signature, .. } => f
                .debug_struct("Native")
                .field("signature", signature)
                .finish_non_exhaustive(),
            Self::Program { signature, program } => f
                .debug_struct("Program")
                .field("signature", signature)
                .field("nodes", &program.len())
                .finish(),
        }
    }
}

/// Catalog of callable functions, keyed by name
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog holding every native function submitted via `inventory`
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        for builtin in inventory::iter::<NativeFn> {
            catalog.register_native((builtin.0)());
        }
        log::debug!("Catalog initialized with {} built-in functions", catalog.len());
        catalog
    }

    /// Register a native function, replacing any entry of the same name
    pub fn register_native(&mut self, function: NativeFunction) {
        self.entries.insert(
            function.name,
            CatalogEntry::Native {
                signature: function.signature,
                runner: function.runner,
            },
        );
    }

    /// Register a program as a callable function
    ///
    /// Its signature is derived from the program's input and output bindings.
    pub fn register_program(&mut self, name: impl Into<String>, program: Program) {
        let signature = program.signature();
        self.entries.insert(
            name.into(),
            CatalogEntry::Program {
                signature,
                program: Arc::new(program),
            },
        );
    }

    /// Register an entry under a name
    pub fn register(&mut self, name: impl Into<String>, entry: CatalogEntry) {
        self.entries.insert(name.into(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    pub fn signature(&self, name: &str) -> Option<&Signature> {
        self.entries.get(name).map(CatalogEntry::signature)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All functions with their signatures, sorted by name
    pub fn all(&self) -> impl Iterator<Item = (&str, &Signature)> + '_ {
        self.entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.signature()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(|name| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge another catalog into this one
    ///
    /// Entries from `other` override entries in `self` with the same name.
    pub fn merge(&mut self, other: Catalog) {
        self.entries.extend(other.entries);
    }

    /// Run the signature consistency check over every entry
    ///
    /// Returns `(function name, messages)` for each inconsistent signature.
    pub fn check_consistency(&self) -> Vec<(String, Vec<String>)> {
        self.entries
            .iter()
            .filter_map(|(name, entry)| {
                let messages = entry.signature().check_consistency();
                (!messages.is_empty()).then(|| (name.clone(), messages))
            })
            .collect()
    }
}
