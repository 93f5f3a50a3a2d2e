//! Host-facing execution environment
//!
//! An [`Environment`] owns a function catalog, the optional memoization
//! cache and the event sink. Hosts register extra functions (programs
//! included), validate programs and run them with a record of inputs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheConfig, CacheStats, MemoCache};
use crate::catalog::{Catalog, NativeFunction};
use crate::engine::{self, Runtime};
use crate::error::Result;
use crate::events::{EventSink, FnEventSink, NullEventSink, RunEvent};
use crate::program::Program;
use crate::signature::Signature;
use crate::types::Values;
use crate::validation::{self, Diagnostic};

/// Caller name used for top-level runs
pub const MAIN: &str = "main";

/// Environment settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentConfig {
    /// Memoization cache, off when `None`
    #[serde(default)]
    pub cache: Option<CacheConfig>,
    /// Extra steps granted to every run on top of its node count
    #[serde(default = "default_budget_slack")]
    pub budget_slack: usize,
    /// Check native signatures for name collisions on construction
    #[serde(default = "default_check_catalog")]
    pub check_catalog: bool,
}

fn default_budget_slack() -> usize {
    10
}

fn default_check_catalog() -> bool {
    true
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            cache: None,
            budget_slack: default_budget_slack(),
            check_catalog: default_check_catalog(),
        }
    }
}

impl EnvironmentConfig {
    /// Enable the memoization cache with `max` entries
    pub fn with_cache(mut self, max: usize) -> Self {
        self.cache = Some(CacheConfig::new(max));
        self
    }
}

/// Catalog plus run-time services
pub struct Environment {
    catalog: Catalog,
    config: EnvironmentConfig,
    cache: Option<MemoCache>,
    events: Arc<dyn EventSink>,
}

impl Environment {
    /// Create an environment with default settings
    pub fn new(catalog: Catalog) -> Self {
        Self::with_config(catalog, EnvironmentConfig::default())
    }

    /// Create an environment with explicit settings
    pub fn with_config(catalog: Catalog, config: EnvironmentConfig) -> Self {
        if config.check_catalog {
            for (name, messages) in catalog.check_consistency() {
                for message in messages {
                    log::warn!("Function '{}': {}", name, message);
                }
            }
        }
        let cache = config.cache.as_ref().map(MemoCache::new);
        Self {
            catalog,
            config,
            cache,
            events: Arc::new(NullEventSink),
        }
    }

    /// Send run events to `sink`
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Report every node firing as `(caller, node_id)`
    pub fn with_run_info<F>(self, callback: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.with_event_sink(Arc::new(FnEventSink::new(callback)))
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// All callable functions with their signatures
    pub fn functions(&self) -> impl Iterator<Item = (&str, &Signature)> + '_ {
        self.catalog.all()
    }

    /// Register a program as a callable function
    ///
    /// The name becomes eligible for memoization when the cache is on.
    /// Registering a name twice replaces the earlier entry.
    pub fn add_function(&mut self, name: impl Into<String>, program: Program) {
        let name = name.into();
        if let Some(cache) = &mut self.cache {
            cache.allow(&name);
        }
        log::debug!("Registered program function '{}'", name);
        self.catalog.register_program(name, program);
    }

    /// Register a native function
    pub fn register_native(&mut self, function: NativeFunction) {
        for message in function.signature.check_consistency() {
            log::warn!("Function '{}': {}", function.name, message);
        }
        self.catalog.register_native(function);
    }

    /// Validate a program against the catalog
    pub fn validate(&self, program: &Program) -> Vec<Diagnostic> {
        validation::validate(program, &self.catalog)
    }

    /// Return the program if it validates cleanly, logging diagnostics otherwise
    pub fn check_strict<'p>(&self, program: &'p Program) -> Option<&'p Program> {
        let diagnostics = self.validate(program);
        if diagnostics.is_empty() {
            return Some(program);
        }
        for diagnostic in &diagnostics {
            log::warn!("{}", diagnostic);
        }
        None
    }

    /// Run a program with the given inputs
    ///
    /// Clears the memoization cache first, so results never leak between
    /// top-level runs. Outputs that were never produced are absent from
    /// the result.
    pub fn run(&mut self, program: &Program, inputs: &Values) -> Result<Values> {
        if let Some(cache) = &mut self.cache {
            cache.clear();
        }

        let execution_id = uuid::Uuid::new_v4().to_string();
        log::info!("Starting run {} ({} nodes)", execution_id, program.len());

        let events = self.events.as_ref();
        let mut rt = Runtime {
            catalog: &self.catalog,
            cache: self.cache.as_mut(),
            events,
            budget_slack: self.config.budget_slack,
            execution_id: execution_id.clone(),
        };
        rt.emit(RunEvent::RunStarted {
            execution_id: execution_id.clone(),
        });

        match engine::run_program(&mut rt, program, inputs, MAIN) {
            Ok(outputs) => {
                let mut names: Vec<String> = outputs.keys().cloned().collect();
                names.sort();
                log::info!("Run {} completed with outputs {:?}", execution_id, names);
                rt.emit(RunEvent::RunCompleted {
                    execution_id,
                    outputs: names,
                });
                Ok(outputs)
            }
            Err(e) => {
                log::error!("Run {} failed: {}", execution_id, e);
                rt.emit(RunEvent::RunFailed {
                    execution_id,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Memoization cache statistics, if the cache is on
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(MemoCache::stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ProgramBuilder;
    use crate::callback::Callbacks;
    use crate::error::EngineError;
    use crate::events::VecEventSink;
    use crate::signature::Param;
    use crate::types::{Args, Flow, Outputs, XType};
    use serde_json::json;
    use std::sync::Mutex;

    fn double(args: &Args, _cb: &mut Callbacks<'_, '_>) -> crate::error::Result<Outputs> {
        let x = args["x"]
            .as_i64()
            .ok_or_else(|| EngineError::invalid("x", "num"))?;
        let mut outputs = Outputs::new();
        outputs.insert("y".to_string(), Flow::Value(json!(x * 2)));
        Ok(outputs)
    }

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.register_native(NativeFunction::new(
            "double",
            Signature::new(
                vec![Param::new("x", XType::num())],
                vec![Param::new("y", XType::num())],
            ),
            double,
        ));
        catalog
    }

    fn quad() -> Program {
        ProgramBuilder::new()
            .add_node("a", "double")
            .add_node("b", "double")
            .connect("a", "y", "b", "x")
            .input("n", "a", "x", XType::num())
            .output("r", "b", "y", XType::num())
            .build()
    }

    fn inputs(n: i64) -> Values {
        let mut values = Values::new();
        values.insert("n".to_string(), json!(n));
        values
    }

    #[test]
    fn test_config_defaults() {
        let config: EnvironmentConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EnvironmentConfig::default());
        assert_eq!(config.budget_slack, 10);

        let config: EnvironmentConfig =
            serde_json::from_str(r#"{"cache": {"max": 100}, "budgetSlack": 3}"#).unwrap();
        assert_eq!(config.cache, Some(CacheConfig::new(100)));
        assert_eq!(config.budget_slack, 3);
    }

    #[test]
    fn test_run_and_events() {
        let sink = Arc::new(VecEventSink::new());
        let mut env = Environment::new(catalog()).with_event_sink(sink.clone());
        let out = env.run(&quad(), &inputs(3)).unwrap();
        assert_eq!(out["r"], json!(12));

        let events = sink.events();
        assert!(matches!(events.first(), Some(RunEvent::RunStarted { .. })));
        assert!(matches!(
            events.last(),
            Some(RunEvent::RunCompleted { outputs, .. }) if outputs == &vec!["r".to_string()]
        ));
        assert_eq!(sink.fired().len(), 2);
    }

    #[test]
    fn test_run_info_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let mut env = Environment::new(catalog()).with_run_info(move |caller, node_id| {
            log.lock().unwrap().push(format!("{}:{}", caller, node_id));
        });
        env.run(&quad(), &inputs(1)).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["main:a", "main:b"]);
    }

    #[test]
    fn test_add_function_and_cache() {
        let mut env = Environment::with_config(catalog(), EnvironmentConfig::default().with_cache(16));
        env.add_function("quad", quad());
        assert!(env.functions().any(|(name, sig)| name == "quad" && sig.has_input("n")));

        let program = ProgramBuilder::new()
            .add_node("p", "quad")
            .add_node("q", "quad")
            .input("n", "p", "n", XType::num())
            .input("m", "q", "n", XType::num())
            .output("a", "p", "r", XType::num())
            .output("b", "q", "r", XType::num())
            .build();
        let mut values = inputs(2);
        values.insert("m".to_string(), json!(2));

        let out = env.run(&program, &values).unwrap();
        assert_eq!(out["a"], json!(8));
        assert_eq!(out["b"], json!(8));
        // "double" is native and never cached; the second "quad" call hits
        let stats = env.cache_stats().unwrap();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);

        // a new run starts from an empty cache
        env.run(&program, &values).unwrap();
        assert_eq!(env.cache_stats().unwrap().hits, 1);
    }

    #[test]
    fn test_failed_run_reports_event() {
        let sink = Arc::new(VecEventSink::new());
        let mut env = Environment::new(catalog()).with_event_sink(sink.clone());
        let err = env.run(&quad(), &Values::new()).unwrap_err();
        assert!(matches!(err, EngineError::MissingInput { .. }));
        assert!(matches!(sink.events().last(), Some(RunEvent::RunFailed { .. })));
    }

    #[test]
    fn test_check_strict() {
        let env = Environment::new(catalog());
        let good = quad();
        assert!(env.check_strict(&good).is_some());

        let bad = ProgramBuilder::new().add_node("a", "triple").build();
        assert!(env.check_strict(&bad).is_none());
        assert_eq!(env.validate(&bad)[0].location(), "data.a.functionName");
    }
}
