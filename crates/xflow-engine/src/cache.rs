//! Memoization cache
//!
//! Results are keyed by function name plus a canonical JSON rendering of the
//! argument record and, for functions taking callbacks, of every callback
//! body with its copied frames. Eviction is FIFO on insertion order: when the cache
//! grows past `max`, the single oldest entry is dropped.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Args, Outputs};

/// Cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// Maximum number of entries kept
    pub max: usize,
    /// Only cache functions registered from programs
    #[serde(default = "default_restrict")]
    pub restrict_to_programs: bool,
}

fn default_restrict() -> bool {
    true
}

impl CacheConfig {
    pub fn new(max: usize) -> Self {
        Self {
            max,
            restrict_to_programs: true,
        }
    }

    /// Cache every function, native built-ins included
    pub fn unrestricted(mut self) -> Self {
        self.restrict_to_programs = false;
        self
    }
}

/// Bounded result cache
#[derive(Debug)]
pub struct MemoCache {
    max: usize,
    entries: HashMap<String, Outputs>,
    order: VecDeque<String>,
    /// `None` caches everything; otherwise only the listed function names
    allowed: Option<HashSet<String>>,
    hits: u64,
    misses: u64,
}

impl MemoCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            max: config.max,
            entries: HashMap::new(),
            order: VecDeque::new(),
            allowed: config.restrict_to_programs.then(HashSet::new),
            hits: 0,
            misses: 0,
        }
    }

    /// Build the cache key for a call
    ///
    /// `callbacks` maps each callback name to the canonical form of its body.
    pub fn key(
        function: &str,
        args: &Args,
        callbacks: &BTreeMap<&str, serde_json::Value>,
    ) -> Result<String> {
        let canonical: BTreeMap<&String, &serde_json::Value> = args.iter().collect();
        let mut key = format!("{}::{}", function, serde_json::to_string(&canonical)?);
        if !callbacks.is_empty() {
            key.push_str("::");
            key.push_str(&serde_json::to_string(callbacks)?);
        }
        Ok(key)
    }

    /// Allow results of `function` to be cached
    pub fn allow(&mut self, function: &str) {
        if let Some(allowed) = &mut self.allowed {
            allowed.insert(function.to_string());
        }
    }

    pub fn is_cacheable(&self, function: &str) -> bool {
        self.max > 0
            && self
                .allowed
                .as_ref()
                .map_or(true, |allowed| allowed.contains(function))
    }

    /// Look up a cached result, counting the hit or miss
    pub fn lookup(&mut self, key: &str) -> Option<Outputs> {
        match self.entries.get(key) {
            Some(outputs) => {
                self.hits += 1;
                Some(outputs.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store a result, evicting the oldest entry when over capacity
    pub fn insert(&mut self, key: String, outputs: Outputs) {
        if self.entries.insert(key.clone(), outputs).is_none() {
            self.order.push_back(key);
        }
        while self.entries.len() > self.max {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    /// Drop all entries and reset the counters
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get statistics about the cache
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            max: self.max,
            hits: self.hits,
            misses: self.misses,
        }
    }
}

/// Statistics about the memoization cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub max: usize,
    pub hits: u64,
    pub misses: u64,
}
