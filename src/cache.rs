//! Content-keyed memoization of finished diagrams.
//!
//! The engine itself is a pure function, so repeated renders of the same
//! input can share one [`FlowDiagram`]. Keys are SHA-256 digests of the JSON
//! form of the input and both configs; a hit is only served after the stored
//! input and configs compare equal to the requested ones.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::{GraphConfig, LayoutConfig};
use crate::ir::FlowInput;
use crate::{FlowDiagram, build_diagram};

/// Default number of diagrams kept before the oldest is evicted.
pub const DEFAULT_CAPACITY: usize = 32;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyMaterial<'a> {
    input: &'a FlowInput,
    graph: &'a GraphConfig,
    layout: &'a LayoutConfig,
}

/// Hex SHA-256 of the canonical JSON of `(input, graph, layout)`.
pub fn cache_key(input: &FlowInput, graph: &GraphConfig, layout: &LayoutConfig) -> Option<String> {
    let material = KeyMaterial {
        input,
        graph,
        layout,
    };
    let bytes = serde_json::to_vec(&material).ok()?;
    Some(format!("sha256:{:x}", Sha256::digest(&bytes)))
}

#[derive(Debug)]
struct CacheEntry {
    input: FlowInput,
    graph: GraphConfig,
    layout: LayoutConfig,
    diagram: Arc<FlowDiagram>,
}

impl CacheEntry {
    fn matches(&self, input: &FlowInput, graph: &GraphConfig, layout: &LayoutConfig) -> bool {
        self.input == *input && self.graph == *graph && self.layout == *layout
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Bounded FIFO cache of diagrams.
#[derive(Debug)]
pub struct DiagramCache {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl Default for DiagramCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl DiagramCache {
    /// A capacity of zero disables storage; every call rebuilds.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
            hits: 0,
            misses: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Returns the cached diagram for this input and configs, building and
    /// storing it on a miss.
    pub fn get_or_build(
        &mut self,
        input: &FlowInput,
        graph: &GraphConfig,
        layout: &LayoutConfig,
    ) -> Arc<FlowDiagram> {
        let Some(key) = cache_key(input, graph, layout) else {
            self.misses += 1;
            return Arc::new(build_diagram(input, graph, layout));
        };

        if let Some(entry) = self.entries.get(&key)
            && entry.matches(input, graph, layout)
        {
            self.hits += 1;
            return Arc::clone(&entry.diagram);
        }

        self.misses += 1;
        let diagram = Arc::new(build_diagram(input, graph, layout));
        if self.capacity == 0 {
            return diagram;
        }

        let entry = CacheEntry {
            input: input.clone(),
            graph: graph.clone(),
            layout: layout.clone(),
            diagram: Arc::clone(&diagram),
        };
        if self.entries.insert(key.clone(), entry).is_none() {
            self.order.push_back(key);
            while self.order.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    tracing::debug!(key = %oldest, "evicting cached diagram");
                    self.entries.remove(&oldest);
                }
            }
        }
        diagram
    }
}
