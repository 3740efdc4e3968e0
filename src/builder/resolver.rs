//! Entity identity resolution during a graph build.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::graph::NodeId;
use crate::models::normalize_name;

/// Maps entity names to graph node ids.
///
/// The default implementation only knows about nodes created in the current run, so a
/// rebuild against an un-cleared store creates duplicate nodes. A resolver backed by the
/// store itself can be plugged in through
/// [`GraphBuilder::build_graph_with_resolver`](super::GraphBuilder::build_graph_with_resolver).
#[async_trait]
pub trait EntityResolver: Send {
    async fn resolve(&mut self, name: &str) -> Option<NodeId>;

    async fn register(&mut self, name: &str, id: NodeId);
}

/// Name → node id map owned by exactly one build run.
#[derive(Debug, Default)]
pub struct RunScopedResolver {
    ids: HashMap<String, NodeId>,
}

impl RunScopedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[async_trait]
impl EntityResolver for RunScopedResolver {
    async fn resolve(&mut self, name: &str) -> Option<NodeId> {
        self.ids.get(&normalize_name(name)).cloned()
    }

    async fn register(&mut self, name: &str, id: NodeId) {
        self.ids.entry(normalize_name(name)).or_insert(id);
    }
}
