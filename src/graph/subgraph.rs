use std::fmt::Write;

use serde::Serialize;

use super::store::{Direction, GraphNode, NodeId};

/// Most lines a serialized subgraph may contribute to the context.
pub const MAX_CONTEXT_LINES: usize = 20;

/// `(node, neighbour, edge_type, direction)` edge seen from a matched node.
///
/// `node_id` ties the triple to one matched node; several nodes may share a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Triple {
    pub node_id: NodeId,
    pub node: String,
    pub neighbor: String,
    pub edge_type: String,
    pub direction: Direction,
}

impl Triple {
    fn sort_key(&self) -> (&str, &str, &str, Direction, &str) {
        (
            &self.node,
            &self.neighbor,
            &self.edge_type,
            self.direction,
            &self.node_id,
        )
    }
}

/// Matched nodes plus their depth-1 triples.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Subgraph {
    pub nodes: Vec<GraphNode>,
    pub triples: Vec<Triple>,
}

impl Subgraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Sort triples lexicographically and drop duplicates.
    pub fn normalize(&mut self) {
        self.triples.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self.triples.dedup();
    }

    /// Render as a single context fragment.
    ///
    /// ```text
    /// Knowledge Graph Context:
    /// [Organization] Acme
    ///   -[MANUFACTURES]-> Panel X
    ///   <-[SUPPLIES]- GreenPower
    /// ```
    pub fn to_context(&self) -> String {
        if self.is_empty() {
            return String::new();
        }

        let mut lines = Vec::new();
        for node in &self.nodes {
            lines.push(format!("[{}] {}", node.label_text(), node.name));
            for triple in self.triples.iter().filter(|t| t.node_id == node.id) {
                let line = match triple.direction {
                    Direction::Outgoing => {
                        format!("  -[{}]-> {}", triple.edge_type, triple.neighbor)
                    }
                    Direction::Incoming => {
                        format!("  <-[{}]- {}", triple.edge_type, triple.neighbor)
                    }
                };
                lines.push(line);
            }
        }
        lines.truncate(MAX_CONTEXT_LINES);

        let mut out = String::from("Knowledge Graph Context:");
        for line in lines {
            let _ = write!(out, "\n{line}");
        }
        out
    }
}
