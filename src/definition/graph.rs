// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Dependency graph over definition elements
//!
//! Elements declare the paths they depend on; the graph checks those
//! references and yields an apply order that keeps the written order
//! wherever dependencies allow it.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use super::DefinitionElement;
use crate::errors::{DefflowError, DefflowResult};

/// Dependency edges between the elements of one folder
pub struct ElementGraph {
    graph: DiGraph<usize, ()>,
    paths: Vec<String>,
}

impl ElementGraph {
    /// Build the graph, rejecting unknown dependencies and cycles
    pub fn build(elements: &[DefinitionElement]) -> DefflowResult<Self> {
        let mut graph = DiGraph::new();
        let mut by_path: HashMap<&str, NodeIndex> = HashMap::new();

        for (idx, element) in elements.iter().enumerate() {
            let node = graph.add_node(idx);
            by_path.insert(element.path.as_str(), node);
        }

        for element in elements {
            let node = by_path[element.path.as_str()];
            for dependency in &element.depends_on {
                let dep = by_path.get(dependency.as_str()).ok_or_else(|| {
                    DefflowError::UnknownDependency {
                        element: element.path.clone(),
                        dependency: dependency.clone(),
                    }
                })?;
                if !graph.contains_edge(*dep, node) {
                    graph.add_edge(*dep, node, ());
                }
            }
        }

        let built = Self {
            graph,
            paths: elements.iter().map(|e| e.path.clone()).collect(),
        };

        if let Err(cycle) = toposort(&built.graph, None) {
            return Err(DefflowError::CircularDependency {
                elements: built.cycle_members(cycle.node_id()),
            });
        }

        Ok(built)
    }

    /// Indices of elements in apply order
    ///
    /// Among elements whose dependencies are satisfied, the one listed
    /// first goes first.
    pub fn order(&self) -> Vec<usize> {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|n| self.graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(idx, _)| Reverse(idx))
            .collect();

        let mut order = Vec::with_capacity(self.paths.len());
        while let Some(Reverse(idx)) = ready.pop() {
            order.push(self.graph[NodeIndex::new(idx)]);
            for next in self
                .graph
                .neighbors_directed(NodeIndex::new(idx), Direction::Outgoing)
            {
                let degree = &mut in_degree[next.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(next.index()));
                }
            }
        }

        order
    }

    fn cycle_members(&self, start: NodeIndex) -> Vec<String> {
        use petgraph::algo::kosaraju_scc;

        kosaraju_scc(&self.graph)
            .into_iter()
            .find(|component| component.contains(&start))
            .map(|component| {
                let mut members: Vec<usize> =
                    component.into_iter().map(|n| self.graph[n]).collect();
                members.sort_unstable();
                members.into_iter().map(|i| self.paths[i].clone()).collect()
            })
            .unwrap_or_else(|| vec![self.paths[self.graph[start]].clone()])
    }
}
