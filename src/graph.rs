/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Shortest-path routing between named nodes.
//!
//! The time scales, orientations, centers and forms all route their pairwise
//! conversions through this structure: nodes live in an arena and edges are
//! registered by the owning module together with the operator they carry.
//! Every node keeps a routing table refreshed when an edge is added, so that
//! `path` and `steps` are simple table walks.

use std::collections::{HashMap, VecDeque};

use crate::errors::{GraphError, NoPathSnafu, UnknownNodeSnafu};
use snafu::prelude::*;

#[derive(Clone, Copy, Debug)]
struct Route {
    /// Neighbor to go through in order to reach the target.
    next: usize,
    steps: usize,
}

#[derive(Clone, Debug, Default)]
struct NodeSlot {
    name: String,
    /// Direct neighbors, in insertion order (which breaks routing ties).
    neighbors: Vec<usize>,
    routes: HashMap<usize, Route>,
}

/// A graph of named nodes with per-node routing tables.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Vec<NodeSlot>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns its index. Re-adding a known name returns the
    /// existing index.
    pub fn add_node(&mut self, name: &str) -> usize {
        if let Some(idx) = self.index_of(name) {
            return idx;
        }
        self.nodes.push(NodeSlot {
            name: name.to_owned(),
            ..Default::default()
        });
        self.nodes.len() - 1
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    pub fn name(&self, idx: usize) -> &str {
        &self.nodes[idx].name
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds an edge between two nodes and refreshes the routing tables of
    /// every node connected to them.
    pub fn add_edge(&mut self, a: usize, b: usize) {
        if !self.nodes[a].neighbors.contains(&b) {
            self.nodes[a].neighbors.push(b);
        }
        if !self.nodes[b].neighbors.contains(&a) {
            self.nodes[b].neighbors.push(a);
        }
        self.refresh();
    }

    /// Rebuilds every routing table with a BFS per node. Ties are broken by
    /// neighbor insertion order, which the BFS queue preserves.
    fn refresh(&mut self) {
        for origin in 0..self.nodes.len() {
            let mut routes = HashMap::new();
            let mut first_hop: Vec<Option<usize>> = vec![None; self.nodes.len()];
            let mut dist: Vec<Option<usize>> = vec![None; self.nodes.len()];
            let mut queue = VecDeque::new();

            dist[origin] = Some(0);
            queue.push_back(origin);

            while let Some(cur) = queue.pop_front() {
                for &nb in &self.nodes[cur].neighbors {
                    if dist[nb].is_none() {
                        dist[nb] = Some(dist[cur].unwrap() + 1);
                        first_hop[nb] = if cur == origin {
                            Some(nb)
                        } else {
                            first_hop[cur]
                        };
                        queue.push_back(nb);
                    }
                }
            }

            for target in 0..self.nodes.len() {
                if target == origin {
                    continue;
                }
                if let (Some(steps), Some(next)) = (dist[target], first_hop[target]) {
                    routes.insert(target, Route { next, steps });
                }
            }
            self.nodes[origin].routes = routes;
        }
    }

    /// Shortest node sequence between two nodes, both ends included.
    pub fn path(&self, from: usize, to: usize) -> Result<Vec<usize>, GraphError> {
        ensure!(
            from < self.nodes.len(),
            UnknownNodeSnafu {
                name: format!("#{from}")
            }
        );
        if from == to {
            return Ok(vec![from]);
        }

        let mut path = vec![from];
        let mut cur = from;
        while cur != to {
            let route = self.nodes[cur].routes.get(&to).context(NoPathSnafu {
                from: self.name(from),
                to: self.name(to),
            })?;
            cur = route.next;
            path.push(cur);
        }
        Ok(path)
    }

    /// Consecutive pairs of the shortest path between two nodes.
    pub fn steps(&self, from: usize, to: usize) -> Result<Vec<(usize, usize)>, GraphError> {
        let path = self.path(from, to)?;
        Ok(path.windows(2).map(|w| (w[0], w[1])).collect())
    }
}

#[cfg(test)]
mod ut_graph {
    use super::*;

    /// The hexagonal layout used as reference:
    ///
    /// ```text
    ///   A
    ///  / \
    /// B   F
    /// | / |
    /// C   E
    ///  \ /
    ///   D
    /// ```
    fn hexagon() -> (Graph, [usize; 6]) {
        let mut g = Graph::new();
        let ids = ["A", "B", "C", "D", "E", "F"].map(|n| g.add_node(n));
        let [a, b, c, d, e, f] = ids;
        g.add_edge(a, b);
        g.add_edge(b, c);
        g.add_edge(c, d);
        g.add_edge(d, e);
        g.add_edge(e, f);
        g.add_edge(f, a);
        g.add_edge(f, c);
        (g, ids)
    }

    #[test]
    fn test_path() {
        let (g, [a, b, c, d, e, f]) = hexagon();
        assert_eq!(g.path(a, e).unwrap(), vec![a, f, e]);
        assert_eq!(g.path(a, c).unwrap(), vec![a, b, c]);
        assert_eq!(g.path(c, e).unwrap(), vec![c, d, e]);
    }

    #[test]
    fn test_steps() {
        let (g, [a, _, _, _, e, f]) = hexagon();
        assert_eq!(g.steps(a, e).unwrap(), vec![(a, f), (f, e)]);
        assert!(g.steps(a, a).unwrap().is_empty());
    }

    #[test]
    fn test_no_path() {
        let mut g = Graph::new();
        let a = g.add_node("A");
        let b = g.add_node("B");
        let lone = g.add_node("Lone");
        g.add_edge(a, b);
        assert!(matches!(
            g.path(a, lone),
            Err(GraphError::NoPath { .. })
        ));
    }

    #[test]
    fn test_edge_refresh_updates_routes() {
        let mut g = Graph::new();
        let a = g.add_node("A");
        let b = g.add_node("B");
        let c = g.add_node("C");
        g.add_edge(a, b);
        g.add_edge(b, c);
        assert_eq!(g.path(a, c).unwrap().len(), 3);
        // A direct edge shortens the route on both endpoints
        g.add_edge(a, c);
        assert_eq!(g.path(a, c).unwrap().len(), 2);
        assert_eq!(g.path(c, a).unwrap().len(), 2);
    }
}
