//! Dependency cycle detection.
//!
//! Cycles are the strongly connected components of the package (or class)
//! `uses` graph with more than one member. Output is canonical: members are
//! sorted by name and cycles by their first member, so identical models
//! always produce identical reports.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::Model;
use crate::usage::UsageCounter;

/// The graph cycles are searched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CycleScope {
    /// Package `uses` edges.
    #[default]
    Packages,
    /// Class `uses` edges.
    Classes,
}

/// One edge inside a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleEdge {
    /// Using node.
    pub from: String,
    /// Used node.
    pub to: String,
    /// Classes realizing a package edge; empty in class scope.
    pub vias: Vec<String>,
}

/// One strongly connected component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cycle {
    /// Member names, sorted.
    pub members: Vec<String>,
    /// Edges between members, sorted by `from` then `to`.
    pub edges: Vec<CycleEdge>,
}

/// Result of cycle detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Cycles not covered by an exception, sorted by first member.
    pub cycles: Vec<Cycle>,
    /// Exception groups that suppressed nothing, each sorted.
    pub unused_exceptions: Vec<Vec<String>>,
}

/// Finds cycles in a [`Model`].
#[derive(Debug, Clone)]
pub struct CycleDetector<'m> {
    model: &'m Model,
    scope: CycleScope,
    allow_intra_package: bool,
    exceptions: Vec<BTreeSet<String>>,
}

impl<'m> CycleDetector<'m> {
    /// Detector over package dependencies.
    #[must_use]
    pub fn packages(model: &'m Model) -> Self {
        Self::new(model, CycleScope::Packages)
    }

    /// Detector over class dependencies.
    #[must_use]
    pub fn classes(model: &'m Model) -> Self {
        Self::new(model, CycleScope::Classes)
    }

    /// Detector over the given scope.
    #[must_use]
    pub fn new(model: &'m Model, scope: CycleScope) -> Self {
        Self {
            model,
            scope,
            allow_intra_package: false,
            exceptions: Vec::new(),
        }
    }

    /// Ignores class edges within one package; only affects class scope.
    #[must_use]
    pub fn allow_intra_package(mut self, allow: bool) -> Self {
        self.allow_intra_package = allow;
        self
    }

    /// Suppresses every cycle whose members all belong to one of `groups`.
    #[must_use]
    pub fn except<I, G, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exceptions.extend(
            groups
                .into_iter()
                .map(|g| g.into_iter().map(Into::into).collect::<BTreeSet<String>>()),
        );
        self
    }

    /// Runs the detection.
    #[must_use]
    pub fn detect(&self) -> CycleReport {
        let graph = self.graph();
        let mut exceptions: UsageCounter<Vec<String>> = UsageCounter::new();
        for group in &self.exceptions {
            exceptions.declare(group.iter().cloned().collect());
        }

        let mut cycles = Vec::new();
        for mut component in strongly_connected(&graph.edges) {
            component.sort_unstable();
            let members: Vec<String> = component.iter().map(|&n| graph.names[n].clone()).collect();
            let covering: Vec<&BTreeSet<String>> = self
                .exceptions
                .iter()
                .filter(|group| members.iter().all(|m| group.contains(m)))
                .collect();
            if !covering.is_empty() {
                for group in covering {
                    exceptions.record(&group.iter().cloned().collect());
                }
                debug!("Cycle {:?} is excepted", members);
                continue;
            }
            cycles.push(Cycle {
                edges: self.cycle_edges(&graph, &component),
                members,
            });
        }
        cycles.sort_by(|a, b| a.members.cmp(&b.members));

        debug!("Found {} cycles ({:?} scope)", cycles.len(), self.scope);
        CycleReport {
            cycles,
            unused_exceptions: exceptions.unused(),
        }
    }

    fn graph(&self) -> Graph {
        match self.scope {
            CycleScope::Packages => Graph {
                names: self.model.packages().map(|(_, p)| p.name.clone()).collect(),
                edges: self
                    .model
                    .packages()
                    .map(|(_, p)| p.uses.iter().map(|u| u.index()).collect())
                    .collect(),
            },
            CycleScope::Classes => Graph {
                names: self.model.classes().map(|(_, c)| c.name.clone()).collect(),
                edges: self
                    .model
                    .classes()
                    .map(|(_, c)| {
                        c.uses
                            .keys()
                            .filter(|&&u| {
                                !(self.allow_intra_package && self.model[u].package == c.package)
                            })
                            .map(|u| u.index())
                            .collect()
                    })
                    .collect(),
            },
        }
    }

    fn cycle_edges(&self, graph: &Graph, component: &[usize]) -> Vec<CycleEdge> {
        let members: BTreeSet<usize> = component.iter().copied().collect();
        let packages: Vec<_> = self.model.packages().map(|(id, _)| id).collect();
        let mut edges = Vec::new();
        for &from in component {
            for &to in graph.edges[from].iter().filter(|to| members.contains(to)) {
                let vias = match self.scope {
                    CycleScope::Packages => self
                        .model
                        .vias(packages[from], packages[to])
                        .into_iter()
                        .map(|c| self.model[c].name.clone())
                        .collect(),
                    CycleScope::Classes => Vec::new(),
                };
                edges.push(CycleEdge {
                    from: graph.names[from].clone(),
                    to: graph.names[to].clone(),
                    vias,
                });
            }
        }
        edges
    }
}

/// Nodes in name order; `edges[n]` are the successors of node `n`, ascending.
struct Graph {
    names: Vec<String>,
    edges: Vec<Vec<usize>>,
}

/// Tarjan's algorithm without recursion; returns components with more than one node.
fn strongly_connected(graph: &[Vec<usize>]) -> Vec<Vec<usize>> {
    const UNVISITED: usize = usize::MAX;

    let mut index = vec![UNVISITED; graph.len()];
    let mut low = vec![0; graph.len()];
    let mut on_stack = vec![false; graph.len()];
    let mut stack = Vec::new();
    let mut components = Vec::new();
    let mut next = 0;

    for root in 0..graph.len() {
        if index[root] != UNVISITED {
            continue;
        }
        // (node, position of the next successor to look at)
        let mut work = vec![(root, 0)];
        while let Some((node, mut edge)) = work.pop() {
            if edge == 0 {
                index[node] = next;
                low[node] = next;
                next += 1;
                stack.push(node);
                on_stack[node] = true;
            } else {
                let child = graph[node][edge - 1];
                if on_stack[child] {
                    low[node] = low[node].min(low[child]);
                }
            }

            let mut descended = false;
            while edge < graph[node].len() {
                let child = graph[node][edge];
                edge += 1;
                if index[child] == UNVISITED {
                    work.push((node, edge));
                    work.push((child, 0));
                    descended = true;
                    break;
                }
                if on_stack[child] {
                    low[node] = low[node].min(index[child]);
                }
            }
            if descended || low[node] != index[node] {
                continue;
            }

            let mut component = Vec::new();
            while let Some(member) = stack.pop() {
                on_stack[member] = false;
                component.push(member);
                if member == node {
                    break;
                }
            }
            if component.len() > 1 {
                components.push(component);
            }
        }
    }
    components
}
