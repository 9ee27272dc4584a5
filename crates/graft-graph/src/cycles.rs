//! Elementary-cycle detection over the module dependency relation.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::error::{GraphError, Result};
use crate::graph::ModuleGraph;

/// Enumeration stops after this many distinct cycles.
const MAX_REPORTED_CYCLES: usize = 64;

/// Fail with every cycle found, each listed once.
pub(crate) fn check(graph: &ModuleGraph) -> Result<()> {
    let names: BTreeMap<&PathBuf, &str> = graph
        .modules
        .iter()
        .map(|(id, module)| (id, module.name.as_str()))
        .collect();
    let adjacency: BTreeMap<&str, Vec<&str>> = graph
        .edges
        .iter()
        .filter_map(|(source, targets)| {
            let source = *names.get(source)?;
            let targets = targets.iter().filter_map(|t| names.get(t).copied()).collect();
            Some((source, targets))
        })
        .collect();

    let cycles = find_cycles(&adjacency);
    if cycles.is_empty() {
        return Ok(());
    }
    tracing::debug!(count = cycles.len(), "module cycles detected");
    Err(GraphError::CircularDependency { cycles })
}

/// All elementary cycles of a directed graph, each rotated to start at its
/// smallest member, deduplicated and sorted.
///
/// Johnson's search: for each start node, only the strongly connected
/// component of the start within the nodes sorting at or after it is
/// explored, and blocked sets keep the work polynomial per cycle found.
pub fn find_cycles(adjacency: &BTreeMap<&str, Vec<&str>>) -> Vec<Vec<String>> {
    let nodes: Vec<&str> = adjacency
        .iter()
        .flat_map(|(source, targets)| std::iter::once(*source).chain(targets.iter().copied()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let index: BTreeMap<&str, usize> = nodes.iter().enumerate().map(|(i, name)| (*name, i)).collect();
    let successors: Vec<Vec<usize>> = nodes
        .iter()
        .map(|name| {
            let mut targets: Vec<usize> = adjacency
                .get(name)
                .into_iter()
                .flatten()
                .filter_map(|target| index.get(target).copied())
                .collect();
            targets.sort_unstable();
            targets.dedup();
            targets
        })
        .collect();

    let mut search = CycleSearch::new(&successors);
    for start in 0..nodes.len() {
        if search.found.len() >= MAX_REPORTED_CYCLES {
            break;
        }
        search.run(start);
    }

    search
        .found
        .into_iter()
        .map(|cycle| {
            let names: Vec<&str> = cycle.iter().map(|&i| nodes[i]).collect();
            canonical(&names)
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

struct CycleSearch<'g> {
    successors: &'g [Vec<usize>],
    start: usize,
    component: Vec<bool>,
    blocked: Vec<bool>,
    blocked_by: Vec<BTreeSet<usize>>,
    stack: Vec<usize>,
    found: BTreeSet<Vec<usize>>,
}

impl<'g> CycleSearch<'g> {
    fn new(successors: &'g [Vec<usize>]) -> Self {
        let len = successors.len();
        Self {
            successors,
            start: 0,
            component: vec![false; len],
            blocked: vec![false; len],
            blocked_by: vec![BTreeSet::new(); len],
            stack: Vec::new(),
            found: BTreeSet::new(),
        }
    }

    fn run(&mut self, start: usize) {
        self.start = start;
        self.component = self.component_of(start);
        let self_loop = self.successors[start].contains(&start);
        let members = self.component.iter().filter(|&&inside| inside).count();
        if members < 2 && !self_loop {
            return;
        }
        self.blocked.iter_mut().for_each(|b| *b = false);
        self.blocked_by.iter_mut().for_each(BTreeSet::clear);
        self.circuit(start);
    }

    /// Nodes `>= start` that are both reachable from `start` and reach it back.
    fn component_of(&self, start: usize) -> Vec<bool> {
        let len = self.successors.len();
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); len];
        for (from, targets) in self.successors.iter().enumerate().skip(start) {
            for &to in targets.iter().filter(|&&to| to >= start) {
                predecessors[to].push(from);
            }
        }
        let forward = reach(start, len, |n| {
            self.successors[n].iter().copied().filter(move |&to| to >= start).collect()
        });
        let backward = reach(start, len, |n| predecessors[n].clone());
        forward.iter().zip(&backward).map(|(a, b)| *a && *b).collect()
    }

    fn circuit(&mut self, node: usize) -> bool {
        let successors = self.successors;
        let mut closed = false;
        self.stack.push(node);
        self.blocked[node] = true;

        for &next in &successors[node] {
            if self.found.len() >= MAX_REPORTED_CYCLES {
                break;
            }
            if !self.component[next] {
                continue;
            }
            if next == self.start {
                self.found.insert(self.stack.clone());
                closed = true;
            } else if !self.blocked[next] && self.circuit(next) {
                closed = true;
            }
        }

        if closed {
            self.unblock(node);
        } else {
            for &next in &successors[node] {
                if self.component[next] {
                    self.blocked_by[next].insert(node);
                }
            }
        }
        self.stack.pop();
        closed
    }

    fn unblock(&mut self, node: usize) {
        self.blocked[node] = false;
        let waiting = std::mem::take(&mut self.blocked_by[node]);
        for other in waiting {
            if self.blocked[other] {
                self.unblock(other);
            }
        }
    }
}

fn reach(start: usize, len: usize, next: impl Fn(usize) -> Vec<usize>) -> Vec<bool> {
    let mut seen = vec![false; len];
    seen[start] = true;
    let mut pending = vec![start];
    while let Some(node) = pending.pop() {
        for to in next(node) {
            if !seen[to] {
                seen[to] = true;
                pending.push(to);
            }
        }
    }
    seen
}

/// Rotate so the smallest member comes first.
fn canonical(cycle: &[&str]) -> Vec<String> {
    let pivot = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, name)| **name)
        .map(|(i, _)| i)
        .unwrap_or(0);
    cycle[pivot..]
        .iter()
        .chain(&cycle[..pivot])
        .map(|name| name.to_string())
        .collect()
}
