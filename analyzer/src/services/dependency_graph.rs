//! Header-to-includer dependency graph.
//!
//! Nodes are distinct file paths (sources and headers), edges run
//! includer -> included with the number of distinct TUs observing the edge as
//! weight. Depths, cycle counts and SCC statistics are computed once at
//! construction; the graph is immutable afterwards. Construction never fails:
//! pathological inputs just yield larger SCC counts.

use petgraph::algo::{condensation, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::metrics::DependencyMetrics;
use crate::models::trace::{normalize_header_path, CompilationUnit};

pub struct IncludeGraph {
    graph: DiGraph<String, u32>,
    indices: FxHashMap<String, NodeIndex>,
    depths: FxHashMap<String, usize>,
    scc_total: usize,
    cyclic_sccs: usize,
    condensation_depth: usize,
}

impl IncludeGraph {
    pub fn from_units(units: &[CompilationUnit]) -> Self {
        // Collect edges keyed by endpoint pair; the weight is the number of
        // distinct TUs in which that include appears. BTreeMap keeps node
        // insertion order independent of hash iteration.
        let mut edge_tus: BTreeMap<(String, String), FxHashSet<usize>> = BTreeMap::new();
        for (tu, unit) in units.iter().enumerate() {
            let source = normalize_header_path(&unit.source_file);
            for inc in &unit.includes {
                let from = if inc.is_direct {
                    source.clone()
                } else {
                    inc.included_by
                        .as_deref()
                        .map(normalize_header_path)
                        .unwrap_or_else(|| source.clone())
                };
                edge_tus
                    .entry((from, inc.header_path.clone()))
                    .or_default()
                    .insert(tu);
            }
        }

        let mut graph: DiGraph<String, u32> = DiGraph::new();
        let mut indices: FxHashMap<String, NodeIndex> = FxHashMap::default();
        let mut intern = |graph: &mut DiGraph<String, u32>, path: &str| -> NodeIndex {
            if let Some(&idx) = indices.get(path) {
                return idx;
            }
            let idx = graph.add_node(path.to_string());
            indices.insert(path.to_string(), idx);
            idx
        };

        // Source files participate even when they include nothing.
        for unit in units {
            intern(&mut graph, &normalize_header_path(&unit.source_file));
        }
        for ((from, to), tus) in &edge_tus {
            let a = intern(&mut graph, from);
            let b = intern(&mut graph, to);
            graph.add_edge(a, b, tus.len() as u32);
        }

        let sccs = tarjan_scc(&graph);
        let scc_total = sccs.len();
        let cyclic_sccs = sccs.iter().filter(|c| c.len() > 1).count();

        // Longest-path depths are computed on the SCC condensation so cycles
        // terminate; a component of size k contributes k - 1 internal hops.
        let cond = condensation(graph.clone(), true);
        let mut component_of: FxHashMap<String, NodeIndex> = FxHashMap::default();
        for c in cond.node_indices() {
            for path in &cond[c] {
                component_of.insert(path.clone(), c);
            }
        }

        let mut node_depth_memo: FxHashMap<NodeIndex, usize> = FxHashMap::default();
        let mut edge_depth_memo: FxHashMap<NodeIndex, usize> = FxHashMap::default();
        let mut depths: FxHashMap<String, usize> = FxHashMap::default();
        let mut condensation_depth = 0usize;
        for c in cond.node_indices() {
            condensation_depth =
                condensation_depth.max(edge_depth(&cond, c, &mut edge_depth_memo));
        }
        for (path, &c) in &component_of {
            depths.insert(path.clone(), node_depth(&cond, c, &mut node_depth_memo));
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            sccs = scc_total,
            cycles = cyclic_sccs,
            "include graph built"
        );

        IncludeGraph {
            graph,
            indices,
            depths,
            scc_total,
            cyclic_sccs,
            condensation_depth,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Longest simple path length starting at `path`; 0 for unknown nodes.
    pub fn depth_of(&self, path: &str) -> usize {
        self.depths.get(path).copied().unwrap_or(0)
    }

    /// Maximum depth over every node in the graph.
    pub fn max_depth(&self) -> usize {
        self.depths.values().copied().max().unwrap_or(0)
    }

    /// Files that include `path` directly, sorted for deterministic output.
    pub fn includers_of(&self, path: &str) -> Vec<String> {
        let Some(&idx) = self.indices.get(path) else {
            return Vec::new();
        };
        let mut includers: Vec<String> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| self.graph[e.source()].clone())
            .collect();
        includers.sort();
        includers.dedup();
        includers
    }

    /// Multiplicity of the `from -> to` edge, 0 when absent.
    pub fn edge_weight(&self, from: &str, to: &str) -> u32 {
        let (Some(&a), Some(&b)) = (self.indices.get(from), self.indices.get(to)) else {
            return 0;
        };
        self.graph
            .find_edge(a, b)
            .and_then(|e| self.graph.edge_weight(e))
            .copied()
            .unwrap_or(0)
    }

    pub fn metrics(&self) -> DependencyMetrics {
        DependencyMetrics {
            total_dependencies: self.graph.edge_count(),
            circular_dependencies: self.cyclic_sccs,
            max_dependency_depth: self.condensation_depth,
            strongly_connected_components: self.scc_total,
        }
    }
}

/// Longest path from component `c`, counting component-internal hops.
fn node_depth(
    cond: &DiGraph<Vec<String>, u32>,
    c: NodeIndex,
    memo: &mut FxHashMap<NodeIndex, usize>,
) -> usize {
    if let Some(&d) = memo.get(&c) {
        return d;
    }
    let internal = cond[c].len().saturating_sub(1);
    let mut best = internal;
    let successors: Vec<NodeIndex> = cond.neighbors(c).collect();
    for succ in successors {
        best = best.max(internal + 1 + node_depth(cond, succ, memo));
    }
    memo.insert(c, best);
    best
}

/// Longest path from component `c` counting condensation edges only.
fn edge_depth(
    cond: &DiGraph<Vec<String>, u32>,
    c: NodeIndex,
    memo: &mut FxHashMap<NodeIndex, usize>,
) -> usize {
    if let Some(&d) = memo.get(&c) {
        return d;
    }
    let mut best = 0;
    let successors: Vec<NodeIndex> = cond.neighbors(c).collect();
    for succ in successors {
        best = best.max(1 + edge_depth(cond, succ, memo));
    }
    memo.insert(c, best);
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::duration::Duration;
    use crate::models::trace::IncludeInfo;

    fn unit_with_includes(source: &str, headers: &[&str]) -> CompilationUnit {
        let mut unit = CompilationUnit::new(source);
        for h in headers {
            unit.includes
                .push(IncludeInfo::new(*h, Duration::from_micros_f64(10.0)));
        }
        unit
    }

    fn indirect(header: &str, via: &str) -> IncludeInfo {
        IncludeInfo {
            is_direct: false,
            included_by: Some(via.to_string()),
            ..IncludeInfo::new(header, Duration::ZERO)
        }
    }

    #[test]
    fn test_empty_units_yield_empty_graph() {
        let graph = IncludeGraph::from_units(&[]);
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.metrics(), DependencyMetrics::default());
    }

    #[test]
    fn test_chain_depth() {
        // main.cpp -> a.h, a.h -> b.h (indirect via a.h)
        let mut unit = unit_with_includes("main.cpp", &["a.h"]);
        unit.includes.push(indirect("b.h", "a.h"));
        let graph = IncludeGraph::from_units(&[unit]);

        assert_eq!(graph.depth_of("main.cpp"), 2);
        assert_eq!(graph.depth_of("a.h"), 1);
        assert_eq!(graph.depth_of("b.h"), 0);
        assert_eq!(graph.max_depth(), 2);
        assert_eq!(graph.metrics().max_dependency_depth, 2);
        assert_eq!(graph.metrics().circular_dependencies, 0);
        assert_eq!(graph.metrics().strongly_connected_components, 3);
    }

    #[test]
    fn test_cycle_detection() {
        // a.h -> b.h -> a.h
        let mut unit = CompilationUnit::new("main.cpp");
        unit.includes.push(indirect("b.h", "a.h"));
        unit.includes.push(indirect("a.h", "b.h"));
        let graph = IncludeGraph::from_units(&[unit]);

        let metrics = graph.metrics();
        assert!(metrics.circular_dependencies >= 1);
        // The cycle still gives each member one simple hop.
        assert_eq!(graph.depth_of("a.h"), 1);
        assert_eq!(graph.depth_of("b.h"), 1);
    }

    #[test]
    fn test_edge_multiplicity_counts_distinct_tus() {
        let units = vec![
            unit_with_includes("a.cpp", &["common.h", "common.h"]),
            unit_with_includes("b.cpp", &["common.h"]),
        ];
        let graph = IncludeGraph::from_units(&units);
        // Duplicate include inside one TU does not raise the weight.
        assert_eq!(graph.edge_weight("a.cpp", "common.h"), 1);
        assert_eq!(graph.edge_weight("b.cpp", "common.h"), 1);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_includers_sorted() {
        let units = vec![
            unit_with_includes("z.cpp", &["common.h"]),
            unit_with_includes("a.cpp", &["common.h"]),
        ];
        let graph = IncludeGraph::from_units(&units);
        assert_eq!(graph.includers_of("common.h"), vec!["a.cpp", "z.cpp"]);
        assert!(graph.includers_of("a.cpp").is_empty());
        assert!(graph.includers_of("unknown.h").is_empty());
    }

    #[test]
    fn test_indirect_include_missing_included_by_falls_back_to_source() {
        let mut unit = CompilationUnit::new("main.cpp");
        unit.includes.push(IncludeInfo {
            is_direct: false,
            included_by: None,
            ..IncludeInfo::new("orphan.h", Duration::ZERO)
        });
        let graph = IncludeGraph::from_units(&[unit]);
        assert_eq!(graph.edge_weight("main.cpp", "orphan.h"), 1);
    }
}
