//! Directed graphs over mutations (or clusters of mutations).
//!
//! Nodes live in a dense arena. Node `v` stands for column `node_to_column[v]` of the matrix it
//! was built from; arcs are stored once and indexed from both endpoints.
use log::debug;
use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
pub mod probabilistic;
pub use probabilistic::{ClusterCoherence, Coherence};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    pub source: usize,
    pub target: usize,
    pub prob: f64,
    /// The reverse direction is plausible as well.
    pub ambiguous: bool,
}

/// Which arcs of the original graph may induce an arc between two clusters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArcAdmission {
    All,
    /// Arcs with probability at least the given threshold.
    AtLeast(f64),
}

impl ArcAdmission {
    fn admits(&self, arc: &Arc) -> bool {
        match *self {
            ArcAdmission::All => true,
            ArcAdmission::AtLeast(threshold) => threshold <= arc.prob,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AncestryGraph {
    node_to_column: Vec<usize>,
    column_to_node: Vec<Option<usize>>,
    arcs: Vec<Arc>,
    out_arcs: Vec<Vec<usize>>,
    in_arcs: Vec<Vec<usize>>,
}

impl AncestryGraph {
    /// Empty graph over `columns` columns, none of which has a node yet.
    pub fn new(columns: usize) -> Self {
        Self {
            node_to_column: vec![],
            column_to_node: vec![None; columns],
            arcs: vec![],
            out_arcs: vec![],
            in_arcs: vec![],
        }
    }
    pub fn add_node(&mut self, column: usize) -> usize {
        assert!(self.column_to_node[column].is_none());
        let node = self.node_to_column.len();
        self.node_to_column.push(column);
        self.column_to_node[column] = Some(node);
        self.out_arcs.push(vec![]);
        self.in_arcs.push(vec![]);
        node
    }
    pub fn add_arc(&mut self, source: usize, target: usize, prob: f64, ambiguous: bool) -> usize {
        assert!(source != target);
        let idx = self.arcs.len();
        self.arcs.push(Arc {
            source,
            target,
            prob,
            ambiguous,
        });
        self.out_arcs[source].push(idx);
        self.in_arcs[target].push(idx);
        idx
    }
    pub fn node_count(&self) -> usize {
        self.node_to_column.len()
    }
    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }
    pub fn columns(&self) -> usize {
        self.column_to_node.len()
    }
    pub fn arc(&self, idx: usize) -> &Arc {
        &self.arcs[idx]
    }
    pub fn arcs(&self) -> &[Arc] {
        &self.arcs
    }
    /// Indices of the arcs leaving `node`.
    pub fn out_arcs(&self, node: usize) -> &[usize] {
        &self.out_arcs[node]
    }
    pub fn in_arcs(&self, node: usize) -> &[usize] {
        &self.in_arcs[node]
    }
    pub fn node_to_column(&self, node: usize) -> usize {
        self.node_to_column[node]
    }
    pub fn column_to_node(&self, column: usize) -> Option<usize> {
        self.column_to_node[column]
    }
    pub fn find_arc(&self, source: usize, target: usize) -> Option<&Arc> {
        self.out_arcs[source]
            .iter()
            .map(|&a| &self.arcs[a])
            .find(|arc| arc.target == target)
    }
    fn to_petgraph<F: Fn(&Arc) -> bool>(&self, keep: F) -> DiGraph<(), ()> {
        let mut graph = DiGraph::with_capacity(self.node_count(), self.arc_count());
        for _ in 0..self.node_count() {
            graph.add_node(());
        }
        for arc in self.arcs.iter().filter(|a| keep(a)) {
            graph.add_edge(NodeIndex::new(arc.source), NodeIndex::new(arc.target), ());
        }
        graph
    }
    /// Strongly connected components of the subgraph made of the arcs satisfying `keep`,
    /// as lists of nodes. Members are sorted and components are ordered by their first member.
    pub fn strongly_connected_components<F: Fn(&Arc) -> bool>(&self, keep: F) -> Vec<Vec<usize>> {
        let graph = self.to_petgraph(keep);
        let mut components: Vec<Vec<usize>> = tarjan_scc(&graph)
            .into_iter()
            .map(|component| {
                let mut nodes: Vec<_> = component.into_iter().map(|v| v.index()).collect();
                nodes.sort_unstable();
                nodes
            })
            .collect();
        components.sort_unstable_by_key(|c| c[0]);
        components
    }
    pub fn is_dag(&self) -> bool {
        !is_cyclic_directed(&self.to_petgraph(|_| true))
    }
    /// Whether i->j->k always comes with i->k.
    pub fn is_transitive(&self) -> bool {
        self.arcs.iter().all(|first| {
            self.out_arcs[first.target]
                .iter()
                .map(|&a| self.arcs[a].target)
                .filter(|&k| k != first.source)
                .all(|k| self.find_arc(first.source, k).is_some())
        })
    }
    pub fn non_trivial_scc_count(&self) -> usize {
        self.strongly_connected_components(|_| true)
            .iter()
            .filter(|c| c.len() > 1)
            .count()
    }
    pub fn isolated_node_count(&self) -> usize {
        (0..self.node_count())
            .filter(|&v| self.in_arcs[v].is_empty() && self.out_arcs[v].is_empty())
            .count()
    }
    pub fn in_degree_zero_count(&self) -> usize {
        (0..self.node_count())
            .filter(|&v| self.in_arcs[v].is_empty())
            .count()
    }
    /// Largest number of nodes reachable from a single node without incoming arcs.
    pub fn largest_arborescence(&self) -> usize {
        let graph = self.to_petgraph(|_| true);
        (0..self.node_count())
            .filter(|&v| self.in_arcs[v].is_empty())
            .map(|v| {
                let mut bfs = Bfs::new(&graph, NodeIndex::new(v));
                let mut reached = 0;
                while bfs.next(&graph).is_some() {
                    reached += 1;
                }
                reached
            })
            .max()
            .unwrap_or(0)
    }
    pub fn max_out_degree(&self) -> usize {
        self.out_arcs.iter().map(|arcs| arcs.len()).max().unwrap_or(0)
    }
    /// Quotient graph with one node per cluster. `clusters[i]` lists columns of this graph,
    /// and becomes column `i` of the quotient. Each admitted arc between distinct clusters
    /// yields an arc unless one was already recorded for that ordered pair.
    pub fn quotient(&self, clusters: &[Vec<usize>], admission: ArcAdmission) -> Self {
        let n = clusters.len();
        let mut quotient = Self::new(n);
        let mut to_cluster = vec![None; self.node_count()];
        for (idx, cluster) in clusters.iter().enumerate() {
            quotient.add_node(idx);
            for &column in cluster {
                if let Some(node) = self.column_to_node[column] {
                    to_cluster[node] = Some(idx);
                }
            }
        }
        let mut bitmap = vec![vec![false; n]; n];
        for (i, row) in bitmap.iter_mut().enumerate() {
            row[i] = true;
        }
        for arc in self.arcs.iter() {
            let (u, v) = match (to_cluster[arc.source], to_cluster[arc.target]) {
                (Some(u), Some(v)) => (u, v),
                _ => continue,
            };
            if !bitmap[u][v] && admission.admits(arc) {
                bitmap[u][v] = true;
                quotient.add_arc(u, v, arc.prob, arc.ambiguous);
            }
        }
        debug!(
            "Quotient over {} clusters has {} arcs ({:?})",
            n,
            quotient.arc_count(),
            admission
        );
        quotient
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    pub fn from_arcs(n: usize, arcs: &[(usize, usize)]) -> AncestryGraph {
        let mut graph = AncestryGraph::new(n);
        for j in 0..n {
            graph.add_node(j);
        }
        for &(u, v) in arcs {
            graph.add_arc(u, v, 0.9, false);
        }
        graph
    }
    #[test]
    fn dag_and_scc() {
        let graph = from_arcs(5, &[(0, 1), (1, 2), (2, 0), (3, 4)]);
        assert!(!graph.is_dag());
        assert_eq!(graph.non_trivial_scc_count(), 1);
        let components = graph.strongly_connected_components(|_| true);
        assert_eq!(components, vec![vec![0, 1, 2], vec![3], vec![4]]);
        let dag = from_arcs(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        assert!(dag.is_dag());
        assert_eq!(dag.non_trivial_scc_count(), 0);
    }
    #[test]
    fn transitivity() {
        let graph = from_arcs(3, &[(0, 1), (1, 2)]);
        assert!(!graph.is_transitive());
        let graph = from_arcs(3, &[(0, 1), (1, 2), (0, 2)]);
        assert!(graph.is_transitive());
        // A 2-cycle does not require self loops.
        let graph = from_arcs(2, &[(0, 1), (1, 0)]);
        assert!(graph.is_transitive());
    }
    #[test]
    fn degree_queries() {
        let graph = from_arcs(6, &[(0, 1), (0, 2), (0, 3), (4, 3)]);
        assert_eq!(graph.isolated_node_count(), 1);
        assert_eq!(graph.in_degree_zero_count(), 3);
        assert_eq!(graph.largest_arborescence(), 4);
        assert_eq!(graph.max_out_degree(), 3);
        let cycle = from_arcs(2, &[(0, 1), (1, 0)]);
        assert_eq!(cycle.largest_arborescence(), 0);
    }
    #[test]
    fn quotient_keeps_first_arc() {
        let mut graph = AncestryGraph::new(4);
        for j in 0..4 {
            graph.add_node(j);
        }
        graph.add_arc(0, 2, 0.7, false);
        graph.add_arc(1, 3, 0.95, false);
        graph.add_arc(0, 1, 0.6, true);
        graph.add_arc(2, 0, 0.3, true);
        let clusters = vec![vec![0, 1], vec![2, 3]];
        let all = graph.quotient(&clusters, ArcAdmission::All);
        assert_eq!(all.node_count(), 2);
        assert_eq!(all.arc_count(), 2);
        assert_eq!(all.find_arc(0, 1).map(|a| a.prob), Some(0.7));
        let strict = graph.quotient(&clusters, ArcAdmission::AtLeast(0.8));
        assert_eq!(strict.arc_count(), 1);
        assert_eq!(strict.find_arc(0, 1).map(|a| a.prob), Some(0.95));
        assert!(strict.is_dag());
        assert_eq!(strict.node_to_column(1), 1);
    }
}
