use super::{AncestryGraph, ArcAdmission};
use crate::ancestry_matrix::AncestryMatrix;
use crate::error::{Error, Result};
use crate::read_counts::ReadCounts;
use log::{debug, info};

/// Relation between two mutations of the same cluster, judged by max(A(j,k), A(k,j)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coherence {
    Incomparable,
    Ancestral,
    Comparable,
}

impl Coherence {
    pub fn classify(prob: f64) -> Self {
        if prob <= 0.05 {
            Coherence::Incomparable
        } else if prob >= 0.7 {
            Coherence::Ancestral
        } else {
            Coherence::Comparable
        }
    }
}

/// Fractions of intra-cluster pairs per relation. Sums to one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterCoherence {
    pub incomparable: f64,
    pub ancestral: f64,
    pub comparable: f64,
}

impl AncestryGraph {
    /// Probabilistic ancestry graph. A mutation becomes a node unless the lower bound of its
    /// confidence interval exceeds 0.5 in some sample. p->q is an arc when A(p,q) >= 0.5 - alpha,
    /// and is ambiguous when also A(p,q) <= 0.5 + alpha.
    pub fn probabilistic(
        ancestry: &AncestryMatrix,
        counts: &ReadCounts,
        alpha: f64,
        gamma: f64,
    ) -> Result<Self> {
        assert_eq!(ancestry.mutations(), counts.mutations());
        let intervals = counts.confidence_intervals(gamma)?;
        let mut graph = Self::new(counts.mutations());
        for j in 0..counts.mutations() {
            let feasible = (0..counts.samples()).all(|i| intervals.get(i, j).0 <= 0.5);
            if feasible {
                graph.add_node(j);
            } else {
                debug!("{} is excluded", counts.mutation_label(j));
            }
        }
        for v_j in 0..graph.node_count() {
            let j = graph.node_to_column(v_j);
            for v_k in 0..graph.node_count() {
                let k = graph.node_to_column(v_k);
                let prob = ancestry.get(j, k);
                if j != k && prob >= 0.5 - alpha {
                    graph.add_arc(v_j, v_k, prob, prob <= 0.5 + alpha);
                }
            }
        }
        info!(
            "Ancestry graph: |V| = {}, |A| = {}, {} infeasible",
            graph.node_count(),
            graph.arc_count(),
            graph.infeasible_count()
        );
        Ok(graph)
    }
    /// Columns without a node.
    pub fn infeasible_count(&self) -> usize {
        self.column_to_node.iter().filter(|x| x.is_none()).count()
    }
    /// Clusters the nodes into the strongly connected components of the ambiguous arcs.
    /// Each cluster lists the columns of its members.
    pub fn remove_cycles(&self) -> Vec<Vec<usize>> {
        let clusters: Vec<Vec<usize>> = self
            .strongly_connected_components(|arc| arc.ambiguous)
            .into_iter()
            .map(|component| {
                let mut columns: Vec<_> = component
                    .into_iter()
                    .map(|v| self.node_to_column(v))
                    .collect();
                columns.sort_unstable();
                columns
            })
            .collect();
        debug!(
            "{} clusters, largest has {} members",
            clusters.len(),
            clusters.iter().map(|c| c.len()).max().unwrap_or(0)
        );
        clusters
    }
    /// One node per cluster, with an arc between two clusters when some arc between their
    /// members has probability at least `beta`. Fails unless the result is acyclic.
    pub fn contract(&self, clusters: &[Vec<usize>], beta: f64) -> Result<Self> {
        let contracted = self.quotient(clusters, ArcAdmission::AtLeast(beta));
        if !contracted.is_dag() {
            return Err(Error::NotADag);
        }
        info!(
            "Contracted graph: |V| = {}, |A| = {}",
            contracted.node_count(),
            contracted.arc_count()
        );
        Ok(contracted)
    }
}

/// Classifies every pair of mutations sharing a cluster.
pub fn intra_cluster_coherence(ancestry: &AncestryMatrix, clusters: &[Vec<usize>]) -> ClusterCoherence {
    let (mut incomparable, mut ancestral, mut comparable) = (0, 0, 0);
    for cluster in clusters {
        for (idx, &j) in cluster.iter().enumerate() {
            for &k in cluster.iter().skip(idx + 1) {
                match Coherence::classify(ancestry.get(j, k).max(ancestry.get(k, j))) {
                    Coherence::Incomparable => incomparable += 1,
                    Coherence::Ancestral => ancestral += 1,
                    Coherence::Comparable => comparable += 1,
                }
            }
        }
    }
    let total = (incomparable + ancestral + comparable) as f64;
    if total == 0. {
        return ClusterCoherence {
            incomparable: 0.,
            ancestral: 0.,
            comparable: 1.,
        };
    }
    ClusterCoherence {
        incomparable: incomparable as f64 / total,
        ancestral: ancestral as f64 / total,
        comparable: comparable as f64 / total,
    }
}

/// For every arc of the contracted graph, the largest ancestry probability
/// between a member of its source cluster and a member of its target cluster.
pub fn inter_cluster_coherence(
    contracted: &AncestryGraph,
    ancestry: &AncestryMatrix,
    clusters: &[Vec<usize>],
) -> Vec<f64> {
    contracted
        .arcs()
        .iter()
        .map(|arc| {
            let source = &clusters[contracted.node_to_column(arc.source)];
            let target = &clusters[contracted.node_to_column(arc.target)];
            source
                .iter()
                .flat_map(|&j| target.iter().map(move |&k| (j, k)))
                .map(|(j, k)| ancestry.get(j, k))
                .fold(0., f64::max)
        })
        .collect()
}
