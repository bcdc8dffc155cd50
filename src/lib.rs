//! Clonal tree reconstruction from multi-sample read counts.
//!
//! Read counts give an ancestry matrix, which gives a probabilistic ancestry graph.
//! Ambiguous cycles are merged into clusters, the clusters are contracted into a DAG, and an
//! integer program picks every largest frequency-consistent spanning tree of it.
pub mod ancestry_graph;
pub mod ancestry_matrix;
pub mod clonal_tree;
pub mod config;
pub mod error;
pub mod ilp;
pub mod matrix;
pub mod read_counts;
pub mod simulation;
pub mod solution_pool;
pub mod tree_solver;
pub use ancestry_graph::AncestryGraph;
pub use ancestry_matrix::AncestryMatrix;
pub use clonal_tree::ClonalTree;
pub use config::Config;
pub use error::{Error, Result};
pub use read_counts::ReadCounts;
pub use solution_pool::SolutionPool;
pub use tree_solver::{IlpTreeSolver, SolveReport};
use log::info;

/// Result of a whole reconstruction.
#[derive(Debug, Clone)]
pub struct Inference {
    pub pool: SolutionPool,
    pub report: SolveReport,
    /// Original columns merged into each node of the contracted graph.
    pub clusters: Vec<Vec<usize>>,
}

/// Runs the full pipeline on `counts`.
pub fn infer_clonal_trees(counts: &ReadCounts, config: &Config) -> Result<Inference> {
    config.validate(counts.samples())?;
    info!(
        "{} mutations over {} samples",
        counts.mutations(),
        counts.samples()
    );
    let ancestry = AncestryMatrix::new(counts, config.order)?;
    infer_with_ancestry(counts, &ancestry, config)
}

/// Runs the pipeline from a precomputed ancestry matrix of `counts`.
pub fn infer_with_ancestry(
    counts: &ReadCounts,
    ancestry: &AncestryMatrix,
    config: &Config,
) -> Result<Inference> {
    config.validate(counts.samples())?;
    if ancestry.mutations() != counts.mutations() {
        return Err(Error::malformed(
            0,
            format!(
                "ancestry matrix over {} mutations, read counts over {}",
                ancestry.mutations(),
                counts.mutations()
            ),
        ));
    }
    let graph = AncestryGraph::probabilistic(ancestry, counts, config.alpha, config.gamma)?;
    let clusters = graph.remove_cycles();
    info!("{} clusters", clusters.len());
    let contracted = graph.contract(&clusters, config.beta)?;
    let intervals = counts.collapse(&clusters)?.confidence_intervals(config.gamma)?;
    let point_estimates = counts.point_estimates();
    let options = ilp::PoolOptions {
        time_limit: config.time_limit(),
        max_solutions: config.max_solutions,
        ..ilp::PoolOptions::default()
    };
    let solver = IlpTreeSolver::new(&contracted, &intervals, &point_estimates, &clusters, options);
    let (pool, report) = solver.solve()?;
    Ok(Inference {
        pool,
        report,
        clusters,
    })
}
