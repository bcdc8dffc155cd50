//! Largest frequency-consistent spanning arborescence of a contracted ancestry graph.
use crate::ancestry_graph::AncestryGraph;
use crate::clonal_tree::ClonalTree;
use crate::error::{Error, Result};
use crate::ilp::{Assignment, IlpSolver, LinearModel, MicroLp, PoolOptions, Relation, Var};
use crate::matrix::{IntervalMatrix, RealMatrix};
use crate::solution_pool::{SolutionPool, Triple};
use log::{debug, info, warn};

// A mutation is heterozygous: its VAF is at most one half.
const MAX_FREQUENCY: f64 = 0.5;
const EXTRACTION_TOLERANCE: f64 = 1e-6;

/// Outcome of the pool enumeration, for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    pub best_bound: f64,
    pub achieved: f64,
    pub time_limited: bool,
    /// Number of optimal assignments returned by the solver (before de-duplication).
    pub assignments: usize,
}

struct TreeModel {
    model: LinearModel,
    roots: Vec<Var>,
    arcs: Vec<Var>,
    // [sample][node]
    frequencies: Vec<Vec<Var>>,
}

pub struct IlpTreeSolver<'a, S: IlpSolver = MicroLp> {
    graph: &'a AncestryGraph,
    intervals: &'a IntervalMatrix,
    point_estimates: &'a RealMatrix,
    clusters: &'a [Vec<usize>],
    options: PoolOptions,
    solver: S,
}

impl<'a> IlpTreeSolver<'a, MicroLp> {
    /// `graph` is the contracted graph whose column `c` is cluster `clusters[c]`.
    /// `intervals` are the confidence intervals of the collapsed read counts, indexed by
    /// (sample, cluster), and `point_estimates` the VAFs of the original mutations.
    pub fn new(
        graph: &'a AncestryGraph,
        intervals: &'a IntervalMatrix,
        point_estimates: &'a RealMatrix,
        clusters: &'a [Vec<usize>],
        options: PoolOptions,
    ) -> Self {
        Self::with_solver(graph, intervals, point_estimates, clusters, options, MicroLp)
    }
}

impl<'a, S: IlpSolver> IlpTreeSolver<'a, S> {
    pub fn with_solver(
        graph: &'a AncestryGraph,
        intervals: &'a IntervalMatrix,
        point_estimates: &'a RealMatrix,
        clusters: &'a [Vec<usize>],
        options: PoolOptions,
        solver: S,
    ) -> Self {
        assert_eq!(graph.columns(), clusters.len());
        assert_eq!(intervals.mutations(), clusters.len());
        assert_eq!(intervals.samples(), point_estimates.rows());
        Self {
            graph,
            intervals,
            point_estimates,
            clusters,
            options,
            solver,
        }
    }
    fn samples(&self) -> usize {
        self.intervals.samples()
    }
    /// Bounds of the frequency of `node` in `sample`: its interval, capped at one half.
    fn frequency_bounds(&self, sample: usize, node: usize) -> (f64, f64) {
        let (low, high) = self.intervals.get(sample, self.graph.node_to_column(node));
        (low.min(MAX_FREQUENCY), high.min(MAX_FREQUENCY))
    }
    fn build_model(&self) -> TreeModel {
        let graph = self.graph;
        let (m, n) = (self.samples(), graph.node_count());
        let mut model = LinearModel::new();
        let roots: Vec<_> = (0..n).map(|_| model.add_binary()).collect();
        let arcs: Vec<_> = (0..graph.arc_count()).map(|_| model.add_binary()).collect();
        let frequencies: Vec<Vec<_>> = (0..m)
            .map(|i| {
                (0..n)
                    .map(|v| {
                        let (low, high) = self.frequency_bounds(i, v);
                        model.add_continuous(low, high)
                    })
                    .collect()
            })
            .collect();
        // f * x for the root indicator of every node, and for every arc with the f of its target.
        let root_products: Vec<Vec<_>> = (0..m)
            .map(|i| {
                (0..n)
                    .map(|v| model.add_product(frequencies[i][v], roots[v], MAX_FREQUENCY))
                    .collect()
            })
            .collect();
        let arc_products: Vec<Vec<_>> = (0..m)
            .map(|i| {
                graph
                    .arcs()
                    .iter()
                    .zip(arcs.iter())
                    .map(|(arc, &x)| model.add_product(frequencies[i][arc.target], x, MAX_FREQUENCY))
                    .collect()
            })
            .collect();
        // An arc leaves a node only if the node is the root or has an incoming arc.
        for (a, arc) in graph.arcs().iter().enumerate() {
            let mut terms = vec![(roots[arc.source], 1.), (arcs[a], -1.)];
            terms.extend(graph.in_arcs(arc.source).iter().map(|&b| (arcs[b], 1.)));
            model.add_constraint(terms, Relation::Ge, 0.);
        }
        for v in 0..n {
            let incoming: Vec<_> = graph.in_arcs(v).iter().map(|&a| (arcs[a], 1.)).collect();
            if !incoming.is_empty() {
                model.add_constraint(incoming, Relation::Le, 1.);
            }
        }
        model.add_constraint(roots.iter().map(|&r| (r, 1.)).collect(), Relation::Eq, 1.);
        // Sum rule.
        for i in 0..m {
            for k in 0..n {
                let mut terms = vec![(root_products[i][k], 1.)];
                terms.extend(graph.in_arcs(k).iter().map(|&a| (arc_products[i][a], 1.)));
                terms.extend(graph.out_arcs(k).iter().map(|&a| (arc_products[i][a], -1.)));
                model.add_constraint(terms, Relation::Ge, 0.);
            }
        }
        // Deviation from the point estimates of the original mutations.
        let columns = self.point_estimates.cols().max(1);
        let weight = 1. / (m.max(1) * columns) as f64;
        let mut objective: Vec<_> = roots.iter().chain(arcs.iter()).map(|&x| (x, 1.)).collect();
        for i in 0..m {
            for v in 0..n {
                for &org in self.clusters[graph.node_to_column(v)].iter() {
                    let estimate = self.point_estimates.get(i, org).min(MAX_FREQUENCY);
                    let g = model.add_continuous(0., MAX_FREQUENCY);
                    let f = frequencies[i][v];
                    model.add_constraint(vec![(g, 1.), (f, 1.)], Relation::Ge, estimate);
                    model.add_constraint(vec![(g, 1.), (f, -1.)], Relation::Ge, -estimate);
                    objective.push((g, -weight));
                }
            }
        }
        model.set_objective(&objective);
        TreeModel {
            model,
            roots,
            arcs,
            frequencies,
        }
    }
    /// Solves the integer program and collects every optimal tree.
    pub fn solve(&self) -> Result<(SolutionPool, SolveReport)> {
        let tree_model = self.build_model();
        info!(
            "ILP with {} variables and {} constraints",
            tree_model.model.var_count(),
            tree_model.model.constraints().len()
        );
        let solved = self.solver.solve_pool(&tree_model.model, &self.options)?;
        let report = SolveReport {
            best_bound: solved.best_bound,
            achieved: solved.achieved(),
            time_limited: solved.time_limited,
            assignments: solved.solutions.len(),
        };
        if report.time_limited {
            warn!("Time limit reached after {} optimal trees", report.assignments);
        }
        let mut pool = SolutionPool::new(self.point_estimates.clone());
        for assignment in solved.solutions.iter() {
            let triple = self.extract(&tree_model, assignment)?;
            if !pool.add(triple) {
                debug!("Duplicated tree is skipped");
            }
        }
        info!(
            "{} trees, objective {:.6} (bound {:.6})",
            pool.len(),
            report.achieved,
            report.best_bound
        );
        Ok((pool, report))
    }
    fn extract(&self, tree_model: &TreeModel, assignment: &Assignment) -> Result<Triple> {
        let graph = self.graph;
        let roots: Vec<_> = (0..graph.node_count())
            .filter(|&v| assignment.is_selected(tree_model.roots[v]))
            .collect();
        if roots.len() != 1 {
            return Err(Error::Solver(format!("{} roots selected", roots.len())));
        }
        let selected_arcs: Vec<_> = (0..graph.arc_count())
            .filter(|&a| assignment.is_selected(tree_model.arcs[a]))
            .collect();
        // Root first, then nodes in the order their arcs were added to the graph.
        let mut nodes = vec![roots[0]];
        for &a in selected_arcs.iter() {
            let arc = graph.arc(a);
            for &v in &[arc.source, arc.target] {
                if !nodes.contains(&v) {
                    nodes.push(v);
                }
            }
        }
        let position = |v: usize| nodes.iter().position(|&w| w == v);
        let mut tree_arcs = vec![];
        for &a in selected_arcs.iter() {
            let arc = graph.arc(a);
            if let (Some(u), Some(v)) = (position(arc.source), position(arc.target)) {
                tree_arcs.push((u, v, arc.prob));
            }
        }
        let mutations: Vec<_> = nodes.iter().map(|&v| graph.node_to_column(v)).collect();
        let tree = ClonalTree::from_arborescence(mutations, 0, &tree_arcs)?;
        let m = self.samples();
        let mut frequencies = RealMatrix::new(m, nodes.len());
        for i in 0..m {
            frequencies.set_row_label(i, self.point_estimates.row_label(i).to_string());
            for (col, &v) in nodes.iter().enumerate() {
                let f = assignment.value(tree_model.frequencies[i][v]);
                let (low, high) = self.frequency_bounds(i, v);
                if f < low - EXTRACTION_TOLERANCE || high + EXTRACTION_TOLERANCE < f {
                    return Err(Error::FrequencyOutOfInterval {
                        sample: i,
                        node: graph.node_to_column(v),
                        value: f,
                        low,
                        high,
                    });
                }
                frequencies.set(i, col, if f.abs() < EXTRACTION_TOLERANCE { 0. } else { f });
            }
        }
        for (col, &v) in nodes.iter().enumerate() {
            let members: Vec<_> = self.clusters[graph.node_to_column(v)]
                .iter()
                .map(|x| x.to_string())
                .collect();
            frequencies.set_col_label(col, members.join(";"));
        }
        for i in 0..m {
            for j in 0..tree.node_count() {
                let parent = frequencies.get(i, j);
                let children: f64 = tree.children(j).iter().map(|&k| frequencies.get(i, k)).sum();
                if parent < children - EXTRACTION_TOLERANCE {
                    return Err(Error::SumRuleViolated {
                        sample: i,
                        node: tree.mutation(j),
                        parent,
                        children,
                    });
                }
            }
        }
        let usage = tree.usage(&frequencies);
        Ok(Triple {
            frequencies,
            usage,
            tree,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ancestry_graph::test::from_arcs;
    use approx::assert_abs_diff_eq;
    use std::time::{Duration, Instant};
    /// Runs microlp, then overwrites the optimal values.
    struct Tampered<F: Fn(&mut Vec<f64>)>(F);
    impl<F: Fn(&mut Vec<f64>)> IlpSolver for Tampered<F> {
        fn solve(&self, model: &LinearModel, deadline: Option<Instant>) -> Result<Assignment> {
            let solution = MicroLp.solve(model, deadline)?;
            let mut values = solution.values().to_vec();
            (self.0)(&mut values);
            Ok(Assignment::new(model.objective_value(&values), values))
        }
    }
    /// Gives up at any deadline, returning the optimum as a mere incumbent.
    struct Interrupted;
    impl IlpSolver for Interrupted {
        fn solve(&self, model: &LinearModel, deadline: Option<Instant>) -> Result<Assignment> {
            let solution = MicroLp.solve(model, None)?;
            match deadline {
                Some(_) => Ok(Assignment::incumbent(
                    solution.objective,
                    solution.values().to_vec(),
                )),
                None => Ok(solution),
            }
        }
    }
    fn intervals(rows: &[Vec<(f64, f64)>]) -> IntervalMatrix {
        let mut intervals = IntervalMatrix::new(rows.len(), rows[0].len());
        for (i, row) in rows.iter().enumerate() {
            for (j, &interval) in row.iter().enumerate() {
                intervals.set(i, j, interval);
            }
        }
        intervals
    }
    #[test]
    fn chain_is_selected() {
        // 0 -> 1 -> 2 with nested frequencies.
        let graph = from_arcs(3, &[(0, 1), (1, 2), (0, 2)]);
        let ci = intervals(&[vec![(0.4, 0.5), (0.2, 0.3), (0.05, 0.15)]]);
        let f = RealMatrix::from_rows(vec![vec![0.45, 0.25, 0.1]], 3);
        let clusters = vec![vec![0], vec![1], vec![2]];
        let solver = IlpTreeSolver::new(&graph, &ci, &f, &clusters, PoolOptions::default());
        let (pool, report) = solver.solve().unwrap();
        assert!(!report.time_limited);
        assert_abs_diff_eq!(report.best_bound, 3., epsilon = 1e-6);
        // 0->1->2 and 0->{1,2} both span the graph.
        assert_eq!(pool.len(), 2);
        for triple in pool.triples() {
            assert_eq!(triple.tree.node_count(), 3);
            assert_eq!(triple.tree.mutation(triple.tree.root()), 0);
            for j in 0..3 {
                let u = triple.usage.get(0, j);
                assert!(u >= -1e-6, "{}", u);
            }
            assert_abs_diff_eq!(triple.frequencies.get(0, 0), 0.45, epsilon = 1e-6);
        }
    }
    #[test]
    fn sum_rule_prunes_children() {
        // Both children need more than half of the root.
        let graph = from_arcs(3, &[(0, 1), (0, 2)]);
        let ci = intervals(&[vec![(0.4, 0.5), (0.3, 0.4), (0.3, 0.4)]]);
        let f = RealMatrix::from_rows(vec![vec![0.45, 0.35, 0.35]], 3);
        let clusters = vec![vec![0], vec![1], vec![2]];
        let solver = IlpTreeSolver::new(&graph, &ci, &f, &clusters, PoolOptions::default());
        let (pool, report) = solver.solve().unwrap();
        assert_abs_diff_eq!(report.best_bound, 2., epsilon = 1e-6);
        // 0->1 and 0->2 are both optimal and have the same ancestor matrix.
        assert_eq!(report.assignments, 2);
        assert_eq!(pool.len(), 1);
        let tree = &pool.get(0).tree;
        assert_eq!(tree.node_count(), 2);
        assert_eq!(tree.children(0).len(), 1);
    }
    #[test]
    fn clusters_label_columns() {
        let graph = from_arcs(2, &[(0, 1)]);
        let ci = intervals(&[vec![(0.4, 0.6), (0.1, 0.2)]]);
        let f = RealMatrix::from_rows(vec![vec![0.1, 0.55, 0.48, 0.15]], 4);
        let clusters = vec![vec![1, 2], vec![0, 3]];
        let solver = IlpTreeSolver::new(&graph, &ci, &f, &clusters, PoolOptions::default());
        let (pool, _) = solver.solve().unwrap();
        assert_eq!(pool.len(), 1);
        let triple = &pool.triples()[0];
        assert_eq!(triple.frequencies.col_label(0), "1;2");
        assert_eq!(triple.frequencies.col_label(1), "0;3");
        // Capped at one half.
        assert!(triple.frequencies.get(0, 0) <= 0.5 + 1e-9);
        assert!(triple.frequencies.get(0, 0) >= 0.48 - 1e-6);
    }
    // 0 -> 1 over one sample. Variables are laid out as the root indicators (0, 1),
    // the arc (2), then the frequencies of node 0 and node 1 (3, 4).
    fn pair() -> (AncestryGraph, IntervalMatrix, RealMatrix, Vec<Vec<usize>>) {
        let graph = from_arcs(2, &[(0, 1)]);
        let ci = intervals(&[vec![(0.2, 0.5), (0.2, 0.5)]]);
        let f = RealMatrix::from_rows(vec![vec![0.3, 0.25]], 2);
        (graph, ci, f, vec![vec![0], vec![1]])
    }
    fn single() -> PoolOptions {
        PoolOptions {
            max_solutions: 1,
            ..PoolOptions::default()
        }
    }
    #[test]
    fn extraction_checks_the_sum_rule() {
        let (graph, ci, f, clusters) = pair();
        let solver = Tampered(|values: &mut Vec<f64>| {
            values[3] = 0.2;
            values[4] = 0.5;
        });
        let solver = IlpTreeSolver::with_solver(&graph, &ci, &f, &clusters, single(), solver);
        match solver.solve() {
            Err(Error::SumRuleViolated {
                sample: 0,
                node: 0,
                parent,
                children,
            }) => {
                assert_abs_diff_eq!(parent, 0.2, epsilon = 1e-9);
                assert_abs_diff_eq!(children, 0.5, epsilon = 1e-9);
            }
            other => panic!("{:?}", other),
        }
    }
    #[test]
    fn extraction_checks_intervals() {
        let (graph, ci, f, clusters) = pair();
        let solver = Tampered(|values: &mut Vec<f64>| values[4] = 0.9);
        let solver = IlpTreeSolver::with_solver(&graph, &ci, &f, &clusters, single(), solver);
        match solver.solve() {
            Err(Error::FrequencyOutOfInterval {
                sample: 0, node: 1, ..
            }) => {}
            other => panic!("{:?}", other),
        }
    }
    #[test]
    fn extraction_needs_one_root() {
        let (graph, ci, f, clusters) = pair();
        let solver = Tampered(|values: &mut Vec<f64>| {
            values[0] = 1.;
            values[1] = 1.;
        });
        let solver = IlpTreeSolver::with_solver(&graph, &ci, &f, &clusters, single(), solver);
        match solver.solve() {
            Err(Error::Solver(_)) => {}
            other => panic!("{:?}", other),
        }
    }
    #[test]
    fn time_limit_is_reported() {
        let (graph, ci, f, clusters) = pair();
        let options = PoolOptions {
            time_limit: Some(Duration::from_secs(3600)),
            ..PoolOptions::default()
        };
        let solver = IlpTreeSolver::with_solver(&graph, &ci, &f, &clusters, options, Interrupted);
        let (pool, report) = solver.solve().unwrap();
        assert!(report.time_limited);
        assert_eq!(report.assignments, 1);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(0).tree.node_count(), 2);
        let (_, report) = IlpTreeSolver::new(&graph, &ci, &f, &clusters, PoolOptions::default())
            .solve()
            .unwrap();
        assert!(!report.time_limited);
    }
}
