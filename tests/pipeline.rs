#![cfg(test)]
use ancestry_tree::simulation::{simulate, SimulationConfig};
use ancestry_tree::*;
use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand_xoshiro::Xoroshiro128PlusPlus;

fn counts(rows: &[Vec<(u32, u32)>]) -> ReadCounts {
    ReadCounts::new(
        (0..rows.len()).map(|j| format!("m{}", j)).collect(),
        (0..rows[0].len()).map(|i| format!("s{}", i)).collect(),
        rows,
    )
}

// A dominates B and C everywhere; B is only present in the first sample, C only in the second.
fn branching() -> ReadCounts {
    counts(&[
        vec![(50, 50), (50, 50)],
        vec![(40, 60), (0, 100)],
        vec![(0, 100), (40, 60)],
    ])
}

fn check_pool(counts: &ReadCounts, config: &Config, inference: &Inference) {
    let intervals = counts
        .collapse(&inference.clusters)
        .unwrap()
        .confidence_intervals(config.gamma)
        .unwrap();
    let pool = &inference.pool;
    for (idx, triple) in pool.triples().iter().enumerate() {
        let tree = &triple.tree;
        for i in 0..counts.samples() {
            for j in 0..tree.node_count() {
                assert!(triple.usage.get(i, j) >= -1e-6);
                let (low, high) = intervals.get(i, tree.mutation(j));
                let f = triple.frequencies.get(i, j);
                assert!(low.min(0.5) - 1e-6 <= f && f <= high.min(0.5) + 1e-6);
            }
        }
        for other in pool.triples().iter().skip(idx + 1) {
            assert_ne!(&other.tree, tree);
        }
    }
    let parsed = SolutionPool::from_text(&pool.to_text()).unwrap();
    assert_eq!(&parsed, pool);
}

#[test]
fn branching_tree() {
    let rc = branching();
    let ancestry = AncestryMatrix::new(&rc, 0).unwrap();
    assert!(ancestry.get(0, 1) > 0.5);
    assert!(ancestry.get(0, 2) > 0.5);
    let config = Config::default();
    let inference = infer_clonal_trees(&rc, &config).unwrap();
    assert_eq!(inference.clusters, vec![vec![0], vec![1], vec![2]]);
    assert_eq!(inference.pool.len(), 1);
    assert!(!inference.report.time_limited);
    assert_abs_diff_eq!(inference.report.best_bound, 3., epsilon = 1e-4);
    let tree = &inference.pool.get(0).tree;
    assert_eq!(tree.node_count(), 3);
    assert_eq!(tree.mutation(tree.root()), 0);
    let position = |m: usize| (0..3).find(|&j| tree.mutation(j) == m).unwrap();
    let (b, c) = (position(1), position(2));
    assert_eq!(tree.parent(b), Some(tree.root()));
    assert_eq!(tree.parent(c), Some(tree.root()));
    assert!(tree.incomparable(b, c));
    assert!(!tree.ancestral(b, c) && !tree.ancestral(c, b));
    check_pool(&rc, &config, &inference);
}

#[test]
fn alpha_half_is_one_cluster() {
    let rc = counts(&[
        vec![(30, 70), (10, 90), (45, 55)],
        vec![(5, 95), (40, 60), (20, 80)],
        vec![(25, 75), (25, 75), (0, 100)],
        vec![(45, 55), (12, 88), (33, 67)],
    ]);
    let config = Config {
        alpha: 0.5,
        ..Config::default()
    };
    let inference = infer_clonal_trees(&rc, &config).unwrap();
    assert_eq!(inference.clusters, vec![vec![0, 1, 2, 3]]);
    assert_eq!(inference.pool.len(), 1);
    let triple = inference.pool.get(0);
    assert_eq!(triple.tree.node_count(), 1);
    assert_eq!(triple.frequencies.col_label(0), "0;1;2;3");
    check_pool(&rc, &config, &inference);
}

#[test]
fn beta_one_has_no_arcs() {
    let rc = branching();
    let config = Config {
        beta: 1.0,
        ..Config::default()
    };
    let inference = infer_clonal_trees(&rc, &config).unwrap();
    // Every cluster is an equally good root, but all of them share the same ancestor matrix.
    assert_eq!(inference.report.assignments, 3);
    assert_eq!(inference.pool.len(), 1);
    let tree = &inference.pool.get(0).tree;
    assert_eq!(tree.node_count(), 1);
    assert_eq!(tree.ancestor_matrix(), &[vec![true]]);
    assert!(tree.children(0).is_empty());
    check_pool(&rc, &config, &inference);
}

#[test]
fn invalid_parameters() {
    let rc = branching();
    for config in vec![
        Config {
            alpha: 0.7,
            ..Config::default()
        },
        Config {
            beta: 0.4,
            ..Config::default()
        },
        Config {
            order: 2,
            ..Config::default()
        },
    ] {
        match infer_clonal_trees(&rc, &config) {
            Err(Error::ParameterOutOfRange { .. }) => {}
            other => panic!("{:?}", other.map(|i| i.pool.len())),
        }
    }
    let smaller = AncestryMatrix::from_rows(vec![vec![0.5]]);
    assert!(infer_with_ancestry(&rc, &smaller, &Config::default()).is_err());
}

#[test]
fn precomputed_matrix_gives_the_same_pool() {
    let rc = branching();
    let config = Config::default();
    let ancestry = AncestryMatrix::from_text(&AncestryMatrix::new(&rc, 0).unwrap().to_text()).unwrap();
    let direct = infer_clonal_trees(&rc, &config).unwrap();
    let precomputed = infer_with_ancestry(&rc, &ancestry, &config).unwrap();
    assert_eq!(direct.pool.len(), precomputed.pool.len());
    assert_eq!(direct.pool.get(0).tree, precomputed.pool.get(0).tree);
}

#[test]
fn simulated_pools_are_consistent() {
    let mut rng: Xoroshiro128PlusPlus = SeedableRng::seed_from_u64(4234);
    let sim_config = SimulationConfig {
        mutations: 5,
        samples: 3,
        coverage: 300,
        min_mix: 1,
        max_mix: 3,
        perfect: false,
    };
    let config = Config {
        max_solutions: 50,
        ..Config::default()
    };
    let mut solved = 0;
    for _ in 0..5 {
        let sim = simulate(&mut rng, &sim_config).unwrap();
        match infer_clonal_trees(&sim.counts, &config) {
            Ok(inference) => {
                assert!(!inference.pool.is_empty());
                check_pool(&sim.counts, &config, &inference);
                solved += 1;
            }
            // Noisy reads may contradict each other across clusters.
            Err(Error::NotADag) => {}
            Err(why) => panic!("{}", why),
        }
    }
    assert!(solved > 0);
}
