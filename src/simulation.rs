//! Synthetic read counts drawn from a random clonal tree.
use crate::clonal_tree::ClonalTree;
use crate::error::{Error, Result};
use crate::matrix::RealMatrix;
use crate::read_counts::ReadCounts;
use rand::distributions::Distribution;
use rand::seq::SliceRandom;
use rand::Rng;
use statrs::distribution::Binomial;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub mutations: usize,
    pub samples: usize,
    /// Reads per (mutation, sample).
    pub coverage: u32,
    /// Number of clones mixed in each sample is drawn from [min_mix, max_mix].
    pub min_mix: usize,
    pub max_mix: usize,
    /// Exact counts round(coverage * F) instead of binomial draws.
    pub perfect: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            mutations: 20,
            samples: 4,
            coverage: 100,
            min_mix: 1,
            max_mix: 4,
            perfect: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Simulation {
    pub tree: ClonalTree,
    /// [sample][mutation]
    pub usage: RealMatrix,
    /// F = 0.5 * U * B.
    pub frequencies: RealMatrix,
    pub counts: ReadCounts,
}

pub fn simulate<R: Rng>(rng: &mut R, config: &SimulationConfig) -> Result<Simulation> {
    if config.mutations == 0 || config.samples == 0 {
        return Err(Error::ParameterOutOfRange {
            name: "mutations/samples",
            value: 0.,
            range: "[1, inf)",
        });
    }
    if config.min_mix == 0 || config.max_mix < config.min_mix {
        return Err(Error::ParameterOutOfRange {
            name: "min_mix",
            value: config.min_mix as f64,
            range: "[1, max_mix]",
        });
    }
    let tree = random_tree(rng, config.mutations)?;
    let usage = random_usage(rng, config);
    let frequencies = frequencies(&tree, &usage);
    let counts = sample_reads(rng, config, &frequencies)?;
    Ok(Simulation {
        tree,
        usage,
        frequencies,
        counts,
    })
}

/// Uniform random recursive tree: in a random order, each mutation hangs below an earlier one.
pub fn random_tree<R: Rng>(rng: &mut R, n: usize) -> Result<ClonalTree> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    let arcs: Vec<_> = (1..n)
        .map(|row| (order[rng.gen_range(0..row)], order[row], 1.))
        .collect();
    ClonalTree::from_arborescence((0..n).collect(), order[0], &arcs)
}

fn random_usage<R: Rng>(rng: &mut R, config: &SimulationConfig) -> RealMatrix {
    let n = config.mutations;
    let mut usage = RealMatrix::new(config.samples, n);
    for i in 0..config.samples {
        let mix = rng.gen_range(config.min_mix..=config.max_mix).min(n);
        // One extra part of the simplex stays unused as normal cells.
        let draw = sample_simplex(rng, mix + 1);
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        for (&j, &u) in indices.iter().zip(draw.iter()).take(mix) {
            usage.set(i, j, u);
        }
    }
    usage
}

/// Uniform draw from the (n-1)-simplex by cutting the unit interval at n-1 random points.
pub fn sample_simplex<R: Rng>(rng: &mut R, n: usize) -> Vec<f64> {
    let mut cuts: Vec<f64> = (1..n).map(|_| rng.gen::<f64>()).collect();
    cuts.push(0.);
    cuts.push(1.);
    cuts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    cuts.windows(2).map(|w| w[1] - w[0]).collect()
}

/// F(i,k) = 0.5 * sum of U(i,j) over every j descending from k (k included).
pub fn frequencies(tree: &ClonalTree, usage: &RealMatrix) -> RealMatrix {
    let b = tree.ancestor_matrix();
    let n = tree.node_count();
    let mut frequencies = RealMatrix::new(usage.rows(), n);
    for i in 0..usage.rows() {
        for k in 0..n {
            let f: f64 = (0..n).filter(|&j| b[j][k]).map(|j| usage.get(i, j)).sum();
            frequencies.set(i, k, 0.5 * f);
        }
    }
    frequencies
}

/// Variant reads of every entry: Binomial(coverage, F), or its rounded mean when `perfect`.
fn sample_reads<R: Rng>(
    rng: &mut R,
    config: &SimulationConfig,
    frequencies: &RealMatrix,
) -> Result<ReadCounts> {
    let coverage = config.coverage;
    let counts = (0..config.mutations)
        .map(|j| {
            (0..config.samples)
                .map(|i| -> Result<(u32, u32)> {
                    let f = frequencies.get(i, j).max(0.).min(1.);
                    let alt = if config.perfect {
                        (coverage as f64 * f).round() as u32
                    } else {
                        let binomial = Binomial::new(f, coverage as u64)
                            .map_err(|why| Error::Numerical(format!("{:?}", why)))?;
                        let alt: u64 = binomial.sample(rng);
                        alt as u32
                    };
                    Ok((alt, coverage - alt.min(coverage)))
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ReadCounts::new(
        (0..config.mutations).map(|j| format!("m{}", j)).collect(),
        (0..config.samples).map(|i| format!("s{}", i)).collect(),
        &counts,
    ))
}
