//! Pairwise ancestry probabilities between mutations.
//!
//! For a single sample, the probability that p is an ancestor of q is the posterior probability
//! that the VAF of p is at least the VAF of q, where both VAFs follow Beta(1 + alt, 1 + ref).
//! It is evaluated in closed form through ratios of Beta functions over a log-factorial table.
use crate::error::{Error, Result};
use crate::matrix::{read_rows, write_rows, TextReader};
use crate::read_counts::ReadCounts;
use log::debug;
use rayon::prelude::*;

// Slack tolerated on a per-sample probability before it is clamped into [0,1].
const ROUNDING_SLACK: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct AncestryMatrix {
    probs: Vec<Vec<f64>>,
}

impl AncestryMatrix {
    /// Computes A(p,q) for every ordered pair. Per pair, the per-sample probabilities
    /// are sorted and the `order`-th smallest is kept.
    pub fn new(counts: &ReadCounts, order: usize) -> Result<Self> {
        if order >= counts.samples() {
            return Err(Error::ParameterOutOfRange {
                name: "order",
                value: order as f64,
                range: "[0, #samples)",
            });
        }
        let table = LogFactorial::new(4 * (counts.max_count() as usize + 1));
        let n = counts.mutations();
        let probs = (0..n)
            .into_par_iter()
            .map(|p| {
                (0..n)
                    .map(|q| pair_probability(counts, order, &table, p, q))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("Computed {}x{} ancestry matrix (order {})", n, n, order);
        Ok(Self { probs })
    }
    pub fn from_rows(probs: Vec<Vec<f64>>) -> Self {
        let n = probs.len();
        assert!(probs.iter().all(|row| row.len() == n));
        Self { probs }
    }
    pub fn mutations(&self) -> usize {
        self.probs.len()
    }
    pub fn get(&self, p: usize, q: usize) -> f64 {
        self.probs[p][q]
    }
    /// Counts the ordered pairs of `set` whose probabilities are complementary,
    /// i.e. |1 - (A(j,k) + A(k,j))| <= 1e-3. Each unordered pair counts twice and
    /// every member counts once for the diagonal.
    pub fn anti_symmetric_pairs(&self, set: &[usize]) -> usize {
        let mut res = 0;
        for (idx, &j) in set.iter().enumerate() {
            for &k in set.iter().skip(idx + 1) {
                if (1. - (self.get(j, k) + self.get(k, j))).abs() <= 1e-3 {
                    res += 1;
                }
            }
        }
        res * 2 + set.len()
    }
    /// Fraction of anti-symmetric ordered pairs over all mutations.
    pub fn anti_symmetric_fraction(&self) -> f64 {
        let n = self.mutations();
        if n == 0 {
            return 1.;
        }
        let all: Vec<_> = (0..n).collect();
        self.anti_symmetric_pairs(&all) as f64 / (n * n) as f64
    }
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        write_rows(&mut out, &self.probs, self.mutations());
        out
    }
    pub fn from_text(content: &str) -> Result<Self> {
        let mut reader = TextReader::new(content);
        let (probs, cols) = read_rows::<f64>(&mut reader)?;
        if probs.len() != cols {
            return Err(reader.error(format!("{}x{} matrix is not square", probs.len(), cols)));
        }
        if let Some(x) = probs.iter().flatten().find(|x| !(0. ..=1.).contains(*x)) {
            return Err(reader.error(format!("{} is not a probability", x)));
        }
        Ok(Self { probs })
    }
}

fn pair_probability(
    counts: &ReadCounts,
    order: usize,
    table: &LogFactorial,
    p: usize,
    q: usize,
) -> Result<f64> {
    let mut probs = (0..counts.samples())
        .map(|i| sample_probability(counts, table, i, p, q))
        .collect::<Result<Vec<_>>>()?;
    probs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Ok(probs[order])
}

/// Probability that p is an ancestor of q in `sample`, clamped into [0,1].
fn sample_probability(
    counts: &ReadCounts,
    table: &LogFactorial,
    sample: usize,
    p: usize,
    q: usize,
) -> Result<f64> {
    let (alt_p, ref_p) = (counts.alt(p, sample), counts.reference(p, sample));
    let (alt_q, ref_q) = (counts.alt(q, sample), counts.reference(q, sample));
    let p_covered = counts.coverage(p, sample) > 0;
    let q_covered = counts.coverage(q, sample) > 0;
    let prob = match (p_covered, q_covered) {
        (false, false) => 1.,
        (false, true) => 0.,
        (true, false) => 1.,
        (true, true) => {
            let (a, b) = (alt_q as usize + 1, ref_q as usize + 1);
            let (c, d) = (alt_p as usize + 1, ref_p as usize + 1);
            1. - table.g(a, b, c, d)?
        }
    };
    if !(-ROUNDING_SLACK..=1. + ROUNDING_SLACK).contains(&prob) {
        return Err(Error::Numerical(format!(
            "probability {} of {} -> {} in sample {} is outside [0,1]",
            prob, p, q, sample
        )));
    }
    Ok(prob.max(0.).min(1.))
}

/// Table of ln(i!) for i up to the requested size.
#[derive(Debug, Clone)]
pub struct LogFactorial {
    table: Vec<f64>,
}

impl LogFactorial {
    pub fn new(n: usize) -> Self {
        let mut table = vec![0.; n + 1];
        for i in 1..=n {
            table[i] = table[i - 1] + (i as f64).ln();
        }
        Self { table }
    }
    /// ln B(x,y) for positive integers.
    pub fn log_beta(&self, x: usize, y: usize) -> f64 {
        assert!(x + y - 1 < self.table.len());
        self.table[x - 1] + self.table[y - 1] - self.table[x + y - 1]
    }
    fn h(&self, a: usize, b: usize, c: usize, d: usize) -> f64 {
        (self.log_beta(a + c, b + d) - (self.log_beta(a, b) + self.log_beta(c, d))).exp()
    }
    /// P(X > Y) for X ~ Beta(a,b) and Y ~ Beta(c,d), starting from the symmetric
    /// case at 0.5 and walking each parameter up to its target.
    pub fn g(&self, a: usize, b: usize, c: usize, d: usize) -> Result<f64> {
        let (mut aa, mut bb) = (a.min(c), b.min(d));
        let (mut cc, mut dd) = (aa, bb);
        let mut res = 0.5;
        while aa < a {
            res += self.h(aa, bb, cc, dd) / aa as f64;
            aa += 1;
        }
        while bb < b {
            res -= self.h(aa, bb, cc, dd) / bb as f64;
            bb += 1;
        }
        while cc < c {
            res -= self.h(aa, bb, cc, dd) / cc as f64;
            cc += 1;
        }
        while dd < d {
            res += self.h(aa, bb, cc, dd) / dd as f64;
            dd += 1;
        }
        if res.is_finite() {
            Ok(res)
        } else {
            Err(Error::Numerical(format!(
                "g({},{},{},{}) evaluated to {}",
                a, b, c, d, res
            )))
        }
    }
}
