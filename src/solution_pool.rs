//! Tied-optimal clonal trees together with their frequencies and usages.
//!
//! The text format is `N #sols`, a blank line, the labelled point-estimate matrix and a blank
//! line, then for every solution its usage matrix, its tree, its labelled frequency matrix and
//! a blank line. Frequency columns are labelled by the `;`-joined original columns of their cluster.
use crate::clonal_tree::ClonalTree;
use crate::error::Result;
use crate::matrix::{RealMatrix, TextReader};
use crate::read_counts::compact_labels;

/// Corrected frequencies F, usages U and the tree T they are consistent with.
#[derive(Debug, Clone, PartialEq)]
pub struct Triple {
    pub frequencies: RealMatrix,
    pub usage: RealMatrix,
    pub tree: ClonalTree,
}

impl Triple {
    /// Original columns merged into node `j`.
    pub fn members(&self, j: usize) -> Result<Vec<usize>> {
        let label = self.frequencies.col_label(j);
        label
            .split(';')
            .map(|x| {
                x.parse::<usize>().map_err(|_| {
                    crate::error::Error::malformed(0, format!("{:?} is not a list of columns", label))
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolutionPool {
    point_estimates: RealMatrix,
    triples: Vec<Triple>,
}

impl SolutionPool {
    pub fn new(point_estimates: RealMatrix) -> Self {
        Self {
            point_estimates,
            triples: vec![],
        }
    }
    pub fn point_estimates(&self) -> &RealMatrix {
        &self.point_estimates
    }
    pub fn len(&self) -> usize {
        self.triples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }
    pub fn get(&self, idx: usize) -> &Triple {
        &self.triples[idx]
    }
    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }
    pub fn contains(&self, tree: &ClonalTree) -> bool {
        self.triples.iter().any(|t| &t.tree == tree)
    }
    /// Appends `triple` unless a tree with the same ancestor matrix is already present.
    /// Returns whether it was added.
    pub fn add(&mut self, triple: Triple) -> bool {
        if self.contains(&triple.tree) {
            false
        } else {
            self.triples.push(triple);
            true
        }
    }
    /// |F(i,j) - VAF(i,c)| for every sample i, node j and original column c merged into j.
    pub fn vaf_deltas(&self, idx: usize) -> Result<Vec<f64>> {
        let triple = &self.triples[idx];
        let f = &triple.frequencies;
        let mut deltas = vec![];
        for j in 0..f.cols() {
            let members = triple.members(j)?;
            for i in 0..f.rows() {
                for &c in members.iter() {
                    deltas.push((f.get(i, j) - self.point_estimates.get(i, c)).abs());
                }
            }
        }
        Ok(deltas)
    }
    /// Mean of `vaf_deltas`, 0 for an empty tree.
    pub fn vaf_delta(&self, idx: usize) -> Result<f64> {
        let deltas = self.vaf_deltas(idx)?;
        if deltas.is_empty() {
            Ok(0.)
        } else {
            Ok(deltas.iter().sum::<f64>() / deltas.len() as f64)
        }
    }
    /// Display label of every node of solution `idx`, showing at most `max` mutation names.
    pub fn display_labels(&self, idx: usize, max: usize) -> Result<Vec<String>> {
        let triple = &self.triples[idx];
        (0..triple.frequencies.cols())
            .map(|j| {
                let members = triple.members(j)?;
                let names: Vec<&str> = members
                    .iter()
                    .map(|&c| self.point_estimates.col_label(c))
                    .collect();
                Ok(compact_labels(&names, max))
            })
            .collect()
    }
    pub fn write_text(&self, out: &mut String) {
        out.push_str(&format!("{} #sols\n\n", self.len()));
        self.point_estimates.write_text(out);
        out.push('\n');
        for triple in self.triples.iter() {
            triple.usage.write_text(out);
            triple.tree.write_text(out);
            triple.frequencies.write_text(out);
            out.push('\n');
        }
    }
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out);
        out
    }
    pub fn from_text(content: &str) -> Result<Self> {
        let mut reader = TextReader::new(content);
        let header = reader.next_line()?;
        let count = match header.split_whitespace().collect::<Vec<_>>().as_slice() {
            [count, "#sols"] => count
                .parse::<usize>()
                .map_err(|_| reader.error(format!("bad solution count {:?}", count)))?,
            _ => return Err(reader.error(format!("expected `N #sols`, found {:?}", header))),
        };
        reader.blank_line()?;
        let point_estimates = RealMatrix::read_text(&mut reader)?;
        reader.blank_line()?;
        let mut pool = Self::new(point_estimates);
        for _ in 0..count {
            let usage = RealMatrix::read_text(&mut reader)?;
            let tree = ClonalTree::read_text(&mut reader)?;
            let frequencies = RealMatrix::read_text(&mut reader)?;
            reader.blank_line()?;
            if usage.cols() != tree.node_count() || frequencies.cols() != tree.node_count() {
                return Err(reader.error("matrices do not match the tree"));
            }
            pool.triples.push(Triple {
                frequencies,
                usage,
                tree,
            });
        }
        Ok(pool)
    }
}
