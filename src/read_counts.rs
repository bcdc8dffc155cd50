//! Variant/reference read counts per mutation and sample.
use crate::error::{Error, Result};
use crate::matrix::{IntervalMatrix, RealMatrix};
use log::debug;
use statrs::distribution::{Beta, ContinuousCDF};

/// Read counts. Rows are mutations and columns are samples.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadCounts {
    alt: Vec<Vec<u32>>,
    reference: Vec<Vec<u32>>,
    mutation_labels: Vec<String>,
    sample_labels: Vec<String>,
}

impl ReadCounts {
    /// `counts[mutation][sample] = (alt, ref)`.
    pub fn new(
        mutation_labels: Vec<String>,
        sample_labels: Vec<String>,
        counts: &[Vec<(u32, u32)>],
    ) -> Self {
        assert_eq!(mutation_labels.len(), counts.len());
        assert!(counts.iter().all(|row| row.len() == sample_labels.len()));
        let alt = counts
            .iter()
            .map(|row| row.iter().map(|x| x.0).collect())
            .collect();
        let reference = counts
            .iter()
            .map(|row| row.iter().map(|x| x.1).collect())
            .collect();
        Self {
            alt,
            reference,
            mutation_labels,
            sample_labels,
        }
    }
    pub fn mutations(&self) -> usize {
        self.alt.len()
    }
    pub fn samples(&self) -> usize {
        self.sample_labels.len()
    }
    pub fn alt(&self, mutation: usize, sample: usize) -> u32 {
        self.alt[mutation][sample]
    }
    pub fn reference(&self, mutation: usize, sample: usize) -> u32 {
        self.reference[mutation][sample]
    }
    pub fn coverage(&self, mutation: usize, sample: usize) -> u64 {
        self.alt[mutation][sample] as u64 + self.reference[mutation][sample] as u64
    }
    pub fn mutation_label(&self, mutation: usize) -> &str {
        &self.mutation_labels[mutation]
    }
    pub fn sample_label(&self, sample: usize) -> &str {
        &self.sample_labels[sample]
    }
    pub fn max_count(&self) -> u32 {
        self.alt
            .iter()
            .chain(self.reference.iter())
            .flat_map(|row| row.iter())
            .copied()
            .max()
            .unwrap_or(0)
    }
    /// Beta(1 + alt, 1 + ref) credible interval at significance `gamma`,
    /// indexed by (sample, mutation).
    pub fn confidence_intervals(&self, gamma: f64) -> Result<IntervalMatrix> {
        let mut intervals = IntervalMatrix::new(self.samples(), self.mutations());
        for sample in 0..self.samples() {
            for mutation in 0..self.mutations() {
                let alt = self.alt(mutation, sample);
                let reference = self.reference(mutation, sample);
                if alt == 0 && reference == 0 {
                    intervals.set(sample, mutation, (0., 0.));
                    continue;
                }
                let beta = Beta::new(1. + alt as f64, 1. + reference as f64)
                    .map_err(|why| Error::Numerical(format!("{:?}", why)))?;
                let upper = if reference == 0 {
                    1.
                } else {
                    quantile(&beta, 1. - gamma / 2.)?
                };
                let lower = if alt == 0 {
                    0.
                } else {
                    quantile(&beta, gamma / 2.)?
                };
                if !(0. <= lower && lower <= upper && upper <= 1.) {
                    return Err(Error::Numerical(format!(
                        "invalid interval [{}, {}] for {}/{}",
                        lower, upper, alt, reference
                    )));
                }
                intervals.set(sample, mutation, (lower, upper));
            }
        }
        Ok(intervals)
    }
    /// VAF point estimates indexed by (sample, mutation). Uncovered entries stay at 0.
    pub fn point_estimates(&self) -> RealMatrix {
        let mut estimates = RealMatrix::new(self.samples(), self.mutations());
        for sample in 0..self.samples() {
            estimates.set_row_label(sample, self.sample_labels[sample].clone());
            for mutation in 0..self.mutations() {
                let total = self.coverage(mutation, sample);
                if total != 0 {
                    let vaf = self.alt(mutation, sample) as f64 / total as f64;
                    estimates.set(sample, mutation, vaf);
                }
            }
        }
        for mutation in 0..self.mutations() {
            estimates.set_col_label(mutation, self.mutation_labels[mutation].clone());
        }
        estimates
    }
    /// Sums the counts of every cluster into a single row, labelled by the cluster index.
    /// Fails when a summed count does not fit in 32 bits.
    pub fn collapse(&self, clusters: &[Vec<usize>]) -> Result<Self> {
        let samples = self.samples();
        let mut alt = vec![vec![0u32; samples]; clusters.len()];
        let mut reference = vec![vec![0u32; samples]; clusters.len()];
        for (idx, cluster) in clusters.iter().enumerate() {
            for &mutation in cluster {
                for sample in 0..samples {
                    let sums = (
                        alt[idx][sample].checked_add(self.alt[mutation][sample]),
                        reference[idx][sample].checked_add(self.reference[mutation][sample]),
                    );
                    match sums {
                        (Some(a), Some(r)) => {
                            alt[idx][sample] = a;
                            reference[idx][sample] = r;
                        }
                        _ => {
                            return Err(Error::malformed(
                                0,
                                format!("read counts of cluster {} overflow in sample {}", idx, sample),
                            ))
                        }
                    }
                }
            }
        }
        debug!("Collapsed {} mutations into {} rows", self.mutations(), clusters.len());
        Ok(Self {
            alt,
            reference,
            mutation_labels: (0..clusters.len()).map(|i| i.to_string()).collect(),
            sample_labels: self.sample_labels.clone(),
        })
    }
    /// Relabels the rows of a collapsed table by the labels of their members in `original`.
    /// Only the part of a label before the first comma is kept, at most `max_cluster_size` of them.
    pub fn remap_labels(
        &mut self,
        clusters: &[Vec<usize>],
        original: &ReadCounts,
        max_cluster_size: usize,
    ) {
        assert_eq!(clusters.len(), self.mutations());
        for (label, cluster) in self.mutation_labels.iter_mut().zip(clusters.iter()) {
            let names: Vec<&str> = cluster
                .iter()
                .map(|&j| original.mutation_label(j))
                .collect();
            *label = compact_labels(&names, max_cluster_size);
        }
    }
    pub fn from_text(content: &str) -> Result<Self> {
        let mut lines = content.lines().enumerate();
        let header = match lines.next() {
            Some((_, line)) if !line.trim().is_empty() => line.trim_end_matches('\r'),
            _ => return Err(Error::malformed(1, "empty sample labels")),
        };
        let fields: Vec<&str> = header.split('\t').skip(1).collect();
        if fields.len() % 2 != 0 {
            return Err(Error::malformed(1, "odd number of sample columns"));
        }
        let mut sample_labels = vec![];
        for pair in fields.chunks(2) {
            if pair[0] != pair[1] {
                return Err(Error::malformed(
                    1,
                    format!("unequal sample label between ref and alt: {} {}", pair[0], pair[1]),
                ));
            }
            sample_labels.push(pair[0].to_string());
        }
        let samples = sample_labels.len();
        let mut mutation_labels = vec![];
        let mut counts = vec![];
        for (idx, line) in lines {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                break;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != 1 + 2 * samples {
                return Err(Error::malformed(
                    idx + 1,
                    format!("expected {} columns, found {}", 1 + 2 * samples, fields.len()),
                ));
            }
            mutation_labels.push(fields[0].to_string());
            let row = fields[1..]
                .chunks(2)
                .map(|pair| {
                    let reference = parse_count(pair[0], idx + 1)?;
                    let alt = parse_count(pair[1], idx + 1)?;
                    Ok((alt, reference))
                })
                .collect::<Result<Vec<_>>>()?;
            counts.push(row);
        }
        Ok(Self::new(mutation_labels, sample_labels, &counts))
    }
    pub fn to_text(&self) -> String {
        let mut out = String::from("gene_id");
        for label in self.sample_labels.iter() {
            out.push_str(&format!("\t{}\t{}", label, label));
        }
        out.push('\n');
        for mutation in 0..self.mutations() {
            out.push_str(&self.mutation_labels[mutation]);
            for sample in 0..self.samples() {
                out.push_str(&format!(
                    "\t{}\t{}",
                    self.reference(mutation, sample),
                    self.alt(mutation, sample)
                ));
            }
            out.push('\n');
        }
        out
    }
}

fn parse_count(field: &str, line: usize) -> Result<u32> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(0);
    }
    match field.parse::<i64>() {
        Ok(x) if x < 0 => Err(Error::malformed(line, format!("negative count {}", x))),
        Ok(x) if x > u32::MAX as i64 => Err(Error::malformed(line, format!("count {} too large", x))),
        Ok(x) => Ok(x as u32),
        Err(_) => Err(Error::malformed(line, format!("could not parse count {:?}", field))),
    }
}

fn quantile(beta: &Beta, p: f64) -> Result<f64> {
    let q = if p <= 0. {
        0.
    } else if 1. <= p {
        1.
    } else {
        beta.inverse_cdf(p)
    };
    if q.is_finite() {
        Ok(q.max(0.).min(1.))
    } else {
        Err(Error::Numerical(format!("beta quantile at {} is {}", p, q)))
    }
}

/// First comma-separated part of each name, newline-joined, capped at `max` names.
pub fn compact_labels(names: &[&str], max: usize) -> String {
    let mut label = names
        .iter()
        .take(max)
        .map(|name| name.split(',').next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n");
    if names.len() > max {
        label.push_str(&format!("\n[{} more]", names.len() - max));
    }
    label
}

#[cfg(test)]
mod test {
    use super::*;
    const TABLE: &str = "gene_id\tS1\tS1\tS2\tS2\nA,chr1\t50\t50\t50\t50\nB\t60\t40\t100\t0\nC\t\t\t60\t40\n";
    #[test]
    fn parse_table() {
        let counts = ReadCounts::from_text(TABLE).unwrap();
        assert_eq!(counts.mutations(), 3);
        assert_eq!(counts.samples(), 2);
        assert_eq!(counts.alt(1, 0), 40);
        assert_eq!(counts.reference(1, 0), 60);
        assert_eq!(counts.coverage(2, 0), 0);
        assert_eq!(counts.sample_label(1), "S2");
        assert_eq!(ReadCounts::from_text(&counts.to_text()).unwrap(), counts);
    }
    #[test]
    fn malformed_tables() {
        assert!(ReadCounts::from_text("").is_err());
        assert!(ReadCounts::from_text("gene_id\tS1\n").is_err());
        assert!(ReadCounts::from_text("gene_id\tS1\tS2\n").is_err());
        assert!(ReadCounts::from_text("gene_id\tS1\tS1\nA\t1\n").is_err());
        match ReadCounts::from_text("gene_id\tS1\tS1\nA\t1\t2\nB\t-1\t2\n") {
            Err(Error::MalformedInput { line, .. }) => assert_eq!(line, 3),
            other => panic!("{:?}", other),
        }
        assert!(ReadCounts::from_text("gene_id\tS1\tS1\nA\t1\t-2\n").is_err());
        assert!(ReadCounts::from_text("gene_id\tS1\tS1\nA\tx\t2\n").is_err());
    }
    #[test]
    fn intervals_are_ordered() {
        let counts = ReadCounts::from_text(TABLE).unwrap();
        for &gamma in &[0., 0.01, 0.2, 1.] {
            let intervals = counts.confidence_intervals(gamma).unwrap();
            for sample in 0..2 {
                for mutation in 0..3 {
                    let (low, high) = intervals.get(sample, mutation);
                    assert!(0. <= low && low <= high && high <= 1., "{} {}", low, high);
                }
            }
            assert_eq!(intervals.get(0, 2), (0., 0.));
        }
        let intervals = counts.confidence_intervals(0.01).unwrap();
        // No variant reads.
        assert_eq!(intervals.get(1, 1).0, 0.);
        let (low, high) = intervals.get(0, 0);
        assert!(low < 0.5 && 0.5 < high);
        assert!(0.3 < low && high < 0.7);
    }
    #[test]
    fn estimates_and_collapse() {
        let counts = ReadCounts::from_text(TABLE).unwrap();
        let f = counts.point_estimates();
        assert_eq!(f.rows(), 2);
        assert_eq!(f.cols(), 3);
        assert!((f.get(0, 1) - 0.4).abs() < 1e-12);
        assert_eq!(f.get(0, 2), 0.);
        assert_eq!(f.col_label(0), "A,chr1");
        let collapsed = counts.collapse(&[vec![1, 2], vec![0]]).unwrap();
        assert_eq!(collapsed.mutations(), 2);
        assert_eq!(collapsed.alt(0, 1), 40);
        assert_eq!(collapsed.reference(0, 1), 160);
        assert_eq!(collapsed.mutation_label(1), "1");
        let mut collapsed = collapsed;
        collapsed.remap_labels(&[vec![1, 2], vec![0]], &counts, 1);
        assert_eq!(collapsed.mutation_label(0), "B\n[1 more]");
        assert_eq!(collapsed.mutation_label(1), "A");
    }
    #[test]
    fn large_counts() {
        let max = u32::MAX;
        let table = format!("gene_id\tS1\tS1\nA\t{}\t{}\nB\t1\t{}\n", max, max, max);
        let counts = ReadCounts::from_text(&table).unwrap();
        assert_eq!(counts.coverage(0, 0), 2 * max as u64);
        let f = counts.point_estimates();
        assert!((f.get(0, 0) - 0.5).abs() < 1e-12);
        assert_eq!(counts.collapse(&[vec![0], vec![1]]).unwrap().alt(0, 0), max);
        match counts.collapse(&[vec![0, 1]]) {
            Err(Error::MalformedInput { .. }) => {}
            other => panic!("{:?}", other),
        }
    }
}
