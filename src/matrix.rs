//! Dense matrices shared by the pipeline and their plain-text format.
//!
//! A matrix is written as its number of rows, its number of columns,
//! then one line per row with space-separated entries.
//! Labelled matrices append one line of row labels and one line of column labels (tab-separated).
use crate::error::{Error, Result};
use std::fmt::Write as _;

/// Line cursor over a text document which remembers line numbers for error messages.
pub struct TextReader<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    last: usize,
}

impl<'a> TextReader<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            lines: content.lines().enumerate(),
            last: 0,
        }
    }
    pub fn next_line(&mut self) -> Result<&'a str> {
        match self.lines.next() {
            Some((idx, line)) => {
                self.last = idx + 1;
                Ok(line)
            }
            None => Err(Error::malformed(self.last + 1, "unexpected end of input")),
        }
    }
    /// Consumes a line which must be blank.
    pub fn blank_line(&mut self) -> Result<()> {
        let line = self.next_line()?;
        if line.trim().is_empty() {
            Ok(())
        } else {
            Err(self.error(format!("expected a blank line, found {:?}", line)))
        }
    }
    pub fn usize_line(&mut self) -> Result<usize> {
        let line = self.next_line()?;
        line.trim()
            .parse()
            .map_err(|_| self.error(format!("expected a dimension, found {:?}", line)))
    }
    /// Reads one row of exactly `len` whitespace-separated values.
    pub fn values<T: std::str::FromStr>(&mut self, len: usize) -> Result<Vec<T>> {
        let line = self.next_line()?;
        let values: Vec<T> = line
            .split_whitespace()
            .map(|x| x.parse::<T>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| self.error(format!("could not parse {:?}", line)))?;
        if values.len() != len {
            return Err(self.error(format!("expected {} entries, found {}", len, values.len())));
        }
        Ok(values)
    }
    pub fn labels(&mut self, len: usize) -> Result<Vec<String>> {
        let line = self.next_line()?;
        if len == 0 {
            return Ok(vec![]);
        }
        let labels: Vec<_> = line.split('\t').map(unescape_label).collect();
        if labels.len() != len {
            return Err(self.error(format!("expected {} labels, found {}", len, labels.len())));
        }
        Ok(labels)
    }
    pub fn error<S: Into<String>>(&self, message: S) -> Error {
        Error::malformed(self.last, message)
    }
}

// Labels may carry newlines after compaction.
pub(crate) fn escape_label(label: &str) -> String {
    label
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
}

pub(crate) fn unescape_label(label: &str) -> String {
    let mut res = String::with_capacity(label.len());
    let mut chars = label.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            res.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => res.push('\n'),
            Some('t') => res.push('\t'),
            Some(other) => res.push(other),
            None => res.push('\\'),
        }
    }
    res
}

fn write_labels(out: &mut String, labels: &[String]) {
    let labels: Vec<_> = labels.iter().map(|l| escape_label(l)).collect();
    out.push_str(&labels.join("\t"));
    out.push('\n');
}

pub(crate) fn write_rows<T: std::fmt::Display>(out: &mut String, rows: &[Vec<T>], cols: usize) {
    let _ = writeln!(out, "{}", rows.len());
    let _ = writeln!(out, "{}", cols);
    for row in rows {
        let row: Vec<_> = row.iter().map(|x| format!("{}", x)).collect();
        out.push_str(&row.join(" "));
        out.push('\n');
    }
}

pub(crate) fn read_rows<T: std::str::FromStr>(reader: &mut TextReader) -> Result<(Vec<Vec<T>>, usize)> {
    let rows = reader.usize_line()?;
    let cols = reader.usize_line()?;
    let data = (0..rows)
        .map(|_| reader.values(cols))
        .collect::<Result<Vec<_>>>()?;
    Ok((data, cols))
}

/// Real-valued matrix with row and column labels.
#[derive(Debug, Clone, PartialEq)]
pub struct RealMatrix {
    cols: usize,
    data: Vec<Vec<f64>>,
    row_labels: Vec<String>,
    col_labels: Vec<String>,
}

impl RealMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            cols,
            data: vec![vec![0.; cols]; rows],
            row_labels: (0..rows).map(|i| i.to_string()).collect(),
            col_labels: (0..cols).map(|j| j.to_string()).collect(),
        }
    }
    pub fn from_rows(data: Vec<Vec<f64>>, cols: usize) -> Self {
        assert!(data.iter().all(|row| row.len() == cols));
        let rows = data.len();
        Self {
            data,
            ..Self::new(rows, cols)
        }
    }
    pub fn rows(&self) -> usize {
        self.data.len()
    }
    pub fn cols(&self) -> usize {
        self.cols
    }
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i][j]
    }
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i][j] = value;
    }
    pub fn row_label(&self, i: usize) -> &str {
        &self.row_labels[i]
    }
    pub fn col_label(&self, j: usize) -> &str {
        &self.col_labels[j]
    }
    pub fn set_row_label(&mut self, i: usize, label: String) {
        self.row_labels[i] = label;
    }
    pub fn set_col_label(&mut self, j: usize, label: String) {
        self.col_labels[j] = label;
    }
    pub fn write_text(&self, out: &mut String) {
        write_rows(out, &self.data, self.cols);
        write_labels(out, &self.row_labels);
        write_labels(out, &self.col_labels);
    }
    pub fn read_text(reader: &mut TextReader) -> Result<Self> {
        let (data, cols) = read_rows::<f64>(reader)?;
        let rows = data.len();
        let row_labels = reader.labels(rows)?;
        let col_labels = reader.labels(cols)?;
        Ok(Self {
            cols,
            data,
            row_labels,
            col_labels,
        })
    }
}

/// Closed intervals indexed by (sample, mutation).
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalMatrix {
    mutations: usize,
    intervals: Vec<Vec<(f64, f64)>>,
}

impl IntervalMatrix {
    pub fn new(samples: usize, mutations: usize) -> Self {
        Self {
            mutations,
            intervals: vec![vec![(0., 0.); mutations]; samples],
        }
    }
    pub fn samples(&self) -> usize {
        self.intervals.len()
    }
    pub fn mutations(&self) -> usize {
        self.mutations
    }
    pub fn get(&self, sample: usize, mutation: usize) -> (f64, f64) {
        self.intervals[sample][mutation]
    }
    pub fn set(&mut self, sample: usize, mutation: usize, interval: (f64, f64)) {
        self.intervals[sample][mutation] = interval;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn labelled_matrix_text() {
        let mut matrix = RealMatrix::from_rows(vec![vec![0.1, 0.25], vec![1. / 3., 0.]], 2);
        matrix.set_col_label(0, "3;4".to_string());
        matrix.set_row_label(1, "tumor\nB".to_string());
        let mut out = String::new();
        matrix.write_text(&mut out);
        let mut reader = TextReader::new(&out);
        let parsed = RealMatrix::read_text(&mut reader).unwrap();
        assert_eq!(parsed, matrix);
    }
    #[test]
    fn wrong_width() {
        let text = "1\n3\n0.1 0.2\n";
        let mut reader = TextReader::new(text);
        match read_rows::<f64>(&mut reader) {
            Err(Error::MalformedInput { line, .. }) => assert_eq!(line, 3),
            other => panic!("{:?}", other),
        }
    }
    #[test]
    fn label_escape() {
        let label = "a\\b\nc\td";
        assert_eq!(unescape_label(&escape_label(label)), label);
        assert!(!escape_label(label).contains('\n'));
    }
}
