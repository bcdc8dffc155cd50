//! Rooted trees over (clusters of) mutations.
//!
//! The tree is kept together with its ancestor matrix: `ancestors[j][k]` holds when node `k` is
//! an ancestor of node `j` or `k == j`, so the row of a node lists its lineage.
//! Every node also carries the index of the mutation cluster it stands for.
use crate::error::{Error, Result};
use crate::matrix::{read_rows, RealMatrix, TextReader};

const USAGE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct ClonalTree {
    ancestors: Vec<Vec<bool>>,
    /// Probability of the arc entering each node. 1 for the root.
    prob: Vec<f64>,
    mutations: Vec<usize>,
    root: usize,
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
}

/// Two trees are equal when their ancestor matrices are. Mutations and arc probabilities are
/// carried along but do not take part.
impl PartialEq for ClonalTree {
    fn eq(&self, other: &Self) -> bool {
        self.ancestors == other.ancestors
    }
}

impl ClonalTree {
    /// Tree over nodes `0..mutations.len()` rooted at `root`, where node `j` stands for
    /// `mutations[j]`. `arcs` are (parent, child, probability) and must span every node.
    pub fn from_arborescence(
        mutations: Vec<usize>,
        root: usize,
        arcs: &[(usize, usize, f64)],
    ) -> Result<Self> {
        let n = mutations.len();
        if n <= root {
            return Err(Error::InvalidTree(format!("root {} out of {} nodes", root, n)));
        }
        let mut parent = vec![None; n];
        let mut children = vec![vec![]; n];
        let mut prob = vec![1.; n];
        for &(u, v, p) in arcs {
            if v == root || parent[v].is_some() {
                return Err(Error::InvalidTree(format!("{} has more than one parent", v)));
            }
            parent[v] = Some(u);
            children[u].push(v);
            prob[v] = p;
        }
        // Top down from the root, each node inherits the lineage of its parent.
        let mut ancestors = vec![vec![false; n]; n];
        let mut reached = 0;
        let mut stack = vec![root];
        while let Some(v) = stack.pop() {
            reached += 1;
            if let Some(u) = parent[v] {
                ancestors[v] = ancestors[u].clone();
            }
            ancestors[v][v] = true;
            stack.extend(children[v].iter().copied());
        }
        if reached != n {
            return Err(Error::InvalidTree(format!(
                "{} of {} nodes are reachable from the root",
                reached, n
            )));
        }
        Ok(Self {
            ancestors,
            prob,
            mutations,
            root,
            parent,
            children,
        })
    }
    /// Recovers the tree from its ancestor matrix. Node `j` stands for mutation `j`.
    pub fn from_ancestor_matrix(ancestors: Vec<Vec<bool>>, prob: Vec<f64>) -> Result<Self> {
        let n = ancestors.len();
        if ancestors.iter().any(|row| row.len() != n) || prob.len() != n {
            return Err(Error::InvalidTree("ancestor matrix is not square".to_string()));
        }
        if (0..n).any(|j| !ancestors[j][j]) {
            return Err(Error::InvalidTree("diagonal must be set".to_string()));
        }
        let roots: Vec<_> = (0..n).filter(|&j| row_sum(&ancestors[j]) == 1).collect();
        if roots.len() != 1 {
            return Err(Error::InvalidTree(format!("{} roots", roots.len())));
        }
        let mut arcs = vec![];
        for j1 in 0..n {
            for j2 in 0..n {
                if j1 != j2 && row_containment(&ancestors[j1], &ancestors[j2]) == Some(1) {
                    arcs.push((j1, j2, prob[j2]));
                }
            }
        }
        let tree = Self::from_arborescence((0..n).collect(), roots[0], &arcs)?;
        if tree.ancestors != ancestors {
            return Err(Error::InvalidTree("lineages are not nested".to_string()));
        }
        Ok(tree)
    }
    pub fn node_count(&self) -> usize {
        self.ancestors.len()
    }
    pub fn root(&self) -> usize {
        self.root
    }
    pub fn parent(&self, j: usize) -> Option<usize> {
        self.parent[j]
    }
    pub fn children(&self, j: usize) -> &[usize] {
        &self.children[j]
    }
    pub fn prob(&self, j: usize) -> f64 {
        self.prob[j]
    }
    /// Cluster index node `j` stands for.
    pub fn mutation(&self, j: usize) -> usize {
        self.mutations[j]
    }
    pub fn mutations(&self) -> &[usize] {
        &self.mutations
    }
    pub fn ancestor_matrix(&self) -> &[Vec<bool>] {
        &self.ancestors
    }
    /// Whether `j` is a proper ancestor of `k`.
    pub fn ancestral(&self, j: usize, k: usize) -> bool {
        j != k && self.ancestors[k][j]
    }
    pub fn incomparable(&self, j: usize, k: usize) -> bool {
        !self.ancestors[j][k] && !self.ancestors[k][j]
    }
    /// Usage U(i,j) = 2 F(i,j) - 2 sum over children k of F(i,k). Tiny values are rounded to 0.
    pub fn usage(&self, frequencies: &RealMatrix) -> RealMatrix {
        assert_eq!(frequencies.cols(), self.node_count());
        let mut usage = frequencies.clone();
        for i in 0..frequencies.rows() {
            for j in 0..self.node_count() {
                let children: f64 = self.children[j].iter().map(|&k| frequencies.get(i, k)).sum();
                let u = 2. * frequencies.get(i, j) - 2. * children;
                usage.set(i, j, if u.abs() < USAGE_TOLERANCE { 0. } else { u });
            }
        }
        usage
    }
    /// Ancestor matrix as 0/1 rows, a line of incoming-arc probabilities, and a line of
    /// mutation indices.
    pub fn write_text(&self, out: &mut String) {
        let rows: Vec<Vec<u8>> = self
            .ancestors
            .iter()
            .map(|row| row.iter().map(|&b| b as u8).collect())
            .collect();
        crate::matrix::write_rows(out, &rows, self.node_count());
        let prob: Vec<_> = self.prob.iter().map(|p| p.to_string()).collect();
        out.push_str(&prob.join(" "));
        out.push('\n');
        let mutations: Vec<_> = self.mutations.iter().map(|m| m.to_string()).collect();
        out.push_str(&mutations.join(" "));
        out.push('\n');
    }
    pub fn read_text(reader: &mut TextReader) -> Result<Self> {
        let (rows, cols) = read_rows::<u8>(reader)?;
        if rows.len() != cols || rows.iter().flatten().any(|&b| 1 < b) {
            return Err(reader.error("ancestor matrix must be a square 0/1 matrix"));
        }
        let n = rows.len();
        let ancestors: Vec<Vec<bool>> = rows
            .into_iter()
            .map(|row| row.into_iter().map(|b| b == 1).collect())
            .collect();
        let prob = reader.values::<f64>(n)?;
        let mutations = reader.values::<usize>(n)?;
        let tree = Self::from_ancestor_matrix(ancestors, prob)?;
        Ok(Self { mutations, ..tree })
    }
}

fn row_sum(row: &[bool]) -> usize {
    row.iter().filter(|&&b| b).count()
}

/// Number of entries set in `row2` but not in `row1`, or None unless `row1` is a subset of `row2`.
fn row_containment(row1: &[bool], row2: &[bool]) -> Option<usize> {
    let mut diff = 0;
    for (&x, &y) in row1.iter().zip(row2) {
        match (x, y) {
            (true, false) => return None,
            (false, true) => diff += 1,
            _ => {}
        }
    }
    Some(diff)
}
