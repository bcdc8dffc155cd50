use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed input at line {line}: {message}")]
    MalformedInput { line: usize, message: String },
    #[error("parameter {name} = {value} is out of range {range}")]
    ParameterOutOfRange {
        name: &'static str,
        value: f64,
        range: &'static str,
    },
    #[error("numerical error: {0}")]
    Numerical(String),
    #[error("contracted graph has a cycle; alpha/beta are inconsistent")]
    NotADag,
    #[error("sum rule violated in sample {sample} at node {node}: {parent} < {children}")]
    SumRuleViolated {
        sample: usize,
        node: usize,
        parent: f64,
        children: f64,
    },
    #[error("frequency {value} of node {node} in sample {sample} is outside [{low}, {high}]")]
    FrequencyOutOfInterval {
        sample: usize,
        node: usize,
        value: f64,
        low: f64,
        high: f64,
    },
    #[error("not a clonal tree: {0}")]
    InvalidTree(String),
    #[error("integer program is infeasible")]
    Infeasible,
    #[error("solver failure: {0}")]
    Solver(String),
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed<S: Into<String>>(line: usize, message: S) -> Self {
        Error::MalformedInput {
            line,
            message: message.into(),
        }
    }
}
