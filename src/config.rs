use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable parameters of the reconstruction pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Noise tolerance of ancestry arcs. An arc p->q is added when A(p,q) >= 0.5 - alpha.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Confidence needed for an arc of the contracted graph.
    #[serde(default = "default_beta")]
    pub beta: f64,
    /// Significance level of the confidence intervals.
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    /// Wall-clock limit of the integer program in seconds. Non-positive means unbounded.
    #[serde(default = "default_time_limit")]
    pub time_limit: i64,
    /// Order statistic taken over the per-sample ancestry probabilities.
    #[serde(default)]
    pub order: usize,
    /// Maximum number of tied optimal trees to enumerate.
    #[serde(default = "default_max_solutions")]
    pub max_solutions: usize,
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Number of mutation labels shown per cluster.
    #[serde(default = "default_max_cluster_size")]
    pub max_cluster_size: usize,
}

fn default_alpha() -> f64 {
    0.3
}

fn default_beta() -> f64 {
    0.8
}

fn default_gamma() -> f64 {
    0.01
}

fn default_time_limit() -> i64 {
    -1
}

fn default_max_solutions() -> usize {
    20_000
}

fn default_threads() -> usize {
    1
}

fn default_max_cluster_size() -> usize {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            beta: default_beta(),
            gamma: default_gamma(),
            time_limit: default_time_limit(),
            order: 0,
            max_solutions: default_max_solutions(),
            threads: default_threads(),
            max_cluster_size: default_max_cluster_size(),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
    pub fn time_limit(&self) -> Option<std::time::Duration> {
        if self.time_limit <= 0 {
            None
        } else {
            Some(std::time::Duration::from_secs(self.time_limit as u64))
        }
    }
    /// Checks every parameter against its admissible range.
    /// `samples` is the number of samples of the read-count table the run will use.
    pub fn validate(&self, samples: usize) -> Result<()> {
        check_range("alpha", self.alpha, 0.0, 0.5, "[0, 0.5]")?;
        check_range("beta", self.beta, 0.5, 1.0, "[0.5, 1]")?;
        check_range("gamma", self.gamma, 0.0, 1.0, "[0, 1]")?;
        if self.order >= samples.max(1) {
            return Err(Error::ParameterOutOfRange {
                name: "order",
                value: self.order as f64,
                range: "[0, #samples)",
            });
        }
        if self.max_solutions == 0 {
            return Err(Error::ParameterOutOfRange {
                name: "max_solutions",
                value: 0.,
                range: "[1, inf)",
            });
        }
        Ok(())
    }
}

fn check_range(name: &'static str, value: f64, low: f64, high: f64, range: &'static str) -> Result<()> {
    if low <= value && value <= high {
        Ok(())
    } else {
        Err(Error::ParameterOutOfRange { name, value, range })
    }
}
