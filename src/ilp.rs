//! Mixed integer linear programs, independent of the solver that runs them.
//!
//! A `LinearModel` is a maximisation problem over binary and bounded continuous variables.
//! Solvers implement `IlpSolver::solve`; enumerating every optimal assignment of the binary
//! variables is provided on top of it by repeatedly excluding the last assignment.
//! Every solve gets the wall-clock deadline of the whole enumeration. A solver that stops at
//! the deadline returns its incumbent, marked as not proven optimal.
use crate::error::{Error, Result};
use log::{debug, info, trace, warn};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(usize);

impl Var {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Binary,
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Le,
    Ge,
    Eq,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub terms: Vec<(Var, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

impl Constraint {
    fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs: f64 = self.terms.iter().map(|&(v, c)| c * values[v.0]).sum();
        match self.relation {
            Relation::Le => lhs <= self.rhs + tolerance,
            Relation::Ge => lhs >= self.rhs - tolerance,
            Relation::Eq => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearModel {
    kinds: Vec<VarKind>,
    bounds: Vec<(f64, f64)>,
    objective: Vec<f64>,
    constraints: Vec<Constraint>,
}

impl LinearModel {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn var_count(&self) -> usize {
        self.kinds.len()
    }
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
    pub fn kind(&self, var: Var) -> VarKind {
        self.kinds[var.0]
    }
    pub fn bounds(&self, var: Var) -> (f64, f64) {
        self.bounds[var.0]
    }
    pub fn add_binary(&mut self) -> Var {
        self.kinds.push(VarKind::Binary);
        self.bounds.push((0., 1.));
        self.objective.push(0.);
        Var(self.kinds.len() - 1)
    }
    pub fn add_continuous(&mut self, low: f64, high: f64) -> Var {
        assert!(low <= high, "empty domain [{}, {}]", low, high);
        self.kinds.push(VarKind::Continuous);
        self.bounds.push((low, high));
        self.objective.push(0.);
        Var(self.kinds.len() - 1)
    }
    /// Adds `sum terms (relation) rhs`. Repeated variables are merged.
    pub fn add_constraint(&mut self, mut terms: Vec<(Var, f64)>, relation: Relation, rhs: f64) {
        terms.sort_by_key(|t| t.0);
        let mut merged: Vec<(Var, f64)> = Vec::with_capacity(terms.len());
        for (var, coeff) in terms {
            match merged.last_mut() {
                Some(last) if last.0 == var => last.1 += coeff,
                _ => merged.push((var, coeff)),
            }
        }
        merged.retain(|t| t.1 != 0.);
        self.constraints.push(Constraint {
            terms: merged,
            relation,
            rhs,
        });
    }
    /// Replaces the objective, which is maximised.
    pub fn set_objective(&mut self, terms: &[(Var, f64)]) {
        self.objective.iter_mut().for_each(|c| *c = 0.);
        for &(var, coeff) in terms {
            self.objective[var.0] += coeff;
        }
    }
    /// New variable z equal to `f * x` for a binary `x` and a continuous `f` in [0, upper]:
    /// z <= f, z <= upper * x, z >= f - upper * (1 - x).
    pub fn add_product(&mut self, f: Var, x: Var, upper: f64) -> Var {
        assert_eq!(self.kind(x), VarKind::Binary);
        let z = self.add_continuous(0., upper);
        self.add_constraint(vec![(z, 1.), (f, -1.)], Relation::Le, 0.);
        self.add_constraint(vec![(z, 1.), (x, -upper)], Relation::Le, 0.);
        self.add_constraint(vec![(z, 1.), (f, -1.), (x, -upper)], Relation::Ge, -upper);
        z
    }
    pub fn binaries(&self) -> impl Iterator<Item = Var> + '_ {
        self.kinds
            .iter()
            .enumerate()
            .filter(|(_, &k)| k == VarKind::Binary)
            .map(|(i, _)| Var(i))
    }
    /// Forbids the assignment of binaries made by `solution`.
    pub fn exclude(&mut self, solution: &Assignment) {
        let mut ones = 0;
        let terms: Vec<_> = self
            .binaries()
            .map(|var| {
                if solution.is_selected(var) {
                    ones += 1;
                    (var, -1.)
                } else {
                    (var, 1.)
                }
            })
            .collect();
        self.add_constraint(terms, Relation::Ge, 1. - ones as f64);
    }
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.iter().zip(values).map(|(c, v)| c * v).sum()
    }
    /// Whether `values` satisfies every bound and constraint up to `tolerance`.
    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        values.len() == self.var_count()
            && self
                .bounds
                .iter()
                .zip(values)
                .all(|(&(low, high), &v)| low - tolerance <= v && v <= high + tolerance)
            && self
                .constraints
                .iter()
                .all(|c| c.is_satisfied(values, tolerance))
    }
}

/// Values of every variable of a model at one solution.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub objective: f64,
    /// False for an incumbent returned when the deadline expired.
    pub optimal: bool,
    values: Vec<f64>,
}

impl Assignment {
    /// Proven optimal assignment.
    pub fn new(objective: f64, values: Vec<f64>) -> Self {
        Self {
            objective,
            optimal: true,
            values,
        }
    }
    pub fn incumbent(objective: f64, values: Vec<f64>) -> Self {
        Self {
            objective,
            optimal: false,
            values,
        }
    }
    pub fn value(&self, var: Var) -> f64 {
        self.values[var.0]
    }
    pub fn values(&self) -> &[f64] {
        &self.values
    }
    pub fn is_selected(&self, var: Var) -> bool {
        self.values[var.0] > 0.5
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolOptions {
    pub time_limit: Option<Duration>,
    pub max_solutions: usize,
    /// Objectives within this distance of the optimum are ties.
    pub tolerance: f64,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            time_limit: None,
            max_solutions: 20_000,
            tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolvedPool {
    pub solutions: Vec<Assignment>,
    /// Objective of the first solve. Only an incumbent value when that solve hit the deadline.
    pub best_bound: f64,
    /// The time limit expired, during the first solve or during enumeration.
    pub time_limited: bool,
}

impl SolvedPool {
    /// Worst objective among the collected solutions.
    pub fn achieved(&self) -> f64 {
        self.solutions
            .iter()
            .map(|s| s.objective)
            .fold(std::f64::INFINITY, f64::min)
    }
}

pub trait IlpSolver {
    /// An optimal assignment, `Error::Infeasible` when none exists. A solver able to stop at
    /// `deadline` returns its best incumbent through `Assignment::incumbent` when it does.
    fn solve(&self, model: &LinearModel, deadline: Option<Instant>) -> Result<Assignment>;
    /// Every assignment of the binary variables reaching the optimal objective,
    /// within the limits of `options`.
    fn solve_pool(&self, model: &LinearModel, options: &PoolOptions) -> Result<SolvedPool> {
        let start = Instant::now();
        let deadline = options.time_limit.map(|limit| start + limit);
        let expired = || deadline.map_or(false, |deadline| deadline <= Instant::now());
        let first = self.solve(model, deadline)?;
        let best_bound = first.objective;
        let mut time_limited = !first.optimal || expired();
        if first.optimal {
            info!("Optimal objective {:.6} in {:?}", best_bound, start.elapsed());
        } else {
            warn!("Time limit expired with incumbent {:.6}", best_bound);
        }
        let mut solutions = vec![first];
        let mut model = model.clone();
        let has_binaries = model.binaries().next().is_some();
        while has_binaries && !time_limited && solutions.len() < options.max_solutions {
            if let Some(last) = solutions.last() {
                model.exclude(last);
            }
            match self.solve(&model, deadline) {
                Ok(next) if best_bound - next.objective <= options.tolerance * (1. + best_bound.abs()) => {
                    trace!("Tied solution {} ({:.6})", solutions.len(), next.objective);
                    time_limited = !next.optimal || expired();
                    solutions.push(next);
                }
                Ok(next) => {
                    debug!("Next best objective {:.6} is not optimal", next.objective);
                    time_limited = !next.optimal;
                    break;
                }
                Err(Error::Infeasible) => break,
                Err(why) => return Err(why),
            }
        }
        debug!("{} tied solutions in {:?}", solutions.len(), start.elapsed());
        Ok(SolvedPool {
            solutions,
            best_bound,
            time_limited,
        })
    }
}

/// Branch and bound solver from the `microlp` crate.
///
/// microlp cannot be interrupted, so a solve always runs to optimality. An expired deadline is
/// only noticed between solves, and is reported through `SolvedPool::time_limited`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicroLp;

impl IlpSolver for MicroLp {
    fn solve(&self, model: &LinearModel, deadline: Option<Instant>) -> Result<Assignment> {
        use microlp::{ComparisonOp, OptimizationDirection, Problem};
        if deadline.map_or(false, |deadline| deadline <= Instant::now()) {
            debug!("Deadline already passed; solving to optimality anyway");
        }
        let mut problem = Problem::new(OptimizationDirection::Maximize);
        let vars: Vec<_> = (0..model.var_count())
            .map(|i| match model.kinds[i] {
                VarKind::Binary => problem.add_binary_var(model.objective[i]),
                VarKind::Continuous => problem.add_var(model.objective[i], model.bounds[i]),
            })
            .collect();
        for constraint in model.constraints.iter() {
            if constraint.terms.is_empty() {
                if constraint.is_satisfied(&[], 0.) {
                    continue;
                }
                return Err(Error::Infeasible);
            }
            let op = match constraint.relation {
                Relation::Le => ComparisonOp::Le,
                Relation::Ge => ComparisonOp::Ge,
                Relation::Eq => ComparisonOp::Eq,
            };
            let expr: Vec<_> = constraint
                .terms
                .iter()
                .map(|&(var, coeff)| (vars[var.0], coeff))
                .collect();
            problem.add_constraint(expr.as_slice(), op, constraint.rhs);
        }
        let solution = problem.solve().map_err(|why| match why {
            microlp::Error::Infeasible => Error::Infeasible,
            other => Error::Solver(other.to_string()),
        })?;
        let values: Vec<f64> = (0..model.var_count())
            .map(|i| match model.kinds[i] {
                VarKind::Binary => solution.var_value_rounded(vars[i]),
                VarKind::Continuous => *solution.var_value(vars[i]),
            })
            .collect();
        Ok(Assignment::new(model.objective_value(&values), values))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn knapsack() {
        // max 5a + 4b + 3c s.t. 2a + 3b + c <= 5, 4a + b + 2c <= 11, 3a + 4b + 2c <= 8
        let mut model = LinearModel::new();
        let vars: Vec<_> = (0..3).map(|_| model.add_binary()).collect();
        model.add_constraint(vec![(vars[0], 2.), (vars[1], 3.), (vars[2], 1.)], Relation::Le, 5.);
        model.add_constraint(vec![(vars[0], 4.), (vars[1], 1.), (vars[2], 2.)], Relation::Le, 11.);
        model.add_constraint(vec![(vars[0], 3.), (vars[1], 4.), (vars[2], 2.)], Relation::Le, 8.);
        model.set_objective(&[(vars[0], 5.), (vars[1], 4.), (vars[2], 3.)]);
        let solution = MicroLp.solve(&model, None).unwrap();
        assert!((solution.objective - 9.).abs() < 1e-6);
        assert!(solution.is_selected(vars[0]));
        assert!(solution.is_selected(vars[1]));
        assert!(!solution.is_selected(vars[2]));
        assert!(model.is_feasible(solution.values(), 1e-6));
    }
    #[test]
    fn repeated_terms_are_merged() {
        let mut model = LinearModel::new();
        let x = model.add_continuous(0., 10.);
        model.add_constraint(vec![(x, 1.), (x, 1.)], Relation::Le, 4.);
        model.set_objective(&[(x, 1.)]);
        assert_eq!(model.constraints()[0].terms, vec![(x, 2.)]);
        let solution = MicroLp.solve(&model, None).unwrap();
        assert!((solution.value(x) - 2.).abs() < 1e-6);
    }
    #[test]
    fn infeasible_is_typed() {
        let mut model = LinearModel::new();
        let x = model.add_binary();
        let y = model.add_binary();
        model.add_constraint(vec![(x, 1.), (y, 1.)], Relation::Ge, 3.);
        match MicroLp.solve(&model, None) {
            Err(Error::Infeasible) => {}
            other => panic!("{:?}", other),
        }
        match MicroLp.solve_pool(&model, &PoolOptions::default()) {
            Err(Error::Infeasible) => {}
            other => panic!("{:?}", other),
        }
    }
    #[test]
    fn product_linearization() {
        for &(fix_x, fix_f) in &[(0., 0.3), (1., 0.3), (1., 0.5), (0., 0.)] {
            let mut model = LinearModel::new();
            let f = model.add_continuous(0., 0.5);
            let x = model.add_binary();
            let z = model.add_product(f, x, 0.5);
            model.add_constraint(vec![(x, 1.)], Relation::Eq, fix_x);
            model.add_constraint(vec![(f, 1.)], Relation::Eq, fix_f);
            // Push z up and down; either way it must equal f * x.
            for &direction in &[1., -1.] {
                model.set_objective(&[(z, direction)]);
                let solution = MicroLp.solve(&model, None).unwrap();
                assert!((solution.value(z) - fix_x * fix_f).abs() < 1e-6);
            }
        }
    }
    #[test]
    fn pool_enumerates_ties() {
        // Pick exactly two of four items; items 0..3 are worth 1, item 3 is worth 0.5.
        let mut model = LinearModel::new();
        let vars: Vec<_> = (0..4).map(|_| model.add_binary()).collect();
        model.add_constraint(vars.iter().map(|&v| (v, 1.)).collect(), Relation::Eq, 2.);
        model.set_objective(&[(vars[0], 1.), (vars[1], 1.), (vars[2], 1.), (vars[3], 0.5)]);
        let pool = MicroLp.solve_pool(&model, &PoolOptions::default()).unwrap();
        assert_eq!(pool.solutions.len(), 3);
        assert!(!pool.time_limited);
        assert!((pool.best_bound - 2.).abs() < 1e-6);
        assert!((pool.achieved() - 2.).abs() < 1e-6);
        let mut picked: Vec<Vec<bool>> = pool
            .solutions
            .iter()
            .map(|s| vars.iter().map(|&v| s.is_selected(v)).collect())
            .collect();
        picked.sort();
        picked.dedup();
        assert_eq!(picked.len(), 3);
        assert!(picked.iter().all(|p| !p[3]));
        let capped = PoolOptions {
            max_solutions: 2,
            ..PoolOptions::default()
        };
        assert_eq!(MicroLp.solve_pool(&model, &capped).unwrap().solutions.len(), 2);
    }
    /// Stops at any deadline with the optimum of microlp as its incumbent.
    struct Interrupted;
    impl IlpSolver for Interrupted {
        fn solve(&self, model: &LinearModel, deadline: Option<Instant>) -> Result<Assignment> {
            let solution = MicroLp.solve(model, None)?;
            match deadline {
                Some(_) => Ok(Assignment::incumbent(solution.objective, solution.values)),
                None => Ok(solution),
            }
        }
    }
    fn ties() -> LinearModel {
        let mut model = LinearModel::new();
        let vars: Vec<_> = (0..3).map(|_| model.add_binary()).collect();
        model.add_constraint(vars.iter().map(|&v| (v, 1.)).collect(), Relation::Eq, 1.);
        model.set_objective(&[(vars[0], 1.), (vars[1], 1.), (vars[2], 1.)]);
        model
    }
    #[test]
    fn incumbent_stops_enumeration() {
        let model = ties();
        let limited = PoolOptions {
            time_limit: Some(Duration::from_secs(3600)),
            ..PoolOptions::default()
        };
        let pool = Interrupted.solve_pool(&model, &limited).unwrap();
        assert!(pool.time_limited);
        assert_eq!(pool.solutions.len(), 1);
        assert!(!pool.solutions[0].optimal);
        assert!((pool.best_bound - 1.).abs() < 1e-6);
        let pool = Interrupted.solve_pool(&model, &PoolOptions::default()).unwrap();
        assert!(!pool.time_limited);
        assert_eq!(pool.solutions.len(), 3);
    }
    #[test]
    fn expired_deadline_is_reported() {
        let model = ties();
        let expired = PoolOptions {
            time_limit: Some(Duration::from_secs(0)),
            ..PoolOptions::default()
        };
        let pool = MicroLp.solve_pool(&model, &expired).unwrap();
        assert!(pool.time_limited);
        assert_eq!(pool.solutions.len(), 1);
        assert!(pool.solutions[0].optimal);
        assert!(model.is_feasible(pool.solutions[0].values(), 1e-6));
    }
}
