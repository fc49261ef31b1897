use std::time::{Duration, Instant};

use crate::problem::{ConstraintOp, LpProblem};
use crate::solution::{Solution, SolutionStatus};

/// Consecutive degenerate pivots tolerated before switching to Bland's rule
const DEGENERATE_RUN_LIMIT: usize = 50;

/// Residual allowed on the phase 1 objective, relative to the largest RHS
const FEASIBILITY_TOLERANCE: f64 = 1e-7;

/// Simplex solver for linear programming problems
#[derive(Debug, Clone)]
pub struct Solver {
    /// Maximum pivots per phase before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
    /// Wall-clock budget for one call to [`Solver::solve`]
    time_budget: Option<Duration>,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
            time_budget: None,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    /// Solve the LP problem using the two-phase simplex method
    pub fn solve(&self, problem: &LpProblem) -> Solution {
        if let Err(e) = problem.validate() {
            return Solution::rejected(e);
        }

        let deadline = self
            .time_budget
            .and_then(|budget| Instant::now().checked_add(budget));
        let mut run = Run {
            deadline,
            iterations: 0,
        };

        let mut tableau = Tableau::build(problem);

        // Phase 1: Find initial basic feasible solution
        if tableau.n_artificial > 0 {
            match self.phase1(&mut tableau, &mut run) {
                PhaseResult::Done => {}
                other => return other.into_solution(run.iterations),
            }
        }

        // Phase 2: Optimize
        let exclude_from = tableau.art_start();
        match self.iterate(&mut tableau, exclude_from, &mut run) {
            PhaseResult::Done => {}
            other => return other.into_solution(run.iterations),
        }

        self.extract_solution(&tableau, problem, run.iterations)
    }

    fn phase1(&self, tableau: &mut Tableau, run: &mut Run) -> PhaseResult {
        let obj_row = tableau.obj_row();
        let n_cols = tableau.n_cols();
        let art_start = tableau.art_start();

        // Save original objective
        let orig_obj = tableau.data[obj_row].clone();

        // Maximize -sum(artificials)
        tableau.data[obj_row].iter_mut().for_each(|v| *v = 0.0);
        for j in art_start..(art_start + tableau.n_artificial) {
            tableau.data[obj_row][j] = -1.0;
        }

        // Price out the basic artificials
        for i in 0..obj_row {
            if tableau.basic_vars[i] >= art_start {
                for j in 0..n_cols {
                    tableau.data[obj_row][j] += tableau.data[i][j];
                }
            }
        }

        match self.iterate(tableau, n_cols - 1, run) {
            PhaseResult::Done => {}
            // The phase 1 objective is bounded by zero, so an unbounded
            // step can only come from numerical trouble.
            PhaseResult::Unbounded => return PhaseResult::NumericalFailure,
            other => return other,
        }

        let rhs_col = n_cols - 1;
        let scale = tableau
            .data
            .iter()
            .take(obj_row)
            .map(|row| row[rhs_col].abs())
            .fold(1.0_f64, f64::max);
        let residual: f64 = (0..obj_row)
            .filter(|&i| tableau.basic_vars[i] >= art_start)
            .map(|i| tableau.data[i][rhs_col])
            .sum();
        if residual > FEASIBILITY_TOLERANCE * scale {
            return PhaseResult::Infeasible;
        }

        self.drive_out_artificials(tableau);

        // Restore original objective and adjust for basic variables
        let obj_row = tableau.obj_row();
        tableau.data[obj_row] = orig_obj;
        for i in 0..obj_row {
            let basic = tableau.basic_vars[i];
            let ratio = tableau.data[obj_row][basic];
            if ratio.abs() > self.tolerance {
                for j in 0..n_cols {
                    tableau.data[obj_row][j] -= ratio * tableau.data[i][j];
                }
            }
        }

        PhaseResult::Done
    }

    /// Pivot zero-level artificials out of the basis. A row with no usable
    /// structural or slack entry is redundant and is removed.
    fn drive_out_artificials(&self, tableau: &mut Tableau) {
        let art_start = tableau.art_start();
        let mut i = 0;
        while i < tableau.obj_row() {
            if tableau.basic_vars[i] < art_start {
                i += 1;
                continue;
            }
            let mut entering: Option<usize> = None;
            for j in (0..art_start).filter(|&j| tableau.data[i][j].abs() > self.tolerance) {
                if entering.is_none_or(|e| tableau.data[i][j].abs() > tableau.data[i][e].abs()) {
                    entering = Some(j);
                }
            }
            match entering {
                Some(col) => {
                    tableau.pivot(i, col);
                    i += 1;
                }
                None => {
                    tableau.data.remove(i);
                    tableau.basic_vars.remove(i);
                }
            }
        }
    }

    /// Run simplex pivots until no column in `0..exclude_from` improves the
    /// objective row.
    fn iterate(&self, tableau: &mut Tableau, exclude_from: usize, run: &mut Run) -> PhaseResult {
        let mut pivots = 0;
        let mut degenerate_run = 0;
        let mut bland = false;

        loop {
            if run.expired() {
                return PhaseResult::TimedOut;
            }

            let Some(pivot_col) = self.find_pivot_column(tableau, exclude_from, bland) else {
                return PhaseResult::Done;
            };
            if pivots >= self.max_iterations {
                return PhaseResult::IterationLimit;
            }
            let Some((pivot_row, ratio)) = self.find_pivot_row(tableau, pivot_col, bland) else {
                return PhaseResult::Unbounded;
            };

            if ratio <= self.tolerance {
                degenerate_run += 1;
                if degenerate_run > DEGENERATE_RUN_LIMIT {
                    bland = true;
                }
            } else {
                degenerate_run = 0;
            }

            tableau.pivot(pivot_row, pivot_col);
            pivots += 1;
            run.iterations += 1;

            if !tableau.is_finite(pivot_row) {
                return PhaseResult::NumericalFailure;
            }
        }
    }

    /// Dantzig's rule (largest reduced cost) or, under Bland's rule, the
    /// lowest improving index
    fn find_pivot_column(&self, tableau: &Tableau, exclude_from: usize, bland: bool) -> Option<usize> {
        let obj = &tableau.data[tableau.obj_row()];

        if bland {
            return (0..exclude_from).find(|&j| obj[j] > self.tolerance);
        }

        let mut best: Option<usize> = None;
        for j in (0..exclude_from).filter(|&j| obj[j] > self.tolerance) {
            if best.is_none_or(|b| obj[j] > obj[b]) {
                best = Some(j);
            }
        }
        best
    }

    /// Minimum ratio test. Ties go to the row whose basic variable has the
    /// lowest index.
    fn find_pivot_row(&self, tableau: &Tableau, col: usize, bland: bool) -> Option<(usize, f64)> {
        let rhs_col = tableau.n_cols() - 1;

        let mut best: Option<(usize, f64)> = None;
        for i in 0..tableau.obj_row() {
            let val = tableau.data[i][col];
            if val <= self.tolerance {
                continue;
            }
            let ratio = tableau.data[i][rhs_col].max(0.0) / val;
            best = match best {
                None => Some((i, ratio)),
                Some((row, min_ratio)) => {
                    let tie = (ratio - min_ratio).abs() <= self.tolerance;
                    if (!tie && ratio < min_ratio)
                        || (tie && bland && tableau.basic_vars[i] < tableau.basic_vars[row])
                    {
                        Some((i, ratio))
                    } else {
                        Some((row, min_ratio))
                    }
                }
            };
        }
        best
    }

    fn extract_solution(&self, tableau: &Tableau, problem: &LpProblem, iterations: usize) -> Solution {
        let n_vars = problem.num_variables();
        let rhs_col = tableau.n_cols() - 1;

        let mut values = vec![0.0; n_vars];
        for i in 0..tableau.obj_row() {
            let basic = tableau.basic_vars[i];
            if basic < n_vars {
                values[basic] = tableau.data[i][rhs_col].max(0.0);
            }
        }

        let objective_value = problem
            .objective
            .coefficients
            .iter()
            .zip(&values)
            .map(|(c, x)| c * x)
            .sum();

        Solution::optimal(values, objective_value, iterations)
    }
}

struct Run {
    deadline: Option<Instant>,
    iterations: usize,
}

impl Run {
    fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Dense simplex tableau. The last row holds the objective in maximization
/// form; the last column holds the right-hand side.
struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    n_vars: usize,
    n_slack: usize,
    n_artificial: usize,
}

impl Tableau {
    fn build(problem: &LpProblem) -> Self {
        let n_vars = problem.num_variables();
        let n_constraints = problem.num_constraints();

        // Normalize every row to a non-negative RHS
        let rows: Vec<(Vec<f64>, ConstraintOp, f64)> = problem
            .constraints
            .iter()
            .map(|c| {
                if c.rhs < 0.0 {
                    let op = match c.op {
                        ConstraintOp::Le => ConstraintOp::Ge,
                        ConstraintOp::Ge => ConstraintOp::Le,
                        ConstraintOp::Eq => ConstraintOp::Eq,
                    };
                    (c.coefficients.iter().map(|v| -v).collect(), op, -c.rhs)
                } else {
                    (c.coefficients.clone(), c.op, c.rhs)
                }
            })
            .collect();

        let n_slack = rows.iter().filter(|(_, op, _)| *op != ConstraintOp::Eq).count();
        let n_artificial = rows.iter().filter(|(_, op, _)| *op != ConstraintOp::Le).count();

        let total_cols = n_vars + n_slack + n_artificial + 1;
        let mut data = vec![vec![0.0; total_cols]; n_constraints + 1];
        let mut basic_vars = vec![0; n_constraints];

        let mut slack_idx = n_vars;
        let mut artificial_idx = n_vars + n_slack;

        for (i, (coefficients, op, rhs)) in rows.into_iter().enumerate() {
            data[i][..n_vars].copy_from_slice(&coefficients);
            data[i][total_cols - 1] = rhs;

            match op {
                ConstraintOp::Le => {
                    data[i][slack_idx] = 1.0;
                    basic_vars[i] = slack_idx;
                    slack_idx += 1;
                }
                ConstraintOp::Ge => {
                    data[i][slack_idx] = -1.0; // surplus
                    slack_idx += 1;
                    data[i][artificial_idx] = 1.0;
                    basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
                ConstraintOp::Eq => {
                    data[i][artificial_idx] = 1.0;
                    basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        // Simplex maximizes, so a minimization objective is negated
        for (j, &coef) in problem.objective.coefficients.iter().enumerate() {
            data[n_constraints][j] = if problem.objective.minimize { -coef } else { coef };
        }

        Self {
            data,
            basic_vars,
            n_vars,
            n_slack,
            n_artificial,
        }
    }

    fn obj_row(&self) -> usize {
        self.data.len() - 1
    }

    fn n_cols(&self) -> usize {
        self.data[0].len()
    }

    fn art_start(&self) -> usize {
        self.n_vars + self.n_slack
    }

    fn pivot(&mut self, row: usize, col: usize) {
        self.basic_vars[row] = col;

        let pivot_val = self.data[row][col];
        for v in self.data[row].iter_mut() {
            *v /= pivot_val;
        }
        self.data[row][col] = 1.0;

        let pivot_row = self.data[row].clone();
        for (i, other) in self.data.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = other[col];
            if factor == 0.0 {
                continue;
            }
            for (v, p) in other.iter_mut().zip(&pivot_row) {
                *v -= factor * p;
            }
            other[col] = 0.0;
        }
    }

    fn is_finite(&self, row: usize) -> bool {
        let rhs_col = self.n_cols() - 1;
        self.data[row].iter().all(|v| v.is_finite()) && self.data[self.obj_row()][rhs_col].is_finite()
    }
}

enum PhaseResult {
    Done,
    Infeasible,
    Unbounded,
    IterationLimit,
    TimedOut,
    NumericalFailure,
}

impl PhaseResult {
    fn into_solution(self, iterations: usize) -> Solution {
        let status = match self {
            PhaseResult::Done => SolutionStatus::Optimal,
            PhaseResult::Infeasible => SolutionStatus::Infeasible,
            PhaseResult::Unbounded => SolutionStatus::Unbounded,
            PhaseResult::IterationLimit => SolutionStatus::IterationLimit,
            PhaseResult::TimedOut => SolutionStatus::TimedOut,
            PhaseResult::NumericalFailure => SolutionStatus::NumericalFailure,
        };
        Solution::without_values(status, iterations)
    }
}
