use crate::problem::ProblemError;

/// The result of solving an LP problem
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Optimal values for each variable (empty unless optimal)
    pub values: Vec<f64>,
    /// Optimal objective value
    pub objective_value: f64,
    /// Pivots performed across both phases
    pub iterations: usize,
    /// Why the problem was rejected (populated when status is `Error`)
    pub error: Option<ProblemError>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
    /// The pivot limit was reached before the solver reached a conclusion
    IterationLimit,
    /// The wall-clock budget ran out
    TimedOut,
    /// A non-finite value appeared in the tableau
    NumericalFailure,
    /// The problem is malformed
    Error,
}

/// Information about a violated constraint
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct ConstraintViolation {
    /// Constraint name
    pub constraint: String,
    /// Required value (from constraint RHS)
    pub required: f64,
    /// Actual value achieved
    pub actual: f64,
    /// How much the constraint is violated by
    pub violation_amount: f64,
    /// Human-readable description of what's wrong
    pub description: String,
}

impl Solution {
    pub fn optimal(values: Vec<f64>, objective_value: f64, iterations: usize) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            values,
            objective_value,
            iterations,
            error: None,
        }
    }

    /// A solution with no usable point
    pub fn without_values(status: SolutionStatus, iterations: usize) -> Self {
        let objective_value = match status {
            SolutionStatus::Unbounded => f64::NEG_INFINITY,
            SolutionStatus::Infeasible => f64::INFINITY,
            _ => f64::NAN,
        };
        Self {
            status,
            values: Vec::new(),
            objective_value,
            iterations,
            error: None,
        }
    }

    pub fn rejected(error: ProblemError) -> Self {
        Self {
            error: Some(error),
            ..Self::without_values(SolutionStatus::Error, 0)
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }
}
