use thiserror::Error;

use crate::solution::ConstraintViolation;

/// Represents a linear programming problem
///
/// All variables are implicitly non-negative.
#[derive(Debug, Clone)]
pub struct LpProblem {
    /// Variable names
    pub variables: Vec<String>,
    /// Objective function coefficients (costs)
    pub objective: Objective,
    /// Constraints
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone)]
pub struct Objective {
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Whether to minimize or maximize
    pub minimize: bool,
}

#[derive(Debug, Clone)]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

/// Structural problems that make an [`LpProblem`] unsolvable as stated
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    #[error("Objective has {found} coefficients but the problem has {expected} variables")]
    ObjectiveLength { expected: usize, found: usize },
    #[error("Constraint {name} has {found} coefficients but the problem has {expected} variables")]
    ConstraintLength {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Non-finite value in {0}")]
    NonFinite(String),
}

impl LpProblem {
    pub fn new(variables: Vec<String>) -> Self {
        let n = variables.len();
        Self {
            variables,
            objective: Objective {
                coefficients: vec![0.0; n],
                minimize: true,
            },
            constraints: Vec::new(),
        }
    }

    pub fn set_objective(&mut self, coefficients: Vec<f64>, minimize: bool) {
        self.objective = Objective { coefficients, minimize };
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, coefficients: Vec<f64>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            coefficients,
            op,
            rhs,
        });
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Check that every coefficient vector matches the variable count and
    /// that no coefficient or right-hand side is NaN or infinite.
    pub fn validate(&self) -> Result<(), ProblemError> {
        let n = self.num_variables();
        if self.objective.coefficients.len() != n {
            return Err(ProblemError::ObjectiveLength {
                expected: n,
                found: self.objective.coefficients.len(),
            });
        }
        if self.objective.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ProblemError::NonFinite("objective".to_string()));
        }

        for c in &self.constraints {
            if c.coefficients.len() != n {
                return Err(ProblemError::ConstraintLength {
                    name: c.name.clone(),
                    expected: n,
                    found: c.coefficients.len(),
                });
            }
            if !c.rhs.is_finite() || c.coefficients.iter().any(|v| !v.is_finite()) {
                return Err(ProblemError::NonFinite(c.name.clone()));
            }
        }
        Ok(())
    }

    /// Evaluate every constraint at `values` and report the ones violated by
    /// more than `tolerance`, scaled by the magnitude of the right-hand side.
    /// Worst violation first.
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();

        for c in &self.constraints {
            let lhs: f64 = c
                .coefficients
                .iter()
                .zip(values)
                .map(|(coef, x)| coef * x)
                .sum();
            let slack = tolerance * c.rhs.abs().max(1.0);

            let violation = match c.op {
                ConstraintOp::Le if lhs > c.rhs + slack => {
                    let amt = lhs - c.rhs;
                    Some((amt, format!("{} exceeds maximum of {:.4} by {:.6}", c.name, c.rhs, amt)))
                }
                ConstraintOp::Ge if lhs < c.rhs - slack => {
                    let amt = c.rhs - lhs;
                    Some((amt, format!("{} is below minimum of {:.4} by {:.6}", c.name, c.rhs, amt)))
                }
                ConstraintOp::Eq if (lhs - c.rhs).abs() > slack => Some((
                    (lhs - c.rhs).abs(),
                    format!("{} requires exactly {:.4} but got {:.4}", c.name, c.rhs, lhs),
                )),
                _ => None,
            };

            if let Some((violation_amount, description)) = violation {
                violations.push(ConstraintViolation {
                    constraint: c.name.clone(),
                    required: c.rhs,
                    actual: lhs,
                    violation_amount,
                    description,
                });
            }
        }

        violations.sort_by(|a, b| b.violation_amount.total_cmp(&a.violation_amount));
        violations
    }
}
