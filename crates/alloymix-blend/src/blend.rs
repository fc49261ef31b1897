use std::collections::BTreeMap;
use std::time::Duration;

use alloymix_solver::{ConstraintOp, LpProblem, SolutionStatus, Solver};

use crate::element::Element;
use crate::material::{Material, ProductSpec, SpecTable};

/// Quantities at or below this are solver noise and left out of the mix
pub const DEFAULT_NOISE_THRESHOLD: f64 = 1e-6;

/// Relative tolerance used when re-checking an optimal point
const VERIFY_TOLERANCE: f64 = 1e-6;

/// One material's share of a blend
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct MixLine {
    pub material: String,
    pub quantity: f64,
    /// `quantity * unit cost`
    pub cost: f64,
}

/// The cheapest mix found for one request
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Blend {
    /// Materials used, in catalog order
    pub lines: Vec<MixLine>,
    pub total_amount: f64,
    pub total_cost: f64,
    pub resulting_composition: BTreeMap<Element, f64>,
    pub cost_per_unit: f64,
}

impl Blend {
    pub fn quantity_of(&self, material: &str) -> Option<f64> {
        self.lines
            .iter()
            .find(|line| line.material == material)
            .map(|line| line.quantity)
    }

    /// Sum of the reported quantities
    pub fn used_total(&self) -> f64 {
        self.lines.iter().map(|line| line.quantity).sum()
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendStatus {
    Optimal,
    Infeasible,
    Unbounded,
    Undefined,
    NotSolved,
    ProductNotFound,
    TimedOut,
    Error,
}

impl BlendStatus {
    /// Fixed explanation for each status
    pub fn description(self) -> &'static str {
        match self {
            BlendStatus::Optimal => "An optimal blend was found.",
            BlendStatus::Infeasible => "No blend satisfies the composition bounds, the requested amount and the available material.",
            BlendStatus::Unbounded => "The cost can be driven arbitrarily low; the problem is not well posed.",
            BlendStatus::Undefined => "The solver could not produce a usable answer (numerical trouble or an ill-defined problem).",
            BlendStatus::NotSolved => "The solver stopped before reaching a conclusion.",
            BlendStatus::ProductNotFound => "The product is not in the composition requirements.",
            BlendStatus::TimedOut => "The solver exceeded its time budget.",
            BlendStatus::Error => "The blend could not be computed.",
        }
    }
}

impl std::fmt::Display for BlendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BlendStatus::Optimal => "Optimal",
            BlendStatus::Infeasible => "Infeasible",
            BlendStatus::Unbounded => "Unbounded",
            BlendStatus::Undefined => "Undefined",
            BlendStatus::NotSolved => "NotSolved",
            BlendStatus::ProductNotFound => "ProductNotFound",
            BlendStatus::TimedOut => "TimedOut",
            BlendStatus::Error => "Error",
        };
        f.write_str(name)
    }
}

/// What a single solve produced. Only `Optimal` carries a mix.
#[derive(Debug, Clone, PartialEq)]
pub enum BlendOutcome {
    Optimal(Blend),
    Infeasible,
    Unbounded,
    Undefined,
    NotSolved,
    ProductNotFound,
    TimedOut,
    Error { message: String },
}

impl BlendOutcome {
    pub fn status(&self) -> BlendStatus {
        match self {
            BlendOutcome::Optimal(_) => BlendStatus::Optimal,
            BlendOutcome::Infeasible => BlendStatus::Infeasible,
            BlendOutcome::Unbounded => BlendStatus::Unbounded,
            BlendOutcome::Undefined => BlendStatus::Undefined,
            BlendOutcome::NotSolved => BlendStatus::NotSolved,
            BlendOutcome::ProductNotFound => BlendStatus::ProductNotFound,
            BlendOutcome::TimedOut => BlendStatus::TimedOut,
            BlendOutcome::Error { .. } => BlendStatus::Error,
        }
    }
}

/// Result of one `(product, amount)` request
#[derive(Debug, Clone, PartialEq)]
pub struct BlendSolution {
    pub product: String,
    pub amount: f64,
    pub outcome: BlendOutcome,
}

impl BlendSolution {
    pub fn status(&self) -> BlendStatus {
        self.outcome.status()
    }

    pub fn is_optimal(&self) -> bool {
        matches!(self.outcome, BlendOutcome::Optimal(_))
    }

    pub fn blend(&self) -> Option<&Blend> {
        match &self.outcome {
            BlendOutcome::Optimal(blend) => Some(blend),
            _ => None,
        }
    }

    /// Human-readable reason for a failed request; `None` when optimal
    pub fn message(&self) -> Option<String> {
        match &self.outcome {
            BlendOutcome::Optimal(_) => None,
            BlendOutcome::ProductNotFound => {
                Some(format!("Product {} not found in composition requirements.", self.product))
            }
            BlendOutcome::Error { message } => Some(message.clone()),
            other => Some(other.status().description().to_string()),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for BlendSolution {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("BlendSolution", 5)?;
        state.serialize_field("product", &self.product)?;
        state.serialize_field("amount", &self.amount)?;
        state.serialize_field("status", &self.status())?;
        state.serialize_field("message", &self.message())?;
        state.serialize_field("blend", &self.blend())?;
        state.end()
    }
}

/// Finds the least-cost blend for one product request
#[derive(Debug, Clone)]
pub struct BlendSolver {
    solver: Solver,
    noise_threshold: f64,
}

impl Default for BlendSolver {
    fn default() -> Self {
        Self {
            solver: Solver::new(),
            noise_threshold: DEFAULT_NOISE_THRESHOLD,
        }
    }
}

impl BlendSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }

    /// Wall-clock limit for each solve; an overrun yields `TimedOut`
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.solver = self.solver.with_time_budget(budget);
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.solver = self.solver.with_max_iterations(max);
        self
    }

    pub fn with_noise_threshold(mut self, threshold: f64) -> Self {
        self.noise_threshold = threshold;
        self
    }

    /// Solve against each material's own `available_amount`
    pub fn solve(&self, materials: &[Material], specs: &SpecTable, product: &str, amount: f64) -> BlendSolution {
        let availability: Vec<f64> = materials.iter().map(|m| m.available_amount).collect();
        self.solve_with_availability(materials, &availability, specs, product, amount)
    }

    /// Solve with `availability[i]` as the cap on `materials[i]`
    pub fn solve_with_availability(
        &self,
        materials: &[Material],
        availability: &[f64],
        specs: &SpecTable,
        product: &str,
        amount: f64,
    ) -> BlendSolution {
        let outcome = match specs.get(product) {
            None => BlendOutcome::ProductNotFound,
            Some(spec) => self.optimize(materials, availability, spec, amount),
        };

        tracing::debug!(product, amount, status = %outcome.status(), "blend solved");

        BlendSolution {
            product: product.to_string(),
            amount,
            outcome,
        }
    }

    fn optimize(&self, materials: &[Material], availability: &[f64], spec: &ProductSpec, amount: f64) -> BlendOutcome {
        if !amount.is_finite() || amount <= 0.0 {
            return BlendOutcome::Error {
                message: format!("Requested amount must be a positive number, got {}", amount),
            };
        }
        if availability.len() != materials.len() {
            return BlendOutcome::Error {
                message: format!(
                    "Availability has {} entries but the catalog has {} materials",
                    availability.len(),
                    materials.len()
                ),
            };
        }

        let problem = formulate(materials, availability, spec, amount);
        let solution = self.solver.solve(&problem);

        match solution.status {
            SolutionStatus::Optimal => {
                let violations = problem.violations(&solution.values, VERIFY_TOLERANCE);
                if let Some(worst) = violations.first() {
                    tracing::warn!(
                        product = %spec.name,
                        violation = %worst.description,
                        "optimal point failed verification"
                    );
                    return BlendOutcome::Undefined;
                }
                BlendOutcome::Optimal(self.build_blend(materials, &solution.values, amount))
            }
            SolutionStatus::Infeasible => BlendOutcome::Infeasible,
            SolutionStatus::Unbounded => BlendOutcome::Unbounded,
            SolutionStatus::IterationLimit => BlendOutcome::NotSolved,
            SolutionStatus::NumericalFailure => BlendOutcome::Undefined,
            SolutionStatus::TimedOut => BlendOutcome::TimedOut,
            SolutionStatus::Error => BlendOutcome::Error {
                message: solution
                    .error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| BlendStatus::Error.description().to_string()),
            },
        }
    }

    fn build_blend(&self, materials: &[Material], values: &[f64], amount: f64) -> Blend {
        let used: Vec<(&Material, f64)> = materials
            .iter()
            .zip(values.iter().copied())
            .filter(|&(_, qty)| qty > self.noise_threshold)
            .collect();

        let lines: Vec<MixLine> = used
            .iter()
            .map(|&(material, quantity)| MixLine {
                material: material.id.clone(),
                quantity,
                cost: quantity * material.cost,
            })
            .collect();

        let total_cost: f64 = lines.iter().map(|line| line.cost).sum();

        let resulting_composition = Element::ALL
            .into_iter()
            .map(|element| {
                let mass: f64 = used
                    .iter()
                    .map(|&(material, qty)| qty * material.composition[element])
                    .sum();
                (element, mass / amount)
            })
            .collect();

        Blend {
            lines,
            total_amount: amount,
            total_cost,
            resulting_composition,
            cost_per_unit: total_cost / amount,
        }
    }
}

/// Build the LP: one variable per material, minimize cost, exact total mass,
/// per-element bounds scaled by `amount`, and per-material availability caps.
pub fn formulate(materials: &[Material], availability: &[f64], spec: &ProductSpec, amount: f64) -> LpProblem {
    let names: Vec<String> = materials.iter().map(|m| m.id.clone()).collect();
    let n = names.len();
    let mut lp = LpProblem::new(names);

    lp.set_objective(materials.iter().map(|m| m.cost).collect(), true);

    lp.add_constraint("total_amount", vec![1.0; n], ConstraintOp::Eq, amount);

    for element in Element::ALL {
        let coeffs: Vec<f64> = materials.iter().map(|m| m.composition[element]).collect();
        let bound = spec.bounds[element];
        lp.add_constraint(format!("{}_min", element), coeffs.clone(), ConstraintOp::Ge, bound.min * amount);
        lp.add_constraint(format!("{}_max", element), coeffs, ConstraintOp::Le, bound.max * amount);
    }

    for (i, (material, &available)) in materials.iter().zip(availability).enumerate() {
        let mut coeffs = vec![0.0; n];
        coeffs[i] = 1.0;
        lp.add_constraint(format!("available_{}", material.id), coeffs, ConstraintOp::Le, available);
    }

    lp
}
