//! Sequential batch runs over a shared, depleting inventory.
//!
//! Jobs run strictly in the order given. Each successful job draws down the
//! inventory seen by every later job, so reordering a batch can change which
//! jobs succeed and what they cost. Nothing is ever handed back to the
//! inventory during a run.

use crate::aggregate::BatchResult;
use crate::blend::{Blend, BlendOutcome, BlendSolution, BlendSolver};
use crate::material::{Material, SpecTable};

/// One `(product, amount)` request
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub product: String,
    pub amount: f64,
}

/// Ordered list of requests
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchJob {
    requests: Vec<JobRequest>,
}

impl BatchJob {
    pub fn new() -> Self {
        Self::default()
    }

    /// One request per spec, at the spec's default amount, in table order
    pub fn from_defaults(specs: &SpecTable) -> Self {
        specs
            .iter()
            .map(|spec| (spec.name.clone(), spec.default_amount))
            .collect()
    }

    pub fn push(&mut self, product: impl Into<String>, amount: f64) {
        self.requests.push(JobRequest {
            product: product.into(),
            amount,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobRequest> {
        self.requests.iter()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for BatchJob {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut job = BatchJob::new();
        for (product, amount) in iter {
            job.push(product, amount);
        }
        job
    }
}

/// Remaining mass of each material, aligned with the catalog order
#[derive(Debug, Clone, PartialEq)]
pub struct Inventory {
    ids: Vec<String>,
    remaining: Vec<f64>,
}

impl Inventory {
    pub fn from_materials(materials: &[Material]) -> Self {
        Self {
            ids: materials.iter().map(|m| m.id.clone()).collect(),
            remaining: materials.iter().map(|m| m.available_amount).collect(),
        }
    }

    pub fn remaining(&self, material: &str) -> Option<f64> {
        self.position(material).map(|i| self.remaining[i])
    }

    /// Owned copy of the current levels for one solve
    pub fn snapshot(&self) -> Vec<f64> {
        self.remaining.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.ids.iter().map(String::as_str).zip(self.remaining.iter().copied())
    }

    /// Draw down every material the blend uses. Levels never go below zero.
    pub fn consume(&mut self, blend: &Blend) {
        for line in &blend.lines {
            if let Some(i) = self.position(&line.material) {
                self.remaining[i] = (self.remaining[i] - line.quantity).max(0.0);
            }
        }
    }

    /// Whether this inventory lists exactly the catalog's materials, in order
    pub fn matches(&self, materials: &[Material]) -> bool {
        self.ids.len() == materials.len() && self.ids.iter().zip(materials).all(|(id, m)| *id == m.id)
    }

    fn position(&self, material: &str) -> Option<usize> {
        self.ids.iter().position(|id| id == material)
    }
}

/// A finished batch plus the inventory it left behind
#[derive(Debug, Clone)]
pub struct BatchRun {
    pub result: BatchResult,
    pub inventory: Inventory,
}

/// Runs a [`BatchJob`] one request at a time against a shared inventory
#[derive(Debug, Clone, Default)]
pub struct BatchSequencer {
    solver: BlendSolver,
}

impl BatchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_solver(mut self, solver: BlendSolver) -> Self {
        self.solver = solver;
        self
    }

    /// Run the batch starting from each material's `available_amount`
    pub fn run(&self, materials: &[Material], specs: &SpecTable, jobs: &BatchJob) -> BatchResult {
        self.run_with_inventory(materials, specs, jobs, Inventory::from_materials(materials))
            .result
    }

    /// Run the batch against `inventory` and return what is left of it
    pub fn run_with_inventory(
        &self,
        materials: &[Material],
        specs: &SpecTable,
        jobs: &BatchJob,
        mut inventory: Inventory,
    ) -> BatchRun {
        let mut outcomes = Vec::with_capacity(jobs.len());

        if !inventory.matches(materials) {
            tracing::warn!("inventory does not match the material catalog; no job was solved");
            outcomes.extend(jobs.iter().map(|job| BlendSolution {
                product: job.product.clone(),
                amount: job.amount,
                outcome: BlendOutcome::Error {
                    message: "Inventory does not match the material catalog.".to_string(),
                },
            }));
            return BatchRun {
                result: BatchResult::from_outcomes(outcomes),
                inventory,
            };
        }

        for (position, job) in jobs.iter().enumerate() {
            let availability = inventory.snapshot();
            let solution =
                self.solver
                    .solve_with_availability(materials, &availability, specs, &job.product, job.amount);

            match solution.blend() {
                Some(blend) => {
                    inventory.consume(blend);
                    tracing::info!(
                        position,
                        product = %job.product,
                        amount = job.amount,
                        cost = blend.total_cost,
                        "batch job optimal"
                    );
                }
                None => {
                    tracing::warn!(
                        position,
                        product = %job.product,
                        amount = job.amount,
                        status = %solution.status(),
                        "batch job failed"
                    );
                }
            }

            outcomes.push(solution);
        }

        let result = BatchResult::from_outcomes(outcomes);
        tracing::info!(
            jobs = jobs.len(),
            optimal = result.optimal_count(),
            total_cost = result.total_batch_cost,
            "batch finished"
        );

        BatchRun { result, inventory }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::blend::BlendStatus;
    use crate::element::Element;
    use crate::material::ProductSpec;

    const TOL: f64 = 1e-6;

    /// A is rich in silicon, B is cheap and lean. Neither order of X and Y
    /// can satisfy both products.
    fn shared_stock() -> (Vec<Material>, SpecTable) {
        let materials = vec![
            Material::new("A", 1.0, 100.0).with_fraction(Element::Si, 0.5),
            Material::new("B", 0.5, 50.0).with_fraction(Element::Si, 0.1),
        ];
        let specs = [
            ProductSpec::new("X", 100.0).with_bound(Element::Si, 0.4, 0.6),
            ProductSpec::new("Y", 100.0).with_bound(Element::Si, 0.2, 0.6),
        ]
        .into_iter()
        .collect();
        (materials, specs)
    }

    #[test]
    fn test_job_order_changes_outcomes() {
        let (materials, specs) = shared_stock();
        let sequencer = BatchSequencer::new();

        let xy: BatchJob = [("X", 100.0), ("Y", 100.0)].into_iter().collect();
        let result = sequencer.run(&materials, &specs, &xy);
        assert_eq!(result.get("X").unwrap().status(), BlendStatus::Optimal);
        assert_eq!(result.get("Y").unwrap().status(), BlendStatus::Infeasible);

        let yx: BatchJob = [("Y", 100.0), ("X", 100.0)].into_iter().collect();
        let result = sequencer.run(&materials, &specs, &yx);
        assert_eq!(result.get("Y").unwrap().status(), BlendStatus::Optimal);
        assert_eq!(result.get("X").unwrap().status(), BlendStatus::Infeasible);
    }

    #[test]
    fn test_inventory_is_drawn_down_between_jobs() {
        let (materials, specs) = shared_stock();
        let jobs: BatchJob = [("X", 40.0), ("X", 40.0)].into_iter().collect();

        let run = BatchSequencer::new().run_with_inventory(&materials, &specs, &jobs, Inventory::from_materials(&materials));

        // Each X job uses 30 of A and 10 of B
        let outcomes = &run.result.outcomes;
        assert_eq!(outcomes.len(), 2);
        for outcome in outcomes {
            let blend = outcome.blend().unwrap();
            assert!((blend.quantity_of("A").unwrap() - 30.0).abs() < TOL);
            assert!((blend.quantity_of("B").unwrap() - 10.0).abs() < TOL);
        }
        assert!((run.inventory.remaining("A").unwrap() - 40.0).abs() < TOL);
        assert!((run.inventory.remaining("B").unwrap() - 30.0).abs() < TOL);

        // The catalog itself is left alone
        assert_eq!(materials[0].available_amount, 100.0);
    }

    #[test]
    fn test_later_job_sees_reduced_availability() {
        let (materials, specs) = shared_stock();
        let jobs: BatchJob = [("X", 40.0), ("X", 40.0), ("X", 40.0)].into_iter().collect();

        let run = BatchSequencer::new().run_with_inventory(&materials, &specs, &jobs, Inventory::from_materials(&materials));

        // 80 of the 150 units are gone; the third job still fits, but every
        // draw from A stays within what was left of it.
        let used_a: f64 = run
            .result
            .outcomes
            .iter()
            .filter_map(|o| o.blend())
            .map(|b| b.quantity_of("A").unwrap_or(0.0))
            .sum();
        assert!(used_a <= 100.0 + TOL);
        assert!(run.inventory.iter().all(|(_, left)| left >= 0.0));
    }

    #[test]
    fn test_failed_jobs_do_not_abort_or_deduct() {
        let (materials, specs) = shared_stock();
        let jobs: BatchJob = [("Missing", 10.0), ("X", 500.0), ("Y", 50.0)].into_iter().collect();

        let run = BatchSequencer::new().run_with_inventory(&materials, &specs, &jobs, Inventory::from_materials(&materials));

        let statuses: Vec<BlendStatus> = run.result.outcomes.iter().map(|o| o.status()).collect();
        assert_eq!(
            statuses,
            [BlendStatus::ProductNotFound, BlendStatus::Infeasible, BlendStatus::Optimal]
        );

        // Only Y drew from the stock
        let y = run.result.get("Y").unwrap().blend().unwrap();
        assert!((run.inventory.remaining("A").unwrap() - (100.0 - y.quantity_of("A").unwrap())).abs() < TOL);
        assert!((run.result.total_batch_cost - y.total_cost).abs() < TOL);
    }

    #[test]
    fn test_consume_clamps_at_zero() {
        let materials = vec![Material::new("A", 1.0, 10.0)];
        let mut inventory = Inventory::from_materials(&materials);
        let blend = Blend {
            lines: vec![crate::blend::MixLine {
                material: "A".to_string(),
                quantity: 10.000000001,
                cost: 10.0,
            }],
            total_amount: 10.0,
            total_cost: 10.0,
            resulting_composition: Default::default(),
            cost_per_unit: 1.0,
        };

        inventory.consume(&blend);

        assert_eq!(inventory.remaining("A"), Some(0.0));
    }

    #[test]
    fn test_mismatched_inventory_fails_every_job() {
        let (materials, specs) = shared_stock();
        let jobs: BatchJob = [("X", 10.0), ("Y", 10.0)].into_iter().collect();
        let stale = Inventory::from_materials(&materials[..1]);

        let run = BatchSequencer::new().run_with_inventory(&materials, &specs, &jobs, stale.clone());

        assert!(run.result.outcomes.iter().all(|o| o.status() == BlendStatus::Error));
        assert_eq!(run.inventory, stale);
        assert_eq!(run.result.total_batch_cost, 0.0);
    }

    #[test]
    fn test_timed_out_job_is_recorded() {
        let (materials, specs) = shared_stock();
        let jobs: BatchJob = [("X", 10.0)].into_iter().collect();
        let sequencer = BatchSequencer::new().with_solver(BlendSolver::new().with_time_budget(Duration::ZERO));

        let result = sequencer.run(&materials, &specs, &jobs);

        assert_eq!(result.get("X").unwrap().status(), BlendStatus::TimedOut);
        assert!(result.total_scrap_usage.is_empty());
    }

    #[test]
    fn test_jobs_from_spec_defaults() {
        let (_, specs) = shared_stock();

        let jobs = BatchJob::from_defaults(&specs);

        let requests: Vec<(&str, f64)> = jobs.iter().map(|r| (r.product.as_str(), r.amount)).collect();
        assert_eq!(requests, [("X", 100.0), ("Y", 100.0)]);
    }

    #[test]
    fn test_empty_batch() {
        let (materials, specs) = shared_stock();

        let result = BatchSequencer::new().run(&materials, &specs, &BatchJob::new());

        assert!(result.outcomes.is_empty());
        assert_eq!(result.total_batch_cost, 0.0);
    }
}
