use std::collections::BTreeMap;

use crate::blend::BlendSolution;

/// Every request's outcome plus batch totals over the optimal ones
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    /// One entry per request, in run order. A product may repeat, so look
    /// entries up with [`BatchResult::get`] rather than keying by name.
    pub outcomes: Vec<BlendSolution>,
    pub total_batch_cost: f64,
    /// Material id -> quantity drawn across all optimal requests
    pub total_scrap_usage: BTreeMap<String, f64>,
}

impl BatchResult {
    pub fn from_outcomes(outcomes: Vec<BlendSolution>) -> Self {
        let mut total_batch_cost = 0.0;
        let mut total_scrap_usage = BTreeMap::new();

        for blend in outcomes.iter().filter_map(BlendSolution::blend) {
            total_batch_cost += blend.total_cost;
            for line in &blend.lines {
                *total_scrap_usage.entry(line.material.clone()).or_insert(0.0) += line.quantity;
            }
        }

        Self {
            outcomes,
            total_batch_cost,
            total_scrap_usage,
        }
    }

    /// Latest outcome recorded for `product`
    pub fn get(&self, product: &str) -> Option<&BlendSolution> {
        self.outcomes.iter().rev().find(|o| o.product == product)
    }

    pub fn optimal_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_optimal()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &BlendSolution> {
        self.outcomes.iter().filter(|o| !o.is_optimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::{Blend, BlendOutcome, MixLine};

    fn optimal(product: &str, lines: &[(&str, f64, f64)]) -> BlendSolution {
        let lines: Vec<MixLine> = lines
            .iter()
            .map(|&(material, quantity, cost)| MixLine {
                material: material.to_string(),
                quantity,
                cost,
            })
            .collect();
        let total_amount = lines.iter().map(|l| l.quantity).sum();
        let total_cost = lines.iter().map(|l| l.cost).sum();
        BlendSolution {
            product: product.to_string(),
            amount: total_amount,
            outcome: BlendOutcome::Optimal(Blend {
                lines,
                total_amount,
                total_cost,
                resulting_composition: BTreeMap::new(),
                cost_per_unit: total_cost / total_amount,
            }),
        }
    }

    fn failed(product: &str) -> BlendSolution {
        BlendSolution {
            product: product.to_string(),
            amount: 10.0,
            outcome: BlendOutcome::Infeasible,
        }
    }

    #[test]
    fn test_totals_cover_only_optimal_entries() {
        let result = BatchResult::from_outcomes(vec![
            optimal("P", &[("A", 60.0, 120.0), ("B", 40.0, 200.0)]),
            failed("Q"),
            optimal("R", &[("B", 10.0, 50.0), ("C", 5.0, 5.0)]),
        ]);

        assert_eq!(result.total_batch_cost, 375.0);
        assert_eq!(result.total_scrap_usage.len(), 3);
        assert_eq!(result.total_scrap_usage["A"], 60.0);
        assert_eq!(result.total_scrap_usage["B"], 50.0);
        assert_eq!(result.total_scrap_usage["C"], 5.0);
        assert_eq!(result.optimal_count(), 2);
        assert_eq!(result.failures().count(), 1);
    }

    #[test]
    fn test_get_returns_latest_entry_for_repeated_product() {
        let result = BatchResult::from_outcomes(vec![optimal("P", &[("A", 1.0, 1.0)]), failed("P")]);

        assert!(!result.get("P").unwrap().is_optimal());
        assert_eq!(result.outcomes.len(), 2);
        assert_eq!(result.total_batch_cost, 1.0);
        assert!(result.get("Z").is_none());
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use serde_json::{Value, json};

    use crate::batch::{BatchJob, BatchSequencer};
    use crate::element::Element;
    use crate::material::{Material, ProductSpec, SpecTable};

    fn keys(value: &Value) -> Vec<&str> {
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_batch_result_json_shape() {
        let materials = vec![
            Material::new("A", 2.0, 100.0).with_fraction(Element::Si, 0.1),
            Material::new("B", 5.0, 100.0).with_fraction(Element::Si, 0.9),
        ];
        let specs: SpecTable = [ProductSpec::new("P", 100.0).with_bound(Element::Si, 0.4, 0.6)]
            .into_iter()
            .collect();
        let jobs: BatchJob = [("P", 100.0), ("Q", 5.0)].into_iter().collect();

        let result = BatchSequencer::new().run(&materials, &specs, &jobs);
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(keys(&value), ["outcomes", "total_batch_cost", "total_scrap_usage"]);
        assert!((value["total_batch_cost"].as_f64().unwrap() - 312.5).abs() < 1e-6);
        assert!((value["total_scrap_usage"]["A"].as_f64().unwrap() - 62.5).abs() < 1e-6);

        let optimal = &value["outcomes"][0];
        assert_eq!(keys(optimal), ["amount", "blend", "message", "product", "status"]);
        assert_eq!(optimal["product"], json!("P"));
        assert_eq!(optimal["status"], json!("Optimal"));
        assert_eq!(optimal["message"], Value::Null);
        assert_eq!(
            keys(&optimal["blend"]),
            ["cost_per_unit", "lines", "resulting_composition", "total_amount", "total_cost"]
        );
        assert_eq!(optimal["blend"]["lines"][0]["material"], json!("A"));
        assert!((optimal["blend"]["resulting_composition"]["SI"].as_f64().unwrap() - 0.4).abs() < 1e-6);

        let missing = &value["outcomes"][1];
        assert_eq!(keys(missing), ["amount", "blend", "message", "product", "status"]);
        assert_eq!(missing["product"], json!("Q"));
        assert_eq!(missing["amount"], json!(5.0));
        assert_eq!(missing["status"], json!("ProductNotFound"));
        assert_eq!(missing["message"], json!("Product Q not found in composition requirements."));
        assert_eq!(missing["blend"], Value::Null);
    }
}
