//! Flat rows for tabular export of a [`BatchResult`].

use crate::aggregate::BatchResult;
use crate::blend::Blend;
use crate::element::Element;

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Scrap,
    Composition,
    Failed,
    #[cfg_attr(feature = "serde", serde(rename = "Total Cost"))]
    TotalCost,
}

/// One line of the export, columns `Type, Product, Scrap, Amount, Cost, SI..MG`
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    #[cfg_attr(feature = "serde", serde(rename = "Type"))]
    pub kind: RowKind,
    #[cfg_attr(feature = "serde", serde(rename = "Product"))]
    pub product: String,
    /// Material id, or the failure message on a `Failed` row
    #[cfg_attr(feature = "serde", serde(rename = "Scrap"))]
    pub scrap: String,
    #[cfg_attr(feature = "serde", serde(rename = "Amount"))]
    pub amount: Option<f64>,
    #[cfg_attr(feature = "serde", serde(rename = "Cost"))]
    pub cost: Option<f64>,
    #[cfg_attr(feature = "serde", serde(rename = "SI"))]
    pub si: Option<f64>,
    #[cfg_attr(feature = "serde", serde(rename = "FE"))]
    pub fe: Option<f64>,
    #[cfg_attr(feature = "serde", serde(rename = "CU"))]
    pub cu: Option<f64>,
    #[cfg_attr(feature = "serde", serde(rename = "MN"))]
    pub mn: Option<f64>,
    #[cfg_attr(feature = "serde", serde(rename = "MG"))]
    pub mg: Option<f64>,
}

impl ReportRow {
    fn new(kind: RowKind, product: impl Into<String>, scrap: impl Into<String>) -> Self {
        Self {
            kind,
            product: product.into(),
            scrap: scrap.into(),
            amount: None,
            cost: None,
            si: None,
            fe: None,
            cu: None,
            mn: None,
            mg: None,
        }
    }

    fn composition(product: &str, blend: &Blend) -> Self {
        let fraction = |e: Element| blend.resulting_composition.get(&e).copied();
        Self {
            amount: Some(blend.total_amount),
            cost: Some(blend.total_cost),
            si: fraction(Element::Si),
            fe: fraction(Element::Fe),
            cu: fraction(Element::Cu),
            mn: fraction(Element::Mn),
            mg: fraction(Element::Mg),
            ..Self::new(RowKind::Composition, product, "")
        }
    }
}

impl BatchResult {
    /// Scrap lines and a composition line per optimal product, a `Failed`
    /// line per failed one, then the batch total.
    pub fn report_rows(&self) -> Vec<ReportRow> {
        let mut rows = Vec::new();

        for outcome in &self.outcomes {
            match outcome.blend() {
                Some(blend) => {
                    for line in &blend.lines {
                        rows.push(ReportRow {
                            amount: Some(line.quantity),
                            cost: Some(line.cost),
                            ..ReportRow::new(RowKind::Scrap, outcome.product.as_str(), line.material.as_str())
                        });
                    }
                    rows.push(ReportRow::composition(&outcome.product, blend));
                }
                None => {
                    rows.push(ReportRow {
                        amount: Some(outcome.amount),
                        ..ReportRow::new(
                            RowKind::Failed,
                            outcome.product.as_str(),
                            outcome.message().unwrap_or_default(),
                        )
                    });
                }
            }
        }

        rows.push(ReportRow {
            cost: Some(self.total_batch_cost),
            ..ReportRow::new(RowKind::TotalCost, "", "")
        });
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchJob, BatchSequencer};
    use crate::material::{Material, ProductSpec, SpecTable};

    #[test]
    fn test_report_rows_follow_outcome_order() {
        let materials = vec![
            Material::new("A", 2.0, 100.0).with_fraction(Element::Si, 0.1),
            Material::new("B", 5.0, 100.0).with_fraction(Element::Si, 0.9),
        ];
        let specs: SpecTable = [ProductSpec::new("P", 100.0).with_bound(Element::Si, 0.4, 0.6)]
            .into_iter()
            .collect();
        let jobs: BatchJob = [("P", 100.0), ("Nope", 5.0)].into_iter().collect();

        let result = BatchSequencer::new().run(&materials, &specs, &jobs);
        let rows = result.report_rows();

        let kinds: Vec<RowKind> = rows.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            [RowKind::Scrap, RowKind::Scrap, RowKind::Composition, RowKind::Failed, RowKind::TotalCost]
        );
        assert_eq!(rows[0].scrap, "A");
        assert!((rows[2].si.unwrap() - 0.4).abs() < 1e-6);
        assert_eq!(rows[2].fe, Some(0.0));
        assert_eq!(rows[3].product, "Nope");
        assert_eq!(rows[3].scrap, "Product Nope not found in composition requirements.");
        assert!((rows[4].cost.unwrap() - 312.5).abs() < 1e-6);
    }
}
