//! Coerces caller-supplied table rows into validated [`Material`] and
//! [`ProductSpec`] records.
//!
//! Composition cells that are missing or unparseable count as 0.0 (the
//! latter is logged). Cost, availability, amount and bound cells have no
//! fallback: any problem with them rejects the whole table.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::element::{Element, PerElement};
use crate::material::{Bound, Material, ProductSpec, SpecTable};

pub const SCRAP_TYPE: &str = "Scrap_Type";
pub const COST: &str = "COST";
pub const AVAILABLE_AMOUNT: &str = "Available_Amount";
pub const PRODUCT: &str = "Product";
pub const AMOUNT: &str = "Amount";

/// Ingestion failure. `row` is the 1-based index of the data row.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Row {row}: missing required column {column}")]
    MissingColumn { row: usize, column: String },
    #[error("Row {row}: column {column} is empty")]
    MissingValue { row: usize, column: String },
    #[error("Row {row}: column {column} must be numeric, got '{value}'")]
    NotNumeric { row: usize, column: String, value: String },
    #[error("Row {row}: column {column} must not be negative, got {value}")]
    Negative { row: usize, column: String, value: f64 },
    #[error("Row {row}: column {column} must be a finite number")]
    NonFinite { row: usize, column: String },
    #[error("Row {row}: column {column} must not be blank")]
    EmptyIdentifier { row: usize, column: String },
    #[error("Row {row}: duplicate {column} '{value}'")]
    Duplicate { row: usize, column: String, value: String },
    #[error("Row {row}: product {product} has {element}_MIN {min} greater than {element}_MAX {max}")]
    BoundsInverted {
        row: usize,
        product: String,
        element: Element,
        min: f64,
        max: f64,
    },
}

/// One table row as column name -> cell text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    cells: HashMap<String, String>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.cells.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Validate the material table
pub fn normalize_materials(rows: &[RawRow]) -> Result<Vec<Material>, ValidationError> {
    let mut seen = HashSet::new();
    let mut materials = Vec::with_capacity(rows.len());

    for (i, raw) in rows.iter().enumerate() {
        let row = i + 1;
        let id = identifier(raw, row, SCRAP_TYPE)?;
        if !seen.insert(id.clone()) {
            return Err(ValidationError::Duplicate {
                row,
                column: SCRAP_TYPE.to_string(),
                value: id,
            });
        }

        let cost = non_negative(raw, row, COST)?;
        let available_amount = non_negative(raw, row, AVAILABLE_AMOUNT)?;

        let mut composition = PerElement::default();
        for element in Element::ALL {
            composition[element] = fraction(raw, row, element)?;
        }

        materials.push(Material {
            id,
            cost,
            composition,
            available_amount,
        });
    }

    tracing::debug!(count = materials.len(), "materials normalized");
    Ok(materials)
}

/// Validate the product spec table
pub fn normalize_specs(rows: &[RawRow]) -> Result<SpecTable, ValidationError> {
    let mut table = SpecTable::new();

    for (i, raw) in rows.iter().enumerate() {
        let row = i + 1;
        let name = identifier(raw, row, PRODUCT)?;
        if table.contains(&name) {
            return Err(ValidationError::Duplicate {
                row,
                column: PRODUCT.to_string(),
                value: name,
            });
        }

        let default_amount = non_negative(raw, row, AMOUNT)?;

        let mut bounds = PerElement::default();
        for element in Element::ALL {
            let min = number(raw, row, &element.min_column())?;
            let max = number(raw, row, &element.max_column())?;
            if min > max {
                return Err(ValidationError::BoundsInverted {
                    row,
                    product: name,
                    element,
                    min,
                    max,
                });
            }
            bounds[element] = Bound { min, max };
        }

        table.insert(ProductSpec {
            name,
            default_amount,
            bounds,
        });
    }

    tracing::debug!(count = table.len(), "product specs normalized");
    Ok(table)
}

fn cell<'a>(raw: &'a RawRow, row: usize, column: &str) -> Result<&'a str, ValidationError> {
    let value = raw.get(column).ok_or_else(|| ValidationError::MissingColumn {
        row,
        column: column.to_string(),
    })?;
    Ok(value.trim())
}

fn identifier(raw: &RawRow, row: usize, column: &str) -> Result<String, ValidationError> {
    let value = cell(raw, row, column)?;
    if value.is_empty() {
        return Err(ValidationError::EmptyIdentifier {
            row,
            column: column.to_string(),
        });
    }
    Ok(value.to_string())
}

fn number(raw: &RawRow, row: usize, column: &str) -> Result<f64, ValidationError> {
    let text = cell(raw, row, column)?;
    if text.is_empty() {
        return Err(ValidationError::MissingValue {
            row,
            column: column.to_string(),
        });
    }
    let value: f64 = text.parse().map_err(|_| ValidationError::NotNumeric {
        row,
        column: column.to_string(),
        value: text.to_string(),
    })?;
    if !value.is_finite() {
        return Err(ValidationError::NonFinite {
            row,
            column: column.to_string(),
        });
    }
    Ok(value)
}

fn non_negative(raw: &RawRow, row: usize, column: &str) -> Result<f64, ValidationError> {
    let value = number(raw, row, column)?;
    if value < 0.0 {
        return Err(ValidationError::Negative {
            row,
            column: column.to_string(),
            value,
        });
    }
    Ok(value)
}

fn fraction(raw: &RawRow, row: usize, element: Element) -> Result<f64, ValidationError> {
    let column = element.symbol();
    let text = raw.get(column).map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Ok(0.0);
    }

    match text.parse::<f64>() {
        Ok(value) if !value.is_finite() => Err(ValidationError::NonFinite {
            row,
            column: column.to_string(),
        }),
        Ok(value) if value < 0.0 => Err(ValidationError::Negative {
            row,
            column: column.to_string(),
            value,
        }),
        Ok(value) => Ok(value),
        Err(_) => {
            tracing::warn!(row, column, value = text, "unparseable composition value treated as 0");
            Ok(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material_row(id: &str, cost: &str, si: &str, available: &str) -> RawRow {
        RawRow::new()
            .with(SCRAP_TYPE, id)
            .with(COST, cost)
            .with("SI", si)
            .with("FE", "0.01")
            .with("CU", "")
            .with("MN", "0")
            .with("MG", "0")
            .with(AVAILABLE_AMOUNT, available)
    }

    fn spec_row(name: &str, amount: &str) -> RawRow {
        let mut row = RawRow::new().with(PRODUCT, name).with(AMOUNT, amount);
        for element in Element::ALL {
            row.insert(element.min_column(), "0");
            row.insert(element.max_column(), "1");
        }
        row
    }

    #[test]
    fn test_materials_parse() {
        let rows = vec![material_row(" Alpha ", "2.5", "0.1", "100"), material_row("Beta", "5", "0.9", "40.5")];

        let materials = normalize_materials(&rows).unwrap();

        assert_eq!(materials.len(), 2);
        assert_eq!(materials[0].id, "Alpha");
        assert_eq!(materials[0].cost, 2.5);
        assert_eq!(materials[0].composition[Element::Si], 0.1);
        assert_eq!(materials[0].composition[Element::Fe], 0.01);
        assert_eq!(materials[1].available_amount, 40.5);
    }

    #[test]
    fn test_missing_and_garbled_composition_become_zero() {
        let row = RawRow::from_iter([
            (SCRAP_TYPE, "Alpha"),
            (COST, "2"),
            (AVAILABLE_AMOUNT, "10"),
            ("SI", "abc"),
            ("FE", "0.01"),
        ]);

        let materials = normalize_materials(&[row]).unwrap();

        assert_eq!(materials[0].composition[Element::Si], 0.0);
        assert_eq!(materials[0].composition[Element::Fe], 0.01);
        assert_eq!(materials[0].composition[Element::Cu], 0.0);
        assert_eq!(materials[0].composition[Element::Mg], 0.0);
    }

    #[test]
    fn test_missing_cost_is_rejected() {
        let row = material_row("Alpha", "", "0.1", "10");

        let err = normalize_materials(&[row]).unwrap_err();

        assert_eq!(
            err,
            ValidationError::MissingValue {
                row: 1,
                column: COST.to_string()
            }
        );
    }

    #[test]
    fn test_unparseable_availability_is_rejected() {
        let rows = vec![material_row("Alpha", "1", "0.1", "10"), material_row("Beta", "1", "0.1", "lots")];

        let err = normalize_materials(&rows).unwrap_err();

        assert!(matches!(
            err,
            ValidationError::NotNumeric { row: 2, ref column, ref value } if column == AVAILABLE_AMOUNT && value == "lots"
        ));
    }

    #[test]
    fn test_absent_cost_column_is_rejected() {
        let row = RawRow::from_iter([(SCRAP_TYPE, "Alpha"), (AVAILABLE_AMOUNT, "10")]);

        let err = normalize_materials(&[row]).unwrap_err();

        assert!(matches!(err, ValidationError::MissingColumn { row: 1, ref column } if column == COST));
    }

    #[test]
    fn test_negative_and_infinite_values_are_rejected() {
        let negative = material_row("Alpha", "-1", "0.1", "10");
        assert!(matches!(
            normalize_materials(&[negative]).unwrap_err(),
            ValidationError::Negative { .. }
        ));

        let infinite = material_row("Alpha", "1", "0.1", "inf");
        assert!(matches!(
            normalize_materials(&[infinite]).unwrap_err(),
            ValidationError::NonFinite { .. }
        ));
    }

    #[test]
    fn test_duplicate_material_is_rejected() {
        let rows = vec![material_row("Alpha", "1", "0.1", "10"), material_row("Alpha", "2", "0.2", "5")];

        let err = normalize_materials(&rows).unwrap_err();

        assert!(matches!(err, ValidationError::Duplicate { row: 2, .. }));
    }

    #[test]
    fn test_blank_identifier_is_rejected() {
        let row = material_row("  ", "1", "0.1", "10");

        assert!(matches!(
            normalize_materials(&[row]).unwrap_err(),
            ValidationError::EmptyIdentifier { row: 1, .. }
        ));
    }

    #[test]
    fn test_specs_parse() {
        let mut row = spec_row("A356", "250");
        row.insert("SI_MIN", "0.065");
        row.insert("SI_MAX", "0.075");

        let table = normalize_specs(&[row, spec_row("6061", "0")]).unwrap();

        assert_eq!(table.len(), 2);
        let spec = table.get("A356").unwrap();
        assert_eq!(spec.default_amount, 250.0);
        assert_eq!(spec.bounds[Element::Si], Bound { min: 0.065, max: 0.075 });
        assert_eq!(spec.bounds[Element::Mg], Bound { min: 0.0, max: 1.0 });
    }

    #[test]
    fn test_inverted_bounds_are_rejected() {
        let mut row = spec_row("A356", "250");
        row.insert("CU_MIN", "0.3");
        row.insert("CU_MAX", "0.2");

        let err = normalize_specs(&[row]).unwrap_err();

        assert_eq!(
            err,
            ValidationError::BoundsInverted {
                row: 1,
                product: "A356".to_string(),
                element: Element::Cu,
                min: 0.3,
                max: 0.2,
            }
        );
        assert_eq!(
            err.to_string(),
            "Row 1: product A356 has CU_MIN 0.3 greater than CU_MAX 0.2"
        );
    }

    #[test]
    fn test_spec_bound_columns_are_required() {
        let row = RawRow::from_iter([(PRODUCT, "A356"), (AMOUNT, "100")]);

        let err = normalize_specs(&[row]).unwrap_err();

        assert!(matches!(err, ValidationError::MissingColumn { ref column, .. } if column == "SI_MIN"));
    }

    #[test]
    fn test_duplicate_product_is_rejected() {
        let err = normalize_specs(&[spec_row("A", "1"), spec_row("A", "2")]).unwrap_err();

        assert!(matches!(err, ValidationError::Duplicate { row: 2, ref value, .. } if value == "A"));
    }
}
