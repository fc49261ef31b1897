use std::collections::HashMap;

use crate::element::{Element, PerElement};

/// A scrap material that can go into a blend
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub id: String,
    /// Cost per unit mass
    pub cost: f64,
    /// Mass fraction of each element
    pub composition: PerElement<f64>,
    /// Usable mass on hand
    pub available_amount: f64,
}

impl Material {
    pub fn new(id: impl Into<String>, cost: f64, available_amount: f64) -> Self {
        Self {
            id: id.into(),
            cost,
            composition: PerElement::default(),
            available_amount,
        }
    }

    pub fn with_fraction(mut self, element: Element, fraction: f64) -> Self {
        self.composition[element] = fraction;
        self
    }
}

/// Allowed mass-fraction range for one element, `min <= max`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub min: f64,
    pub max: f64,
}

impl Bound {
    /// The whole fraction range, i.e. no restriction
    pub const UNCONSTRAINED: Bound = Bound { min: 0.0, max: 1.0 };
}

impl Default for Bound {
    fn default() -> Self {
        Self::UNCONSTRAINED
    }
}

/// Composition requirements for one product
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSpec {
    pub name: String,
    /// Request quantity used when a batch is built from the spec table
    pub default_amount: f64,
    pub bounds: PerElement<Bound>,
}

impl ProductSpec {
    pub fn new(name: impl Into<String>, default_amount: f64) -> Self {
        Self {
            name: name.into(),
            default_amount,
            bounds: PerElement::default(),
        }
    }

    pub fn with_bound(mut self, element: Element, min: f64, max: f64) -> Self {
        self.bounds[element] = Bound { min, max };
        self
    }
}

/// Product specs keyed by name, in input order
#[derive(Debug, Clone, Default)]
pub struct SpecTable {
    specs: Vec<ProductSpec>,
    index: HashMap<String, usize>,
}

impl SpecTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a spec, returning the one it replaces if the name was taken
    pub fn insert(&mut self, spec: ProductSpec) -> Option<ProductSpec> {
        match self.index.get(&spec.name) {
            Some(&i) => Some(std::mem::replace(&mut self.specs[i], spec)),
            None => {
                self.index.insert(spec.name.clone(), self.specs.len());
                self.specs.push(spec);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ProductSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl FromIterator<ProductSpec> for SpecTable {
    fn from_iter<I: IntoIterator<Item = ProductSpec>>(iter: I) -> Self {
        let mut table = SpecTable::new();
        for spec in iter {
            table.insert(spec);
        }
        table
    }
}
