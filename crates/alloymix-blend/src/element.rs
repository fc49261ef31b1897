use std::ops::{Index, IndexMut};

/// Alloying elements tracked in every material and product spec
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Element {
    Si,
    Fe,
    Cu,
    Mn,
    Mg,
}

impl Element {
    pub const COUNT: usize = 5;

    /// Column order used by every table
    pub const ALL: [Element; Element::COUNT] = [Element::Si, Element::Fe, Element::Cu, Element::Mn, Element::Mg];

    /// Column name in the material table, e.g. `SI`
    pub fn symbol(self) -> &'static str {
        match self {
            Element::Si => "SI",
            Element::Fe => "FE",
            Element::Cu => "CU",
            Element::Mn => "MN",
            Element::Mg => "MG",
        }
    }

    pub fn min_column(self) -> String {
        format!("{}_MIN", self.symbol())
    }

    pub fn max_column(self) -> String {
        format!("{}_MAX", self.symbol())
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.symbol())
    }
}

/// One value per [`Element`], stored in column order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerElement<T>([T; Element::COUNT]);

impl<T> PerElement<T> {
    pub fn from_fn(f: impl FnMut(Element) -> T) -> Self {
        Self(Element::ALL.map(f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Element, &T)> {
        Element::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T> Index<Element> for PerElement<T> {
    type Output = T;

    fn index(&self, element: Element) -> &T {
        &self.0[element.index()]
    }
}

impl<T> IndexMut<Element> for PerElement<T> {
    fn index_mut(&mut self, element: Element) -> &mut T {
        &mut self.0[element.index()]
    }
}
