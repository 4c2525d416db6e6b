//! Witness rows of the infraction form

use crate::domain::{digits_only, Witness};

/// Ordered, editable list of witnesses.
///
/// Rows are addressed by position; removing a row shifts the ones after it
/// up by one, so positions always run from 0 to `len() - 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Witnesses {
    rows: Vec<Witness>,
}

impl Witnesses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an empty row and return its position.
    pub fn add(&mut self) -> usize {
        self.rows.push(Witness::default());
        self.rows.len() - 1
    }

    /// Remove the row at `index`, keeping the relative order of the rest.
    pub fn remove(&mut self, index: usize) -> Option<Witness> {
        (index < self.rows.len()).then(|| self.rows.remove(index))
    }

    /// Returns `false` when `index` is out of range.
    pub fn set_nome(&mut self, index: usize, nome: impl Into<String>) -> bool {
        match self.rows.get_mut(index) {
            Some(row) => {
                row.nome = nome.into();
                true
            }
            None => false,
        }
    }

    /// Stores digits only. Returns `false` when `index` is out of range.
    pub fn set_cpf(&mut self, index: usize, cpf: &str) -> bool {
        match self.rows.get_mut(index) {
            Some(row) => {
                row.cpf = digits_only(cpf);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, index: usize) -> Option<&Witness> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn as_slice(&self) -> &[Witness] {
        &self.rows
    }

    /// Rows with at least one filled value, in order
    pub fn filled(&self) -> Vec<Witness> {
        self.rows.iter().filter(|w| !w.is_blank()).cloned().collect()
    }
}

impl From<Vec<Witness>> for Witnesses {
    fn from(rows: Vec<Witness>) -> Self {
        Self { rows }
    }
}
