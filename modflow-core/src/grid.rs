use crate::errors::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Structured grid dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridShape {
    pub nlay: usize,
    pub nrow: usize,
    pub ncol: usize,
}

impl GridShape {
    pub fn new(nlay: usize, nrow: usize, ncol: usize) -> Self {
        Self { nlay, nrow, ncol }
    }

    /// Cells per layer.
    pub fn ncpl(&self) -> usize {
        self.nrow * self.ncol
    }

    pub fn nodes(&self) -> usize {
        self.nlay * self.ncpl()
    }

    pub fn contains(&self, cell: CellIndex) -> bool {
        cell.layer < self.nlay && cell.row < self.nrow && cell.column < self.ncol
    }

    /// Zero-based node number in layer-row-column order.
    pub fn node(&self, cell: CellIndex) -> Result<usize> {
        if !self.contains(cell) {
            return Err(CoreError::CellOutOfRange(format!(
                "{} outside {}x{}x{} grid",
                cell, self.nlay, self.nrow, self.ncol
            )));
        }
        Ok(cell.layer * self.ncpl() + cell.row * self.ncol + cell.column)
    }
}

/// Zero-based structured cell address. Files store these one-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellIndex {
    pub layer: usize,
    pub row: usize,
    pub column: usize,
}

impl CellIndex {
    pub fn new(layer: usize, row: usize, column: usize) -> Self {
        Self { layer, row, column }
    }

    pub fn from_one_based(layer: i64, row: i64, column: i64) -> Result<Self> {
        Ok(Self {
            layer: to_zero_based(layer, "layer")?,
            row: to_zero_based(row, "row")?,
            column: to_zero_based(column, "column")?,
        })
    }

    pub fn to_one_based(&self) -> (usize, usize, usize) {
        (self.layer + 1, self.row + 1, self.column + 1)
    }
}

impl std::fmt::Display for CellIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.layer, self.row, self.column)
    }
}

/// Convert a one-based file index to zero-based.
pub fn to_zero_based(value: i64, field: &str) -> Result<usize> {
    if value < 1 {
        return Err(CoreError::invalid_field(field, value.to_string()));
    }
    Ok((value - 1) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_numbering_is_layer_major() {
        let shape = GridShape::new(2, 3, 4);
        assert_eq!(shape.nodes(), 24);
        assert_eq!(shape.node(CellIndex::new(1, 2, 3)).unwrap(), 23);
        assert_eq!(shape.node(CellIndex::new(0, 1, 0)).unwrap(), 4);
    }

    #[test]
    fn node_outside_grid_is_error() {
        let shape = GridShape::new(1, 11, 11);
        assert!(shape.node(CellIndex::new(0, 11, 0)).is_err());
    }

    #[test]
    fn one_based_round_trip() {
        let cell = CellIndex::from_one_based(1, 6, 6).unwrap();
        assert_eq!(cell, CellIndex::new(0, 5, 5));
        assert_eq!(cell.to_one_based(), (1, 6, 6));
    }

    #[test]
    fn zero_one_based_index_rejected() {
        assert!(CellIndex::from_one_based(0, 1, 1).is_err());
        assert!(to_zero_based(-3, "row").is_err());
    }
}
