//! Serialized matrix layouts.

use serde::{Deserialize, Serialize};
use wardrop_core::Real;

/// Sparse matrix in coordinate (triplet) form.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CooMatrix {
    pub rows: usize,
    pub cols: usize,
    pub row_indices: Vec<usize>,
    pub col_indices: Vec<usize>,
    pub values: Vec<Real>,
}

impl CooMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            ..Self::default()
        }
    }

    pub fn push(&mut self, row: usize, col: usize, value: Real) {
        self.row_indices.push(row);
        self.col_indices.push(col);
        self.values.push(value);
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Dense row-major copy, duplicates summed.
    pub fn to_dense(&self) -> Vec<Vec<Real>> {
        let mut dense = vec![vec![0.0; self.cols]; self.rows];
        for ((&r, &c), &v) in self
            .row_indices
            .iter()
            .zip(&self.col_indices)
            .zip(&self.values)
        {
            dense[r][c] += v;
        }
        dense
    }
}

/// Affine equilibrium data: `C x = d`, link delays `p * x + q`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MatrixExport {
    /// Node-link incidence, +1 for in-links and -1 for out-links.
    #[serde(rename = "C")]
    pub incidence: CooMatrix,
    /// Net OD demand per node (arriving minus departing).
    pub d: Vec<Real>,
    /// Link slopes.
    pub p: Vec<Real>,
    /// Link free-flow delays.
    pub q: Vec<Real>,
}
