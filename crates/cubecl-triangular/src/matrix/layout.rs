use serde::{Deserialize, Serialize};

use crate::LayoutError;

/// Memory order of a dense matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageOrder {
    /// Consecutive elements of a column are contiguous.
    ColMajor,
    /// Consecutive elements of a row are contiguous.
    RowMajor,
}

impl StorageOrder {
    pub fn transposed(self) -> Self {
        match self {
            StorageOrder::ColMajor => StorageOrder::RowMajor,
            StorageOrder::RowMajor => StorageOrder::ColMajor,
        }
    }

    /// Contiguous strides of a `rows x cols` matrix stored in this order.
    pub fn strides(self, rows: usize, cols: usize) -> [usize; 2] {
        match self {
            StorageOrder::ColMajor => [1, rows],
            StorageOrder::RowMajor => [cols, 1],
        }
    }
}

/// Half of a square matrix, the diagonal belonging to both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Triangle {
    Upper,
    Lower,
}

impl Triangle {
    /// The same elements seen through a transposed view.
    pub fn transposed(self) -> Self {
        match self {
            Triangle::Upper => Triangle::Lower,
            Triangle::Lower => Triangle::Upper,
        }
    }

    pub fn is_upper(self) -> bool {
        self == Triangle::Upper
    }

    /// Whether element `(row, col)` belongs to this half.
    pub fn contains(self, row: usize, col: usize) -> bool {
        match self {
            Triangle::Upper => row <= col,
            Triangle::Lower => row >= col,
        }
    }
}

/// Which index of an element selects its vector multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Element `(i, j)` is multiplied by `v[i]`.
    Rows,
    /// Element `(i, j)` is multiplied by `v[j]`.
    Columns,
}

impl Side {
    pub fn transposed(self) -> Self {
        match self {
            Side::Rows => Side::Columns,
            Side::Columns => Side::Rows,
        }
    }
}

/// Shape and strides of a matrix, without its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatrixLayout {
    pub rows: usize,
    pub cols: usize,
    pub strides: [usize; 2],
}

impl MatrixLayout {
    pub fn new(shape: [usize; 2], strides: [usize; 2]) -> Self {
        Self {
            rows: shape[0],
            cols: shape[1],
            strides,
        }
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Whether the kernels can address this matrix assuming the given order.
    ///
    /// A stride along an axis of extent one is never used, so any value is accepted there.
    pub fn supports(&self, order: StorageOrder) -> bool {
        let [stride_row, stride_col] = self.strides;

        match order {
            StorageOrder::ColMajor => {
                (stride_row == 1 || self.rows <= 1) && (stride_col == self.rows || self.cols <= 1)
            }
            StorageOrder::RowMajor => {
                (stride_col == 1 || self.cols <= 1) && (stride_row == self.cols || self.rows <= 1)
            }
        }
    }

    /// Storage order of the matrix, column-major being preferred when both fit.
    pub fn order(&self) -> Result<StorageOrder, LayoutError> {
        if self.supports(StorageOrder::ColMajor) {
            Ok(StorageOrder::ColMajor)
        } else if self.supports(StorageOrder::RowMajor) {
            Ok(StorageOrder::RowMajor)
        } else {
            Err(LayoutError::NonContiguous {
                rows: self.rows,
                cols: self.cols,
                strides: self.strides,
            })
        }
    }

    /// Swaps the axes without touching the data.
    ///
    /// A row-major matrix becomes its column-major transpose.
    pub fn logical_transpose(&self) -> Self {
        Self {
            rows: self.cols,
            cols: self.rows,
            strides: [self.strides[1], self.strides[0]],
        }
    }
}
