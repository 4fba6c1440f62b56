use cubecl_core::ir::Elem;
use thiserror::Error;

use crate::matrix::StorageOrder;

/// Errors reported before any kernel is enqueued.
///
/// No partial work is ever performed when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TriangularError {
    /// An argument doesn't live on the expected device.
    #[error("Unable to launch because of argument placement: {0}")]
    Placement(#[from] PlacementError),
    /// Dimensions don't fit the operation.
    #[error("Unable to launch because the problem isn't correctly defined: {0}")]
    Shape(#[from] ShapeError),
    /// Strides describe a layout the kernels can't address.
    #[error("Unable to launch because of an unsupported layout: {0}")]
    Layout(#[from] LayoutError),
    /// Element type outside of the supported float set.
    #[error("Unable to launch because of the element type: {0}")]
    ElemType(#[from] ElemTypeError),
    /// The kernel settings are inconsistent.
    #[error("Unable to launch because the settings are invalid: {0}")]
    Settings(#[from] SettingsError),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementError {
    #[error("the {argument} is resident in host memory, expected a device buffer")]
    NotOnDevice { argument: &'static str },
    #[error("the {argument} is on device {found} while the {reference} is on device {expected}")]
    DeviceMismatch {
        argument: &'static str,
        reference: &'static str,
        expected: usize,
        found: usize,
    },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeError {
    #[error("expected a square matrix, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
    #[error(
        "transpose of a {rows}x{cols} matrix must be written to a {cols}x{rows} matrix, got {out_rows}x{out_cols}"
    )]
    TransposeMismatch {
        rows: usize,
        cols: usize,
        out_rows: usize,
        out_cols: usize,
    },
    #[error("vector has {len} elements but the matrix dimension is {dim}")]
    VectorLength { len: usize, dim: usize },
    #[error("dimension {dim} exceeds the addressable range of the kernels")]
    TooLarge { dim: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("strides {strides:?} don't describe a contiguous {rows}x{cols} matrix")]
    NonContiguous {
        rows: usize,
        cols: usize,
        strides: [usize; 2],
    },
    #[error("vector stride {stride} isn't supported, vectors must be contiguous")]
    StridedVector { stride: usize },
    #[error("transpose output is {output:?} but the input is {input:?}")]
    OrderMismatch {
        input: StorageOrder,
        output: StorageOrder,
    },
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ElemTypeError {
    #[error("element type {0:?} is not a supported float type")]
    Unsupported(Elem),
    #[error("the {argument} has element type {found:?}, expected {expected:?}")]
    Mismatch {
        argument: &'static str,
        expected: Elem,
        found: Elem,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("unable to parse settings: {0}")]
    Parse(String),
    #[error("tile size {0} must be a power of two between 8 and 32")]
    TileSize(u32),
    #[error("row block factor {factor} must divide the tile size {tile_size}")]
    RowBlockFactor { factor: u32, tile_size: u32 },
    #[error("units per cube {0} must be a power of two between 32 and 1024")]
    UnitsPerCube(u32),
}
