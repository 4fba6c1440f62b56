//! Triangular and transpose primitives for dense square matrices.
//!
//! Every operation validates its arguments on the host, then enqueues a single kernel on the
//! caller's client and returns without waiting for it. Row-major matrices are handled as the
//! column-major transpose of the same buffer, with the triangle and side flags flipped.

mod device;
mod element;
mod error;
mod index;
mod kernels;
mod launch;
mod plan;
mod settings;

pub mod matrix;

pub use device::*;
pub use element::*;
pub use error::*;
pub use index::{triangular_tile_coords, triangular_tile_count, TileCoord};
pub use launch::*;
pub use plan::*;
pub use settings::*;

#[cfg(feature = "export_tests")]
pub mod tests;
