//! Validation of the operation arguments and computation of the launch geometry.
//!
//! Planning only looks at metadata, so every failure is reported before anything is enqueued
//! and plans can be inspected without a device.

use cubecl_core::ir::Elem;
use cubecl_core::{CubeCount, CubeDim};
use derive_new::new;

use crate::matrix::{MatrixLayout, Side, StorageOrder, Triangle};
use crate::{
    common_device, is_supported, triangular_tile_count, ElemTypeError, KernelSettings,
    LayoutError, Placement, ShapeError, TriangularError,
};

/// Metadata of a matrix argument.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixDesc {
    pub layout: MatrixLayout,
    pub elem: Elem,
    pub placement: Placement,
}

/// Metadata of a vector argument.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorDesc {
    pub len: usize,
    pub stride: usize,
    pub elem: Elem,
    pub placement: Placement,
}

impl VectorDesc {
    /// Fails for strided views, the kernels read vectors as contiguous arrays.
    pub fn check_contiguous(&self) -> Result<(), LayoutError> {
        if self.stride != 1 && self.len > 1 {
            return Err(LayoutError::StridedVector {
                stride: self.stride,
            });
        }

        Ok(())
    }
}

/// Largest cube count accepted along one dimension by every runtime.
const MAX_CUBE_COUNT_DIM: u32 = u16::MAX as u32;

/// Cube count and cube dim of a launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchGeometry {
    pub cube_count: [u32; 3],
    pub cube_dim: [u32; 3],
}

impl LaunchGeometry {
    /// Spread `num_cubes` cubes over the first two dimensions of the cube count.
    ///
    /// Counts can exceed the limit of a single dimension, so they are laid out on a square
    /// and the kernels discard the cubes past `num_cubes`.
    pub fn new(num_cubes: u32, cube_dim: [u32; 3]) -> Self {
        let cube_count = match num_cubes {
            0 => [0, 1, 1],
            1..=MAX_CUBE_COUNT_DIM => [num_cubes, 1, 1],
            _ => {
                let x = f64::from(num_cubes).sqrt().ceil() as u32;
                [x, num_cubes.div_ceil(x), 1]
            }
        };

        Self {
            cube_count,
            cube_dim,
        }
    }

    pub fn num_cubes(&self) -> u64 {
        self.cube_count.iter().map(|&count| count as u64).product()
    }

    pub fn cube_count(&self) -> CubeCount {
        let [x, y, z] = self.cube_count;
        CubeCount::Static(x, y, z)
    }

    pub fn cube_dim(&self) -> CubeDim {
        let [x, y, z] = self.cube_dim;
        CubeDim::new(x, y, z)
    }
}

/// Everything needed to enqueue one operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchPlan<V> {
    /// Device every argument lives on.
    pub device: usize,
    pub elem: Elem,
    /// Storage order of the caller's matrices.
    pub order: StorageOrder,
    /// Kernel flags, expressed on the column-major view of the arguments.
    pub variant: V,
    pub geometry: LaunchGeometry,
    pub settings: KernelSettings,
}

impl<V> LaunchPlan<V> {
    /// Empty matrices are valid and launch nothing.
    pub fn is_noop(&self) -> bool {
        self.geometry.num_cubes() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorVariant {
    /// Half being copied.
    pub source: Triangle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleVariant {
    pub triangle: Triangle,
    pub preserve_diagonal: bool,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZeroVariant {
    pub triangle: Triangle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VecMulVariant {
    pub triangle: Triangle,
    pub side: Side,
    /// Tiles of the triangular tile grid, one cube each.
    pub num_tiles: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransposeVariant {
    /// Tiles along the contiguous axis of the input.
    pub tiles_per_fast: u32,
    pub num_tiles: u32,
}

/// Validated square matrix.
struct SquareTarget {
    device: usize,
    order: StorageOrder,
    dim: usize,
}

impl SquareTarget {
    fn triangle(&self, triangle: Triangle) -> Triangle {
        match self.order {
            StorageOrder::ColMajor => triangle,
            StorageOrder::RowMajor => triangle.transposed(),
        }
    }

    fn side(&self, side: Side) -> Side {
        match self.order {
            StorageOrder::ColMajor => side,
            StorageOrder::RowMajor => side.transposed(),
        }
    }

    fn plan<V>(
        &self,
        elem: Elem,
        variant: V,
        geometry: LaunchGeometry,
        settings: &KernelSettings,
    ) -> LaunchPlan<V> {
        LaunchPlan {
            device: self.device,
            elem,
            order: self.order,
            variant,
            geometry,
            settings: *settings,
        }
    }
}

fn check_square(
    matrix: &MatrixDesc,
    settings: &KernelSettings,
    others: &[(&'static str, Placement)],
) -> Result<SquareTarget, TriangularError> {
    settings.validate()?;

    let mut placements = vec![("matrix", matrix.placement)];
    placements.extend_from_slice(others);
    let device = common_device(&placements)?;

    let order = matrix.layout.order()?;
    let [rows, cols] = matrix.layout.shape();

    if !matrix.layout.is_square() {
        return Err(ShapeError::NotSquare { rows, cols }.into());
    }
    check_addressable(rows, cols)?;
    check_elem(matrix.elem)?;

    Ok(SquareTarget {
        device,
        order,
        dim: rows,
    })
}

/// Indices are computed in `u32` on the device.
fn check_addressable(rows: usize, cols: usize) -> Result<(), ShapeError> {
    match rows.checked_mul(cols) {
        Some(len) if len <= u32::MAX as usize => Ok(()),
        _ => Err(ShapeError::TooLarge {
            dim: rows.max(cols),
        }),
    }
}

fn check_elem(elem: Elem) -> Result<(), ElemTypeError> {
    if !is_supported(elem) {
        return Err(ElemTypeError::Unsupported(elem));
    }

    Ok(())
}

fn check_same_elem(
    argument: &'static str,
    expected: Elem,
    found: Elem,
) -> Result<(), ElemTypeError> {
    if expected != found {
        return Err(ElemTypeError::Mismatch {
            argument,
            expected,
            found,
        });
    }

    Ok(())
}

/// One unit per column of the column-major view.
fn per_column_geometry(dim: usize, settings: &KernelSettings) -> LaunchGeometry {
    let units = settings.units_per_cube;
    let num_cubes = (dim as u32).div_ceil(units);

    LaunchGeometry::new(num_cubes, [units, 1, 1])
}

/// One cube per tile, each cube covering its tile in `tile_size / block_rows` passes.
fn tiled_geometry(num_tiles: u32, settings: &KernelSettings) -> LaunchGeometry {
    LaunchGeometry::new(num_tiles, [settings.tile_size, settings.block_rows(), 1])
}

pub fn plan_mirror(
    matrix: &MatrixDesc,
    source: Triangle,
    settings: &KernelSettings,
) -> Result<LaunchPlan<MirrorVariant>, TriangularError> {
    let target = check_square(matrix, settings, &[])?;
    let variant = MirrorVariant {
        source: target.triangle(source),
    };

    Ok(target.plan(
        matrix.elem,
        variant,
        per_column_geometry(target.dim, settings),
        settings,
    ))
}

pub fn plan_scale(
    matrix: &MatrixDesc,
    triangle: Triangle,
    preserve_diagonal: bool,
    multiplier: f64,
    settings: &KernelSettings,
) -> Result<LaunchPlan<ScaleVariant>, TriangularError> {
    let target = check_square(matrix, settings, &[])?;
    let variant = ScaleVariant {
        triangle: target.triangle(triangle),
        preserve_diagonal,
        multiplier,
    };

    Ok(target.plan(
        matrix.elem,
        variant,
        per_column_geometry(target.dim, settings),
        settings,
    ))
}

pub fn plan_zero(
    matrix: &MatrixDesc,
    triangle: Triangle,
    settings: &KernelSettings,
) -> Result<LaunchPlan<ZeroVariant>, TriangularError> {
    let target = check_square(matrix, settings, &[])?;
    let variant = ZeroVariant {
        triangle: target.triangle(triangle),
    };

    Ok(target.plan(
        matrix.elem,
        variant,
        per_column_geometry(target.dim, settings),
        settings,
    ))
}

pub fn plan_vec_mul(
    matrix: &MatrixDesc,
    vector: &VectorDesc,
    triangle: Triangle,
    side: Side,
    settings: &KernelSettings,
) -> Result<LaunchPlan<VecMulVariant>, TriangularError> {
    let target = check_square(matrix, settings, &[("vector", vector.placement)])?;

    vector.check_contiguous()?;
    if vector.len != target.dim {
        return Err(ShapeError::VectorLength {
            len: vector.len,
            dim: target.dim,
        }
        .into());
    }
    check_same_elem("vector", matrix.elem, vector.elem)?;

    let tiles_per_side = (target.dim as u64).div_ceil(settings.tile_size as u64);
    // Bounded by dim * dim, which fits in u32.
    let num_tiles = triangular_tile_count(tiles_per_side) as u32;

    let variant = VecMulVariant {
        triangle: target.triangle(triangle),
        side: target.side(side),
        num_tiles,
    };

    Ok(target.plan(
        matrix.elem,
        variant,
        tiled_geometry(num_tiles, settings),
        settings,
    ))
}

pub fn plan_transpose(
    input: &MatrixDesc,
    output: &MatrixDesc,
    settings: &KernelSettings,
) -> Result<LaunchPlan<TransposeVariant>, TriangularError> {
    settings.validate()?;

    let device = common_device(&[("input", input.placement), ("output", output.placement)])?;

    let order = input.layout.order()?;
    let output_order = output.layout.order()?;
    if !output.layout.supports(order) {
        return Err(LayoutError::OrderMismatch {
            input: order,
            output: output_order,
        }
        .into());
    }

    let [rows, cols] = input.layout.shape();
    let [out_rows, out_cols] = output.layout.shape();
    if out_rows != cols || out_cols != rows {
        return Err(ShapeError::TransposeMismatch {
            rows,
            cols,
            out_rows,
            out_cols,
        }
        .into());
    }
    check_addressable(rows, cols)?;

    check_elem(input.elem)?;
    check_same_elem("output", input.elem, output.elem)?;

    let (fast, slow) = match order {
        StorageOrder::ColMajor => (rows, cols),
        StorageOrder::RowMajor => (cols, rows),
    };
    let tile_size = settings.tile_size as usize;
    let tiles_per_fast = fast.div_ceil(tile_size) as u32;
    let num_tiles = tiles_per_fast * slow.div_ceil(tile_size) as u32;

    Ok(LaunchPlan {
        device,
        elem: input.elem,
        order,
        variant: TransposeVariant {
            tiles_per_fast,
            num_tiles,
        },
        geometry: tiled_geometry(num_tiles, settings),
        settings: *settings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FloatElement, PlacementError, SettingsError};
    use cubecl_core::ir::IntKind;
    use pretty_assertions::assert_eq;

    fn square(dim: usize, order: StorageOrder) -> MatrixDesc {
        MatrixDesc::new(
            MatrixLayout::new([dim, dim], order.strides(dim, dim)),
            f32::ELEM,
            Placement::Device(0),
        )
    }

    fn vector(len: usize) -> VectorDesc {
        VectorDesc::new(len, 1, f32::ELEM, Placement::Device(0))
    }

    #[test]
    fn geometry_stays_in_one_dimension_when_it_fits() {
        let geometry = LaunchGeometry::new(1000, [256, 1, 1]);

        assert_eq!(geometry.cube_count, [1000, 1, 1]);
        assert_eq!(geometry.num_cubes(), 1000);
    }

    #[test]
    fn geometry_spreads_large_counts() {
        let num_cubes = 70_000 * 3;
        let geometry = LaunchGeometry::new(num_cubes, [32, 8, 1]);
        let [x, y, z] = geometry.cube_count;

        assert!(x <= u16::MAX as u32 && y <= u16::MAX as u32);
        assert_eq!(z, 1);
        assert!(geometry.num_cubes() >= num_cubes as u64);
    }

    #[test]
    fn mirror_keeps_the_half_of_column_major_matrices() {
        let plan = plan_mirror(
            &square(1000, StorageOrder::ColMajor),
            Triangle::Upper,
            &KernelSettings::default(),
        )
        .unwrap();

        assert_eq!(plan.order, StorageOrder::ColMajor);
        assert_eq!(plan.variant.source, Triangle::Upper);
        assert_eq!(plan.geometry.cube_count, [4, 1, 1]);
        assert_eq!(plan.geometry.cube_dim, [256, 1, 1]);
    }

    #[test]
    fn mirror_flips_the_half_of_row_major_matrices() {
        let plan = plan_mirror(
            &square(4, StorageOrder::RowMajor),
            Triangle::Upper,
            &KernelSettings::default(),
        )
        .unwrap();

        assert_eq!(plan.order, StorageOrder::RowMajor);
        assert_eq!(plan.variant.source, Triangle::Lower);
    }

    #[test]
    fn scale_selects_the_variant() {
        let plan = plan_scale(
            &square(3, StorageOrder::RowMajor),
            Triangle::Lower,
            true,
            2.0,
            &KernelSettings::default(),
        )
        .unwrap();

        assert_eq!(
            plan.variant,
            ScaleVariant {
                triangle: Triangle::Upper,
                preserve_diagonal: true,
                multiplier: 2.0,
            }
        );
    }

    #[test]
    fn zero_uses_the_units_per_cube_setting() {
        let settings = KernelSettings {
            units_per_cube: 64,
            ..Default::default()
        };
        let plan = plan_zero(&square(130, StorageOrder::ColMajor), Triangle::Lower, &settings)
            .unwrap();

        assert_eq!(plan.geometry.cube_count, [3, 1, 1]);
        assert_eq!(plan.geometry.cube_dim, [64, 1, 1]);
    }

    #[test]
    fn vec_mul_flips_half_and_side_of_row_major_matrices() {
        let plan = plan_vec_mul(
            &square(100, StorageOrder::RowMajor),
            &vector(100),
            Triangle::Upper,
            Side::Columns,
            &KernelSettings::default(),
        )
        .unwrap();

        assert_eq!(plan.variant.triangle, Triangle::Lower);
        assert_eq!(plan.variant.side, Side::Rows);
        // 4 tiles per side, 10 in one half.
        assert_eq!(plan.variant.num_tiles, 10);
        assert_eq!(plan.geometry.cube_count, [10, 1, 1]);
        assert_eq!(plan.geometry.cube_dim, [32, 8, 1]);
    }

    #[test]
    fn vec_mul_rejects_wrong_vector_length() {
        let err = plan_vec_mul(
            &square(3, StorageOrder::ColMajor),
            &vector(4),
            Triangle::Lower,
            Side::Rows,
            &KernelSettings::default(),
        )
        .unwrap_err();

        assert_eq!(
            err,
            TriangularError::from(ShapeError::VectorLength { len: 4, dim: 3 })
        );
    }

    #[test]
    fn vec_mul_rejects_strided_vector() {
        let strided = VectorDesc::new(3, 2, f32::ELEM, Placement::Device(0));
        let err = plan_vec_mul(
            &square(3, StorageOrder::ColMajor),
            &strided,
            Triangle::Lower,
            Side::Rows,
            &KernelSettings::default(),
        )
        .unwrap_err();

        assert_eq!(
            err,
            TriangularError::from(LayoutError::StridedVector { stride: 2 })
        );
    }

    #[test]
    fn vec_mul_rejects_vector_on_another_device() {
        let remote = VectorDesc::new(3, 1, f32::ELEM, Placement::Device(1));
        let err = plan_vec_mul(
            &square(3, StorageOrder::ColMajor),
            &remote,
            Triangle::Lower,
            Side::Rows,
            &KernelSettings::default(),
        )
        .unwrap_err();

        assert_eq!(
            err,
            TriangularError::from(PlacementError::DeviceMismatch {
                argument: "vector",
                reference: "matrix",
                expected: 0,
                found: 1,
            })
        );
    }

    #[test]
    fn vec_mul_rejects_vector_of_another_type() {
        let vector = VectorDesc::new(3, 1, f64::ELEM, Placement::Device(0));
        let err = plan_vec_mul(
            &square(3, StorageOrder::ColMajor),
            &vector,
            Triangle::Lower,
            Side::Rows,
            &KernelSettings::default(),
        )
        .unwrap_err();

        assert_eq!(
            err,
            TriangularError::from(ElemTypeError::Mismatch {
                argument: "vector",
                expected: f32::ELEM,
                found: f64::ELEM,
            })
        );
    }

    #[test]
    fn rejects_host_matrices() {
        let mut matrix = square(3, StorageOrder::ColMajor);
        matrix.placement = Placement::Host;

        let err = plan_mirror(&matrix, Triangle::Upper, &KernelSettings::default()).unwrap_err();

        assert_eq!(
            err,
            TriangularError::from(PlacementError::NotOnDevice { argument: "matrix" })
        );
    }

    #[test]
    fn rejects_non_square_matrices() {
        let matrix = MatrixDesc::new(
            MatrixLayout::new([2, 3], StorageOrder::ColMajor.strides(2, 3)),
            f32::ELEM,
            Placement::Device(0),
        );

        let err = plan_zero(&matrix, Triangle::Upper, &KernelSettings::default()).unwrap_err();

        assert_eq!(err, TriangularError::from(ShapeError::NotSquare { rows: 2, cols: 3 }));
    }

    #[test]
    fn rejects_non_contiguous_matrices() {
        let matrix = MatrixDesc::new(
            MatrixLayout::new([3, 3], [1, 4]),
            f32::ELEM,
            Placement::Device(0),
        );

        let err = plan_mirror(&matrix, Triangle::Upper, &KernelSettings::default()).unwrap_err();

        assert_eq!(
            err,
            TriangularError::from(LayoutError::NonContiguous {
                rows: 3,
                cols: 3,
                strides: [1, 4],
            })
        );
    }

    #[test]
    fn rejects_integer_matrices() {
        let mut matrix = square(3, StorageOrder::ColMajor);
        matrix.elem = Elem::Int(IntKind::I32);

        let err = plan_scale(
            &matrix,
            Triangle::Upper,
            false,
            2.0,
            &KernelSettings::default(),
        )
        .unwrap_err();

        assert_eq!(
            err,
            TriangularError::from(ElemTypeError::Unsupported(Elem::Int(IntKind::I32)))
        );
    }

    #[test]
    fn rejects_invalid_settings() {
        let settings = KernelSettings {
            tile_size: 12,
            ..Default::default()
        };

        let err = plan_mirror(&square(3, StorageOrder::ColMajor), Triangle::Upper, &settings)
            .unwrap_err();

        assert_eq!(err, TriangularError::from(SettingsError::TileSize(12)));
    }

    #[test]
    fn rejects_matrices_past_the_u32_range() {
        let matrix = MatrixDesc::new(
            MatrixLayout::new([70_000, 70_000], [1, 70_000]),
            f32::ELEM,
            Placement::Device(0),
        );

        let err = plan_mirror(&matrix, Triangle::Upper, &KernelSettings::default()).unwrap_err();

        assert_eq!(
            err,
            TriangularError::from(ShapeError::TooLarge { dim: 70_000 })
        );
    }

    #[test]
    fn empty_matrices_are_a_noop() {
        let plan = plan_mirror(
            &square(0, StorageOrder::ColMajor),
            Triangle::Lower,
            &KernelSettings::default(),
        )
        .unwrap();

        assert!(plan.is_noop());

        let plan = plan_vec_mul(
            &square(0, StorageOrder::ColMajor),
            &vector(0),
            Triangle::Lower,
            Side::Rows,
            &KernelSettings::default(),
        )
        .unwrap();

        assert!(plan.is_noop());
    }

    fn matrix(shape: [usize; 2], order: StorageOrder) -> MatrixDesc {
        MatrixDesc::new(
            MatrixLayout::new(shape, order.strides(shape[0], shape[1])),
            f32::ELEM,
            Placement::Device(0),
        )
    }

    #[test]
    fn transpose_tiles_along_the_contiguous_axis() {
        let settings = KernelSettings::default();

        let col_major = plan_transpose(
            &matrix([100, 40], StorageOrder::ColMajor),
            &matrix([40, 100], StorageOrder::ColMajor),
            &settings,
        )
        .unwrap();
        let row_major = plan_transpose(
            &matrix([100, 40], StorageOrder::RowMajor),
            &matrix([40, 100], StorageOrder::RowMajor),
            &settings,
        )
        .unwrap();

        assert_eq!(
            col_major.variant,
            TransposeVariant {
                tiles_per_fast: 4,
                num_tiles: 8,
            }
        );
        assert_eq!(
            row_major.variant,
            TransposeVariant {
                tiles_per_fast: 2,
                num_tiles: 8,
            }
        );
        assert_eq!(row_major.order, StorageOrder::RowMajor);
        assert_eq!(row_major.geometry.cube_dim, [32, 8, 1]);
    }

    #[test]
    fn transpose_uses_the_row_block_factor() {
        let settings = KernelSettings {
            tile_size: 16,
            row_block_factor: 2,
            ..Default::default()
        };

        let plan = plan_transpose(
            &matrix([2, 3], StorageOrder::RowMajor),
            &matrix([3, 2], StorageOrder::RowMajor),
            &settings,
        )
        .unwrap();

        assert_eq!(plan.geometry.cube_dim, [16, 8, 1]);
        assert_eq!(plan.geometry.cube_count, [1, 1, 1]);
    }

    #[test]
    fn transpose_rejects_mismatched_shapes() {
        let err = plan_transpose(
            &matrix([2, 3], StorageOrder::ColMajor),
            &matrix([2, 3], StorageOrder::ColMajor),
            &KernelSettings::default(),
        )
        .unwrap_err();

        assert_eq!(
            err,
            TriangularError::from(ShapeError::TransposeMismatch {
                rows: 2,
                cols: 3,
                out_rows: 2,
                out_cols: 3,
            })
        );
    }

    #[test]
    fn transpose_rejects_mismatched_orders() {
        let err = plan_transpose(
            &matrix([2, 3], StorageOrder::ColMajor),
            &matrix([3, 2], StorageOrder::RowMajor),
            &KernelSettings::default(),
        )
        .unwrap_err();

        assert_eq!(
            err,
            TriangularError::from(LayoutError::OrderMismatch {
                input: StorageOrder::ColMajor,
                output: StorageOrder::RowMajor,
            })
        );
    }

    #[test]
    fn transpose_accepts_degenerate_outputs_in_any_order() {
        // A single row is both row-major and column-major.
        let plan = plan_transpose(
            &matrix([1, 5], StorageOrder::RowMajor),
            &matrix([5, 1], StorageOrder::ColMajor),
            &KernelSettings::default(),
        )
        .unwrap();
        assert_eq!(plan.order, StorageOrder::ColMajor);
    }

    #[test]
    fn transpose_rejects_outputs_on_another_device() {
        let mut output = matrix([3, 2], StorageOrder::ColMajor);
        output.placement = Placement::Device(2);

        let err = plan_transpose(
            &matrix([2, 3], StorageOrder::ColMajor),
            &output,
            &KernelSettings::default(),
        )
        .unwrap_err();

        assert_eq!(
            err,
            TriangularError::from(PlacementError::DeviceMismatch {
                argument: "output",
                reference: "input",
                expected: 0,
                found: 2,
            })
        );
    }
}
