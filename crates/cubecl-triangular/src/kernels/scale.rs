use cubecl_core as cubecl;
use cubecl_core::prelude::*;

use crate::matrix::MatrixHandleRef;
use crate::{cast_multiplier, FloatElement, LaunchPlan, ScaleVariant, ZeroVariant};

/// First and last (exclusive) row of column `col` that belong to the half.
#[cube]
fn half_rows(
    col: u32,
    dim: u32,
    #[comptime] upper: bool,
    #[comptime] include_diagonal: bool,
) -> (u32, u32) {
    let mut start = 0u32;
    let mut end = col;

    if upper {
        if include_diagonal {
            end = col + 1;
        }
    } else {
        start = col + 1;
        end = dim;
        if include_diagonal {
            start = col;
        }
    }

    (start, end)
}

/// Multiplies one half of a column-major square matrix by `multiplier`, one unit per column.
#[cube(launch_unchecked)]
fn scale_kernel<F: Float>(
    matrix: &mut Tensor<F>,
    multiplier: F,
    #[comptime] upper: bool,
    #[comptime] preserve_diagonal: bool,
) {
    let dim = matrix.shape(0);
    let col = ABSOLUTE_POS;

    if col >= dim {
        terminate!();
    }

    let column = col * matrix.stride(1);
    let (start, end) = half_rows(col, dim, upper, comptime!(!preserve_diagonal));

    for row in start..end {
        matrix[row + column] = matrix[row + column] * multiplier;
    }
}

/// Writes zeros over the strictly triangular part of one half.
#[cube(launch_unchecked)]
fn zero_kernel<F: Float>(matrix: &mut Tensor<F>, #[comptime] upper: bool) {
    let dim = matrix.shape(0);
    let col = ABSOLUTE_POS;

    if col >= dim {
        terminate!();
    }

    let column = col * matrix.stride(1);
    let (start, end) = half_rows(col, dim, upper, false);

    for row in start..end {
        matrix[row + column] = F::from_int(0);
    }
}

/// Launch the scale kernel on a column-major view.
///
/// The multiplier is rounded to `F` before the launch.
pub(crate) fn launch_scale<R: Runtime, F: FloatElement>(
    client: &ComputeClient<R::Server, R::Channel>,
    view: &MatrixHandleRef<'_, R>,
    plan: &LaunchPlan<ScaleVariant>,
) {
    let variant = &plan.variant;
    let multiplier = cast_multiplier::<F>(variant.multiplier);

    unsafe {
        scale_kernel::launch_unchecked::<F, R>(
            client,
            plan.geometry.cube_count(),
            plan.geometry.cube_dim(),
            TensorArg::from_raw_parts::<F>(view.handle, &view.strides, &view.shape, 1),
            ScalarArg::new(multiplier),
            variant.triangle.is_upper(),
            variant.preserve_diagonal,
        );
    }
}

/// Launch the zero kernel on a column-major view.
pub(crate) fn launch_zero<R: Runtime, F: FloatElement>(
    client: &ComputeClient<R::Server, R::Channel>,
    view: &MatrixHandleRef<'_, R>,
    plan: &LaunchPlan<ZeroVariant>,
) {
    unsafe {
        zero_kernel::launch_unchecked::<F, R>(
            client,
            plan.geometry.cube_count(),
            plan.geometry.cube_dim(),
            TensorArg::from_raw_parts::<F>(view.handle, &view.strides, &view.shape, 1),
            plan.variant.triangle.is_upper(),
        );
    }
}
