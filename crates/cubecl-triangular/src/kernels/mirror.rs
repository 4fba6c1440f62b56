use cubecl_core as cubecl;
use cubecl_core::prelude::*;

use crate::matrix::MatrixHandleRef;
use crate::{FloatElement, LaunchPlan, MirrorVariant};

/// Copies one half of a column-major square matrix onto the other one.
///
/// Unit `j` owns the `j` off-diagonal elements of column `j` (lower to upper) or of row `j`
/// (upper to lower), so no two units write the same element. Reads only touch the source
/// half, which is never written.
#[cube(launch_unchecked)]
fn mirror_kernel<F: Float>(matrix: &mut Tensor<F>, #[comptime] upper: bool) {
    let dim = matrix.shape(0);
    let pivot = ABSOLUTE_POS;

    if pivot >= dim {
        terminate!();
    }

    let ld = matrix.stride(1);
    let column = pivot * ld;

    for other in 0..pivot {
        if upper {
            // (other, pivot) -> (pivot, other)
            matrix[pivot + other * ld] = matrix[other + column];
        } else {
            // (pivot, other) -> (other, pivot)
            matrix[other + column] = matrix[pivot + other * ld];
        }
    }
}

/// Launch the mirror kernel on a column-major view.
pub(crate) fn launch_mirror<R: Runtime, F: FloatElement>(
    client: &ComputeClient<R::Server, R::Channel>,
    view: &MatrixHandleRef<'_, R>,
    plan: &LaunchPlan<MirrorVariant>,
) {
    unsafe {
        mirror_kernel::launch_unchecked::<F, R>(
            client,
            plan.geometry.cube_count(),
            plan.geometry.cube_dim(),
            TensorArg::from_raw_parts::<F>(view.handle, &view.strides, &view.shape, 1),
            plan.variant.source.is_upper(),
        );
    }
}
