use cubecl_core as cubecl;
use cubecl_core::prelude::*;

use crate::index::tile_coords;
use crate::matrix::{MatrixHandleRef, Side, VectorHandleRef};
use crate::{FloatElement, LaunchPlan, VecMulVariant};

/// Scales the rows or columns of one half of a column-major square matrix by a vector.
///
/// Every cube owns a tile of the triangular tile grid. The vector segment matching the tile
/// and the tile itself are staged in shared memory, scaled there and written back. Tiles
/// crossing the diagonal only update the elements belonging to the half, diagonal included.
#[cube(launch_unchecked)]
fn vec_mul_kernel<F: Float>(
    matrix: &mut Tensor<F>,
    vector: &Array<F>,
    num_tiles: u32,
    #[comptime] tile_size: u32,
    #[comptime] block_rows: u32,
    #[comptime] upper: bool,
    #[comptime] scale_rows: bool,
) {
    // Uniform across the cube, so no unit is left waiting on the barrier.
    if CUBE_POS >= num_tiles {
        terminate!();
    }

    let dim = matrix.shape(0);
    let ld = matrix.stride(1);
    let padded_stride = comptime!(tile_size + 1);

    let (tile_row, tile_col) = tile_coords(CUBE_POS, upper);
    let row_base = tile_row * tile_size;
    let col_base = tile_col * tile_size;

    let mut tile = SharedMemory::<F>::new(comptime!(padded_stride * tile_size));
    let mut segment = SharedMemory::<F>::new(tile_size);

    let unit_x = UNIT_POS_X;
    let row = row_base + unit_x;

    if UNIT_POS_Y == 0 {
        let mut segment_base = col_base;
        if scale_rows {
            segment_base = row_base;
        }

        if segment_base + unit_x < dim {
            segment[unit_x] = vector[segment_base + unit_x];
        }
    }

    let mut col_offset = UNIT_POS_Y;
    while col_offset < tile_size {
        let col = col_base + col_offset;

        if row < dim && col < dim {
            tile[col_offset * padded_stride + unit_x] = matrix[row + col * ld];
        }

        col_offset += block_rows;
    }

    sync_units();

    let mut col_offset = UNIT_POS_Y;
    while col_offset < tile_size {
        let col = col_base + col_offset;

        let mut in_half = row >= col;
        if upper {
            in_half = row <= col;
        }

        if row < dim && col < dim && in_half {
            let mut factor = segment[col_offset];
            if scale_rows {
                factor = segment[unit_x];
            }

            matrix[row + col * ld] = tile[col_offset * padded_stride + unit_x] * factor;
        }

        col_offset += block_rows;
    }
}

/// Launch the vector engine on a column-major view.
pub(crate) fn launch_vec_mul<R: Runtime, F: FloatElement>(
    client: &ComputeClient<R::Server, R::Channel>,
    view: &MatrixHandleRef<'_, R>,
    vector: &VectorHandleRef<'_, R>,
    plan: &LaunchPlan<VecMulVariant>,
) {
    unsafe {
        vec_mul_kernel::launch_unchecked::<F, R>(
            client,
            plan.geometry.cube_count(),
            plan.geometry.cube_dim(),
            TensorArg::from_raw_parts::<F>(view.handle, &view.strides, &view.shape, 1),
            ArrayArg::from_raw_parts::<F>(vector.handle, vector.len, 1),
            ScalarArg::new(plan.variant.num_tiles),
            plan.settings.tile_size,
            plan.settings.block_rows(),
            plan.variant.triangle.is_upper(),
            plan.variant.side == Side::Rows,
        );
    }
}
