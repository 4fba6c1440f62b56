use cubecl_core as cubecl;
use cubecl_core::prelude::*;

use crate::matrix::{MatrixHandleRef, StorageOrder};
use crate::{FloatElement, LaunchPlan, TransposeVariant};

/// Out-of-place transpose, the output having the storage order of the input.
///
/// The kernel works on the contiguous (fast) and the strided (slow) axes of the input, which
/// are the rows and the columns for column-major storage and the other way around for
/// row-major storage. Tiles are numbered along the fast axis first. Unit `x` walks the fast
/// axis on the read and on the write so both are coalesced, and the padded stride keeps the
/// transposed read from shared memory free of bank conflicts.
#[cube(launch_unchecked)]
fn transpose_kernel<F: Float>(
    input: &Tensor<F>,
    output: &mut Tensor<F>,
    tiles_per_fast: u32,
    num_tiles: u32,
    #[comptime] tile_size: u32,
    #[comptime] block_rows: u32,
    #[comptime] row_major: bool,
) {
    if CUBE_POS >= num_tiles {
        terminate!();
    }

    let mut fast = input.shape(0);
    let mut slow = input.shape(1);
    let mut ld_in = input.stride(1);
    let mut ld_out = output.stride(1);

    if row_major {
        fast = input.shape(1);
        slow = input.shape(0);
        ld_in = input.stride(0);
        ld_out = output.stride(0);
    }

    let padded_stride = comptime!(tile_size + 1);

    let fast_base = (CUBE_POS % tiles_per_fast) * tile_size;
    let slow_base = (CUBE_POS / tiles_per_fast) * tile_size;

    let mut tile = SharedMemory::<F>::new(comptime!(padded_stride * tile_size));
    let unit_x = UNIT_POS_X;

    let mut offset = UNIT_POS_Y;
    while offset < tile_size {
        let index_fast = fast_base + unit_x;
        let index_slow = slow_base + offset;

        if index_fast < fast && index_slow < slow {
            tile[offset * padded_stride + unit_x] = input[index_fast + index_slow * ld_in];
        }

        offset += block_rows;
    }

    sync_units();

    // The slow axis of the input is the fast axis of the output.
    let mut offset = UNIT_POS_Y;
    while offset < tile_size {
        let out_fast = slow_base + unit_x;
        let out_slow = fast_base + offset;

        if out_fast < slow && out_slow < fast {
            output[out_fast + out_slow * ld_out] = tile[unit_x * padded_stride + offset];
        }

        offset += block_rows;
    }
}

/// Launch the transpose engine, `input` and `output` sharing the storage order of the plan.
pub(crate) fn launch_transpose<R: Runtime, F: FloatElement>(
    client: &ComputeClient<R::Server, R::Channel>,
    input: &MatrixHandleRef<'_, R>,
    output: &MatrixHandleRef<'_, R>,
    plan: &LaunchPlan<TransposeVariant>,
) {
    unsafe {
        transpose_kernel::launch_unchecked::<F, R>(
            client,
            plan.geometry.cube_count(),
            plan.geometry.cube_dim(),
            TensorArg::from_raw_parts::<F>(input.handle, &input.strides, &input.shape, 1),
            TensorArg::from_raw_parts::<F>(output.handle, &output.strides, &output.shape, 1),
            ScalarArg::new(plan.variant.tiles_per_fast),
            ScalarArg::new(plan.variant.num_tiles),
            plan.settings.tile_size,
            plan.settings.block_rows(),
            plan.order == StorageOrder::RowMajor,
        );
    }
}
