use cubecl_core::prelude::*;

use crate::kernels::{launch_mirror, launch_scale, launch_transpose, launch_vec_mul, launch_zero};
use crate::matrix::{MatrixHandleRef, Side, Triangle, VectorHandleRef};
use crate::{
    dispatch_float, plan_mirror, plan_scale, plan_transpose, plan_vec_mul, plan_zero, DeviceGuard,
    KernelSettings, LaunchPlan, TriangularError,
};

fn trace_geometry<V>(operation: &str, plan: &LaunchPlan<V>) {
    log::trace!(
        "{operation}: cube count {:?}, cube dim {:?} on device {}",
        plan.geometry.cube_count,
        plan.geometry.cube_dim,
        plan.device,
    );
}

/// Copy the `source` half of a square matrix onto the other half, leaving the diagonal as is.
///
/// The matrix is symmetric once the operation completes. The call returns as soon as the
/// kernel is enqueued on `client`.
pub fn mirror_triangle<R: Runtime>(
    client: &ComputeClient<R::Server, R::Channel>,
    matrix: &MatrixHandleRef<'_, R>,
    source: Triangle,
) -> Result<(), TriangularError> {
    mirror_triangle_with_settings(client, matrix, source, &KernelSettings::default())
}

pub fn mirror_triangle_with_settings<R: Runtime>(
    client: &ComputeClient<R::Server, R::Channel>,
    matrix: &MatrixHandleRef<'_, R>,
    source: Triangle,
    settings: &KernelSettings,
) -> Result<(), TriangularError> {
    let plan = plan_mirror(&matrix.desc(), source, settings)?;
    log::debug!(
        "mirror_triangle: {:?} {}x{} matrix, {source:?} half launched as {:?}",
        plan.order,
        matrix.shape[0],
        matrix.shape[1],
        plan.variant.source,
    );

    if plan.is_noop() {
        return Ok(());
    }

    let _guard = DeviceGuard::new(plan.device);
    let view = matrix.col_major_view(plan.order);
    trace_geometry("mirror_triangle", &plan);

    dispatch_float!(plan.elem, launch_mirror::<R>(client, &view, &plan));

    Ok(())
}

/// Multiply the `triangle` half of a square matrix by `multiplier`.
///
/// The diagonal is scaled too unless `preserve_diagonal` is set, in which case it is left
/// bit-identical. The multiplier is rounded to the element type of the matrix, values out of
/// its range become infinite.
pub fn scale_triangle<R: Runtime>(
    client: &ComputeClient<R::Server, R::Channel>,
    matrix: &MatrixHandleRef<'_, R>,
    triangle: Triangle,
    preserve_diagonal: bool,
    multiplier: f64,
) -> Result<(), TriangularError> {
    scale_triangle_with_settings(
        client,
        matrix,
        triangle,
        preserve_diagonal,
        multiplier,
        &KernelSettings::default(),
    )
}

pub fn scale_triangle_with_settings<R: Runtime>(
    client: &ComputeClient<R::Server, R::Channel>,
    matrix: &MatrixHandleRef<'_, R>,
    triangle: Triangle,
    preserve_diagonal: bool,
    multiplier: f64,
    settings: &KernelSettings,
) -> Result<(), TriangularError> {
    let plan = plan_scale(
        &matrix.desc(),
        triangle,
        preserve_diagonal,
        multiplier,
        settings,
    )?;
    log::debug!(
        "scale_triangle: {:?} {}x{} matrix, {triangle:?} half launched as {:?}, preserve diagonal: {preserve_diagonal}",
        plan.order,
        matrix.shape[0],
        matrix.shape[1],
        plan.variant.triangle,
    );

    if plan.is_noop() {
        return Ok(());
    }

    let _guard = DeviceGuard::new(plan.device);
    let view = matrix.col_major_view(plan.order);
    trace_geometry("scale_triangle", &plan);

    dispatch_float!(plan.elem, launch_scale::<R>(client, &view, &plan));

    Ok(())
}

/// Set the strictly triangular part of the `triangle` half to zero.
///
/// Values are overwritten, not multiplied, so non-finite entries are cleared as well.
pub fn zero_triangle<R: Runtime>(
    client: &ComputeClient<R::Server, R::Channel>,
    matrix: &MatrixHandleRef<'_, R>,
    triangle: Triangle,
) -> Result<(), TriangularError> {
    zero_triangle_with_settings(client, matrix, triangle, &KernelSettings::default())
}

pub fn zero_triangle_with_settings<R: Runtime>(
    client: &ComputeClient<R::Server, R::Channel>,
    matrix: &MatrixHandleRef<'_, R>,
    triangle: Triangle,
    settings: &KernelSettings,
) -> Result<(), TriangularError> {
    let plan = plan_zero(&matrix.desc(), triangle, settings)?;
    log::debug!(
        "zero_triangle: {:?} {}x{} matrix, {triangle:?} half launched as {:?}",
        plan.order,
        matrix.shape[0],
        matrix.shape[1],
        plan.variant.triangle,
    );

    if plan.is_noop() {
        return Ok(());
    }

    let _guard = DeviceGuard::new(plan.device);
    let view = matrix.col_major_view(plan.order);
    trace_geometry("zero_triangle", &plan);

    dispatch_float!(plan.elem, launch_zero::<R>(client, &view, &plan));

    Ok(())
}

/// Scale the `triangle` half of a square matrix, diagonal included, by a vector.
///
/// Element `(i, j)` is multiplied by `vector[i]` with [Side::Rows] and by `vector[j]` with
/// [Side::Columns]. The other half is left untouched.
pub fn scale_triangle_by_vector<R: Runtime>(
    client: &ComputeClient<R::Server, R::Channel>,
    matrix: &MatrixHandleRef<'_, R>,
    vector: &VectorHandleRef<'_, R>,
    triangle: Triangle,
    side: Side,
) -> Result<(), TriangularError> {
    scale_triangle_by_vector_with_settings(
        client,
        matrix,
        vector,
        triangle,
        side,
        &KernelSettings::default(),
    )
}

pub fn scale_triangle_by_vector_with_settings<R: Runtime>(
    client: &ComputeClient<R::Server, R::Channel>,
    matrix: &MatrixHandleRef<'_, R>,
    vector: &VectorHandleRef<'_, R>,
    triangle: Triangle,
    side: Side,
    settings: &KernelSettings,
) -> Result<(), TriangularError> {
    let plan = plan_vec_mul(&matrix.desc(), &vector.desc(), triangle, side, settings)?;
    log::debug!(
        "scale_triangle_by_vector: {:?} {}x{} matrix, {triangle:?} half and {side:?} launched as {:?} and {:?} over {} tiles",
        plan.order,
        matrix.shape[0],
        matrix.shape[1],
        plan.variant.triangle,
        plan.variant.side,
        plan.variant.num_tiles,
    );

    if plan.is_noop() {
        return Ok(());
    }

    let _guard = DeviceGuard::new(plan.device);
    let view = matrix.col_major_view(plan.order);
    trace_geometry("scale_triangle_by_vector", &plan);

    dispatch_float!(
        plan.elem,
        launch_vec_mul::<R>(client, &view, vector, &plan)
    );

    Ok(())
}

/// Write the transpose of `input` into `output`, which must be preallocated with the swapped
/// shape and the storage order of `input`.
///
/// `output` must not alias `input`.
pub fn transpose<R: Runtime>(
    client: &ComputeClient<R::Server, R::Channel>,
    input: &MatrixHandleRef<'_, R>,
    output: &MatrixHandleRef<'_, R>,
) -> Result<(), TriangularError> {
    transpose_with_settings(client, input, output, &KernelSettings::default())
}

pub fn transpose_with_settings<R: Runtime>(
    client: &ComputeClient<R::Server, R::Channel>,
    input: &MatrixHandleRef<'_, R>,
    output: &MatrixHandleRef<'_, R>,
    settings: &KernelSettings,
) -> Result<(), TriangularError> {
    let plan = plan_transpose(&input.desc(), &output.desc(), settings)?;
    log::debug!(
        "transpose: {:?} {}x{} matrix over {} tiles",
        plan.order,
        input.shape[0],
        input.shape[1],
        plan.variant.num_tiles,
    );

    if plan.is_noop() {
        return Ok(());
    }

    let _guard = DeviceGuard::new(plan.device);
    trace_geometry("transpose", &plan);

    dispatch_float!(
        plan.elem,
        launch_transpose::<R>(client, input, output, &plan)
    );

    Ok(())
}
