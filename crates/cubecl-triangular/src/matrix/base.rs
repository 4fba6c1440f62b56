use core::marker::PhantomData;

use cubecl_core::ir::Elem;
use cubecl_core::prelude::*;
use cubecl_runtime::server::Handle;

use super::{MatrixLayout, StorageOrder};
use crate::{FloatElement, LayoutError, MatrixDesc, Placement, VectorDesc};

/// Matrix representation containing a [server handle](Handle) as well as its 2-D metadata.
pub struct MatrixHandle<R: Runtime> {
    /// The buffer where the data are stored.
    pub handle: Handle,
    /// Rows and columns.
    pub shape: [usize; 2],
    /// Distance between consecutive rows and consecutive columns.
    pub strides: [usize; 2],
    pub elem: Elem,
    pub placement: Placement,
    runtime: PhantomData<R>,
}

impl<R: Runtime> core::fmt::Debug for MatrixHandle<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!(
            "Matrix {{ shape: {:?}, strides: {:?}, runtime: {}, elem: {:?}, placement: {:?} }}",
            self.shape,
            self.strides,
            core::any::type_name::<R>(),
            self.elem,
            self.placement,
        ))
    }
}

impl<R: Runtime> Clone for MatrixHandle<R> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            shape: self.shape,
            strides: self.strides,
            elem: self.elem,
            placement: self.placement,
            runtime: PhantomData,
        }
    }
}

impl<R: Runtime> MatrixHandle<R> {
    /// Create a new matrix.
    pub fn new(
        handle: Handle,
        shape: [usize; 2],
        strides: [usize; 2],
        elem: Elem,
        placement: Placement,
    ) -> Self {
        Self {
            handle,
            shape,
            strides,
            elem,
            placement,
            runtime: PhantomData,
        }
    }

    /// Upload `data`, laid out in `order`, to the device of `client`.
    pub fn from_data<F: FloatElement>(
        client: &ComputeClient<R::Server, R::Channel>,
        device: usize,
        data: &[F],
        shape: [usize; 2],
        order: StorageOrder,
    ) -> Self {
        assert_eq!(
            data.len(),
            shape[0] * shape[1],
            "data doesn't match the matrix shape"
        );
        let handle = client.create(F::as_bytes(data));

        Self::new(
            handle,
            shape,
            order.strides(shape[0], shape[1]),
            F::ELEM,
            Placement::Device(device),
        )
    }

    /// Allocate an uninitialized matrix on the device of `client`.
    pub fn empty<F: FloatElement>(
        client: &ComputeClient<R::Server, R::Channel>,
        device: usize,
        shape: [usize; 2],
        order: StorageOrder,
    ) -> Self {
        let size = core::mem::size_of::<F>() * shape[0] * shape[1];
        let handle = client.empty(size);

        Self::new(
            handle,
            shape,
            order.strides(shape[0], shape[1]),
            F::ELEM,
            Placement::Device(device),
        )
    }

    pub fn as_ref(&self) -> MatrixHandleRef<'_, R> {
        MatrixHandleRef {
            handle: &self.handle,
            shape: self.shape,
            strides: self.strides,
            elem: self.elem,
            placement: self.placement,
            runtime: PhantomData,
        }
    }

    /// Read the matrix back in its storage order.
    ///
    /// Blocks until every operation enqueued on `client` has completed.
    pub fn read<F: FloatElement>(&self, client: &ComputeClient<R::Server, R::Channel>) -> Vec<F> {
        let bytes = client.read_one(self.handle.clone().binding());
        F::from_bytes(&bytes).to_vec()
    }
}

/// Borrowed matrix, the argument type of every operation.
pub struct MatrixHandleRef<'a, R: Runtime> {
    pub handle: &'a Handle,
    pub shape: [usize; 2],
    pub strides: [usize; 2],
    pub elem: Elem,
    pub placement: Placement,
    runtime: PhantomData<R>,
}

impl<R: Runtime> Clone for MatrixHandleRef<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Runtime> Copy for MatrixHandleRef<'_, R> {}

impl<'a, R: Runtime> MatrixHandleRef<'a, R> {
    pub fn new(
        handle: &'a Handle,
        shape: [usize; 2],
        strides: [usize; 2],
        elem: Elem,
        placement: Placement,
    ) -> Self {
        Self {
            handle,
            shape,
            strides,
            elem,
            placement,
            runtime: PhantomData,
        }
    }

    pub fn layout(&self) -> MatrixLayout {
        MatrixLayout::new(self.shape, self.strides)
    }

    /// Storage order deduced from the strides.
    pub fn order(&self) -> Result<StorageOrder, LayoutError> {
        self.layout().order()
    }

    pub fn desc(&self) -> MatrixDesc {
        MatrixDesc::new(self.layout(), self.elem, self.placement)
    }

    /// The same buffer seen as a column-major matrix.
    ///
    /// A row-major matrix is reinterpreted as its column-major transpose.
    pub(crate) fn col_major_view(&self, order: StorageOrder) -> Self {
        match order {
            StorageOrder::ColMajor => *self,
            StorageOrder::RowMajor => {
                let transposed = self.layout().logical_transpose();
                Self::new(
                    self.handle,
                    transposed.shape(),
                    transposed.strides,
                    self.elem,
                    self.placement,
                )
            }
        }
    }
}

/// Borrowed contiguous vector.
pub struct VectorHandleRef<'a, R: Runtime> {
    pub handle: &'a Handle,
    pub len: usize,
    pub stride: usize,
    pub elem: Elem,
    pub placement: Placement,
    runtime: PhantomData<R>,
}

impl<R: Runtime> Clone for VectorHandleRef<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Runtime> Copy for VectorHandleRef<'_, R> {}

impl<'a, R: Runtime> VectorHandleRef<'a, R> {
    pub fn new(
        handle: &'a Handle,
        len: usize,
        stride: usize,
        elem: Elem,
        placement: Placement,
    ) -> Self {
        Self {
            handle,
            len,
            stride,
            elem,
            placement,
            runtime: PhantomData,
        }
    }

    pub fn desc(&self) -> VectorDesc {
        VectorDesc::new(self.len, self.stride, self.elem, self.placement)
    }
}
