use cubecl_core::ir::{Elem, FloatKind};
use cubecl_core::prelude::*;
use cubecl_core::CubeElement;
use half::{bf16, f16};

/// Float types the kernels are instantiated for.
pub trait FloatElement: Float + CubeElement {
    /// Runtime description of the type, used to match a handle against an instantiation.
    const ELEM: Elem;
}

impl FloatElement for f16 {
    const ELEM: Elem = Elem::Float(FloatKind::F16);
}

impl FloatElement for bf16 {
    const ELEM: Elem = Elem::Float(FloatKind::BF16);
}

impl FloatElement for f32 {
    const ELEM: Elem = Elem::Float(FloatKind::F32);
}

impl FloatElement for f64 {
    const ELEM: Elem = Elem::Float(FloatKind::F64);
}

/// Calls `$launch::<R, F>($args)` with `F` the float type described by `$elem`.
///
/// Expands to an early `return` with an [ElemTypeError](crate::ElemTypeError) for any other
/// element type, so it must be used inside a function returning a [TriangularError](crate::TriangularError).
macro_rules! dispatch_float {
    ($elem:expr, $launch:ident::<$runtime:ty>($($arg:expr),* $(,)?)) => {
        match $elem {
            cubecl_core::ir::Elem::Float(cubecl_core::ir::FloatKind::F16) => {
                $launch::<$runtime, half::f16>($($arg),*)
            }
            cubecl_core::ir::Elem::Float(cubecl_core::ir::FloatKind::BF16) => {
                $launch::<$runtime, half::bf16>($($arg),*)
            }
            cubecl_core::ir::Elem::Float(cubecl_core::ir::FloatKind::F32) => {
                $launch::<$runtime, f32>($($arg),*)
            }
            cubecl_core::ir::Elem::Float(cubecl_core::ir::FloatKind::F64) => {
                $launch::<$runtime, f64>($($arg),*)
            }
            elem => {
                return Err($crate::ElemTypeError::Unsupported(elem).into());
            }
        }
    };
}

pub(crate) use dispatch_float;

/// Whether `elem` has a kernel instantiation.
pub fn is_supported(elem: Elem) -> bool {
    matches!(
        elem,
        Elem::Float(FloatKind::F16 | FloatKind::BF16 | FloatKind::F32 | FloatKind::F64)
    )
}

/// Casts the host multiplier to the kernel element type.
///
/// Values out of the range of `F` saturate to the infinity of the same sign.
pub(crate) fn cast_multiplier<F: FloatElement>(multiplier: f64) -> F {
    <F as num_traits::NumCast>::from(multiplier).unwrap_or_else(|| F::new(multiplier as f32))
}
