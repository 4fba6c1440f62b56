mod mirror;
mod scale;
mod transpose;
mod vec_mul;

pub(crate) use mirror::*;
pub(crate) use scale::*;
pub(crate) use transpose::*;
pub(crate) use vec_mul::*;
