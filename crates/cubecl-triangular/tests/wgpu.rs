#![cfg(feature = "wgpu")]

pub type TestRuntime = cubecl_wgpu::WgpuRuntime;

cubecl_triangular::testgen_triangular!();
