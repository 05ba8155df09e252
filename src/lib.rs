//! Crop-and-resize (ROI align) sampling kernels with a data-parallel host
//! backend and, behind the `cuda` feature, device launchers.

extern crate cropresize_cuda_kernels;
extern crate byteorder;
extern crate densearray;
#[cfg(feature = "cuda")]
extern crate libc;
extern crate rayon;
extern crate thiserror;
extern crate tracing;

pub mod atomic;
pub mod config;
#[cfg(feature = "cuda")]
pub mod device;
pub mod error;
pub mod geometry;
pub mod host;
pub mod launch;
pub mod operator;
pub mod prelude;
pub mod pyramid;
pub mod util;
