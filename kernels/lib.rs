extern crate libc;
#[cfg(feature = "cuda")]
extern crate cuda;

#[cfg(feature = "cuda")]
pub use self::ffi::*;

#[cfg(feature = "cuda")]
mod ffi {
  use cuda::ffi::runtime::{cudaStream_t};
  use libc::*;

  #[link(name = "cropresize_cuda_kernels", kind = "static")]
  extern "C" {
    pub fn cropresize_cuda_crop_and_resize_fwd(
        image: *const f32,
        boxes: *const f32,
        box_ind: *const c_int,
        num_boxes: c_int,
        batch: c_int,
        image_height: c_int,
        image_width: c_int,
        crop_height: c_int,
        crop_width: c_int,
        depth: c_int,
        extrapolation_value: f32,
        crops: *mut f32,
        stream: cudaStream_t,
        device_id: c_int);
    pub fn cropresize_cuda_crop_and_resize_bwd(
        grads: *const f32,
        boxes: *const f32,
        box_ind: *const c_int,
        num_boxes: c_int,
        batch: c_int,
        image_height: c_int,
        image_width: c_int,
        crop_height: c_int,
        crop_width: c_int,
        depth: c_int,
        grads_image: *mut f32,
        stream: cudaStream_t,
        device_id: c_int);
  }
}
