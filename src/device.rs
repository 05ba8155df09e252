//! Device launches. The caller owns every buffer, the stream and the
//! synchronisation; these wrappers only translate sizes and forward to the
//! kernels crate.

use crate::error::{CropResizeError, Result};
use crate::geometry::{CropGeometry};

use cropresize_cuda_kernels::*;
use ::cuda::ffi::runtime::{cudaStream_t};
use libc::{c_int};
use tracing::{debug};

use std::convert::{TryFrom};

/// A raw CUDA stream paired with the device it was created on.
#[derive(Clone, Copy)]
pub struct CudaStream {
  pub raw:        cudaStream_t,
  pub device_id:  i32,
}

impl CudaStream {
  pub fn new(raw: cudaStream_t, device_id: i32) -> CudaStream {
    CudaStream{raw, device_id}
  }
}

struct LaunchDims {
  num_boxes:    c_int,
  batch:        c_int,
  image_height: c_int,
  image_width:  c_int,
  crop_height:  c_int,
  crop_width:   c_int,
  depth:        c_int,
}

fn to_c_int(what: &str, value: usize) -> Result<c_int> {
  c_int::try_from(value)
    .map_err(|_| CropResizeError::InvalidDim(format!("{} = {} does not fit a device int", what, value)))
}

impl LaunchDims {
  fn new(geom: &CropGeometry) -> Result<LaunchDims> {
    // Device kernels index flat element counts as `int`.
    to_c_int("crops_len", geom.crops_len())?;
    to_c_int("image_len", geom.image_len())?;
    Ok(LaunchDims{
      num_boxes:    to_c_int("num_boxes", geom.num_boxes)?,
      batch:        to_c_int("batch", geom.batch)?,
      image_height: to_c_int("image_height", geom.image_height)?,
      image_width:  to_c_int("image_width", geom.image_width)?,
      crop_height:  to_c_int("crop_height", geom.crop_height)?,
      crop_width:   to_c_int("crop_width", geom.crop_width)?,
      depth:        to_c_int("depth", geom.depth)?,
    })
  }
}

/// Enqueues the forward sampler on `stream`.
///
/// # Safety
///
/// All pointers must be device pointers on `stream.device_id`, sized per
/// `geom`, and stay alive until the stream is synchronised. `box_ind`
/// entries must lie in `0 .. geom.batch`.
pub unsafe fn crop_and_resize_cuda(
    image: *const f32,
    boxes: *const f32,
    box_ind: *const i32,
    geom: &CropGeometry,
    extrapolation_value: f32,
    crops: *mut f32,
    stream: &CudaStream)
    -> Result<()>
{
  let dims = LaunchDims::new(geom)?;
  debug!(device_id = stream.device_id, num_boxes = geom.num_boxes, "crop_and_resize fwd (cuda)");
  cropresize_cuda_crop_and_resize_fwd(
      image, boxes, box_ind,
      dims.num_boxes, dims.batch, dims.image_height, dims.image_width,
      dims.crop_height, dims.crop_width, dims.depth,
      extrapolation_value,
      crops,
      stream.raw,
      stream.device_id,
  );
  Ok(())
}

/// Enqueues the backward sampler on `stream`; contributions are added into
/// `grads_image`.
///
/// # Safety
///
/// Same requirements as `crop_and_resize_cuda`; `grads_image` must be zeroed
/// by the caller (on the same stream) for a fresh gradient.
pub unsafe fn crop_and_resize_backward_cuda(
    grads: *const f32,
    boxes: *const f32,
    box_ind: *const i32,
    geom: &CropGeometry,
    grads_image: *mut f32,
    stream: &CudaStream)
    -> Result<()>
{
  let dims = LaunchDims::new(geom)?;
  debug!(device_id = stream.device_id, num_boxes = geom.num_boxes, "crop_and_resize bwd (cuda)");
  cropresize_cuda_crop_and_resize_bwd(
      grads, boxes, box_ind,
      dims.num_boxes, dims.batch, dims.image_height, dims.image_width,
      dims.crop_height, dims.crop_width, dims.depth,
      grads_image,
      stream.raw,
      stream.device_id,
  );
  Ok(())
}
