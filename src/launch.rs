//! Host launch entry points.
//!
//! The plain entry points are the hot path: they only validate their inputs
//! in debug builds. The `try_` variants validate every length and index up
//! front and report problems as `CropResizeError`.

use crate::config::{GradAccumulation};
use crate::error::{CropResizeError, Result};
use crate::geometry::{CropGeometry};
use crate::host::{self, HostStream, batch_index};

use tracing::{Level, debug, enabled, warn};

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
  if expected != actual {
    return Err(CropResizeError::ShapeMismatch{what, expected, actual});
  }
  Ok(())
}

/// Validates the geometry against the box list and index list.
pub fn check_boxes(boxes: &[f32], box_ind: &[i32], geom: &CropGeometry) -> Result<()> {
  if geom.crop_height == 0 || geom.crop_width == 0 {
    return Err(CropResizeError::InvalidDim(format!(
        "crop size must be positive, got {}x{}", geom.crop_height, geom.crop_width)));
  }
  if geom.image_height == 0 || geom.image_width == 0 || geom.depth == 0 {
    return Err(CropResizeError::InvalidDim(format!(
        "image dims must be positive, got {}x{}x{}", geom.image_height, geom.image_width, geom.depth)));
  }
  check_len("boxes", 4 * geom.num_boxes, boxes.len())?;
  check_len("box_ind", geom.num_boxes, box_ind.len())?;
  for (box_idx, &index) in box_ind.iter().enumerate() {
    if batch_index(index, geom.batch).is_none() {
      return Err(CropResizeError::BoxIndexOutOfRange{box_idx, index, batch: geom.batch});
    }
  }
  Ok(())
}

fn check_fwd(image: &[f32], boxes: &[f32], box_ind: &[i32], geom: &CropGeometry, crops: &[f32]) -> Result<()> {
  check_boxes(boxes, box_ind, geom)?;
  check_len("image", geom.image_len(), image.len())?;
  check_len("crops", geom.crops_len(), crops.len())
}

fn check_bwd(grads: &[f32], boxes: &[f32], box_ind: &[i32], geom: &CropGeometry, grads_image: &[f32]) -> Result<()> {
  check_boxes(boxes, box_ind, geom)?;
  check_len("grads", geom.crops_len(), grads.len())?;
  check_len("grads_image", geom.image_len(), grads_image.len())
}

/// Number of boxes the host kernels will skip, or `None` without scanning
/// when `WARN` events are filtered out.
fn dropped_boxes(box_ind: &[i32], batch: usize) -> Option<usize> {
  if !enabled!(Level::WARN) {
    return None;
  }
  Some(box_ind.iter().filter(|&&index| batch_index(index, batch).is_none()).count())
}

fn warn_dropped_boxes(box_ind: &[i32], batch: usize) {
  match dropped_boxes(box_ind, batch) {
    Some(dropped) if dropped > 0 => {
      warn!(dropped, batch, "boxes with out-of-range batch index are skipped");
    }
    _ => {}
  }
}

/// Samples `geom.num_boxes` crops of `crop_height x crop_width` from `image`.
///
/// `crops` is fully overwritten. Samples outside the image take
/// `extrapolation_value`.
pub fn crop_and_resize(
    image: &[f32],
    boxes: &[f32],
    box_ind: &[i32],
    geom: &CropGeometry,
    extrapolation_value: f32,
    crops: &mut [f32],
    stream: &HostStream)
{
  if cfg!(debug_assertions) {
    if let Err(e) = check_fwd(image, boxes, box_ind, geom, crops) {
      panic!("crop_and_resize: {}", e);
    }
  } else {
    warn_dropped_boxes(box_ind, geom.batch);
  }
  debug!(
      num_boxes = geom.num_boxes, batch = geom.batch,
      image_height = geom.image_height, image_width = geom.image_width,
      crop_height = geom.crop_height, crop_width = geom.crop_width, depth = geom.depth,
      "crop_and_resize fwd");
  stream.install(|| {
    host::crop_and_resize_fwd(image, boxes, box_ind, geom, extrapolation_value, crops)
  });
}

/// Adds the gradient of `crop_and_resize` with respect to the image into
/// `grads_image`, which the caller must have zeroed for a fresh gradient.
pub fn crop_and_resize_backward(
    grads: &[f32],
    boxes: &[f32],
    box_ind: &[i32],
    geom: &CropGeometry,
    grads_image: &mut [f32],
    accumulate: GradAccumulation,
    stream: &HostStream)
{
  if cfg!(debug_assertions) {
    if let Err(e) = check_bwd(grads, boxes, box_ind, geom, grads_image) {
      panic!("crop_and_resize_backward: {}", e);
    }
  } else {
    warn_dropped_boxes(box_ind, geom.batch);
  }
  debug!(
      num_boxes = geom.num_boxes, batch = geom.batch,
      image_height = geom.image_height, image_width = geom.image_width,
      crop_height = geom.crop_height, crop_width = geom.crop_width, depth = geom.depth,
      accumulate = ?accumulate,
      "crop_and_resize bwd");
  stream.install(|| {
    host::crop_and_resize_bwd(grads, boxes, box_ind, geom, grads_image, accumulate)
  });
}

pub fn try_crop_and_resize(
    image: &[f32],
    boxes: &[f32],
    box_ind: &[i32],
    geom: &CropGeometry,
    extrapolation_value: f32,
    crops: &mut [f32],
    stream: &HostStream)
    -> Result<()>
{
  check_fwd(image, boxes, box_ind, geom, crops)?;
  crop_and_resize(image, boxes, box_ind, geom, extrapolation_value, crops, stream);
  Ok(())
}

pub fn try_crop_and_resize_backward(
    grads: &[f32],
    boxes: &[f32],
    box_ind: &[i32],
    geom: &CropGeometry,
    grads_image: &mut [f32],
    accumulate: GradAccumulation,
    stream: &HostStream)
    -> Result<()>
{
  check_bwd(grads, boxes, box_ind, geom, grads_image)?;
  crop_and_resize_backward(grads, boxes, box_ind, geom, grads_image, accumulate, stream);
  Ok(())
}
