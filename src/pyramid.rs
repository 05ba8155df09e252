//! Multi-level ROI align over a feature pyramid.
//!
//! Each box is routed to one pyramid level by its size relative to a
//! canonical object scale, cropped from that level, and the crops are put
//! back in the caller's box order.

use crate::config::{GradAccumulation};
use crate::error::{CropResizeError, Result};
use crate::geometry::{BoxAlignment, CropGeometry, NormBox};
use crate::host::{HostStream};
use crate::launch::{try_crop_and_resize, try_crop_and_resize_backward};

use densearray::{ArrayIndex};
use tracing::{trace};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PyramidRoiAlignConfig {
  pub crop_height:          usize,
  pub crop_width:           usize,
  /// Side length, in input image pixels, of an object that maps to
  /// `canonical_level`.
  pub canonical_scale:      f32,
  pub canonical_level:      i32,
  pub min_level:            i32,
  pub max_level:            i32,
  pub alignment:            BoxAlignment,
  pub extrapolation_value:  f32,
}

impl Default for PyramidRoiAlignConfig {
  fn default() -> Self {
    PyramidRoiAlignConfig{
      crop_height:          7,
      crop_width:           7,
      canonical_scale:      224.0,
      canonical_level:      4,
      min_level:            2,
      max_level:            5,
      alignment:            BoxAlignment::Corner,
      extrapolation_value:  0.0,
    }
  }
}

impl PyramidRoiAlignConfig {
  pub fn num_levels(&self) -> usize {
    (self.max_level - self.min_level + 1).max(0) as usize
  }

  /// Pyramid level for a normalized box on an `image_shape = (height,
  /// width)` input.
  pub fn level_for(&self, bbox: &NormBox, image_shape: (usize, usize)) -> i32 {
    let area = bbox.height() * bbox.width();
    if !(area > 0.0) {
      return self.min_level;
    }
    let image_side = ((image_shape.0 * image_shape.1) as f32).sqrt();
    let rel = area.sqrt() * image_side / self.canonical_scale;
    self.level_for_log_scale(rel.log2())
  }

  /// Level for a box whose side is `2^log_rel` times the canonical scale.
  /// Rounds the fractional level as a whole.
  pub fn level_for_log_scale(&self, log_rel: f32) -> i32 {
    let level = (self.canonical_level as f32 + log_rel).round();
    (level as i32).max(self.min_level).min(self.max_level)
  }
}

/// One NHWC level of the pyramid: `dim = (depth, width, height, batch)`.
#[derive(Clone, Copy, Debug)]
pub struct FeatureLevel<'a> {
  pub dim:  (usize, usize, usize, usize),
  pub buf:  &'a [f32],
}

fn check_levels(dims: &[(usize, usize, usize, usize)], cfg: &PyramidRoiAlignConfig) -> Result<(usize, usize)> {
  if dims.len() != cfg.num_levels() || dims.is_empty() {
    return Err(CropResizeError::InvalidDim(format!(
        "expected {} pyramid levels ({}..={}), got {}",
        cfg.num_levels(), cfg.min_level, cfg.max_level, dims.len())));
  }
  let (batch, depth) = (dims[0].3, dims[0].0);
  for (idx, dim) in dims.iter().enumerate() {
    if dim.3 != batch || dim.0 != depth {
      return Err(CropResizeError::InvalidDim(format!(
          "level {} has batch/depth {}/{}, expected {}/{}",
          cfg.min_level + idx as i32, dim.3, dim.0, batch, depth)));
    }
  }
  Ok((batch, depth))
}

/// Box positions grouped by pyramid level, in input order within a level.
fn route_boxes(boxes: &[f32], image_shape: (usize, usize), cfg: &PyramidRoiAlignConfig) -> Vec<Vec<usize>> {
  let mut routes = vec![Vec::new(); cfg.num_levels()];
  for box_idx in 0 .. boxes.len() / 4 {
    let level = cfg.level_for(&NormBox::from_slice(boxes, box_idx), image_shape);
    routes[(level - cfg.min_level) as usize].push(box_idx);
  }
  routes
}

fn gather_level(positions: &[usize], boxes: &[f32], box_ind: &[i32]) -> (Vec<f32>, Vec<i32>) {
  let mut level_boxes = Vec::with_capacity(4 * positions.len());
  let mut level_ind = Vec::with_capacity(positions.len());
  for &pos in positions {
    level_boxes.extend_from_slice(&boxes[4 * pos .. 4 * pos + 4]);
    level_ind.push(box_ind[pos]);
  }
  (level_boxes, level_ind)
}

fn level_geom(dim: (usize, usize, usize, usize), num_boxes: usize, cfg: &PyramidRoiAlignConfig) -> CropGeometry {
  CropGeometry{
    num_boxes:    num_boxes,
    batch:        dim.3,
    image_height: dim.2,
    image_width:  dim.1,
    crop_height:  cfg.crop_height,
    crop_width:   cfg.crop_width,
    depth:        dim.0,
  }
}

fn check_box_list(boxes: &[f32], box_ind: &[i32]) -> Result<()> {
  if boxes.len() != 4 * box_ind.len() {
    return Err(CropResizeError::ShapeMismatch{
      what:     "boxes",
      expected: 4 * box_ind.len(),
      actual:   boxes.len(),
    });
  }
  Ok(())
}

/// Returns the level assigned to each box.
pub fn assign_levels(boxes: &[f32], image_shape: (usize, usize), cfg: &PyramidRoiAlignConfig) -> Vec<i32> {
  (0 .. boxes.len() / 4)
    .map(|box_idx| cfg.level_for(&NormBox::from_slice(boxes, box_idx), image_shape))
    .collect()
}

/// Crops every box from its assigned level. Output is laid out as
/// `(num_boxes, crop_height, crop_width, depth)` in input box order.
pub fn pyramid_roi_align(
    levels: &[FeatureLevel],
    boxes: &[f32],
    box_ind: &[i32],
    image_shape: (usize, usize),
    cfg: &PyramidRoiAlignConfig,
    stream: &HostStream)
    -> Result<Vec<f32>>
{
  let dims: Vec<_> = levels.iter().map(|level| level.dim).collect();
  let (_, depth) = check_levels(&dims, cfg)?;
  check_box_list(boxes, box_ind)?;
  let num_boxes = box_ind.len();
  let crop_len = cfg.crop_height * cfg.crop_width * depth;
  let mut out = vec![cfg.extrapolation_value; num_boxes * crop_len];

  for (idx, positions) in route_boxes(boxes, image_shape, cfg).iter().enumerate() {
    if positions.is_empty() {
      continue;
    }
    let level = &levels[idx];
    trace!(level = cfg.min_level + idx as i32, num_boxes = positions.len(), "pyramid level crop");
    let (level_boxes, level_ind) = gather_level(positions, boxes, box_ind);
    let geom = level_geom(level.dim, positions.len(), cfg);
    let level_boxes = cfg.alignment.align_all(&level_boxes, &geom);
    let mut crops = vec![0.0; geom.crops_len()];
    try_crop_and_resize(
        level.buf, &level_boxes, &level_ind, &geom,
        cfg.extrapolation_value, &mut crops, stream)?;
    for (k, &pos) in positions.iter().enumerate() {
      out[pos * crop_len .. (pos + 1) * crop_len]
        .copy_from_slice(&crops[k * crop_len .. (k + 1) * crop_len]);
    }
  }
  Ok(out)
}

/// Scatters crop gradients back onto the pyramid. Returns one zero-initialized
/// gradient buffer per level, shaped like `level_dims`.
pub fn pyramid_roi_align_backward(
    grads: &[f32],
    level_dims: &[(usize, usize, usize, usize)],
    boxes: &[f32],
    box_ind: &[i32],
    image_shape: (usize, usize),
    cfg: &PyramidRoiAlignConfig,
    accumulate: GradAccumulation,
    stream: &HostStream)
    -> Result<Vec<Vec<f32>>>
{
  let (_, depth) = check_levels(level_dims, cfg)?;
  check_box_list(boxes, box_ind)?;
  let crop_len = cfg.crop_height * cfg.crop_width * depth;
  if grads.len() != box_ind.len() * crop_len {
    return Err(CropResizeError::ShapeMismatch{
      what:     "grads",
      expected: box_ind.len() * crop_len,
      actual:   grads.len(),
    });
  }

  let mut level_grads: Vec<Vec<f32>> = level_dims.iter().map(|dim| vec![0.0; dim.flat_len()]).collect();
  for (idx, positions) in route_boxes(boxes, image_shape, cfg).iter().enumerate() {
    if positions.is_empty() {
      continue;
    }
    let (level_boxes, level_ind) = gather_level(positions, boxes, box_ind);
    let geom = level_geom(level_dims[idx], positions.len(), cfg);
    let level_boxes = cfg.alignment.align_all(&level_boxes, &geom);
    let mut level_crop_grads = Vec::with_capacity(geom.crops_len());
    for &pos in positions {
      level_crop_grads.extend_from_slice(&grads[pos * crop_len .. (pos + 1) * crop_len]);
    }
    try_crop_and_resize_backward(
        &level_crop_grads, &level_boxes, &level_ind, &geom,
        &mut level_grads[idx], accumulate, stream)?;
  }
  Ok(level_grads)
}
