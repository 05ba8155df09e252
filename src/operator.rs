use crate::config::{GradAccumulation};
use crate::error::{CropResizeError, Result};
use crate::geometry::{BoxAlignment, CropGeometry};
use crate::host::{HostStream};
use crate::launch::{try_crop_and_resize, try_crop_and_resize_backward};

use densearray::{ArrayIndex};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropAndResizeOperatorConfig {
  pub crop_height:          usize,
  pub crop_width:           usize,
  pub extrapolation_value:  f32,
  pub alignment:            BoxAlignment,
  pub accumulate:           GradAccumulation,
}

impl CropAndResizeOperatorConfig {
  pub fn new(crop_height: usize, crop_width: usize) -> Self {
    CropAndResizeOperatorConfig{
      crop_height:          crop_height,
      crop_width:           crop_width,
      extrapolation_value:  0.0,
      alignment:            BoxAlignment::Corner,
      accumulate:           GradAccumulation::Atomic,
    }
  }

  pub fn out_dim(&self, num_boxes: usize, depth: usize) -> (usize, usize, usize, usize) {
    (depth, self.crop_width, self.crop_height, num_boxes)
  }
}

struct SavedInputs {
  boxes:    Vec<f32>,
  box_ind:  Vec<i32>,
  geom:     CropGeometry,
}

/// Pairs a forward crop with its backward scatter.
///
/// `_forward` keeps the (aligned) boxes, indices and image dims so that
/// `_backward` only needs the incoming crop gradient.
pub struct CropAndResizeOperator {
  cfg:      CropAndResizeOperatorConfig,
  stream:   HostStream,
  saved:    Option<SavedInputs>,
}

impl CropAndResizeOperator {
  pub fn new(cfg: CropAndResizeOperatorConfig, stream: HostStream) -> CropAndResizeOperator {
    CropAndResizeOperator{
      cfg:      cfg,
      stream:   stream,
      saved:    None,
    }
  }

  pub fn config(&self) -> &CropAndResizeOperatorConfig {
    &self.cfg
  }

  /// `image` is NHWC with `image_dim = (depth, width, height, batch)`.
  /// Returns crops laid out per `cfg.out_dim(num_boxes, depth)`.
  pub fn _forward(&mut self, image: &[f32], image_dim: (usize, usize, usize, usize), boxes: &[f32], box_ind: &[i32]) -> Result<Vec<f32>> {
    let geom = CropGeometry{
      num_boxes:    box_ind.len(),
      batch:        image_dim.3,
      image_height: image_dim.2,
      image_width:  image_dim.1,
      crop_height:  self.cfg.crop_height,
      crop_width:   self.cfg.crop_width,
      depth:        image_dim.0,
    };
    let boxes = self.cfg.alignment.align_all(boxes, &geom);
    let mut crops = vec![0.0; self.cfg.out_dim(geom.num_boxes, geom.depth).flat_len()];
    try_crop_and_resize(image, &boxes, box_ind, &geom, self.cfg.extrapolation_value, &mut crops, &self.stream)?;
    self.saved = Some(SavedInputs{
      boxes:    boxes,
      box_ind:  box_ind.to_vec(),
      geom:     geom,
    });
    Ok(crops)
  }

  /// Returns the gradient with respect to the image of the last `_forward`.
  pub fn _backward(&mut self, grads: &[f32]) -> Result<Vec<f32>> {
    let saved = self.saved.as_ref().ok_or(CropResizeError::BackwardBeforeForward)?;
    let mut grads_image = vec![0.0; saved.geom.image_dim().flat_len()];
    try_crop_and_resize_backward(
        grads, &saved.boxes, &saved.box_ind, &saved.geom,
        &mut grads_image, self.cfg.accumulate, &self.stream)?;
    Ok(grads_image)
  }
}
