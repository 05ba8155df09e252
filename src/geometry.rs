//! Box geometry shared by the forward and backward samplers.
//!
//! Both directions must agree bit-for-bit on where a crop element samples the
//! source image, so the coordinate mapping lives here and nowhere else.

use densearray::{ArrayIndex};

/// Sizes of one crop-and-resize launch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropGeometry {
  pub num_boxes:    usize,
  pub batch:        usize,
  pub image_height: usize,
  pub image_width:  usize,
  pub crop_height:  usize,
  pub crop_width:   usize,
  pub depth:        usize,
}

impl CropGeometry {
  /// NHWC image extent, fastest axis first: `(depth, width, height, batch)`.
  pub fn image_dim(&self) -> (usize, usize, usize, usize) {
    (self.depth, self.image_width, self.image_height, self.batch)
  }

  pub fn crops_dim(&self) -> (usize, usize, usize, usize) {
    (self.depth, self.crop_width, self.crop_height, self.num_boxes)
  }

  pub fn image_len(&self) -> usize {
    self.image_dim().flat_len()
  }

  pub fn crops_len(&self) -> usize {
    self.crops_dim().flat_len()
  }

  pub fn crop_row_len(&self) -> usize {
    self.crop_width * self.depth
  }
}

/// A normalized `(y1, x1, y2, x2)` box. Zero maps to the first pixel
/// row/column and one maps to the last.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormBox {
  pub y1: f32,
  pub x1: f32,
  pub y2: f32,
  pub x2: f32,
}

impl NormBox {
  pub fn new(y1: f32, x1: f32, y2: f32, x2: f32) -> NormBox {
    NormBox{y1, x1, y2, x2}
  }

  pub fn from_slice(boxes: &[f32], box_idx: usize) -> NormBox {
    let b = &boxes[4 * box_idx .. 4 * box_idx + 4];
    NormBox{y1: b[0], x1: b[1], y2: b[2], x2: b[3]}
  }

  pub fn write_to(&self, boxes: &mut [f32], box_idx: usize) {
    boxes[4 * box_idx .. 4 * box_idx + 4].copy_from_slice(&[self.y1, self.x1, self.y2, self.x2]);
  }

  pub fn height(&self) -> f32 {
    self.y2 - self.y1
  }

  pub fn width(&self) -> f32 {
    self.x2 - self.x1
  }
}

/// Source coordinate convention of incoming boxes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoxAlignment {
  /// Zero and one are the centres of the first and last pixels.
  Corner,
  /// Pixel centres sit at `(y + 0.5, x + 0.5)`, so zero and one are the
  /// outer image borders; crop pixels are sampled at their centres.
  BorderAware,
}

impl Default for BoxAlignment {
  fn default() -> Self {
    BoxAlignment::Corner
  }
}

fn align_axis(lo: f32, hi: f32, crop_len: usize, image_len: usize) -> (f32, f32) {
  if image_len <= 1 {
    return (0.0, 0.0);
  }
  let n = image_len as f32;
  let extent = (image_len - 1) as f32;
  let crop = crop_len as f32;
  let span = (hi - lo) * n;
  let lo_px = lo * n + 0.5 * span / crop - 0.5;
  let aligned_lo = lo_px / extent;
  let aligned_hi = aligned_lo + span * (crop - 1.0) / (crop * extent);
  (aligned_lo, aligned_hi)
}

impl BoxAlignment {
  /// Converts a box in this convention to the equivalent corner box.
  pub fn align(&self, bbox: NormBox, geom: &CropGeometry) -> NormBox {
    match *self {
      BoxAlignment::Corner => bbox,
      BoxAlignment::BorderAware => {
        let (y1, y2) = align_axis(bbox.y1, bbox.y2, geom.crop_height, geom.image_height);
        let (x1, x2) = align_axis(bbox.x1, bbox.x2, geom.crop_width, geom.image_width);
        NormBox{y1, x1, y2, x2}
      }
    }
  }

  /// Aligns a flat `(y1, x1, y2, x2)` box list into a new list.
  pub fn align_all(&self, boxes: &[f32], geom: &CropGeometry) -> Vec<f32> {
    let mut aligned = boxes.to_vec();
    if *self == BoxAlignment::Corner {
      return aligned;
    }
    for box_idx in 0 .. boxes.len() / 4 {
      let bbox = self.align(NormBox::from_slice(boxes, box_idx), geom);
      bbox.write_to(&mut aligned, box_idx);
    }
    aligned
  }
}

/// Absolute source coordinate of crop element `i` along one axis.
#[inline]
pub fn axis_coord(lo: f32, hi: f32, i: usize, crop_len: usize, image_len: usize) -> f32 {
  let extent = image_len.saturating_sub(1) as f32;
  if crop_len > 1 {
    let scale = (hi - lo) * extent / (crop_len - 1) as f32;
    lo * extent + i as f32 * scale
  } else {
    0.5 * (lo + hi) * extent
  }
}

/// The two neighbouring integer positions around a source coordinate and the
/// weight of the upper one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisTap {
  pub lo:   usize,
  pub hi:   usize,
  pub lerp: f32,
}

impl AxisTap {
  /// Returns `None` when `coord` lies outside `[0, image_len - 1]`.
  #[inline]
  pub fn at(coord: f32, image_len: usize) -> Option<AxisTap> {
    let extent = image_len.saturating_sub(1) as f32;
    // NaN lands here as well.
    if !(coord >= 0.0 && coord <= extent) || image_len == 0 {
      return None;
    }
    let lo = coord.floor();
    let hi = coord.ceil();
    Some(AxisTap{
      lo:   lo as usize,
      hi:   hi as usize,
      lerp: coord - lo,
    })
  }
}

/// Row and column taps for crop row `y` of a box.
#[inline]
pub fn row_tap(bbox: &NormBox, y: usize, geom: &CropGeometry) -> Option<AxisTap> {
  AxisTap::at(axis_coord(bbox.y1, bbox.y2, y, geom.crop_height, geom.image_height), geom.image_height)
}

#[inline]
pub fn col_tap(bbox: &NormBox, x: usize, geom: &CropGeometry) -> Option<AxisTap> {
  AxisTap::at(axis_coord(bbox.x1, bbox.x2, x, geom.crop_width, geom.image_width), geom.image_width)
}
