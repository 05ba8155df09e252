#![allow(dead_code)]

use cropresize_cuda::prelude::*;

use rand::{Rng};
use rand::rngs::{StdRng};

pub fn geom(batch: usize, ih: usize, iw: usize, ch: usize, cw: usize, depth: usize, num_boxes: usize) -> CropGeometry {
  CropGeometry{
    num_boxes,
    batch,
    image_height: ih,
    image_width:  iw,
    crop_height:  ch,
    crop_width:   cw,
    depth,
  }
}

/// Scalar reference: one sample at a time, no shared helpers.
pub fn naive_coord(lo: f32, hi: f32, i: usize, crop: usize, image: usize) -> Option<(usize, usize, f32)> {
  let extent = (image - 1) as f32;
  let c = if crop > 1 {
    lo * extent + i as f32 * ((hi - lo) * extent / (crop - 1) as f32)
  } else {
    0.5 * (lo + hi) * extent
  };
  if c < 0.0 || c > extent {
    return None;
  }
  Some((c.floor() as usize, c.ceil() as usize, c - c.floor()))
}

pub fn naive_forward(image: &[f32], boxes: &[f32], box_ind: &[i32], g: &CropGeometry, extrap: f32) -> Vec<f32> {
  let mut out = vec![0.0; g.crops_len()];
  let px = |b: usize, y: usize, x: usize, d: usize| image[((b * g.image_height + y) * g.image_width + x) * g.depth + d];
  for n in 0 .. g.num_boxes {
    let b = box_ind[n] as usize;
    for y in 0 .. g.crop_height {
      for x in 0 .. g.crop_width {
        for d in 0 .. g.depth {
          let o = ((n * g.crop_height + y) * g.crop_width + x) * g.depth + d;
          let ry = naive_coord(boxes[4 * n], boxes[4 * n + 2], y, g.crop_height, g.image_height);
          let rx = naive_coord(boxes[4 * n + 1], boxes[4 * n + 3], x, g.crop_width, g.image_width);
          out[o] = match (ry, rx) {
            (Some((t, bt, yl)), Some((l, r, xl))) => {
              let top = px(b, t, l, d) + (px(b, t, r, d) - px(b, t, l, d)) * xl;
              let bot = px(b, bt, l, d) + (px(b, bt, r, d) - px(b, bt, l, d)) * xl;
              top + (bot - top) * yl
            }
            _ => extrap,
          };
        }
      }
    }
  }
  out
}

pub fn naive_backward(grads: &[f32], boxes: &[f32], box_ind: &[i32], g: &CropGeometry) -> Vec<f64> {
  let mut out = vec![0.0f64; g.image_len()];
  let at = |b: usize, y: usize, x: usize, d: usize| ((b * g.image_height + y) * g.image_width + x) * g.depth + d;
  for n in 0 .. g.num_boxes {
    let b = box_ind[n] as usize;
    for y in 0 .. g.crop_height {
      for x in 0 .. g.crop_width {
        let ry = naive_coord(boxes[4 * n], boxes[4 * n + 2], y, g.crop_height, g.image_height);
        let rx = naive_coord(boxes[4 * n + 1], boxes[4 * n + 3], x, g.crop_width, g.image_width);
        if let (Some((t, bt, yl)), Some((l, r, xl))) = (ry, rx) {
          for d in 0 .. g.depth {
            let gr = grads[((n * g.crop_height + y) * g.crop_width + x) * g.depth + d] as f64;
            let (yl, xl) = (yl as f64, xl as f64);
            out[at(b, t, l, d)] += (1.0 - yl) * (1.0 - xl) * gr;
            out[at(b, t, r, d)] += (1.0 - yl) * xl * gr;
            out[at(b, bt, l, d)] += yl * (1.0 - xl) * gr;
            out[at(b, bt, r, d)] += yl * xl * gr;
          }
        }
      }
    }
  }
  out
}

pub fn random_case(rng: &mut StdRng, g: &CropGeometry) -> (Vec<f32>, Vec<f32>, Vec<i32>) {
  let image = (0 .. g.image_len()).map(|_| rng.gen_range(-2.0 .. 2.0)).collect();
  let mut boxes = Vec::new();
  let mut box_ind = Vec::new();
  for _ in 0 .. g.num_boxes {
    // Some boxes poke outside the image.
    for _ in 0 .. 4 {
      boxes.push(rng.gen_range(-0.2 .. 1.2));
    }
    box_ind.push(rng.gen_range(0 .. g.batch as i32));
  }
  (image, boxes, box_ind)
}

/// Half-image boxes that all land on the same few cells.
pub fn overlapping_boxes(rng: &mut StdRng, g: &CropGeometry) -> Vec<f32> {
  let mut boxes = Vec::new();
  for _ in 0 .. g.num_boxes {
    let y1 = rng.gen_range(0.0 .. 0.5);
    let x1 = rng.gen_range(0.0 .. 0.5);
    boxes.extend_from_slice(&[y1, x1, y1 + 0.5, x1 + 0.5]);
  }
  boxes
}
