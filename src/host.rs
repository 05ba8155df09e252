//! Host (CPU) kernels.
//!
//! One work item per `(box, crop row)`; the column and channel loops run
//! inside the item. Forward items write disjoint output rows. Backward items
//! scatter into a shared gradient image, either through atomic cells or
//! through per-worker buffers that are reduced afterwards.

use crate::atomic::{AtomicF32};
use crate::config::{GradAccumulation, RuntimeConfig};
use crate::error::{CropResizeError, Result};
use crate::geometry::{AxisTap, CropGeometry, NormBox, col_tap, row_tap};

use densearray::{ArrayIndex};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::{Arc};

/// Execution context for host launches.
///
/// Launches on a host stream run on its thread pool and return once they are
/// complete, so there is never outstanding work to synchronise.
#[derive(Clone, Default)]
pub struct HostStream {
  pool: Option<Arc<ThreadPool>>,
}

impl HostStream {
  /// Uses rayon's global pool.
  pub fn new() -> HostStream {
    HostStream{pool: None}
  }

  pub fn with_threads(num_threads: usize) -> Result<HostStream> {
    let pool = ThreadPoolBuilder::new()
      .num_threads(num_threads)
      .thread_name(|idx| format!("cropresize-{}", idx))
      .build()
      .map_err(|e| CropResizeError::ThreadPool(e.to_string()))?;
    Ok(HostStream{pool: Some(Arc::new(pool))})
  }

  pub fn from_config(cfg: &RuntimeConfig) -> Result<HostStream> {
    match cfg.num_threads {
      Some(n) => HostStream::with_threads(n),
      None => Ok(HostStream::new()),
    }
  }

  pub fn num_threads(&self) -> usize {
    match self.pool {
      Some(ref pool) => pool.current_num_threads(),
      None => rayon::current_num_threads(),
    }
  }

  pub fn install<R, F>(&self, f: F) -> R where R: Send, F: FnOnce() -> R + Send {
    match self.pool {
      Some(ref pool) => pool.install(f),
      None => f(),
    }
  }
}

#[inline]
pub fn batch_index(index: i32, batch: usize) -> Option<usize> {
  if index >= 0 && (index as usize) < batch {
    Some(index as usize)
  } else {
    None
  }
}

/// Flat offset of channel 0 at `(b, h, w)`, or `None` off the image.
#[inline]
fn pixel_base(dim: &(usize, usize, usize, usize), b: usize, h: usize, w: usize) -> Option<usize> {
  if w < dim.1 && h < dim.2 {
    Some((0, w, h, b).offset(dim.least_stride()))
  } else {
    None
  }
}

struct Taps {
  top_left:     Option<usize>,
  top_right:    Option<usize>,
  bottom_left:  Option<usize>,
  bottom_right: Option<usize>,
}

impl Taps {
  #[inline]
  fn new(dim: &(usize, usize, usize, usize), b: usize, ytap: &AxisTap, xtap: &AxisTap) -> Taps {
    Taps{
      top_left:     pixel_base(dim, b, ytap.lo, xtap.lo),
      top_right:    pixel_base(dim, b, ytap.lo, xtap.hi),
      bottom_left:  pixel_base(dim, b, ytap.hi, xtap.lo),
      bottom_right: pixel_base(dim, b, ytap.hi, xtap.hi),
    }
  }
}

pub fn crop_and_resize_fwd(
    image: &[f32],
    boxes: &[f32],
    box_ind: &[i32],
    geom: &CropGeometry,
    extrapolation_value: f32,
    crops: &mut [f32])
{
  let crops_len = geom.crops_len();
  if crops_len == 0 {
    return;
  }
  let row_len = geom.crop_row_len();
  let depth = geom.depth;
  let image_dim = geom.image_dim();
  let fetch = |base: Option<usize>, d: usize| -> f32 {
    match base {
      Some(base) => image[base + d],
      None => extrapolation_value,
    }
  };

  crops[ .. crops_len].par_chunks_mut(row_len).enumerate().for_each(|(row, out_row)| {
    let box_idx = row / geom.crop_height;
    let y = row % geom.crop_height;
    let b = match batch_index(box_ind[box_idx], geom.batch) {
      Some(b) => b,
      None => {
        out_row.iter_mut().for_each(|v| *v = extrapolation_value);
        return;
      }
    };
    let bbox = NormBox::from_slice(boxes, box_idx);
    let ytap = match row_tap(&bbox, y, geom) {
      Some(tap) => tap,
      None => {
        out_row.iter_mut().for_each(|v| *v = extrapolation_value);
        return;
      }
    };
    for (x, out_px) in out_row.chunks_mut(depth).enumerate() {
      let xtap = match col_tap(&bbox, x, geom) {
        Some(tap) => tap,
        None => {
          out_px.iter_mut().for_each(|v| *v = extrapolation_value);
          continue;
        }
      };
      let taps = Taps::new(&image_dim, b, &ytap, &xtap);
      for (d, out) in out_px.iter_mut().enumerate() {
        let top_left = fetch(taps.top_left, d);
        let top_right = fetch(taps.top_right, d);
        let bottom_left = fetch(taps.bottom_left, d);
        let bottom_right = fetch(taps.bottom_right, d);
        let top = top_left + (top_right - top_left) * xtap.lerp;
        let bottom = bottom_left + (bottom_right - bottom_left) * xtap.lerp;
        *out = top + (bottom - top) * ytap.lerp;
      }
    }
  });
}

#[inline]
fn scatter_row<F>(
    row: usize,
    grad_row: &[f32],
    boxes: &[f32],
    box_ind: &[i32],
    geom: &CropGeometry,
    add: &mut F)
where F: FnMut(usize, f32)
{
  let box_idx = row / geom.crop_height;
  let y = row % geom.crop_height;
  let b = match batch_index(box_ind[box_idx], geom.batch) {
    Some(b) => b,
    None => return,
  };
  let bbox = NormBox::from_slice(boxes, box_idx);
  let ytap = match row_tap(&bbox, y, geom) {
    Some(tap) => tap,
    None => return,
  };
  let image_dim = geom.image_dim();
  for (x, grad_px) in grad_row.chunks(geom.depth).enumerate() {
    let xtap = match col_tap(&bbox, x, geom) {
      Some(tap) => tap,
      None => continue,
    };
    let taps = Taps::new(&image_dim, b, &ytap, &xtap);
    for (d, &g) in grad_px.iter().enumerate() {
      let dtop = (1.0 - ytap.lerp) * g;
      let dbottom = ytap.lerp * g;
      if let Some(base) = taps.top_left {
        add(base + d, (1.0 - xtap.lerp) * dtop);
      }
      if let Some(base) = taps.top_right {
        add(base + d, xtap.lerp * dtop);
      }
      if let Some(base) = taps.bottom_left {
        add(base + d, (1.0 - xtap.lerp) * dbottom);
      }
      if let Some(base) = taps.bottom_right {
        add(base + d, xtap.lerp * dbottom);
      }
    }
  }
}

/// Rows per scratch buffer so that `rows` split into at most `num_workers`
/// partitions.
#[inline]
fn rows_per_partition(rows: usize, num_workers: usize) -> usize {
  let num_workers = num_workers.max(1);
  ((rows + num_workers - 1) / num_workers).max(1)
}

pub fn crop_and_resize_bwd(
    grads: &[f32],
    boxes: &[f32],
    box_ind: &[i32],
    geom: &CropGeometry,
    grads_image: &mut [f32],
    accumulate: GradAccumulation)
{
  let crops_len = geom.crops_len();
  let image_len = geom.image_len();
  if crops_len == 0 || image_len == 0 {
    return;
  }
  let row_len = geom.crop_row_len();
  let grads = &grads[ .. crops_len];

  match accumulate {
    GradAccumulation::Atomic => {
      let cells = AtomicF32::from_mut_slice(&mut grads_image[ .. image_len]);
      grads.par_chunks(row_len).enumerate().for_each(|(row, grad_row)| {
        scatter_row(row, grad_row, boxes, box_ind, geom, &mut |offset, value| {
          cells[offset].fetch_add(value);
        });
      });
    }
    GradAccumulation::LocalReduce => {
      // One scratch image per worker, each covering a contiguous run of rows.
      let rows = crops_len / row_len;
      let rows_per_part = rows_per_partition(rows, rayon::current_num_threads());
      let partial = grads.par_chunks(rows_per_part * row_len).enumerate()
        .map(|(part, part_grads)| {
          let mut acc = vec![0.0f32; image_len];
          for (k, grad_row) in part_grads.chunks(row_len).enumerate() {
            scatter_row(part * rows_per_part + k, grad_row, boxes, box_ind, geom, &mut |offset, value| {
              acc[offset] += value;
            });
          }
          acc
        })
        .reduce_with(|mut lhs, rhs| {
          lhs.iter_mut().zip(rhs.iter()).for_each(|(l, r)| *l += *r);
          lhs
        });
      if let Some(partial) = partial {
        grads_image[ .. image_len].par_iter_mut().zip(partial.par_iter())
          .for_each(|(dst, src)| *dst += *src);
      }
    }
  }
}
