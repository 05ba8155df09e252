extern crate cropresize_cuda;
extern crate rand;
extern crate tracing;
extern crate tracing_subscriber;

use cropresize_cuda::prelude::*;
use cropresize_cuda::util::{dump_to_file};

use rand::{Rng, SeedableRng};
use rand::rngs::{StdRng};
use tracing::{info};
use tracing_subscriber::{EnvFilter};

use std::env;
use std::path::{PathBuf};
use std::time::{Instant};

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cropresize_cuda=info,crop_resize_bench=info")))
    .init();

  let runtime_cfg = RuntimeConfig::from_env();
  let stream = HostStream::from_config(&runtime_cfg)?;
  info!(threads = stream.num_threads(), accumulate = ?runtime_cfg.accumulate, "host stream ready");

  // Mask head sized launch: 4 images of 64x64x256 features, 512 boxes, 14x14 crops.
  let geom = CropGeometry{
    num_boxes:    512,
    batch:        4,
    image_height: 64,
    image_width:  64,
    crop_height:  14,
    crop_width:   14,
    depth:        256,
  };
  let trials = 5;

  let mut rng = StdRng::seed_from_u64(1234);
  let image: Vec<f32> = (0 .. geom.image_len()).map(|_| rng.gen_range(-1.0 .. 1.0)).collect();
  let mut boxes = Vec::with_capacity(4 * geom.num_boxes);
  let mut box_ind = Vec::with_capacity(geom.num_boxes);
  for _ in 0 .. geom.num_boxes {
    let y1: f32 = rng.gen_range(0.0 .. 0.8);
    let x1: f32 = rng.gen_range(0.0 .. 0.8);
    boxes.extend_from_slice(&[y1, x1, y1 + rng.gen_range(0.05 .. 0.2), x1 + rng.gen_range(0.05 .. 0.2)]);
    box_ind.push(rng.gen_range(0 .. geom.batch as i32));
  }

  let mut crops = vec![0.0; geom.crops_len()];
  let start = Instant::now();
  for _ in 0 .. trials {
    try_crop_and_resize(&image, &boxes, &box_ind, &geom, 0.0, &mut crops, &stream)?;
  }
  let fwd_elapsed = start.elapsed();
  info!(per_launch_ms = fwd_elapsed.as_secs_f64() * 1.0e3 / trials as f64, "forward");

  let grads = vec![1.0; geom.crops_len()];
  let mut grads_image = vec![0.0; geom.image_len()];
  let start = Instant::now();
  for _ in 0 .. trials {
    grads_image.iter_mut().for_each(|g| *g = 0.0);
    try_crop_and_resize_backward(&grads, &boxes, &box_ind, &geom, &mut grads_image, runtime_cfg.accumulate, &stream)?;
  }
  let bwd_elapsed = start.elapsed();
  info!(per_launch_ms = bwd_elapsed.as_secs_f64() * 1.0e3 / trials as f64, "backward");

  // Unit gradients hand out total weight one per in-bounds sample.
  let mass: f64 = grads_image.iter().map(|&g| g as f64).sum();
  info!(mass, expected = geom.crops_len() as f64, "gradient mass");

  if let Some(dir) = env::args().nth(1) {
    let dir = PathBuf::from(dir);
    dump_to_file(&dir.join("crops.bin"), &crops)?;
    dump_to_file(&dir.join("grads_image.bin"), &grads_image)?;
    info!(dir = %dir.display(), "dumped crops and image gradient");
  }
  Ok(())
}
