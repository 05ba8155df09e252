#![cfg(feature = "cuda")]

extern crate approx;
extern crate cropresize_cuda;
extern crate cuda;
extern crate libc;
extern crate rand;

mod common;

use crate::common::*;
use cropresize_cuda::prelude::*;

use approx::{assert_abs_diff_eq};
use cuda::ffi::runtime::{cudaStream_t};
use libc::{c_int, c_void, size_t};
use rand::{Rng, SeedableRng};
use rand::rngs::{StdRng};

use std::mem::{size_of};
use std::ptr::{null_mut};

const MEMCPY_HOST_TO_DEVICE: c_int = 1;
const MEMCPY_DEVICE_TO_HOST: c_int = 2;

#[link(name = "cudart")]
extern "C" {
  fn cudaMalloc(ptr: *mut *mut c_void, size: size_t) -> c_int;
  fn cudaFree(ptr: *mut c_void) -> c_int;
  fn cudaMemcpy(dst: *mut c_void, src: *const c_void, count: size_t, kind: c_int) -> c_int;
  fn cudaMemset(ptr: *mut c_void, value: c_int, count: size_t) -> c_int;
  fn cudaStreamCreate(stream: *mut cudaStream_t) -> c_int;
  fn cudaStreamSynchronize(stream: cudaStream_t) -> c_int;
  fn cudaStreamDestroy(stream: cudaStream_t) -> c_int;
}

fn check(status: c_int, what: &str) {
  assert_eq!(0, status, "{} failed with cudaError {}", what, status);
}

struct DeviceBuf<T> {
  ptr:  *mut T,
  len:  usize,
}

impl<T: Copy + Default> DeviceBuf<T> {
  fn zeros(len: usize) -> DeviceBuf<T> {
    let mut ptr = null_mut();
    let nbytes = len.max(1) * size_of::<T>();
    unsafe {
      check(cudaMalloc(&mut ptr, nbytes), "cudaMalloc");
      check(cudaMemset(ptr, 0, nbytes), "cudaMemset");
    }
    DeviceBuf{ptr: ptr as *mut T, len}
  }

  fn upload(src: &[T]) -> DeviceBuf<T> {
    let buf = DeviceBuf::zeros(src.len());
    unsafe {
      check(cudaMemcpy(
          buf.ptr as *mut c_void, src.as_ptr() as *const c_void,
          src.len() * size_of::<T>(), MEMCPY_HOST_TO_DEVICE), "cudaMemcpy");
    }
    buf
  }

  fn download(&self) -> Vec<T> {
    let mut dst = vec![T::default(); self.len];
    unsafe {
      check(cudaMemcpy(
          dst.as_mut_ptr() as *mut c_void, self.ptr as *const c_void,
          self.len * size_of::<T>(), MEMCPY_DEVICE_TO_HOST), "cudaMemcpy");
    }
    dst
  }
}

impl<T> Drop for DeviceBuf<T> {
  fn drop(&mut self) {
    unsafe { cudaFree(self.ptr as *mut c_void); }
  }
}

struct TestStream {
  stream: CudaStream,
}

impl TestStream {
  fn new() -> TestStream {
    let mut raw = null_mut();
    unsafe { check(cudaStreamCreate(&mut raw), "cudaStreamCreate"); }
    TestStream{stream: CudaStream::new(raw, 0)}
  }

  fn sync(&self) {
    unsafe { check(cudaStreamSynchronize(self.stream.raw), "cudaStreamSynchronize"); }
  }
}

impl Drop for TestStream {
  fn drop(&mut self) {
    unsafe { cudaStreamDestroy(self.stream.raw); }
  }
}

fn device_forward(image: &[f32], boxes: &[f32], box_ind: &[i32], g: &CropGeometry, extrap: f32) -> Vec<f32> {
  let stream = TestStream::new();
  let d_image = DeviceBuf::upload(image);
  let d_boxes = DeviceBuf::upload(boxes);
  let d_box_ind = DeviceBuf::upload(box_ind);
  let d_crops = DeviceBuf::<f32>::zeros(g.crops_len());
  unsafe {
    crop_and_resize_cuda(d_image.ptr, d_boxes.ptr, d_box_ind.ptr, g, extrap, d_crops.ptr, &stream.stream).unwrap();
  }
  stream.sync();
  d_crops.download()
}

fn device_backward(grads: &[f32], boxes: &[f32], box_ind: &[i32], g: &CropGeometry) -> Vec<f32> {
  let stream = TestStream::new();
  let d_grads = DeviceBuf::upload(grads);
  let d_boxes = DeviceBuf::upload(boxes);
  let d_box_ind = DeviceBuf::upload(box_ind);
  let d_grads_image = DeviceBuf::<f32>::zeros(g.image_len());
  unsafe {
    crop_and_resize_backward_cuda(d_grads.ptr, d_boxes.ptr, d_box_ind.ptr, g, d_grads_image.ptr, &stream.stream).unwrap();
  }
  stream.sync();
  d_grads_image.download()
}

#[test]
fn device_forward_matches_reference() {
  let mut rng = StdRng::seed_from_u64(7);
  let g = geom(3, 9, 6, 5, 4, 3, 11);
  let (image, boxes, box_ind) = random_case(&mut rng, &g);
  let crops = device_forward(&image, &boxes, &box_ind, &g, 0.25);
  let expected = naive_forward(&image, &boxes, &box_ind, &g, 0.25);
  for (&e, &c) in expected.iter().zip(crops.iter()) {
    assert_abs_diff_eq!(e, c, epsilon = 1e-5);
  }
}

#[test]
fn device_backward_matches_reference() {
  let mut rng = StdRng::seed_from_u64(3);
  let g = geom(2, 7, 8, 6, 5, 2, 16);
  let (_, boxes, box_ind) = random_case(&mut rng, &g);
  let grads: Vec<f32> = (0 .. g.crops_len()).map(|_| rng.gen_range(-1.0 .. 1.0)).collect();
  let expected = naive_backward(&grads, &boxes, &box_ind, &g);
  let grads_image = device_backward(&grads, &boxes, &box_ind, &g);
  for (&e, &v) in expected.iter().zip(grads_image.iter()) {
    assert_abs_diff_eq!(e as f32, v, epsilon = 1e-4);
  }
}

#[test]
fn device_backward_survives_colliding_boxes() {
  let g = geom(1, 3, 3, 4, 4, 1, 32);
  let mut rng = StdRng::seed_from_u64(5);
  let boxes = overlapping_boxes(&mut rng, &g);
  let box_ind = vec![0; g.num_boxes];
  let ones = vec![1.0; g.crops_len()];
  let expected = naive_backward(&ones, &boxes, &box_ind, &g);
  let grads_image = device_backward(&ones, &boxes, &box_ind, &g);
  for (&e, &v) in expected.iter().zip(grads_image.iter()) {
    assert_abs_diff_eq!(e as f32, v, epsilon = 1e-3);
  }
  let total: f32 = grads_image.iter().sum();
  assert_abs_diff_eq!(g.crops_len() as f32, total, epsilon = 1e-3);
}

#[test]
fn device_matches_host() {
  let mut rng = StdRng::seed_from_u64(12);
  let g = geom(2, 8, 8, 4, 4, 2, 9);
  let (image, boxes, box_ind) = random_case(&mut rng, &g);
  let mut host_crops = vec![0.0; g.crops_len()];
  try_crop_and_resize(&image, &boxes, &box_ind, &g, 0.0, &mut host_crops, &HostStream::new()).unwrap();
  let device_crops = device_forward(&image, &boxes, &box_ind, &g, 0.0);
  for (&h, &d) in host_crops.iter().zip(device_crops.iter()) {
    assert_abs_diff_eq!(h, d, epsilon = 1e-5);
  }
}
