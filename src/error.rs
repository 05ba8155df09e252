use thiserror::{Error};

use std::io;

#[derive(Error, Debug)]
pub enum CropResizeError {
  #[error("shape mismatch for {what}: expected {expected} elements, got {actual}")]
  ShapeMismatch {
    what:     &'static str,
    expected: usize,
    actual:   usize,
  },

  #[error("box {box_idx} refers to batch index {index}, but batch size is {batch}")]
  BoxIndexOutOfRange {
    box_idx:  usize,
    index:    i32,
    batch:    usize,
  },

  #[error("invalid dimension: {0}")]
  InvalidDim(String),

  #[error("backward called before forward")]
  BackwardBeforeForward,

  #[error("thread pool error: {0}")]
  ThreadPool(String),

  #[error("IO error: {0}")]
  Io(#[from] io::Error),
}

pub type Result<T> = ::std::result::Result<T, CropResizeError>;
