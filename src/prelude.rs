pub use crate::config::{GradAccumulation, RuntimeConfig};
#[cfg(feature = "cuda")]
pub use crate::device::{CudaStream, crop_and_resize_cuda, crop_and_resize_backward_cuda};
pub use crate::error::{CropResizeError, Result};
pub use crate::geometry::{BoxAlignment, CropGeometry, NormBox};
pub use crate::host::{HostStream};
pub use crate::launch::{
  crop_and_resize, crop_and_resize_backward,
  try_crop_and_resize, try_crop_and_resize_backward,
};
pub use crate::operator::{CropAndResizeOperator, CropAndResizeOperatorConfig};
pub use crate::pyramid::{FeatureLevel, PyramidRoiAlignConfig, assign_levels, pyramid_roi_align, pyramid_roi_align_backward};

pub use densearray::{ArrayIndex};
