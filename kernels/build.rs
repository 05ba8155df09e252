extern crate gcc;

use std::env;

fn main() {
  println!("cargo:rerun-if-changed=crop_and_resize.cu");
  println!("cargo:rerun-if-env-changed=CROPRESIZE_CUDA_ARCH");
  println!("cargo:rerun-if-env-changed=CUDA_HOME");

  // Host-only builds carry no device code.
  if env::var_os("CARGO_FEATURE_CUDA").is_none() {
    return;
  }

  let cuda_home = env::var("CUDA_HOME").unwrap_or_else(|_| "/usr/local/cuda".to_string());
  let arch = env::var("CROPRESIZE_CUDA_ARCH").unwrap_or_else(|_| "sm_52".to_string());

  gcc::Config::new()
    .compiler(format!("{}/bin/nvcc", cuda_home))
    .opt_level(3)
    .flag(&format!("-arch={}", arch))
    .flag("-Xcompiler")
    .flag("\'-fPIC\'")
    .include(format!("{}/include", cuda_home))
    .file("crop_and_resize.cu")
    .compile("libcropresize_cuda_kernels.a");

  println!("cargo:rustc-link-search=native={}/lib64", cuda_home);
  println!("cargo:rustc-link-lib=cudart");
}
