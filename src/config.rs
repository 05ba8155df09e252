use std::env;
use std::str::{FromStr};

/// How the backward sampler combines contributions that land on the same
/// source cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GradAccumulation {
  /// Compare-and-swap float adds straight into the destination.
  Atomic,
  /// Per-worker scratch buffers summed by a reduction pass.
  LocalReduce,
}

impl Default for GradAccumulation {
  fn default() -> Self {
    GradAccumulation::Atomic
  }
}

impl FromStr for GradAccumulation {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "atomic" => Ok(GradAccumulation::Atomic),
      "reduce" | "local_reduce" | "local-reduce" => Ok(GradAccumulation::LocalReduce),
      other => Err(format!("unknown accumulation mode: {:?}", other)),
    }
  }
}

/// Environment-driven runtime knobs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuntimeConfig {
  /// Host pool size; `None` shares rayon's global pool.
  pub num_threads:  Option<usize>,
  pub accumulate:   GradAccumulation,
}

impl RuntimeConfig {
  pub fn from_env() -> Self {
    RuntimeConfig::from_lookup(|key| env::var(key).ok())
  }

  /// Builds a config from an arbitrary key lookup. Unparseable values fall
  /// back to the defaults.
  pub fn from_lookup<F>(lookup: F) -> Self where F: Fn(&str) -> Option<String> {
    RuntimeConfig{
      num_threads:  lookup("CROPRESIZE_NUM_THREADS")
                      .and_then(|v| v.trim().parse().ok())
                      .filter(|&n: &usize| n > 0),
      accumulate:   lookup("CROPRESIZE_ACCUMULATE")
                      .and_then(|v| v.parse().ok())
                      .unwrap_or_default(),
    }
  }
}
