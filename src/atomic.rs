use std::mem::{align_of, size_of};
use std::slice::{from_raw_parts};
use std::sync::atomic::{AtomicU32, Ordering};

/// An `f32` cell supporting lock-free accumulation from many threads.
#[repr(transparent)]
pub struct AtomicF32 {
  bits: AtomicU32,
}

impl AtomicF32 {
  pub fn new(value: f32) -> AtomicF32 {
    AtomicF32{bits: AtomicU32::new(value.to_bits())}
  }

  pub fn load(&self) -> f32 {
    f32::from_bits(self.bits.load(Ordering::Relaxed))
  }

  /// Adds `delta` and returns the previous value.
  #[inline]
  pub fn fetch_add(&self, delta: f32) -> f32 {
    let mut cur = self.bits.load(Ordering::Relaxed);
    loop {
      let next = (f32::from_bits(cur) + delta).to_bits();
      match self.bits.compare_exchange_weak(cur, next, Ordering::Relaxed, Ordering::Relaxed) {
        Ok(prev) => return f32::from_bits(prev),
        Err(actual) => cur = actual,
      }
    }
  }

  /// Views an exclusively borrowed `f32` buffer as atomic cells for the
  /// duration of the borrow.
  pub fn from_mut_slice(buf: &mut [f32]) -> &[AtomicF32] {
    debug_assert_eq!(size_of::<AtomicF32>(), size_of::<f32>());
    debug_assert_eq!(align_of::<AtomicF32>(), align_of::<f32>());
    // SAFETY: `AtomicF32` is a transparent wrapper over `AtomicU32`, which has
    // the size and alignment of `u32` and therefore of `f32`. The exclusive
    // borrow guarantees no non-atomic access overlaps the returned view.
    unsafe { from_raw_parts(buf.as_mut_ptr() as *const AtomicF32, buf.len()) }
  }
}
