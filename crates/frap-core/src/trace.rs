use num_traits::AsPrimitive;

use crate::frame::{Samples, Stack};

type Widen<'a> = Box<dyn Fn(usize) -> f64 + Send + Sync + 'a>;

fn widen<'a, T>(values: &'a [T]) -> Widen<'a>
where
    T: AsPrimitive<f64> + Send + Sync,
{
    Box::new(move |i| values[i].as_())
}

/// Reads raw stack samples as `f64`.
///
/// The pixel type is resolved once when the reader is built, so the per-sample
/// path is a single indirect call with no branching on the sample format.
pub struct SampleReader<'a> {
    read: Widen<'a>,
    frame_len: usize,
    frames: usize,
}

impl<'a> SampleReader<'a> {
    pub fn new(stack: &'a Stack) -> Self {
        let read = match stack.samples() {
            Samples::U8(v) => widen(v),
            Samples::U16(v) => widen(v),
            Samples::F32(v) => widen(v),
        };
        Self {
            read,
            frame_len: stack.pixel_count(),
            frames: stack.frame_count(),
        }
    }

    #[inline]
    pub fn sample(&self, frame: usize, pixel: usize) -> f64 {
        (self.read)(frame * self.frame_len + pixel)
    }

    /// Intensity-over-time sequence of one pixel, `len == frame_count`.
    pub fn trace(&self, pixel: usize) -> Vec<f64> {
        assert!(pixel < self.frame_len, "pixel {pixel} out of range");
        (0..self.frames).map(|f| self.sample(f, pixel)).collect()
    }
}
