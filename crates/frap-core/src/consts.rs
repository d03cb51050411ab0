/// Minimum frame count to use frame-level Rayon parallelism.
pub const PARALLEL_FRAME_THRESHOLD: usize = 4;

/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Smallest stack the analysis accepts.
pub const MIN_FRAMES: usize = 2;

/// Number of histogram bins for Otsu's thresholding of the projection.
pub const OTSU_HISTOGRAM_BINS: usize = 256;

/// Largest region id. Label 0 is background and `N + 1` is the
/// never-bleached foreground, so ids must fit in a `u8` below 255.
pub const MAX_REGIONS: usize = 254;

/// Upper bound on the configured bleached-border width.
pub const MAX_BORDER: usize = 5;

/// Fraction of EMA weight carried by the first `k` observations.
pub const EMA_WEIGHT_FRACTION: f64 = 0.999;

/// Radius of the square structuring element used for the closing step.
pub const CLOSING_RADIUS: usize = 1;

/// Radius of the square structuring element used for speckle erosion.
pub const SPECKLE_EROSION_RADIUS: usize = 2;

/// Gaussian sigma applied to the event-score map in circular mode.
pub const SCORE_BLUR_SIGMA: f32 = 1.0;

/// Maximum Levenberg-Marquardt iterations per fit.
pub const LM_MAX_ITERATIONS: usize = 3000;

/// Relative cost change below which a fit is considered converged.
pub const LM_RELATIVE_TOLERANCE: f64 = 1e-6;

/// Significance level of the nested-model F-test.
pub const F_TEST_ALPHA: f64 = 0.01;

/// Fraction of `i0` moved into the offset `B` when seeding decay-envelope fits.
pub const DECAY_OFFSET_FRACTION: f64 = 0.05;

/// Default assumed diffusion coefficient (calibrated units² per time unit).
pub const DEFAULT_DIFFUSION_COEFFICIENT: f64 = 1.0;

/// Default minimum region size in pixels.
pub const DEFAULT_MIN_REGION_SIZE: usize = 20;

/// Default standard-score threshold for bleach events.
pub const DEFAULT_SCORE_THRESHOLD: f64 = 4.0;

/// Default effective EMA window.
pub const DEFAULT_EMA_WINDOW: usize = 10;
