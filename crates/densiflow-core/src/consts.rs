/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum patch count to scatter patches across the Rayon pool.
pub const PARALLEL_PATCH_THRESHOLD: usize = 64;

/// Default patch edge length in pixels.
pub const DEFAULT_PATCH_SIZE: usize = 8;

/// Default error floor added to the local cost before inverting it into a
/// confidence weight.
pub const DEFAULT_MIN_ERR_VAL: f32 = 1e-4;

/// Default number of pyramid levels built by the preprocessing stage.
pub const DEFAULT_PYRAMID_LEVELS: usize = 3;

/// Default per-level scale factor of the preprocessing pyramid.
pub const DEFAULT_PYRAMID_SCALE_FACTOR: f64 = 0.5;

/// Number of channels the preprocessing stage expects (R, G, B).
pub const COLOR_CHANNEL_COUNT: usize = 3;

/// Flow components stored per pixel in the accumulator (x, y).
pub const FLOW_COMPONENTS: usize = 2;
