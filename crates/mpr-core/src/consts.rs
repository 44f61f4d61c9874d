/// Minimum output pixel count to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Slack allowed around the voxel extent before a sample counts as outside
/// the volume (2^-17 voxels).
pub const RESLICE_BOUNDS_TOLERANCE: f64 = 7.629_394_531_25e-6;

/// Maximum angle in degrees between the slice normal and a voxel axis for
/// the two to be treated as colinear.
pub const AXIS_ALIGNMENT_TOLERANCE_DEG: f64 = 0.1;

/// Offset changes at or below this distance are ignored.
pub const SLICE_OFFSET_EPSILON: f64 = 1e-6;

/// Placeholder slice dimensions used before a slice plane is known.
pub const PLACEHOLDER_SLICE_DIMENSION: usize = 100;

/// Half extent of the slice bounds reported when no volume is bound.
pub const DEFAULT_SLICE_HALF_EXTENT: f64 = 100.0;

/// Default foreground layer opacity.
pub const DEFAULT_FOREGROUND_OPACITY: f64 = 0.0;

/// Default label layer opacity.
pub const DEFAULT_LABEL_OPACITY: f64 = 1.0;

/// Default viewport width and height in pixels.
pub const DEFAULT_VIEWPORT_SIZE: usize = 256;

/// Number of RGBA channels in a display image.
pub const RGBA_CHANNELS: usize = 4;
