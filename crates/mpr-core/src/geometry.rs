//! Bounds, spacing, fit and offset/index helpers for navigation code.
//!
//! Everything here is a pure function of plane and volume snapshots.

use nalgebra::{Matrix4, Vector4};

use crate::consts::{AXIS_ALIGNMENT_TOLERANCE_DEG, DEFAULT_SLICE_HALF_EXTENT};
use crate::math;
use crate::plane::{SlicePlane, SpacingMode};
use crate::volume::VolumeNode;

/// Axis-aligned box. Invalid (min > max) when empty.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Default for Bounds {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bounds {
    pub fn empty() -> Self {
        Self {
            min: [f64::INFINITY; 3],
            max: [f64::NEG_INFINITY; 3],
        }
    }

    /// The +/-100 mm box reported when no volume is available.
    pub fn default_slice_bounds() -> Self {
        Self {
            min: [-DEFAULT_SLICE_HALF_EXTENT; 3],
            max: [DEFAULT_SLICE_HALF_EXTENT; 3],
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = [f64; 3]>) -> Self {
        let mut b = Self::empty();
        for p in points {
            b.include(p);
        }
        b
    }

    pub fn include(&mut self, p: [f64; 3]) {
        for a in 0..3 {
            self.min[a] = self.min[a].min(p[a]);
            self.max[a] = self.max[a].max(p[a]);
        }
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        let mut b = *self;
        if other.is_valid() {
            b.include(other.min);
            b.include(other.max);
        }
        b
    }

    pub fn is_valid(&self) -> bool {
        (0..3).all(|a| self.min[a] <= self.max[a])
    }

    pub fn center(&self) -> [f64; 3] {
        [0, 1, 2].map(|a| 0.5 * (self.min[a] + self.max[a]))
    }

    pub fn lengths(&self) -> [f64; 3] {
        [0, 1, 2].map(|a| self.max[a] - self.min[a])
    }
}

/// Result of converting a slice offset to a 1-based slice index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SliceIndex {
    Index(i32),
    /// The plane normal is not aligned with any voxel axis.
    Rotated,
    OutOfVolume,
    NoVolume,
}

impl SliceIndex {
    /// Integer code: the index itself, or -1, -2, -3 for the failure cases.
    pub fn code(self) -> i32 {
        match self {
            Self::Index(i) => i,
            Self::Rotated => -1,
            Self::OutOfVolume => -2,
            Self::NoVolume => -3,
        }
    }
}

/// The eight corners of the voxel grid in IJK, at voxel edges or centres.
fn ijk_corners(dims: [usize; 3], use_voxel_center: bool) -> [[f64; 3]; 8] {
    let (lo, hi_pad) = if use_voxel_center { (0.0, -1.0) } else { (-0.5, -0.5) };
    let hi = dims.map(|d| d as f64 + hi_pad);
    let mut corners = [[0.0; 3]; 8];
    for (n, c) in corners.iter_mut().enumerate() {
        *c = [
            if n & 1 == 0 { lo } else { hi[0] },
            if n & 2 == 0 { lo } else { hi[1] },
            if n & 4 == 0 { lo } else { hi[2] },
        ];
    }
    corners
}

/// RAS to slice rotation: inverse of slice-to-RAS with translation dropped.
fn ras_to_slice_rotation(plane: &SlicePlane) -> Option<Matrix4<f64>> {
    plane
        .slice_to_ras
        .try_inverse()
        .map(|inv| math::without_translation(&inv))
}

/// Physical bounding box of a volume, through a linear parent transform.
pub fn volume_ras_bounds(volume: &VolumeNode, use_voxel_center: bool) -> Bounds {
    let ijk_to_world = volume.ijk_to_world();
    Bounds::from_points(
        ijk_corners(volume.dimensions(), use_voxel_center)
            .iter()
            .map(|&c| math::transform_point(&ijk_to_world, c)),
    )
}

/// Size and centre of the physical bounding box.
pub fn volume_ras_box(volume: &VolumeNode) -> ([f64; 3], [f64; 3]) {
    let b = volume_ras_bounds(volume, false);
    (b.lengths(), b.center())
}

/// Volume bounds expressed along the slice plane's axes.
pub fn volume_slice_bounds(plane: &SlicePlane, volume: &VolumeNode, use_voxel_center: bool) -> Bounds {
    let Some(ras_to_slice) = ras_to_slice_rotation(plane) else {
        return Bounds::default_slice_bounds();
    };
    let ijk_to_slice = ras_to_slice * volume.ijk_to_world();
    Bounds::from_points(
        ijk_corners(volume.dimensions(), use_voxel_center)
            .iter()
            .map(|&c| math::transform_point(&ijk_to_slice, c)),
    )
}

/// Extent of the volume along slice x, y and normal.
pub fn volume_slice_dimensions(plane: &SlicePlane, volume: &VolumeNode) -> [f64; 3] {
    volume_slice_bounds(plane, volume, false).lengths()
}

/// Voxel spacing as seen along each slice axis.
///
/// For every slice axis the voxel axis pointing most nearly along it
/// supplies the spacing. Prescribed spacing overrides this.
pub fn volume_slice_spacing(plane: &SlicePlane, volume: &VolumeNode) -> [f64; 3] {
    if let SpacingMode::Prescribed(spacing) = plane.spacing_mode {
        return spacing;
    }
    let Some(ras_to_slice) = ras_to_slice_rotation(plane) else {
        return volume.spacing();
    };
    let ijk_to_slice = ras_to_slice * volume.ijk_to_world();
    let Some(slice_to_ijk) = ijk_to_slice.try_inverse() else {
        return volume.spacing();
    };

    let mut spacing = [1.0; 3];
    for (slice_axis, s) in spacing.iter_mut().enumerate() {
        let column = math::column3(&slice_to_ijk, slice_axis);
        let len = column.norm();
        if len == 0.0 {
            continue;
        }
        let mut best = 0;
        let mut best_component = 0.0;
        for ijk_axis in 0..3 {
            let component = (column[ijk_axis] / len).abs();
            if component > best_component {
                best_component = component;
                best = ijk_axis;
            }
        }
        *s = ijk_to_slice[(slice_axis, best)].abs();
    }
    spacing
}

/// Field of view showing a `display` sized region (mm) in a `width` by
/// `height` pixel viewport with square pixels.
pub fn fit_field_of_view(display: [f64; 2], fit_z: f64, width: usize, height: usize) -> [f64; 3] {
    let (w, h) = (width.max(1) as f64, height.max(1) as f64);
    let [display_x, display_y] = display;
    let (mut fit_x, mut fit_y) = (display_x, display_y);

    if h > w {
        let pixel_size = fit_x / w;
        fit_y = pixel_size * h;
    } else {
        let pixel_size = fit_y / h;
        fit_x = pixel_size * w;
    }

    // Grow whichever axis still clips the data.
    if display_x > fit_x {
        fit_y = fit_y / (fit_x / display_x);
        fit_x = display_x;
    }
    if display_y > fit_y {
        fit_x = fit_x / (fit_y / display_y);
        fit_y = display_y;
    }
    [fit_x, fit_y, fit_z]
}

/// Fit the plane to one volume. See [`fit_slice_to_volumes`].
pub fn fit_slice_to_volume(
    plane: &SlicePlane,
    volume: &VolumeNode,
    width: usize,
    height: usize,
) -> Option<SlicePlane> {
    fit_slice_to_volumes(plane, &[volume], width, height)
}

/// Zoom and centre the plane so every volume fits the viewport.
///
/// Returns `None` when there is nothing to fit or the viewport is empty.
/// The first volume sets the stack spacing and the offset snap.
pub fn fit_slice_to_volumes(
    plane: &SlicePlane,
    volumes: &[&VolumeNode],
    width: usize,
    height: usize,
) -> Option<SlicePlane> {
    let first = *volumes.first()?;
    if width == 0 || height == 0 {
        return None;
    }

    let mut slice_bounds = Bounds::empty();
    let mut ras_bounds = Bounds::empty();
    for volume in volumes {
        slice_bounds = slice_bounds.union(&volume_slice_bounds(plane, volume, false));
        ras_bounds = ras_bounds.union(&volume_ras_bounds(volume, false));
    }
    if !slice_bounds.is_valid() {
        return None;
    }

    let lengths = slice_bounds.lengths();
    let spacing = volume_slice_spacing(plane, first);
    let fit_z = spacing[2] * plane.dimensions[2].max(1) as f64;

    let mut fitted = plane.clone();
    fitted.set_field_of_view(fit_field_of_view([lengths[0], lengths[1]], fit_z, width, height));
    fitted.set_center(ras_bounds.center());
    fitted.xyz_origin = [0.0; 3];
    Some(snap_slice_offset_to_ijk(&fitted, first))
}

/// Move the plane to the centre of the voxel slab containing it.
pub fn snap_slice_offset_to_ijk(plane: &SlicePlane, volume: &VolumeNode) -> SlicePlane {
    let bounds = volume_slice_bounds(plane, volume, false);
    let spacing_z = volume_slice_spacing(plane, volume)[2];
    let mut snapped = plane.clone();
    if !bounds.is_valid() || spacing_z <= 0.0 {
        return snapped;
    }
    let z_min = bounds.min[2];
    let slab = ((plane.slice_offset() - z_min) / spacing_z).trunc();
    snapped.set_slice_offset((slab + 0.5) * spacing_z + z_min);
    snapped
}

/// Union of the volumes' slice bounds, or +/-100 when there are none.
pub fn slice_bounds(plane: &SlicePlane, volumes: &[&VolumeNode]) -> Bounds {
    let b = volumes.iter().fold(Bounds::empty(), |acc, v| {
        acc.union(&volume_slice_bounds(plane, v, false))
    });
    if b.is_valid() {
        b
    } else {
        Bounds::default_slice_bounds()
    }
}

/// Offset range covering the voxel centres along the normal, and the step.
pub fn slice_offset_range_resolution(plane: &SlicePlane, volumes: &[&VolumeNode]) -> ([f64; 2], f64) {
    let bounds = volumes.iter().fold(Bounds::empty(), |acc, v| {
        acc.union(&volume_slice_bounds(plane, v, true))
    });
    if !bounds.is_valid() {
        let d = Bounds::default_slice_bounds();
        return ([d.min[2], d.max[2]], 1.0);
    }
    let resolution = volumes
        .iter()
        .map(|v| volume_slice_spacing(plane, v)[2])
        .filter(|s| *s > 0.0)
        .fold(f64::INFINITY, f64::min);
    let resolution = if resolution.is_finite() { resolution } else { 1.0 };
    ([bounds.min[2], bounds.max[2]], resolution)
}

/// 1-based slice index of the volume slab at `offset` along the normal.
pub fn slice_index_from_offset(plane: &SlicePlane, volume: Option<&VolumeNode>, offset: f64) -> SliceIndex {
    let Some(volume) = volume else {
        return SliceIndex::NoVolume;
    };
    let dims = volume.dimensions();
    if dims.iter().any(|&d| d == 0) {
        return SliceIndex::NoVolume;
    }

    let ijk_to_ras = volume.ijk_to_world();
    let n = plane.slice_to_ras * Vector4::new(0.0, 0.0, 1.0, 0.0);
    let normal = n.xyz();
    let normal_len = normal.norm();
    if normal_len == 0.0 {
        return SliceIndex::Rotated;
    }
    let normal = normal / normal_len;

    let mut aligned = None;
    for axis in 0..3 {
        let column = math::column3(&ijk_to_ras, axis);
        let spacing = column.norm();
        if spacing == 0.0 {
            continue;
        }
        let cos = (column / spacing).dot(&normal).clamp(-1.0, 1.0);
        let angle = cos.acos().to_degrees();
        if angle < AXIS_ALIGNMENT_TOLERANCE_DEG {
            aligned = Some((axis, spacing));
            break;
        }
        if angle > 180.0 - AXIS_ALIGNMENT_TOLERANCE_DEG {
            aligned = Some((axis, -spacing));
            break;
        }
    }
    let Some((axis, spacing)) = aligned else {
        return SliceIndex::Rotated;
    };

    let Some(ras_to_slice) = plane.slice_to_ras.try_inverse() else {
        return SliceIndex::Rotated;
    };
    let origin = math::translation(&ijk_to_ras);
    let origin_offset = (ras_to_slice * Vector4::new(origin[0], origin[1], origin[2], 0.0)).z;

    let index = math::round_half_up((offset - origin_offset) / spacing) + 1.0;
    if index < 1.0 || index > dims[axis] as f64 {
        return SliceIndex::OutOfVolume;
    }
    SliceIndex::Index(index as i32)
}

/// Whether raster position `xyz` (pixel x, y, stack index) lands within
/// half a voxel of the volume's grid.
pub fn is_xy_inside_volume(plane: &SlicePlane, volume: &VolumeNode, xyz: [f64; 3]) -> bool {
    let xy_to_ijk = volume.world_to_ijk() * plane.xy_to_ras();
    let ijk = math::transform_point(&xy_to_ijk, xyz);
    let dims = volume.dimensions();
    (0..3).all(|a| ijk[a] >= -0.5 && ijk[a] <= dims[a] as f64 - 0.5)
}

/// Adapt the plane to a resized viewport, keeping pixels square and the
/// zoom level of the axis that changed least.
pub fn resize_slice_plane(plane: &SlicePlane, width: usize, height: usize) -> SlicePlane {
    let mut resized = plane.clone();
    if width == 0 || height == 0 {
        return resized;
    }
    let old = plane.dimensions;
    let old_fov = plane.field_of_view;
    let (w, h) = (width as f64, height as f64);

    let scale_x = if old[0] != 0 { w / old[0] as f64 } else { 1.0 };
    let scale_y = if old[1] != 0 { h / old[1] as f64 } else { 1.0 };
    let magnitude = |s: f64| if s >= 1.0 { s } else { 1.0 / s };

    let mut fov = if magnitude(scale_x) < magnitude(scale_y) {
        [old_fov[0], old_fov[1] * scale_y / scale_x]
    } else {
        [old_fov[0] * scale_x / scale_y, old_fov[1]]
    };

    let window_aspect = h / w;
    if fov[0] != 0.0 && fov[1] / fov[0] != window_aspect {
        fov[0] = fov[1] / window_aspect;
    }

    let step = plane.pixel_spacing()[2];
    resized.set_dimensions([width, height, old[2]]);
    resized.set_field_of_view([fov[0], fov[1], step * old[2].max(1) as f64]);
    resized
}
