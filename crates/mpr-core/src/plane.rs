use std::fmt;

use nalgebra::{Matrix4, Vector4};
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_VIEWPORT_SIZE, SLICE_OFFSET_EPSILON};
use crate::math;

/// Standard slice orientations, radiological convention (patient right on
/// screen left).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Axial,
    Sagittal,
    Coronal,
}

impl Orientation {
    /// Rotation columns: slice x, slice y and slice normal in RAS.
    pub fn axes(self) -> [[f64; 3]; 3] {
        match self {
            Self::Axial => [[-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            Self::Sagittal => [[0.0, -1.0, 0.0], [0.0, 0.0, 1.0], [-1.0, 0.0, 0.0]],
            Self::Coronal => [[-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]],
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Axial => write!(f, "Axial"),
            Self::Sagittal => write!(f, "Sagittal"),
            Self::Coronal => write!(f, "Coronal"),
        }
    }
}

/// How slice spacing is chosen when stepping through a volume.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum SpacingMode {
    /// Derived from the volume's voxel spacing.
    #[default]
    Automatic,
    Prescribed([f64; 3]),
}

/// Snapshot of a slice node: where the slice sits and how it is rastered.
#[derive(Clone, Debug, PartialEq)]
pub struct SlicePlane {
    /// Slice (x, y, normal) axes plus origin, in RAS.
    pub slice_to_ras: Matrix4<f64>,
    /// Physical extent covered by the raster, in mm.
    pub field_of_view: [f64; 3],
    /// Raster width, height and number of light-box slices.
    pub dimensions: [usize; 3],
    /// Pan of the raster centre within the slice plane, in mm.
    pub xyz_origin: [f64; 3],
    pub active_slice: usize,
    pub visible: bool,
    pub use_label_outline: bool,
    pub spacing_mode: SpacingMode,
    pub orientation: Option<Orientation>,
}

impl Default for SlicePlane {
    fn default() -> Self {
        Self::new(Orientation::Axial, [DEFAULT_VIEWPORT_SIZE, DEFAULT_VIEWPORT_SIZE, 1])
    }
}

impl SlicePlane {
    /// Plane through the RAS origin with a square field of view matching the
    /// raster width.
    pub fn new(orientation: Orientation, dimensions: [usize; 3]) -> Self {
        let mut plane = Self {
            slice_to_ras: Matrix4::identity(),
            field_of_view: [
                dimensions[0] as f64,
                dimensions[1] as f64,
                dimensions[2].max(1) as f64,
            ],
            dimensions,
            xyz_origin: [0.0; 3],
            active_slice: 0,
            visible: false,
            use_label_outline: false,
            spacing_mode: SpacingMode::Automatic,
            orientation: None,
        };
        plane.set_orientation(orientation);
        plane
    }

    /// Replace the rotation part, keeping the plane's origin.
    pub fn set_orientation(&mut self, orientation: Orientation) {
        for (c, axis) in orientation.axes().iter().enumerate() {
            for (r, v) in axis.iter().enumerate() {
                self.slice_to_ras[(r, c)] = *v;
            }
        }
        self.orientation = Some(orientation);
    }

    /// Set an arbitrary slice-to-RAS matrix. Clears the orientation label.
    pub fn set_slice_to_ras(&mut self, m: Matrix4<f64>) {
        self.slice_to_ras = m;
        self.orientation = None;
    }

    pub fn set_dimensions(&mut self, dims: [usize; 3]) {
        self.dimensions = dims;
        if self.active_slice >= dims[2].max(1) {
            self.active_slice = dims[2].max(1) - 1;
        }
    }

    pub fn set_field_of_view(&mut self, fov: [f64; 3]) {
        self.field_of_view = fov;
    }

    pub fn set_active_slice(&mut self, k: usize) {
        self.active_slice = k.min(self.dimensions[2].max(1) - 1);
    }

    /// Raster pixel (x, y, stack index) to slice-plane millimetres.
    pub fn xy_to_slice(&self) -> Matrix4<f64> {
        let mut m = Matrix4::identity();
        for i in 0..3 {
            let dim = self.dimensions[i].max(1) as f64;
            m[(i, i)] = self.field_of_view[i] / dim;
        }
        m[(0, 3)] = -self.field_of_view[0] / 2.0 + self.xyz_origin[0];
        m[(1, 3)] = -self.field_of_view[1] / 2.0 + self.xyz_origin[1];
        m
    }

    /// Raster pixel (x, y, stack index) to RAS.
    pub fn xy_to_ras(&self) -> Matrix4<f64> {
        self.slice_to_ras * self.xy_to_slice()
    }

    /// Physical size of one raster pixel along x, y and the stack.
    pub fn pixel_spacing(&self) -> [f64; 3] {
        [0, 1, 2].map(|i| self.field_of_view[i] / self.dimensions[i].max(1) as f64)
    }

    /// Unit normal of the plane in RAS.
    pub fn normal(&self) -> [f64; 3] {
        let n = math::column3(&self.slice_to_ras, 2);
        let len = n.norm();
        if len > 0.0 {
            [n.x / len, n.y / len, n.z / len]
        } else {
            [0.0, 0.0, 1.0]
        }
    }

    /// Distance of the plane origin along its normal, in slice coordinates.
    pub fn slice_offset(&self) -> f64 {
        let rotation = math::without_translation(&self.slice_to_ras);
        match rotation.try_inverse() {
            Some(inv) => {
                let t = math::translation(&self.slice_to_ras);
                (inv * Vector4::new(t[0], t[1], t[2], 0.0)).z
            }
            None => 0.0,
        }
    }

    /// Move the plane along its normal so that `slice_offset() == offset`.
    pub fn set_slice_offset(&mut self, offset: f64) {
        let rotation = math::without_translation(&self.slice_to_ras);
        let Some(inv) = rotation.try_inverse() else {
            return;
        };
        let t = math::translation(&self.slice_to_ras);
        let mut in_slice = inv * Vector4::new(t[0], t[1], t[2], 0.0);
        if (in_slice.z - offset).abs() <= SLICE_OFFSET_EPSILON {
            return;
        }
        in_slice.z = offset;
        let ras = rotation * in_slice;
        math::set_translation(&mut self.slice_to_ras, [ras.x, ras.y, ras.z]);
    }

    /// Place the plane origin at a RAS position.
    pub fn set_center(&mut self, ras: [f64; 3]) {
        math::set_translation(&mut self.slice_to_ras, ras);
    }
}
