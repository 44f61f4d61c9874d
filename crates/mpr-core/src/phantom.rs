use std::sync::Arc;

use nalgebra::{Rotation3, Vector3};
use ndarray::Array4;
use serde::{Deserialize, Serialize};

use crate::display::DisplayParams;
use crate::error::{MprError, Result};
use crate::image_data::ImageData;
use crate::volume::{ParentTransform, VolumeId, VolumeKind, VolumeNode};

/// Synthetic volume shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhantomKind {
    /// `f32` intensity `i + j + k`.
    Ramp,
    /// `i16` ball of 1000 in a -1000 background.
    Sphere,
    /// `u8` label map with two boxes labelled 1 and 2.
    LabelBlocks,
    /// `u8` RGB volume, each channel ramping along one axis.
    Gradient,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhantomSpec {
    pub id: VolumeId,
    pub kind: PhantomKind,
    #[serde(default = "default_dimensions")]
    pub dimensions: [usize; 3],
    #[serde(default = "default_spacing")]
    pub spacing: [f64; 3],
    #[serde(default)]
    pub origin: [f64; 3],
    /// Rotation of a linear parent transform about the S axis, in degrees.
    #[serde(default)]
    pub parent_rotation_deg: Option<f64>,
    #[serde(default)]
    pub display: Option<DisplayParams>,
}

fn default_dimensions() -> [usize; 3] {
    [64, 64, 32]
}

fn default_spacing() -> [f64; 3] {
    [1.0, 1.0, 1.0]
}

impl PhantomSpec {
    pub fn new(id: impl Into<VolumeId>, kind: PhantomKind) -> Self {
        Self {
            id: id.into(),
            kind,
            dimensions: default_dimensions(),
            spacing: default_spacing(),
            origin: [0.0; 3],
            parent_rotation_deg: None,
            display: None,
        }
    }

    pub fn with_dimensions(mut self, dimensions: [usize; 3]) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_spacing(mut self, spacing: [f64; 3]) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_origin(mut self, origin: [f64; 3]) -> Self {
        self.origin = origin;
        self
    }

    /// Generate the voxel data and wrap it in a shareable volume node.
    pub fn build(&self) -> Result<Arc<VolumeNode>> {
        let [w, h, n] = self.dimensions;
        if w == 0 || h == 0 || n == 0 {
            return Err(MprError::InvalidDimensions {
                width: w,
                height: h,
                depth: n,
            });
        }

        let image = match self.kind {
            PhantomKind::Ramp => ImageData::F32(Array4::from_shape_fn((n, h, w, 1), |(k, j, i, _)| {
                (i + j + k) as f32
            })),
            PhantomKind::Sphere => {
                let center = [w, h, n].map(|d| (d as f64 - 1.0) / 2.0);
                let radius = 0.35 * w.min(h).min(n.max(2)) as f64;
                ImageData::I16(Array4::from_shape_fn((n, h, w, 1), |(k, j, i, _)| {
                    let d2 = (i as f64 - center[0]).powi(2)
                        + (j as f64 - center[1]).powi(2)
                        + (k as f64 - center[2]).powi(2);
                    if d2 <= radius * radius {
                        1000
                    } else {
                        -1000
                    }
                }))
            }
            PhantomKind::LabelBlocks => {
                ImageData::U8(Array4::from_shape_fn((n, h, w, 1), |(k, j, i, _)| {
                    let in_box = |lo: f64, hi: f64, v: usize, d: usize| {
                        let t = v as f64 / d as f64;
                        t >= lo && t < hi
                    };
                    let z_ok = n == 1 || in_box(0.2, 0.8, k, n);
                    if z_ok && in_box(0.15, 0.45, i, w) && in_box(0.2, 0.8, j, h) {
                        1
                    } else if z_ok && in_box(0.55, 0.85, i, w) && in_box(0.3, 0.7, j, h) {
                        2
                    } else {
                        0
                    }
                }))
            }
            PhantomKind::Gradient => {
                let scale = |v: usize, d: usize| (255.0 * v as f64 / (d.max(2) - 1) as f64).round() as u8;
                ImageData::U8(Array4::from_shape_fn((n, h, w, 3), |(k, j, i, c)| match c {
                    0 => scale(i, w),
                    1 => scale(j, h),
                    _ => scale(k, n),
                }))
            }
        };

        let mut node = VolumeNode::with_spacing_origin(self.id.clone(), image, self.spacing, self.origin)?;
        node = match self.kind {
            PhantomKind::LabelBlocks => node.with_kind(VolumeKind::LabelMap),
            PhantomKind::Gradient => node.with_kind(VolumeKind::Vector),
            _ => node,
        };
        if let Some(display) = &self.display {
            let interpolate = node.display.interpolate && display.interpolate;
            node = node.with_display(DisplayParams {
                interpolate,
                ..display.clone()
            });
        }
        if let Some(deg) = self.parent_rotation_deg {
            let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), deg.to_radians());
            node = node.with_parent_transform(ParentTransform::linear(rotation.to_homogeneous())?);
        }
        Ok(Arc::new(node))
    }
}
