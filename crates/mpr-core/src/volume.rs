use std::fmt;
use std::sync::Arc;

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use crate::display::DisplayParams;
use crate::error::Result;
use crate::image_data::ImageData;
use crate::math;

/// Scene-assigned volume identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumeId(pub String);

impl VolumeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VolumeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VolumeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How the volume's samples are interpreted for display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeKind {
    #[default]
    Scalar,
    LabelMap,
    Vector,
}

/// The transform a volume sits under in the scene.
#[derive(Clone, Debug, PartialEq)]
pub enum ParentTransform {
    Linear {
        to_world: Matrix4<f64>,
        from_world: Matrix4<f64>,
    },
    /// A deformable transform. Reslicing ignores it.
    NonLinear { name: String },
}

impl ParentTransform {
    pub fn linear(to_world: Matrix4<f64>) -> Result<Self> {
        let from_world = math::invert(&to_world, "parent transform")?;
        Ok(Self::Linear {
            to_world,
            from_world,
        })
    }

    pub fn non_linear(name: impl Into<String>) -> Self {
        Self::NonLinear { name: name.into() }
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, Self::Linear { .. })
    }
}

/// Immutable snapshot of a volume node.
///
/// Viewports share one snapshot through `Arc`; a change in the scene
/// produces a new snapshot rather than mutating this one.
#[derive(Clone, Debug)]
pub struct VolumeNode {
    pub id: VolumeId,
    pub name: String,
    pub image: Arc<ImageData>,
    ijk_to_ras: Matrix4<f64>,
    ras_to_ijk: Matrix4<f64>,
    pub parent_transform: Option<ParentTransform>,
    pub kind: VolumeKind,
    pub display: DisplayParams,
}

impl VolumeNode {
    pub fn new(id: impl Into<VolumeId>, image: ImageData, ijk_to_ras: Matrix4<f64>) -> Result<Self> {
        let id = id.into();
        let ras_to_ijk = math::invert(&ijk_to_ras, &format!("IJK to RAS of volume {id}"))?;
        let display = DisplayParams::auto_for(&image);
        Ok(Self {
            name: id.0.clone(),
            id,
            image: Arc::new(image),
            ijk_to_ras,
            ras_to_ijk,
            parent_transform: None,
            kind: VolumeKind::Scalar,
            display,
        })
    }

    /// Axis-aligned volume with the given voxel spacing and origin.
    pub fn with_spacing_origin(
        id: impl Into<VolumeId>,
        image: ImageData,
        spacing: [f64; 3],
        origin: [f64; 3],
    ) -> Result<Self> {
        let mut m = Matrix4::from_diagonal(&nalgebra::Vector4::new(
            spacing[0], spacing[1], spacing[2], 1.0,
        ));
        math::set_translation(&mut m, origin);
        Self::new(id, image, m)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_parent_transform(mut self, transform: ParentTransform) -> Self {
        self.parent_transform = Some(transform);
        self
    }

    /// Set the kind; label maps switch to nearest-neighbour display.
    pub fn with_kind(mut self, kind: VolumeKind) -> Self {
        self.kind = kind;
        if kind == VolumeKind::LabelMap {
            self.display.interpolate = false;
        }
        self
    }

    pub fn with_display(mut self, display: DisplayParams) -> Self {
        self.display = display;
        self
    }

    /// Same volume data under a different display configuration.
    pub fn redisplayed(&self, display: DisplayParams) -> Self {
        Self {
            display,
            ..self.clone()
        }
    }

    pub fn ijk_to_ras(&self) -> &Matrix4<f64> {
        &self.ijk_to_ras
    }

    pub fn ras_to_ijk(&self) -> &Matrix4<f64> {
        &self.ras_to_ijk
    }

    /// Voxel to world, through the parent transform when it is linear.
    pub fn ijk_to_world(&self) -> Matrix4<f64> {
        match &self.parent_transform {
            Some(ParentTransform::Linear { to_world, .. }) => to_world * self.ijk_to_ras,
            _ => self.ijk_to_ras,
        }
    }

    pub fn world_to_ijk(&self) -> Matrix4<f64> {
        match &self.parent_transform {
            Some(ParentTransform::Linear { from_world, .. }) => self.ras_to_ijk * from_world,
            _ => self.ras_to_ijk,
        }
    }

    pub fn dimensions(&self) -> [usize; 3] {
        self.image.dimensions()
    }

    /// Voxel spacing along i, j, k (column norms of IJK to RAS).
    pub fn spacing(&self) -> [f64; 3] {
        [0, 1, 2].map(|axis| math::column3(&self.ijk_to_ras, axis).norm())
    }

    pub fn origin(&self) -> [f64; 3] {
        math::translation(&self.ijk_to_ras)
    }

    /// True when geometry (not just display) differs from `other`.
    pub fn geometry_differs(&self, other: &VolumeNode) -> bool {
        !Arc::ptr_eq(&self.image, &other.image)
            || !math::identical(&self.ijk_to_ras, &other.ijk_to_ras)
            || self.parent_transform != other.parent_transform
    }
}
