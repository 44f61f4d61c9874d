use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::composite::CompositeState;
use crate::consts::DEFAULT_VIEWPORT_SIZE;
use crate::error::{MprError, Result};
use crate::outline::{Connectivity, LabelOutline};
use crate::phantom::{PhantomKind, PhantomSpec};
use crate::plane::{Orientation, SlicePlane};
use crate::volume::{VolumeId, VolumeNode};

/// Everything needed to set up and render one slice viewport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default)]
    pub viewport: ViewportConfig,
    #[serde(default = "default_orientation")]
    pub orientation: Orientation,
    /// Slice offset along the normal; the volume centre when absent.
    #[serde(default)]
    pub offset: Option<f64>,
    /// Zoom to fit the background volume before rendering.
    #[serde(default = "default_fit")]
    pub fit: bool,
    #[serde(default)]
    pub use_label_outline: bool,
    #[serde(default)]
    pub outline: OutlineConfig,
    #[serde(default)]
    pub composite: CompositeState,
    #[serde(default)]
    pub volumes: Vec<PhantomSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub width: usize,
    pub height: usize,
    /// Light-box slice count.
    #[serde(default = "default_slices")]
    pub slices: usize,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_VIEWPORT_SIZE,
            height: DEFAULT_VIEWPORT_SIZE,
            slices: default_slices(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutlineConfig {
    #[serde(default)]
    pub connectivity: Connectivity,
    #[serde(default = "default_radius")]
    pub radius: usize,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            connectivity: Connectivity::Full,
            radius: default_radius(),
        }
    }
}

impl OutlineConfig {
    pub fn to_filter(&self) -> LabelOutline {
        LabelOutline::new()
            .with_connectivity(self.connectivity)
            .with_radius(self.radius)
    }
}

fn default_orientation() -> Orientation {
    Orientation::Axial
}

fn default_fit() -> bool {
    true
}

fn default_slices() -> usize {
    1
}

fn default_radius() -> usize {
    1
}

impl Default for ViewConfig {
    fn default() -> Self {
        let anatomy = PhantomSpec::new("anatomy", PhantomKind::Sphere);
        let segmentation = PhantomSpec::new("segmentation", PhantomKind::LabelBlocks);
        Self {
            viewport: ViewportConfig::default(),
            orientation: default_orientation(),
            offset: None,
            fit: default_fit(),
            use_label_outline: false,
            outline: OutlineConfig::default(),
            composite: CompositeState {
                background: Some(anatomy.id.clone()),
                label: Some(segmentation.id.clone()),
                ..CompositeState::default()
            },
            volumes: vec![anatomy, segmentation],
        }
    }
}

impl ViewConfig {
    pub fn validate(&self) -> Result<()> {
        let ViewportConfig {
            width,
            height,
            slices,
        } = self.viewport;
        if width == 0 || height == 0 || slices == 0 {
            return Err(MprError::InvalidDimensions {
                width,
                height,
                depth: slices,
            });
        }
        for (name, opacity) in [
            ("foreground_opacity", self.composite.foreground_opacity),
            ("label_opacity", self.composite.label_opacity),
        ] {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(MprError::Config(format!(
                    "{name} must be within 0..1, got {opacity}"
                )));
            }
        }
        let mut seen: Vec<&VolumeId> = Vec::new();
        for spec in &self.volumes {
            if seen.contains(&&spec.id) {
                return Err(MprError::Config(format!("duplicate volume id {}", spec.id)));
            }
            seen.push(&spec.id);
        }
        Ok(())
    }

    /// Plane snapshot before any fit or offset is applied.
    pub fn initial_plane(&self) -> SlicePlane {
        let mut plane = SlicePlane::new(
            self.orientation,
            [self.viewport.width, self.viewport.height, self.viewport.slices],
        );
        plane.use_label_outline = self.use_label_outline;
        plane.visible = true;
        plane
    }

    pub fn build_volumes(&self) -> Result<Vec<Arc<VolumeNode>>> {
        self.volumes.iter().map(PhantomSpec::build).collect()
    }
}
