use serde::{Deserialize, Serialize};

use crate::blend::BlendMode;
use crate::consts::{DEFAULT_FOREGROUND_OPACITY, DEFAULT_LABEL_OPACITY};
use crate::layer::LayerRole;
use crate::volume::VolumeId;

/// Which volumes occupy which layer of a viewport, and how they blend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompositeState {
    #[serde(default)]
    pub background: Option<VolumeId>,
    #[serde(default)]
    pub foreground: Option<VolumeId>,
    #[serde(default)]
    pub label: Option<VolumeId>,
    #[serde(default = "default_foreground_opacity")]
    pub foreground_opacity: f64,
    #[serde(default = "default_label_opacity")]
    pub label_opacity: f64,
    #[serde(default)]
    pub blend_mode: BlendMode,
    #[serde(default)]
    pub show_intersections: bool,
}

fn default_foreground_opacity() -> f64 {
    DEFAULT_FOREGROUND_OPACITY
}

fn default_label_opacity() -> f64 {
    DEFAULT_LABEL_OPACITY
}

impl Default for CompositeState {
    fn default() -> Self {
        Self {
            background: None,
            foreground: None,
            label: None,
            foreground_opacity: default_foreground_opacity(),
            label_opacity: default_label_opacity(),
            blend_mode: BlendMode::default(),
            show_intersections: false,
        }
    }
}

impl CompositeState {
    pub fn volume_for(&self, role: LayerRole) -> Option<&VolumeId> {
        match role {
            LayerRole::Background => self.background.as_ref(),
            LayerRole::Foreground => self.foreground.as_ref(),
            LayerRole::Label => self.label.as_ref(),
        }
    }

    pub fn set_volume(&mut self, role: LayerRole, id: Option<VolumeId>) {
        match role {
            LayerRole::Background => self.background = id,
            LayerRole::Foreground => self.foreground = id,
            LayerRole::Label => self.label = id,
        }
    }

    /// True when any layer assignment differs from `other`.
    pub fn bindings_differ(&self, other: &CompositeState) -> bool {
        LayerRole::ALL
            .iter()
            .any(|&role| self.volume_for(role) != other.volume_for(role))
    }
}
