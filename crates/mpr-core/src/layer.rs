use std::fmt;
use std::sync::Arc;

use nalgebra::Matrix4;
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::PLACEHOLDER_SLICE_DIMENSION;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::display::{map_to_rgba, LabelColorTable, RgbaImage};
use crate::image_data::ImageData;
use crate::math;
use crate::outline::LabelOutline;
use crate::plane::SlicePlane;
use crate::reslice::{Interpolation, ResliceSampler, Resliced};
use crate::volume::{ParentTransform, VolumeKind, VolumeNode};

/// Position of a layer in the compositing stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerRole {
    Background,
    Foreground,
    Label,
}

impl LayerRole {
    pub const ALL: [LayerRole; 3] = [Self::Background, Self::Foreground, Self::Label];

    pub fn index(self) -> usize {
        match self {
            Self::Background => 0,
            Self::Foreground => 1,
            Self::Label => 2,
        }
    }
}

impl fmt::Display for LayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Background => write!(f, "Background"),
            Self::Foreground => write!(f, "Foreground"),
            Self::Label => write!(f, "Label"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerState {
    /// Nothing to show: no volume or no plane.
    Idle,
    /// Inputs changed since the last reslice.
    TransformDirty,
    /// Reslice is current, display image is not.
    Resliced,
    ImageReady,
}

/// One volume resliced into a viewport's pixel grid.
///
/// The layer keeps snapshots of its inputs and rebuilds only the stages
/// whose inputs changed. `generation` advances whenever anything a
/// consumer can observe (transform or images) changes.
pub struct SliceLayer {
    role: LayerRole,
    source: String,
    volume: Option<Arc<VolumeNode>>,
    plane: Option<SlicePlane>,
    xy_to_ijk: Matrix4<f64>,
    dimensions: [usize; 3],
    state: LayerState,
    needs_reslice: bool,
    needs_outline: bool,
    needs_display: bool,
    resliced: Option<Resliced>,
    image: Option<ImageData>,
    /// Outline flag the exposed image was built with.
    outline_applied: Option<bool>,
    display_image: Option<RgbaImage>,
    outline: LabelOutline,
    colors: LabelColorTable,
    generation: u64,
}

impl SliceLayer {
    pub fn new(role: LayerRole, viewport: &str) -> Self {
        Self {
            role,
            source: format!("{viewport}/{role}"),
            volume: None,
            plane: None,
            xy_to_ijk: Matrix4::identity(),
            dimensions: [PLACEHOLDER_SLICE_DIMENSION, PLACEHOLDER_SLICE_DIMENSION, 1],
            state: LayerState::Idle,
            needs_reslice: false,
            needs_outline: false,
            needs_display: false,
            resliced: None,
            image: None,
            outline_applied: None,
            display_image: None,
            outline: LabelOutline::default(),
            colors: LabelColorTable::default(),
            generation: 0,
        }
    }

    pub fn role(&self) -> LayerRole {
        self.role
    }

    pub fn is_label_layer(&self) -> bool {
        self.role == LayerRole::Label
    }

    pub fn volume(&self) -> Option<&Arc<VolumeNode>> {
        self.volume.as_ref()
    }

    pub fn plane(&self) -> Option<&SlicePlane> {
        self.plane.as_ref()
    }

    pub fn state(&self) -> LayerState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Slice pixel (x, y, stack index) to voxel (i, j, k).
    pub fn xy_to_ijk(&self) -> &Matrix4<f64> {
        &self.xy_to_ijk
    }

    pub fn dimensions(&self) -> [usize; 3] {
        self.dimensions
    }

    /// Reslice output before any outline stage.
    pub fn resliced_image(&self) -> Option<&ImageData> {
        self.resliced.as_ref().map(|r| &r.image)
    }

    /// True where the reslice sampled inside the volume.
    pub fn inside_mask(&self) -> Option<&Array3<bool>> {
        self.resliced.as_ref().map(|r| &r.mask)
    }

    /// The layer's exposed image: outlined for label-map volumes in the label
    /// role when requested, otherwise the raw reslice.
    pub fn image(&self) -> Option<&ImageData> {
        self.image.as_ref()
    }

    pub fn display_image(&self) -> Option<&RgbaImage> {
        self.display_image.as_ref()
    }

    /// Nearest for label maps or when the display turns interpolation off.
    pub fn interpolation(&self) -> Interpolation {
        match &self.volume {
            Some(v) if v.kind == VolumeKind::LabelMap || !v.display.interpolate => {
                Interpolation::Nearest
            }
            _ => Interpolation::Linear,
        }
    }

    pub fn set_outline(&mut self, outline: LabelOutline) {
        if outline != self.outline {
            self.outline = outline;
            self.needs_outline = true;
        }
    }

    pub fn set_color_table(&mut self, colors: LabelColorTable) {
        if colors != self.colors {
            self.colors = colors;
            self.needs_display = true;
        }
    }

    /// Bind a volume snapshot, or detach with `None`. Returns true if the
    /// binding changed in a way that needs recomputation.
    pub fn set_volume(&mut self, volume: Option<Arc<VolumeNode>>) -> bool {
        let changed = match (&self.volume, &volume) {
            (None, None) => false,
            (Some(old), Some(new)) if Arc::ptr_eq(old, new) => false,
            (Some(old), Some(new)) if old.id == new.id && !old.geometry_differs(new) => {
                let kind_changed = old.kind != new.kind;
                let interp_changed = old.display.interpolate != new.display.interpolate;
                if kind_changed || interp_changed {
                    self.needs_reslice = true;
                } else if old.display != new.display {
                    self.needs_display = true;
                } else {
                    // New snapshot, same content.
                    self.volume = volume;
                    return false;
                }
                true
            }
            _ => {
                self.needs_reslice = true;
                true
            }
        };
        if changed {
            debug!(
                layer = %self.source,
                volume = volume.as_ref().map(|v| v.id.as_str()).unwrap_or("none"),
                "Layer volume changed"
            );
            self.volume = volume;
            self.state = LayerState::TransformDirty;
        }
        changed
    }

    /// Take a new slice plane snapshot. Returns true if it differs.
    pub fn set_plane(&mut self, plane: &SlicePlane) -> bool {
        if self.plane.as_ref() == Some(plane) {
            return false;
        }
        self.plane = Some(plane.clone());
        self.state = LayerState::TransformDirty;
        true
    }

    /// Recompute the slice-to-voxel transform.
    ///
    /// The cached matrix is replaced, and the layer marked modified, only
    /// when a volume is bound and the new matrix is not bit-identical to
    /// the cached one. Returns whether that happened.
    pub fn update_transforms(&mut self, sink: &dyn DiagnosticSink) -> bool {
        let (xy_to_ras, dims) = match &self.plane {
            Some(plane) => (plane.xy_to_ras(), plane.dimensions),
            None => (
                Matrix4::identity(),
                [PLACEHOLDER_SLICE_DIMENSION, PLACEHOLDER_SLICE_DIMENSION, 1],
            ),
        };

        let mut xy_to_ijk = xy_to_ras;
        if let Some(volume) = &self.volume {
            match &volume.parent_transform {
                Some(ParentTransform::Linear { from_world, .. }) => {
                    xy_to_ijk = from_world * xy_to_ijk;
                }
                Some(ParentTransform::NonLinear { name }) => {
                    sink.report(Diagnostic::warning(
                        DiagnosticKind::NonLinearTransform,
                        self.source.clone(),
                        format!(
                            "volume {} is under non-linear transform {name}; reslicing without it",
                            volume.id
                        ),
                    ));
                }
                None => {}
            }
            xy_to_ijk = volume.ras_to_ijk() * xy_to_ijk;
        }

        if dims != self.dimensions {
            self.dimensions = dims;
            self.needs_reslice = true;
        }

        let modified = self.volume.is_some() && !math::identical(&xy_to_ijk, &self.xy_to_ijk);
        if modified {
            self.xy_to_ijk = xy_to_ijk;
            self.needs_reslice = true;
            self.generation += 1;
        }
        modified
    }

    /// Bring every stage up to date. Returns true if the layer's observable
    /// output changed.
    pub fn update(&mut self, sink: &dyn DiagnosticSink) -> bool {
        let start = self.generation;
        self.update_transforms(sink);

        let Some(volume) = self.volume.clone().filter(|_| self.plane.is_some()) else {
            if self.clear_outputs() {
                self.generation += 1;
            }
            self.state = LayerState::Idle;
            return self.generation != start;
        };
        let want_outline = self.is_label_layer()
            && volume.kind == VolumeKind::LabelMap
            && self.plane.as_ref().is_some_and(|p| p.use_label_outline);

        if self.needs_reslice || self.resliced.is_none() {
            let sampler = ResliceSampler::new(self.interpolation());
            let resliced = sampler.reslice_masked(&volume.image, &self.xy_to_ijk, self.dimensions);
            debug!(
                layer = %self.source,
                interpolation = %self.interpolation(),
                width = self.dimensions[0],
                height = self.dimensions[1],
                slices = self.dimensions[2],
                "Layer resliced"
            );
            self.resliced = Some(resliced);
            self.needs_reslice = false;
            self.needs_outline = true;
            self.state = LayerState::Resliced;
        }

        if self.needs_outline || self.outline_applied != Some(want_outline) {
            self.image = self.build_exposed_image(want_outline, sink);
            self.outline_applied = Some(want_outline);
            self.needs_outline = false;
            self.needs_display = true;
            self.state = LayerState::Resliced;
        }

        if self.needs_display || self.display_image.is_none() {
            if let Some(image) = &self.image {
                let mask = self.resliced.as_ref().map(|r| &r.mask);
                let rgba = map_to_rgba(image, mask, volume.kind, &volume.display, &self.colors);
                if self.display_image.as_ref() != Some(&rgba) {
                    self.display_image = Some(rgba);
                    self.generation += 1;
                }
            }
            self.needs_display = false;
        }

        self.state = LayerState::ImageReady;
        self.generation != start
    }

    fn build_exposed_image(&self, want_outline: bool, sink: &dyn DiagnosticSink) -> Option<ImageData> {
        let raw = self.resliced.as_ref().map(|r| &r.image)?;
        if !want_outline {
            return Some(raw.clone());
        }
        match self.outline.apply(raw) {
            Ok(outlined) => Some(outlined),
            Err(e) => {
                sink.report(Diagnostic::error(
                    DiagnosticKind::UnsupportedData,
                    self.source.clone(),
                    format!("label outline skipped: {e}"),
                ));
                Some(raw.clone())
            }
        }
    }

    /// Drop cached outputs. Returns true if there was anything to drop.
    fn clear_outputs(&mut self) -> bool {
        let had_output = self.display_image.is_some() || self.image.is_some();
        self.resliced = None;
        self.image = None;
        self.display_image = None;
        self.outline_applied = None;
        self.needs_reslice = true;
        had_output
    }

    /// Release cached buffers, keeping bindings.
    pub fn release(&mut self) {
        if self.clear_outputs() {
            self.generation += 1;
        }
        self.state = LayerState::Idle;
    }
}
