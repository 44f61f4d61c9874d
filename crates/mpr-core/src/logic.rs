use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::blend::{blend_layers, plan_layers, BlendMode};
use crate::composite::CompositeState;
use crate::diagnostics::DiagnosticSink;
use crate::display::RgbaImage;
use crate::geometry::{self, Bounds, SliceIndex};
use crate::layer::{LayerRole, SliceLayer};
use crate::model::SlicePlaneModel;
use crate::outline::LabelOutline;
use crate::plane::SlicePlane;
use crate::volume::{VolumeId, VolumeNode};

/// What changed in the scene since the last notification.
#[derive(Clone, Debug)]
pub enum InputChange {
    /// A volume was added, or its data, geometry or display changed.
    Volume(Arc<VolumeNode>),
    VolumeRemoved(VolumeId),
    Plane(SlicePlane),
    Composite(CompositeState),
}

/// Compositor for one slice viewport.
///
/// Owns the background, foreground and label layers, blends their images
/// and maintains the cross-reference plane model. All recomputation runs
/// synchronously inside the notification that triggered it.
pub struct SliceLogic {
    name: String,
    sink: Arc<dyn DiagnosticSink>,
    volumes: HashMap<VolumeId, Arc<VolumeNode>>,
    plane: Option<SlicePlane>,
    composite: CompositeState,
    layers: [SliceLayer; 3],
    blend_key: Option<BlendKey>,
    blended: Option<RgbaImage>,
    effective_mode: BlendMode,
    model: Option<SlicePlaneModel>,
    generation: u64,
}

impl SliceLogic {
    pub fn new(name: impl Into<String>, sink: Arc<dyn DiagnosticSink>) -> Self {
        let name = name.into();
        let layers = LayerRole::ALL.map(|role| SliceLayer::new(role, &name));
        Self {
            name,
            sink,
            volumes: HashMap::new(),
            plane: None,
            composite: CompositeState::default(),
            layers,
            blend_key: None,
            blended: None,
            effective_mode: BlendMode::Alpha,
            model: None,
            generation: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply one input change. Returns true if the published image or
    /// plane model changed.
    pub fn process(&mut self, change: InputChange) -> bool {
        match change {
            InputChange::Volume(volume) => self.on_volume_changed(volume),
            InputChange::VolumeRemoved(id) => self.on_volume_removed(&id),
            InputChange::Plane(plane) => self.on_plane_changed(plane),
            InputChange::Composite(composite) => self.on_composite_changed(composite),
        }
    }

    pub fn on_volume_changed(&mut self, volume: Arc<VolumeNode>) -> bool {
        let id = volume.id.clone();
        if let Some(existing) = self.volumes.get(&id) {
            if Arc::ptr_eq(existing, &volume) {
                return false;
            }
        }
        self.volumes.insert(id.clone(), volume);
        if !self.references(&id) {
            return false;
        }
        self.rebind_layers();
        self.update_pipeline()
    }

    pub fn on_volume_removed(&mut self, id: &VolumeId) -> bool {
        if self.volumes.remove(id).is_none() || !self.references(id) {
            return false;
        }
        self.rebind_layers();
        self.update_pipeline()
    }

    pub fn on_plane_changed(&mut self, plane: SlicePlane) -> bool {
        if self.plane.as_ref() == Some(&plane) {
            return false;
        }
        for layer in &mut self.layers {
            layer.set_plane(&plane);
        }
        self.plane = Some(plane);
        self.update_pipeline()
    }

    pub fn on_composite_changed(&mut self, composite: CompositeState) -> bool {
        if composite == self.composite {
            return false;
        }
        let rebind = composite.bindings_differ(&self.composite);
        self.composite = composite;
        if rebind {
            self.rebind_layers();
        }
        self.update_pipeline()
    }

    /// Replace the outline filter used by the label layer.
    pub fn set_label_outline(&mut self, outline: LabelOutline) -> bool {
        self.layers[LayerRole::Label.index()].set_outline(outline);
        self.update_pipeline()
    }

    fn references(&self, id: &VolumeId) -> bool {
        LayerRole::ALL
            .iter()
            .any(|&role| self.composite.volume_for(role) == Some(id))
    }

    /// Point each layer at the registry entry its composite slot names.
    /// Unknown identifiers detach the layer.
    fn rebind_layers(&mut self) {
        for role in LayerRole::ALL {
            let volume = self
                .composite
                .volume_for(role)
                .and_then(|id| self.volumes.get(id))
                .cloned();
            self.layers[role.index()].set_volume(volume);
        }
    }

    /// Layers, then blend, then plane model. Returns whether anything a
    /// consumer can observe changed.
    fn update_pipeline(&mut self) -> bool {
        let sink = Arc::clone(&self.sink);
        for layer in &mut self.layers {
            layer.update(sink.as_ref());
        }

        let key = self.blend_key();
        let blend_changed = if self.blend_key != Some(key) {
            self.blend_key = Some(key);
            self.reblend()
        } else {
            false
        };

        let model_changed = self.update_model();
        let changed = blend_changed || model_changed;
        if changed {
            self.generation += 1;
            debug!(viewport = %self.name, generation = self.generation, "Slice view modified");
        }
        changed
    }

    fn blend_key(&self) -> BlendKey {
        BlendKey {
            generations: self.layers.each_ref().map(|l| l.generation()),
            mode: self.composite.blend_mode,
            foreground_opacity: self.composite.foreground_opacity,
            label_opacity: self.composite.label_opacity,
        }
    }

    /// Blend the layer images. Returns true if the result's pixels differ
    /// from the cached composite.
    fn reblend(&mut self) -> bool {
        let (blended, effective_mode) = {
            let image = |role: LayerRole| self.layers[role.index()].display_image();
            let plan = plan_layers(
                self.composite.blend_mode,
                image(LayerRole::Background),
                image(LayerRole::Foreground),
                image(LayerRole::Label),
                self.composite.foreground_opacity,
                self.composite.label_opacity,
            );
            let blended = blend_layers(&plan.inputs, self.sink.as_ref());
            (blended, plan.effective_mode)
        };
        if effective_mode != self.composite.blend_mode {
            debug!(
                viewport = %self.name,
                requested = %self.composite.blend_mode,
                applied = %effective_mode,
                "Blend mode fell back"
            );
        }
        self.effective_mode = effective_mode;

        if blended == self.blended {
            return false;
        }
        if let Some(img) = &blended {
            info!(
                viewport = %self.name,
                width = img.width(),
                height = img.height(),
                mode = %effective_mode,
                "Slice composited"
            );
        }
        self.blended = blended;
        true
    }

    /// Rebuild the cross-reference plane model; true if it changed.
    fn update_model(&mut self) -> bool {
        let Some(plane) = &self.plane else {
            return self.model.take().is_some();
        };
        let has_label = self.layers[LayerRole::Label.index()].volume().is_some();
        let mut candidate = SlicePlaneModel::build(
            plane,
            self.blended.as_ref(),
            self.composite.show_intersections,
            has_label,
            0,
        );
        match &self.model {
            Some(old) => {
                candidate.generation = old.generation;
                if candidate == *old {
                    return false;
                }
                candidate.generation = old.generation + 1;
            }
            None => candidate.generation = 1,
        }
        self.model = Some(candidate);
        true
    }

    /// Final composited raster, absent when no layer has an image.
    pub fn image(&self) -> Option<&RgbaImage> {
        self.blended.as_ref()
    }

    pub fn layer(&self, role: LayerRole) -> &SliceLayer {
        &self.layers[role.index()]
    }

    pub fn layers(&self) -> &[SliceLayer; 3] {
        &self.layers
    }

    pub fn plane(&self) -> Option<&SlicePlane> {
        self.plane.as_ref()
    }

    pub fn composite(&self) -> &CompositeState {
        &self.composite
    }

    pub fn plane_model(&self) -> Option<&SlicePlaneModel> {
        self.model.as_ref()
    }

    /// Mode used for the last blend, after any Add/Subtract fallback.
    pub fn effective_blend_mode(&self) -> BlendMode {
        self.effective_mode
    }

    /// Advances each time the published image or plane model changes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn volume(&self, id: &VolumeId) -> Option<&Arc<VolumeNode>> {
        self.volumes.get(id)
    }

    /// First bound volume, searching background, foreground, label.
    pub fn first_volume(&self) -> Option<&Arc<VolumeNode>> {
        self.layers.iter().find_map(|l| l.volume())
    }

    fn bound_volumes(&self) -> Vec<&VolumeNode> {
        self.layers
            .iter()
            .filter_map(|l| l.volume().map(|v| v.as_ref()))
            .collect()
    }

    /// Plane zoomed and centred on the first bound volume.
    pub fn fit_slice_to_first_volume(&self, width: usize, height: usize) -> Option<SlicePlane> {
        let plane = self.plane.as_ref()?;
        geometry::fit_slice_to_volume(plane, self.first_volume()?, width, height)
    }

    /// Plane zoomed and centred on all bound volumes.
    pub fn fit_slice_to_all_volumes(&self, width: usize, height: usize) -> Option<SlicePlane> {
        let plane = self.plane.as_ref()?;
        geometry::fit_slice_to_volumes(plane, &self.bound_volumes(), width, height)
    }

    /// Slice index of `offset` in the volume bound to `role`.
    pub fn slice_index_from_offset(&self, offset: f64, role: LayerRole) -> SliceIndex {
        match &self.plane {
            Some(plane) => geometry::slice_index_from_offset(
                plane,
                self.layers[role.index()].volume().map(|v| v.as_ref()),
                offset,
            ),
            None => SliceIndex::NoVolume,
        }
    }

    pub fn snap_slice_offset_to_ijk(&self) -> Option<SlicePlane> {
        let plane = self.plane.as_ref()?;
        Some(geometry::snap_slice_offset_to_ijk(plane, self.first_volume()?))
    }

    pub fn slice_bounds(&self) -> Bounds {
        match &self.plane {
            Some(plane) => geometry::slice_bounds(plane, &self.bound_volumes()),
            None => Bounds::default_slice_bounds(),
        }
    }

    pub fn slice_offset_range_resolution(&self) -> ([f64; 2], f64) {
        match &self.plane {
            Some(plane) => geometry::slice_offset_range_resolution(plane, &self.bound_volumes()),
            None => {
                let d = Bounds::default_slice_bounds();
                ([d.min[2], d.max[2]], 1.0)
            }
        }
    }

    /// Drop the plane model and every cached buffer.
    pub fn teardown(&mut self) {
        self.model = None;
        self.blended = None;
        self.blend_key = None;
        for layer in &mut self.layers {
            layer.release();
        }
        debug!(viewport = %self.name, "Slice view torn down");
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct BlendKey {
    generations: [u64; 3],
    mode: BlendMode,
    foreground_opacity: f64,
    label_opacity: f64,
}
