mod common;

use std::sync::Arc;

use mpr_core::blend::BlendMode;
use mpr_core::composite::CompositeState;
use mpr_core::diagnostics::{DiagnosticSink, NoOpSink, RecordingSink};
use mpr_core::geometry::SliceIndex;
use mpr_core::layer::LayerRole;
use mpr_core::logic::{InputChange, SliceLogic};
use mpr_core::outline::{Connectivity, LabelOutline};
use mpr_core::volume::{VolumeId, VolumeNode};

use common::{assert_close, make_axial_plane, make_label_volume, make_uniform_volume};

const VOLUME_DIMS: [usize; 3] = [16, 16, 1];

fn two_layer_composite(mode: BlendMode, opacity: f64) -> CompositeState {
    CompositeState {
        background: Some("bg".into()),
        foreground: Some("fg".into()),
        foreground_opacity: opacity,
        blend_mode: mode,
        ..CompositeState::default()
    }
}

fn block_label() -> Arc<VolumeNode> {
    // Covers slice pixels x in 2..=6, y in 2..=5.
    make_label_volume("seg", VOLUME_DIMS, |i, j, _| {
        if (6..=10).contains(&i) && (6..=9).contains(&j) {
            1
        } else {
            0
        }
    })
}

/// Viewport with uniform 100 background and 50 foreground on an 8x8 plane.
fn two_layer_view(mode: BlendMode, opacity: f64) -> SliceLogic {
    two_layer_view_with_sink(mode, opacity, Arc::new(NoOpSink))
}

fn two_layer_view_with_sink(mode: BlendMode, opacity: f64, sink: Arc<dyn DiagnosticSink>) -> SliceLogic {
    let mut logic = SliceLogic::new("Red", sink);
    logic.on_volume_changed(make_uniform_volume("bg", VOLUME_DIMS, 100));
    logic.on_volume_changed(make_uniform_volume("fg", VOLUME_DIMS, 50));
    logic.on_composite_changed(two_layer_composite(mode, opacity));
    assert!(logic.on_plane_changed(make_axial_plane(8, 8)));
    logic
}

fn gray_at(logic: &SliceLogic, x: usize, y: usize) -> u8 {
    logic.image().expect("composite image").pixel(x, y, 0)[0]
}

// ---------------------------------------------------------------------------
// Blending end to end
// ---------------------------------------------------------------------------

#[test]
fn test_alpha_blend_end_to_end() {
    let logic = two_layer_view(BlendMode::Alpha, 0.5);
    let image = logic.image().unwrap();
    assert_eq!(image.dimensions(), [8, 8, 1]);
    assert_eq!(image.pixel(0, 0, 0), [75, 75, 75, 255]);
    assert_eq!(image.pixel(7, 7, 0), [75, 75, 75, 255]);
    assert_eq!(logic.effective_blend_mode(), BlendMode::Alpha);
}

#[test]
fn test_add_and_subtract_end_to_end() {
    let add = two_layer_view(BlendMode::Add, 0.5);
    assert_eq!(gray_at(&add, 3, 3), 150);
    let subtract = two_layer_view(BlendMode::Subtract, 0.5);
    assert_eq!(gray_at(&subtract, 3, 3), 50);
}

#[test]
fn test_reverse_alpha_with_background_only() {
    let mut logic = SliceLogic::new("Red", Arc::new(NoOpSink));
    logic.on_volume_changed(make_uniform_volume("bg", VOLUME_DIMS, 100));
    logic.on_composite_changed(CompositeState {
        background: Some("bg".into()),
        blend_mode: BlendMode::ReverseAlpha,
        ..CompositeState::default()
    });
    assert!(logic.on_plane_changed(make_axial_plane(8, 8)));

    let image = logic.image().unwrap();
    assert_eq!(image.pixel(0, 0, 0), [100, 100, 100, 255]);
    assert_eq!(image.pixel(7, 7, 0), [100, 100, 100, 255]);
}

#[test]
fn test_blend_mode_change_reblends() {
    let mut logic = two_layer_view(BlendMode::Alpha, 0.5);
    let generation = logic.generation();
    assert!(logic.on_composite_changed(two_layer_composite(BlendMode::Add, 0.5)));
    assert_eq!(gray_at(&logic, 0, 0), 150);
    assert!(logic.generation() > generation);
}

#[test]
fn test_missing_foreground_falls_back_to_alpha() {
    let mut logic = two_layer_view(BlendMode::Add, 0.5);
    let composite = CompositeState {
        foreground: Some("missing".into()),
        ..two_layer_composite(BlendMode::Add, 0.5)
    };
    assert!(logic.on_composite_changed(composite));

    assert!(logic.layer(LayerRole::Foreground).volume().is_none());
    assert_eq!(logic.effective_blend_mode(), BlendMode::Alpha);
    assert_eq!(gray_at(&logic, 2, 2), 100);
}

#[test]
fn test_label_layer_on_top() {
    let mut logic = two_layer_view(BlendMode::Alpha, 0.5);
    logic.on_volume_changed(block_label());
    let composite = CompositeState {
        label: Some("seg".into()),
        ..two_layer_composite(BlendMode::Alpha, 0.5)
    };
    assert!(logic.on_composite_changed(composite));

    let image = logic.image().unwrap();
    assert_eq!(image.pixel(4, 4, 0), [128, 174, 128, 255]);
    assert_eq!(image.pixel(0, 0, 0), [75, 75, 75, 255]);
}

#[test]
fn test_label_outline_through_plane_flag() {
    let mut logic = two_layer_view(BlendMode::Alpha, 0.5);
    logic.on_volume_changed(block_label());
    logic.on_composite_changed(CompositeState {
        label: Some("seg".into()),
        ..two_layer_composite(BlendMode::Alpha, 0.5)
    });

    let mut plane = make_axial_plane(8, 8);
    plane.use_label_outline = true;
    assert!(logic.on_plane_changed(plane));
    assert_eq!(gray_at(&logic, 4, 4), 75);
    assert_eq!(gray_at(&logic, 2, 4), 128);

    // Face connectivity does not change a convex block's boundary.
    assert!(!logic.set_label_outline(LabelOutline::new().with_connectivity(Connectivity::Face)));
}

// ---------------------------------------------------------------------------
// Change suppression
// ---------------------------------------------------------------------------

#[test]
fn test_repeated_plane_is_ignored() {
    let mut logic = two_layer_view(BlendMode::Alpha, 0.5);
    let generation = logic.generation();
    assert!(!logic.on_plane_changed(make_axial_plane(8, 8)));
    assert_eq!(logic.generation(), generation);
}

#[test]
fn test_repeated_composite_is_ignored() {
    let mut logic = two_layer_view(BlendMode::Alpha, 0.5);
    assert!(!logic.on_composite_changed(two_layer_composite(BlendMode::Alpha, 0.5)));
}

#[test]
fn test_label_opacity_without_label_changes_nothing() {
    let mut logic = two_layer_view(BlendMode::Alpha, 0.5);
    let generation = logic.generation();
    let composite = CompositeState {
        label_opacity: 0.3,
        ..two_layer_composite(BlendMode::Alpha, 0.5)
    };
    assert!(!logic.on_composite_changed(composite));
    assert_eq!(logic.generation(), generation);
    assert_eq!(logic.composite().label_opacity, 0.3);
}

#[test]
fn test_foreground_opacity_change() {
    let mut logic = two_layer_view(BlendMode::Alpha, 0.5);
    assert!(logic.on_composite_changed(two_layer_composite(BlendMode::Alpha, 1.0)));
    assert_eq!(gray_at(&logic, 1, 1), 50);
}

#[test]
fn test_unreferenced_volume_is_registered_silently() {
    let mut logic = two_layer_view(BlendMode::Alpha, 0.5);
    let generation = logic.generation();
    assert!(!logic.on_volume_changed(make_uniform_volume("other", VOLUME_DIMS, 7)));
    assert_eq!(logic.generation(), generation);
    assert!(logic.volume(&VolumeId::from("other")).is_some());
}

#[test]
fn test_same_volume_snapshot_is_ignored() {
    let bg = make_uniform_volume("bg", VOLUME_DIMS, 100);
    let mut logic = SliceLogic::new("Red", Arc::new(NoOpSink));
    logic.on_volume_changed(Arc::clone(&bg));
    logic.on_composite_changed(CompositeState {
        background: Some("bg".into()),
        ..CompositeState::default()
    });
    logic.on_plane_changed(make_axial_plane(8, 8));
    assert!(!logic.on_volume_changed(bg));
}

// ---------------------------------------------------------------------------
// Volume updates
// ---------------------------------------------------------------------------

#[test]
fn test_volume_data_change_propagates() {
    let mut logic = two_layer_view(BlendMode::Alpha, 0.5);
    assert!(logic.on_volume_changed(make_uniform_volume("bg", VOLUME_DIMS, 200)));
    assert_eq!(gray_at(&logic, 5, 5), 125);
}

#[test]
fn test_volume_removal_detaches_layer() {
    let mut logic = two_layer_view(BlendMode::Subtract, 0.5);
    assert!(logic.on_volume_removed(&VolumeId::from("fg")));
    assert!(logic.layer(LayerRole::Foreground).volume().is_none());
    assert_eq!(logic.effective_blend_mode(), BlendMode::Alpha);
    assert_eq!(gray_at(&logic, 0, 0), 100);

    assert!(!logic.on_volume_removed(&VolumeId::from("fg")));
}

#[test]
fn test_volume_shared_between_viewports() {
    let bg = make_uniform_volume("bg", VOLUME_DIMS, 100);
    let composite = CompositeState {
        background: Some("bg".into()),
        ..CompositeState::default()
    };

    let mut views: Vec<SliceLogic> = ["Red", "Green"]
        .into_iter()
        .map(|name| SliceLogic::new(name, Arc::new(NoOpSink)))
        .collect();
    for view in &mut views {
        view.on_volume_changed(Arc::clone(&bg));
        view.on_composite_changed(composite.clone());
        view.on_plane_changed(make_axial_plane(8, 8));
    }

    assert_eq!(Arc::strong_count(&bg), 1 + 2 * 2);
    assert_eq!(views[0].image(), views[1].image());
    assert_eq!(gray_at(&views[1], 4, 4), 100);
}

#[test]
fn test_process_dispatches_changes() {
    let mut logic = SliceLogic::new("Red", Arc::new(RecordingSink::new()));
    assert!(!logic.process(InputChange::Volume(make_uniform_volume("bg", VOLUME_DIMS, 100))));
    assert!(!logic.process(InputChange::Composite(CompositeState {
        background: Some("bg".into()),
        ..CompositeState::default()
    })));
    assert!(logic.process(InputChange::Plane(make_axial_plane(8, 8))));
    assert_eq!(gray_at(&logic, 0, 0), 100);
    assert!(logic.process(InputChange::VolumeRemoved("bg".into())));
    assert!(logic.image().is_none());
}

// ---------------------------------------------------------------------------
// Plane model
// ---------------------------------------------------------------------------

#[test]
fn test_plane_model_corners_and_texture() {
    let logic = two_layer_view(BlendMode::Alpha, 0.5);
    let model = logic.plane_model().unwrap();

    let expected = [[4.0, -4.0], [-4.0, -4.0], [4.0, 4.0], [-4.0, 4.0]];
    for (corner, [r, a]) in model.corners.iter().zip(expected) {
        assert_close(corner.x, r, 1e-12);
        assert_close(corner.y, a, 1e-12);
        assert_close(corner.z, 0.0, 1e-12);
    }
    assert!(model.visible);
    assert!(!model.show_intersections);
    assert!(model.interpolate_texture);
    let texture = model.texture.as_ref().unwrap();
    assert_eq!(texture.dim(), (8, 8, 4));
    assert_eq!(texture[[0, 0, 0]], 75);
}

#[test]
fn test_plane_model_with_label_disables_interpolation() {
    let mut logic = two_layer_view(BlendMode::Alpha, 0.5);
    logic.on_volume_changed(block_label());
    logic.on_composite_changed(CompositeState {
        label: Some("seg".into()),
        show_intersections: true,
        ..two_layer_composite(BlendMode::Alpha, 0.5)
    });
    let model = logic.plane_model().unwrap();
    assert!(!model.interpolate_texture);
    assert!(model.show_intersections);
}

#[test]
fn test_plane_model_follows_plane() {
    let mut logic = two_layer_view(BlendMode::Alpha, 0.5);
    let before = logic.plane_model().unwrap().generation;

    let mut plane = make_axial_plane(8, 8);
    plane.visible = false;
    assert!(logic.on_plane_changed(plane));
    let model = logic.plane_model().unwrap();
    assert!(!model.visible);
    assert_eq!(model.generation, before + 1);
}

#[test]
fn test_teardown_releases_outputs() {
    let mut logic = two_layer_view(BlendMode::Alpha, 0.5);
    logic.teardown();
    assert!(logic.image().is_none());
    assert!(logic.plane_model().is_none());
    assert!(logic.layer(LayerRole::Background).display_image().is_none());
}

// ---------------------------------------------------------------------------
// Navigation helpers
// ---------------------------------------------------------------------------

#[test]
fn test_fit_to_first_volume() {
    let logic = two_layer_view(BlendMode::Alpha, 0.5);
    let fitted = logic.fit_slice_to_first_volume(8, 8).unwrap();
    assert_close(fitted.field_of_view[0], 16.0, 1e-9);
    assert_close(fitted.field_of_view[1], 16.0, 1e-9);
    assert_close(fitted.field_of_view[2], 1.0, 1e-9);

    let all = logic.fit_slice_to_all_volumes(8, 8).unwrap();
    assert_eq!(all.field_of_view, fitted.field_of_view);
}

#[test]
fn test_fit_without_plane_is_none() {
    let mut logic = SliceLogic::new("Red", Arc::new(NoOpSink));
    logic.on_volume_changed(make_uniform_volume("bg", VOLUME_DIMS, 100));
    assert!(logic.fit_slice_to_first_volume(8, 8).is_none());
    assert_eq!(logic.slice_index_from_offset(0.0, LayerRole::Background), SliceIndex::NoVolume);
}

#[test]
fn test_slice_index_per_role() {
    let logic = two_layer_view(BlendMode::Alpha, 0.5);
    assert_eq!(logic.slice_index_from_offset(0.0, LayerRole::Background), SliceIndex::Index(1));
    assert_eq!(logic.slice_index_from_offset(5.0, LayerRole::Foreground), SliceIndex::OutOfVolume);
    assert_eq!(logic.slice_index_from_offset(0.0, LayerRole::Label).code(), -3);
}

#[test]
fn test_slice_bounds_and_range() {
    let logic = two_layer_view(BlendMode::Alpha, 0.5);
    let bounds = logic.slice_bounds();
    assert_close(bounds.min[0], -7.5, 1e-12);
    assert_close(bounds.max[0], 8.5, 1e-12);
    assert_close(bounds.min[2], -0.5, 1e-12);

    let (range, resolution) = logic.slice_offset_range_resolution();
    assert_close(range[0], 0.0, 1e-12);
    assert_close(range[1], 0.0, 1e-12);
    assert_close(resolution, 1.0, 1e-12);

    let empty = SliceLogic::new("Red", Arc::new(NoOpSink));
    assert_eq!(empty.slice_bounds().max, [100.0; 3]);
}
