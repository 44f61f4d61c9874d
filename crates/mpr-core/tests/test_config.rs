use mpr_core::blend::BlendMode;
use mpr_core::config::{OutlineConfig, ViewConfig};
use mpr_core::display::DisplayParams;
use mpr_core::error::MprError;
use mpr_core::image_data::ScalarType;
use mpr_core::outline::Connectivity;
use mpr_core::phantom::{PhantomKind, PhantomSpec};
use mpr_core::plane::Orientation;
use mpr_core::reslice::Interpolation;
use mpr_core::volume::{VolumeId, VolumeKind};

// ---------------------------------------------------------------------------
// ViewConfig
// ---------------------------------------------------------------------------

#[test]
fn test_default_config_is_valid() {
    let config = ViewConfig::default();
    config.validate().unwrap();
    assert_eq!(config.composite.background, Some(VolumeId::from("anatomy")));
    assert_eq!(config.composite.label, Some(VolumeId::from("segmentation")));
    assert!(config.composite.foreground.is_none());
    assert_eq!(config.volumes.len(), 2);
}

#[test]
fn test_config_json_roundtrip() {
    let mut config = ViewConfig::default();
    config.orientation = Orientation::Coronal;
    config.offset = Some(-12.5);
    config.composite.blend_mode = BlendMode::ReverseAlpha;
    config.composite.foreground_opacity = 0.4;
    config.volumes[0].display = Some(DisplayParams {
        interpolate: false,
        window: 400.0,
        level: 40.0,
    });

    let json = serde_json::to_string(&config).unwrap();
    let back: ViewConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_partial_config_fills_defaults() {
    let json = r#"{
        "viewport": { "width": 32, "height": 16 },
        "orientation": "Sagittal",
        "composite": { "background": "ct", "blend_mode": "subtract" },
        "volumes": [ { "id": "ct", "kind": "ramp" } ]
    }"#;
    let config: ViewConfig = serde_json::from_str(json).unwrap();

    assert_eq!(config.viewport.slices, 1);
    assert_eq!(config.orientation, Orientation::Sagittal);
    assert!(config.fit);
    assert!(!config.use_label_outline);
    assert_eq!(config.outline, OutlineConfig::default());
    assert_eq!(config.composite.blend_mode, BlendMode::Subtract);
    assert_eq!(config.composite.foreground_opacity, 0.0);
    assert_eq!(config.composite.label_opacity, 1.0);
    assert_eq!(config.volumes[0].dimensions, [64, 64, 32]);
    assert_eq!(config.volumes[0].spacing, [1.0; 3]);
    config.validate().unwrap();
}

#[test]
fn test_validate_rejects_empty_viewport() {
    let mut config = ViewConfig::default();
    config.viewport.height = 0;
    assert!(matches!(
        config.validate(),
        Err(MprError::InvalidDimensions { height: 0, .. })
    ));
}

#[test]
fn test_validate_rejects_bad_opacity() {
    let mut config = ViewConfig::default();
    config.composite.label_opacity = 1.5;
    match config.validate() {
        Err(MprError::Config(msg)) => assert!(msg.contains("label_opacity"), "got: {msg}"),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_validate_rejects_duplicate_ids() {
    let mut config = ViewConfig::default();
    config.volumes.push(PhantomSpec::new("anatomy", PhantomKind::Ramp));
    match config.validate() {
        Err(MprError::Config(msg)) => assert!(msg.contains("anatomy"), "got: {msg}"),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_initial_plane() {
    let mut config = ViewConfig::default();
    config.viewport.width = 120;
    config.viewport.height = 80;
    config.use_label_outline = true;
    let plane = config.initial_plane();
    assert_eq!(plane.dimensions, [120, 80, 1]);
    assert_eq!(plane.orientation, Some(Orientation::Axial));
    assert!(plane.visible);
    assert!(plane.use_label_outline);
}

#[test]
fn test_outline_config_to_filter() {
    let config = OutlineConfig {
        connectivity: Connectivity::Face,
        radius: 0,
    };
    let filter = config.to_filter();
    assert_eq!(filter.connectivity, Connectivity::Face);
    assert_eq!(filter.radius, 1);
}

// ---------------------------------------------------------------------------
// Phantoms
// ---------------------------------------------------------------------------

#[test]
fn test_default_volumes_build() {
    let volumes = ViewConfig::default().build_volumes().unwrap();
    assert_eq!(volumes.len(), 2);
    assert_eq!(volumes[0].image.scalar_type(), ScalarType::I16);
    assert_eq!(volumes[1].kind, VolumeKind::LabelMap);
}

#[test]
fn test_ramp_phantom() {
    let volume = PhantomSpec::new("ramp", PhantomKind::Ramp)
        .with_dimensions([5, 6, 7])
        .with_spacing([0.5, 0.5, 2.0])
        .with_origin([1.0, 2.0, 3.0])
        .build()
        .unwrap();
    assert_eq!(volume.dimensions(), [5, 6, 7]);
    assert_eq!(volume.image.value(2, 3, 4, 0), 9.0);
    assert_eq!(volume.spacing(), [0.5, 0.5, 2.0]);
    assert_eq!(volume.origin(), [1.0, 2.0, 3.0]);
}

#[test]
fn test_sphere_phantom() {
    let volume = PhantomSpec::new("ball", PhantomKind::Sphere)
        .with_dimensions([9, 9, 9])
        .build()
        .unwrap();
    assert_eq!(volume.image.value(4, 4, 4, 0), 1000.0);
    assert_eq!(volume.image.value(0, 0, 0, 0), -1000.0);
    assert_eq!(volume.kind, VolumeKind::Scalar);
}

#[test]
fn test_label_blocks_phantom() {
    let volume = PhantomSpec::new("seg", PhantomKind::LabelBlocks)
        .with_dimensions([20, 20, 1])
        .build()
        .unwrap();
    assert_eq!(volume.kind, VolumeKind::LabelMap);
    assert!(!volume.display.interpolate);
    assert_eq!(volume.image.value(5, 10, 0, 0), 1.0);
    assert_eq!(volume.image.value(13, 10, 0, 0), 2.0);
    assert_eq!(volume.image.value(0, 0, 0, 0), 0.0);
}

#[test]
fn test_label_display_override_stays_nearest() {
    let mut spec = PhantomSpec::new("seg", PhantomKind::LabelBlocks).with_dimensions([8, 8, 1]);
    spec.display = Some(DisplayParams {
        interpolate: true,
        window: 10.0,
        level: 5.0,
    });
    let volume = spec.build().unwrap();
    assert!(!volume.display.interpolate);
    assert_eq!(volume.display.window, 10.0);
}

#[test]
fn test_gradient_phantom() {
    let volume = PhantomSpec::new("rgb", PhantomKind::Gradient)
        .with_dimensions([5, 4, 3])
        .build()
        .unwrap();
    assert_eq!(volume.kind, VolumeKind::Vector);
    assert_eq!(volume.image.components(), 3);
    assert_eq!(volume.image.value(4, 0, 0, 0), 255.0);
    assert_eq!(volume.image.value(2, 0, 0, 0), 128.0);
    assert_eq!(volume.image.value(0, 3, 0, 1), 255.0);
    assert_eq!(volume.image.value(0, 0, 2, 2), 255.0);
}

#[test]
fn test_phantom_parent_rotation() {
    let mut spec = PhantomSpec::new("rot", PhantomKind::Ramp).with_dimensions([4, 4, 4]);
    spec.parent_rotation_deg = Some(90.0);
    let volume = spec.build().unwrap();
    assert!(volume.parent_transform.as_ref().is_some_and(|t| t.is_linear()));
}

#[test]
fn test_phantom_zero_dimension_is_error() {
    let result = PhantomSpec::new("empty", PhantomKind::Ramp)
        .with_dimensions([4, 0, 4])
        .build();
    assert!(matches!(result, Err(MprError::InvalidDimensions { height: 0, .. })));
}

// ---------------------------------------------------------------------------
// Display names
// ---------------------------------------------------------------------------

#[test]
fn test_interpolation_display() {
    assert_eq!(format!("{}", Interpolation::Nearest), "nearest");
    assert_eq!(format!("{}", Interpolation::Cubic), "cubic");
    assert_eq!(Interpolation::default(), Interpolation::Linear);
}

#[test]
fn test_blend_mode_serde_names() {
    assert_eq!(serde_json::to_string(&BlendMode::ReverseAlpha).unwrap(), "\"reverse_alpha\"");
    let mode: BlendMode = serde_json::from_str("\"add\"").unwrap();
    assert_eq!(mode, BlendMode::Add);
}
