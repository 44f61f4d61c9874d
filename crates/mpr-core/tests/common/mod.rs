#![allow(dead_code)]

use std::sync::Arc;

use mpr_core::display::{DisplayParams, RgbaImage};
use mpr_core::image_data::ImageData;
use mpr_core::plane::{Orientation, SlicePlane};
use mpr_core::volume::{VolumeKind, VolumeNode};
use nalgebra::Matrix4;
use ndarray::Array4;

/// Single-component u8 image of `[w, h, n]` filled by `f(i, j, k)`.
pub fn make_u8_image(dims: [usize; 3], f: impl Fn(usize, usize, usize) -> u8) -> ImageData {
    let [w, h, n] = dims;
    ImageData::U8(Array4::from_shape_fn((n, h, w, 1), |(k, j, i, _)| f(i, j, k)))
}

/// Uniform u8 volume centred on the RAS origin in-plane, unit spacing,
/// with slice 0 at S = 0. Display maps values 1:1 to gray.
pub fn make_uniform_volume(id: &str, dims: [usize; 3], value: u8) -> Arc<VolumeNode> {
    let origin = [-(dims[0] as f64) / 2.0, -(dims[1] as f64) / 2.0, 0.0];
    let node = VolumeNode::with_spacing_origin(id, make_u8_image(dims, |_, _, _| value), [1.0; 3], origin)
        .unwrap()
        .with_display(DisplayParams::default());
    Arc::new(node)
}

/// Label map volume laid out like [`make_uniform_volume`].
pub fn make_label_volume(id: &str, dims: [usize; 3], f: impl Fn(usize, usize, usize) -> u8) -> Arc<VolumeNode> {
    let origin = [-(dims[0] as f64) / 2.0, -(dims[1] as f64) / 2.0, 0.0];
    let node = VolumeNode::with_spacing_origin(id, make_u8_image(dims, f), [1.0; 3], origin)
        .unwrap()
        .with_kind(VolumeKind::LabelMap);
    Arc::new(node)
}

/// Plane whose pixels coincide with voxels of the volumes above.
pub fn make_axial_plane(width: usize, height: usize) -> SlicePlane {
    let mut plane = SlicePlane::new(Orientation::Axial, [width, height, 1]);
    plane.set_field_of_view([width as f64, height as f64, 1.0]);
    plane.visible = true;
    plane
}

pub fn make_rgba(dims: [usize; 3], gray: u8) -> RgbaImage {
    RgbaImage::filled(dims, gray)
}

pub fn assert_matrix_close(a: &Matrix4<f64>, b: &Matrix4<f64>, eps: f64) {
    for r in 0..4 {
        for c in 0..4 {
            let (x, y) = (a[(r, c)], b[(r, c)]);
            assert!(
                (x - y).abs() <= eps,
                "element ({r}, {c}): expected {y}, got {x}\n{a}\nvs\n{b}"
            );
        }
    }
}

pub fn assert_close(actual: f64, expected: f64, eps: f64) {
    assert!(
        (actual - expected).abs() <= eps,
        "expected {expected}, got {actual} (tolerance {eps})"
    );
}
