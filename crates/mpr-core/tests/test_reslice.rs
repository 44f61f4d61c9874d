mod common;

use mpr_core::image_data::{ImageData, ScalarType};
use mpr_core::reslice::{Interpolation, ResliceSampler};
use nalgebra::{Matrix4, Vector3};
use ndarray::Array4;

use common::make_u8_image;

fn ramp_f32(dims: [usize; 3]) -> ImageData {
    let [w, h, n] = dims;
    ImageData::F32(Array4::from_shape_fn((n, h, w, 1), |(k, j, i, _)| {
        (10 * i + 100 * j + 1000 * k) as f32
    }))
}

// ---------------------------------------------------------------------------
// Axis-aligned sampling
// ---------------------------------------------------------------------------

#[test]
fn test_identity_nearest_copies_slice() {
    let input = make_u8_image([4, 3, 2], |i, j, k| (i + 4 * j + 12 * k) as u8);
    let sampler = ResliceSampler::new(Interpolation::Nearest);
    let out = sampler.reslice(&input, &Matrix4::identity(), [4, 3, 1]);

    assert_eq!(out.dimensions(), [4, 3, 1]);
    assert_eq!(out.scalar_type(), ScalarType::U8);
    for j in 0..3 {
        for i in 0..4 {
            assert_eq!(out.value(i, j, 0, 0), input.value(i, j, 0, 0));
        }
    }
}

#[test]
fn test_stack_index_maps_through_transform() {
    let input = make_u8_image([4, 3, 2], |i, j, k| (i + 4 * j + 12 * k) as u8);
    let sampler = ResliceSampler::new(Interpolation::Nearest);
    // Output stack index 0 reads input slice 1.
    let mut m = Matrix4::identity();
    m[(2, 3)] = 1.0;
    let out = sampler.reslice(&input, &m, [4, 3, 1]);
    assert_eq!(out.value(2, 1, 0, 0), input.value(2, 1, 1, 0));
}

#[test]
fn test_outside_samples_get_background() {
    let input = make_u8_image([4, 4, 1], |_, _, _| 7);
    let sampler = ResliceSampler::new(Interpolation::Linear).with_background(vec![42.0]);
    let mut m = Matrix4::identity();
    m[(0, 3)] = 2.0;
    let resliced = sampler.reslice_masked(&input, &m, [4, 4, 1]);

    // Columns 0-1 land on i = 2..3, columns 2-3 fall off the right edge.
    assert_eq!(resliced.image.value(1, 0, 0, 0), 7.0);
    assert_eq!(resliced.image.value(2, 0, 0, 0), 42.0);
    assert_eq!(resliced.image.value(3, 3, 0, 0), 42.0);
    assert!(resliced.mask[[0, 0, 1]]);
    assert!(!resliced.mask[[0, 0, 2]]);
}

#[test]
fn test_vector_background_per_channel() {
    let input = ImageData::U8(Array4::from_elem((1, 2, 2, 3), 9));
    let sampler = ResliceSampler::new(Interpolation::Nearest).with_background(vec![1.0, 2.0, 3.0]);
    let mut m = Matrix4::identity();
    m[(1, 3)] = -10.0;
    let out = sampler.reslice(&input, &m, [2, 2, 1]);

    assert_eq!(out.components(), 3);
    assert_eq!(out.value(0, 0, 0, 0), 1.0);
    assert_eq!(out.value(0, 0, 0, 1), 2.0);
    assert_eq!(out.value(0, 0, 0, 2), 3.0);
}

#[test]
fn test_short_background_repeats_last_entry() {
    let sampler = ResliceSampler::new(Interpolation::Nearest).with_background(vec![5.0]);
    assert_eq!(sampler.background_for(0), 5.0);
    assert_eq!(sampler.background_for(2), 5.0);
    let empty = ResliceSampler::new(Interpolation::Nearest).with_background(vec![]);
    assert_eq!(empty.background_for(1), 0.0);
}

// ---------------------------------------------------------------------------
// Interpolation kernels
// ---------------------------------------------------------------------------

#[test]
fn test_linear_midpoint() {
    let input = ramp_f32([4, 1, 1]);
    let mut m = Matrix4::identity();
    m[(0, 0)] = 0.5;
    let out = ResliceSampler::new(Interpolation::Linear).reslice(&input, &m, [7, 1, 1]);
    // Output x = 3 samples i = 1.5.
    assert!((out.value(3, 0, 0, 0) - 15.0).abs() < 1e-4);
    assert!((out.value(6, 0, 0, 0) - 30.0).abs() < 1e-4);
}

#[test]
fn test_nearest_rounds_to_closest_voxel() {
    let input = ramp_f32([4, 1, 1]);
    let mut m = Matrix4::identity();
    m[(0, 3)] = 0.6;
    let out = ResliceSampler::new(Interpolation::Nearest).reslice(&input, &m, [2, 1, 1]);
    assert_eq!(out.value(0, 0, 0, 0), 10.0);
    assert_eq!(out.value(1, 0, 0, 0), 20.0);
}

#[test]
fn test_trilinear_between_slices() {
    let input = ramp_f32([3, 3, 2]);
    let mut m = Matrix4::identity();
    m[(0, 3)] = 0.5;
    m[(1, 3)] = 0.5;
    m[(2, 3)] = 0.5;
    let out = ResliceSampler::new(Interpolation::Linear).reslice(&input, &m, [1, 1, 1]);
    let expected = 10.0 * 0.5 + 100.0 * 0.5 + 1000.0 * 0.5;
    assert!((out.value(0, 0, 0, 0) - expected).abs() < 1e-3);
}

#[test]
fn test_cubic_reproduces_linear_ramp_in_interior() {
    let input = ramp_f32([6, 1, 1]);
    let mut m = Matrix4::identity();
    m[(0, 3)] = 2.25;
    let out = ResliceSampler::new(Interpolation::Cubic).reslice(&input, &m, [1, 1, 1]);
    assert!((out.value(0, 0, 0, 0) - 22.5).abs() < 1e-4);
}

#[test]
fn test_cubic_at_grid_points_is_exact() {
    let input = make_u8_image([5, 5, 1], |i, j, _| (i * 7 + j * 3) as u8);
    let out = ResliceSampler::new(Interpolation::Cubic).reslice(&input, &Matrix4::identity(), [5, 5, 1]);
    assert_eq!(out, input);
}

#[test]
fn test_integer_output_rounds() {
    let input = make_u8_image([2, 1, 1], |i, _, _| i as u8);
    let mut m = Matrix4::identity();
    m[(0, 3)] = 0.5;
    let out = ResliceSampler::new(Interpolation::Linear).reslice(&input, &m, [1, 1, 1]);
    assert_eq!(out.value(0, 0, 0, 0), 1.0);
}

// ---------------------------------------------------------------------------
// Oblique sampling
// ---------------------------------------------------------------------------

#[test]
fn test_transposed_sampling() {
    let input = make_u8_image([4, 3, 1], |i, j, _| (i + 10 * j) as u8);
    // Output x walks input j, output y walks input i.
    let m = Matrix4::new(
        0.0, 1.0, 0.0, 0.0, //
        1.0, 0.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    );
    let out = ResliceSampler::new(Interpolation::Nearest).reslice(&input, &m, [3, 4, 1]);
    assert_eq!(out.dimensions(), [3, 4, 1]);
    assert_eq!(out.value(2, 1, 0, 0), input.value(1, 2, 0, 0));
}

#[test]
fn test_rotation_about_center() {
    let input = ramp_f32([5, 5, 1]);
    let rotation = nalgebra::Rotation3::from_axis_angle(&Vector3::z_axis(), 45f64.to_radians());
    let center = nalgebra::Translation3::new(2.0, 2.0, 0.0);
    let m = center.to_homogeneous() * rotation.to_homogeneous() * center.inverse().to_homogeneous();
    let out = ResliceSampler::new(Interpolation::Linear).reslice(&input, &m, [5, 5, 1]);

    // The rotation centre maps to itself.
    assert!((out.value(2, 2, 0, 0) - input.value(2, 2, 0, 0)).abs() < 1e-3);
    // Corners rotate outside the grid.
    assert_eq!(out.value(0, 0, 0, 0), 0.0);
}

// ---------------------------------------------------------------------------
// Output type and parallel path
// ---------------------------------------------------------------------------

#[test]
fn test_output_type_cast_saturates() {
    let input = ImageData::F32(Array4::from_elem((1, 1, 2, 1), 300.7));
    let sampler = ResliceSampler::new(Interpolation::Nearest).with_output_type(ScalarType::U8);
    let out = sampler.reslice(&input, &Matrix4::identity(), [2, 1, 1]);
    assert_eq!(out.scalar_type(), ScalarType::U8);
    assert_eq!(out.value(0, 0, 0, 0), 255.0);
}

#[test]
fn test_large_output_matches_input() {
    // 300x300 crosses the row-parallel threshold.
    let input = make_u8_image([300, 300, 1], |i, j, _| ((i * 31 + j * 17) % 251) as u8);
    let out = ResliceSampler::new(Interpolation::Linear).reslice(&input, &Matrix4::identity(), [300, 300, 1]);
    assert_eq!(out, input);
}
