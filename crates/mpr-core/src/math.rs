use nalgebra::{Matrix4, Point3, Vector3, Vector4};

use crate::error::{MprError, Result};

/// Invert a 4x4 matrix, naming it in the error when it is singular.
pub fn invert(m: &Matrix4<f64>, what: &str) -> Result<Matrix4<f64>> {
    m.try_inverse()
        .ok_or_else(|| MprError::SingularMatrix(what.to_string()))
}

/// True when every element of `a` has the same bit pattern as in `b`.
///
/// Stricter than `==`: distinguishes `-0.0` from `0.0` and treats
/// identical NaNs as equal, so a recomputation that yields the same bits
/// never reads as a change.
pub fn identical(a: &Matrix4<f64>, b: &Matrix4<f64>) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
}

/// Apply an affine matrix to a point (w = 1).
pub fn transform_point(m: &Matrix4<f64>, p: [f64; 3]) -> [f64; 3] {
    let v = m * Vector4::new(p[0], p[1], p[2], 1.0);
    [v.x, v.y, v.z]
}

/// Apply the linear part of an affine matrix to a direction (w = 0).
pub fn transform_vector(m: &Matrix4<f64>, d: [f64; 3]) -> [f64; 3] {
    let v = m * Vector4::new(d[0], d[1], d[2], 0.0);
    [v.x, v.y, v.z]
}

pub fn to_point(p: [f64; 3]) -> Point3<f64> {
    Point3::new(p[0], p[1], p[2])
}

/// Copy of `m` with its translation column cleared.
pub fn without_translation(m: &Matrix4<f64>) -> Matrix4<f64> {
    let mut r = *m;
    r[(0, 3)] = 0.0;
    r[(1, 3)] = 0.0;
    r[(2, 3)] = 0.0;
    r
}

pub fn translation(m: &Matrix4<f64>) -> [f64; 3] {
    [m[(0, 3)], m[(1, 3)], m[(2, 3)]]
}

pub fn set_translation(m: &mut Matrix4<f64>, t: [f64; 3]) {
    m[(0, 3)] = t[0];
    m[(1, 3)] = t[1];
    m[(2, 3)] = t[2];
}

/// Column `axis` of the upper-left 3x3 block.
pub fn column3(m: &Matrix4<f64>, axis: usize) -> Vector3<f64> {
    Vector3::new(m[(0, axis)], m[(1, axis)], m[(2, axis)])
}

/// Build a matrix from row-major nested arrays.
pub fn from_rows(rows: &[[f64; 4]; 4]) -> Matrix4<f64> {
    Matrix4::from_fn(|r, c| rows[r][c])
}

/// Row-major nested arrays, the layout used in config files.
pub fn to_rows(m: &Matrix4<f64>) -> [[f64; 4]; 4] {
    let mut rows = [[0.0; 4]; 4];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = m[(r, c)];
        }
    }
    rows
}

/// Round half up, matching the integer rounding used for slice indices.
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}
