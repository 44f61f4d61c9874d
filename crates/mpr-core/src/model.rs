use nalgebra::{Matrix4, Point3};
use ndarray::Array3;

use crate::display::RgbaImage;
use crate::math;
use crate::plane::SlicePlane;

/// Textured quad placing the current slice in physical space, for
/// cross-referencing the slice in other views.
#[derive(Clone, Debug, PartialEq)]
pub struct SlicePlaneModel {
    /// RAS positions of raster corners (0,0), (w,0), (0,h), (w,h) at the
    /// active light-box slice.
    pub corners: [Point3<f64>; 4],
    /// Raster pixel to RAS for the active slice.
    pub transform: Matrix4<f64>,
    /// Active slice of the composite, `(rows, columns, 4)`.
    pub texture: Option<Array3<u8>>,
    pub visible: bool,
    pub show_intersections: bool,
    /// Label maps must not be smoothed when the texture is magnified.
    pub interpolate_texture: bool,
    pub generation: u64,
}

impl SlicePlaneModel {
    pub fn corners_for(plane: &SlicePlane) -> [Point3<f64>; 4] {
        let xy_to_ras = plane.xy_to_ras();
        let [w, h, _] = plane.dimensions.map(|d| d as f64);
        let z = plane.active_slice as f64;
        [[0.0, 0.0], [w, 0.0], [0.0, h], [w, h]]
            .map(|[x, y]| math::to_point(math::transform_point(&xy_to_ras, [x, y, z])))
    }

    pub fn build(
        plane: &SlicePlane,
        image: Option<&RgbaImage>,
        show_intersections: bool,
        has_label_layer: bool,
        generation: u64,
    ) -> Self {
        let mut transform = plane.xy_to_ras();
        let offset = math::transform_vector(&transform, [0.0, 0.0, plane.active_slice as f64]);
        let t = math::translation(&transform);
        math::set_translation(&mut transform, [t[0] + offset[0], t[1] + offset[1], t[2] + offset[2]]);

        let texture = image
            .filter(|img| plane.active_slice < img.slices())
            .map(|img| img.slice(plane.active_slice).to_owned());

        Self {
            corners: Self::corners_for(plane),
            transform,
            texture,
            visible: plane.visible,
            show_intersections,
            interpolate_texture: !has_label_layer,
            generation,
        }
    }
}
