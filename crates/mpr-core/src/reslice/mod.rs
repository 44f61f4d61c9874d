pub mod interpolate;

pub use interpolate::Interpolation;

use nalgebra::{Matrix4, Vector4};
use ndarray::{Array3, Array4, ArrayViewMut1, ArrayViewMut2, Axis};
use rayon::prelude::*;

use crate::consts::{PARALLEL_PIXEL_THRESHOLD, RESLICE_BOUNDS_TOLERANCE};
use crate::image_data::{dispatch_image, ImageData, ScalarType, Voxel};

/// Output of a masked reslice.
#[derive(Clone, Debug, PartialEq)]
pub struct Resliced {
    pub image: ImageData,
    /// `(slices, rows, columns)`; true where the sample fell inside the input.
    pub mask: Array3<bool>,
}

/// Resamples a volume onto an arbitrarily oriented output grid.
///
/// The output grid has unit spacing and zero origin; `output_to_input`
/// carries all physical placement.
#[derive(Clone, Debug, PartialEq)]
pub struct ResliceSampler {
    pub interpolation: Interpolation,
    /// Per-component value written outside the input extent.
    pub background: Vec<f64>,
    /// Cast the output to this type instead of keeping the input type.
    pub output_type: Option<ScalarType>,
    pub tolerance: f64,
}

impl Default for ResliceSampler {
    fn default() -> Self {
        Self::new(Interpolation::Linear)
    }
}

impl ResliceSampler {
    pub fn new(interpolation: Interpolation) -> Self {
        Self {
            interpolation,
            background: vec![0.0],
            output_type: None,
            tolerance: RESLICE_BOUNDS_TOLERANCE,
        }
    }

    pub fn with_background(mut self, background: Vec<f64>) -> Self {
        self.background = background;
        self
    }

    pub fn with_output_type(mut self, scalar_type: ScalarType) -> Self {
        self.output_type = Some(scalar_type);
        self
    }

    /// Background for component `c`; short tuples repeat their last entry.
    pub fn background_for(&self, c: usize) -> f64 {
        self.background
            .get(c)
            .or_else(|| self.background.last())
            .copied()
            .unwrap_or(0.0)
    }

    /// Resample `input` into an output grid of `dims` = `[w, h, n]`.
    pub fn reslice(&self, input: &ImageData, output_to_input: &Matrix4<f64>, dims: [usize; 3]) -> ImageData {
        self.reslice_masked(input, output_to_input, dims).image
    }

    /// Like [`reslice`](Self::reslice), also returning the inside-volume mask.
    pub fn reslice_masked(
        &self,
        input: &ImageData,
        output_to_input: &Matrix4<f64>,
        dims: [usize; 3],
    ) -> Resliced {
        let background: Vec<f64> = (0..input.components())
            .map(|c| self.background_for(c))
            .collect();

        let (image, mask) = dispatch_image!(input, a => {
            let (out, mask) = reslice_typed(
                a,
                output_to_input,
                dims,
                self.interpolation,
                &background,
                self.tolerance,
            );
            (ImageData::from_array(out), mask)
        });

        let image = match self.output_type {
            Some(st) => image.cast(st),
            None => image,
        };
        Resliced { image, mask }
    }
}

fn reslice_typed<T: Voxel>(
    input: &Array4<T>,
    output_to_input: &Matrix4<f64>,
    dims: [usize; 3],
    interpolation: Interpolation,
    background: &[f64],
    tol: f64,
) -> (Array4<T>, Array3<bool>) {
    let [w, h, n] = dims;
    let components = input.dim().3;
    let (in_n, in_h, in_w, _) = input.dim();
    let in_dims = [in_w, in_h, in_n];

    let mut out = Array4::<T>::zeros((n, h, w, components));
    let mut mask = Array3::<bool>::from_elem((n, h, w), false);

    let step = output_to_input * Vector4::new(1.0, 0.0, 0.0, 0.0);
    let bg: Vec<T> = background.iter().map(|&v| T::from_f64(v)).collect();

    let fill_row = |k: usize, j: usize, mut row: ArrayViewMut2<T>, mut mrow: ArrayViewMut1<bool>| {
        let origin = output_to_input * Vector4::new(0.0, j as f64, k as f64, 1.0);
        let mut samples = vec![0.0f64; components];
        for x in 0..w {
            let xf = x as f64;
            let p = [
                origin.x + step.x * xf,
                origin.y + step.y * xf,
                origin.z + step.z * xf,
            ];
            if interpolate::inside(p, in_dims, tol) {
                interpolate::sample(input, p, interpolation, &mut samples);
                for (c, &v) in samples.iter().enumerate() {
                    row[[x, c]] = T::from_f64(v);
                }
                mrow[x] = true;
            } else {
                for (c, &v) in bg.iter().enumerate() {
                    row[[x, c]] = v;
                }
            }
        }
    };

    let parallel = w * h * n >= PARALLEL_PIXEL_THRESHOLD;
    for (k, (mut slab, mut mslab)) in out
        .axis_iter_mut(Axis(0))
        .zip(mask.axis_iter_mut(Axis(0)))
        .enumerate()
    {
        if parallel {
            slab.axis_iter_mut(Axis(0))
                .into_par_iter()
                .zip(mslab.axis_iter_mut(Axis(0)).into_par_iter())
                .enumerate()
                .for_each(|(j, (row, mrow))| fill_row(k, j, row, mrow));
        } else {
            for (j, (row, mrow)) in slab
                .axis_iter_mut(Axis(0))
                .zip(mslab.axis_iter_mut(Axis(0)))
                .enumerate()
            {
                fill_row(k, j, row, mrow);
            }
        }
    }

    (out, mask)
}
