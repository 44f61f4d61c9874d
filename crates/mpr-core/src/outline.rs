use ndarray::{Array4, ArrayViewMut2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{MprError, Result};
use crate::image_data::{dispatch_image, ImageData, Voxel};

/// Neighbourhood shape used when looking for a differing label.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// Neighbours sharing a face: 4 in 2D, 6 in 3D.
    Face,
    /// Full box neighbourhood: 8 in 2D, 26 in 3D.
    #[default]
    Full,
}

/// Turns filled label regions into their boundary pixels.
///
/// A non-background pixel keeps its label when any in-bounds neighbour
/// carries a different value; every other pixel becomes background.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelOutline {
    pub background: f64,
    pub connectivity: Connectivity,
    pub radius: usize,
    /// Only compare against neighbours in the same stack slice.
    pub per_slice: bool,
}

impl Default for LabelOutline {
    fn default() -> Self {
        Self {
            background: 0.0,
            connectivity: Connectivity::Full,
            radius: 1,
            per_slice: true,
        }
    }
}

impl LabelOutline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn with_radius(mut self, radius: usize) -> Self {
        self.radius = radius.max(1);
        self
    }

    pub fn with_background(mut self, background: f64) -> Self {
        self.background = background;
        self
    }

    pub fn with_per_slice(mut self, per_slice: bool) -> Self {
        self.per_slice = per_slice;
        self
    }

    /// Neighbour offsets as `[di, dj, dk]`, excluding the centre.
    pub fn offsets(&self) -> Vec<[isize; 3]> {
        let r = self.radius as isize;
        let rk = if self.per_slice { 0 } else { r };
        let mut offsets = Vec::new();
        for dk in -rk..=rk {
            for dj in -r..=r {
                for di in -r..=r {
                    let nonzero = [di, dj, dk].iter().filter(|&&d| d != 0).count();
                    let keep = match self.connectivity {
                        Connectivity::Face => nonzero == 1,
                        Connectivity::Full => nonzero > 0,
                    };
                    if keep {
                        offsets.push([di, dj, dk]);
                    }
                }
            }
        }
        offsets
    }

    pub fn apply(&self, input: &ImageData) -> Result<ImageData> {
        let components = input.components();
        if components != 1 {
            return Err(MprError::UnsupportedComponents {
                filter: "label outline",
                components,
            });
        }
        let offsets = self.offsets();
        let background = self.background;
        Ok(dispatch_image!(input, a => ImageData::from_array(
            outline_typed(a, Voxel::from_f64(background), &offsets)
        )))
    }
}

fn outline_typed<T: Voxel>(input: &Array4<T>, background: T, offsets: &[[isize; 3]]) -> Array4<T> {
    let (n, h, w, _) = input.dim();
    let mut out = Array4::<T>::from_elem((n, h, w, 1), background);

    let in_bounds = |i: isize, j: isize, k: isize| {
        i >= 0 && j >= 0 && k >= 0 && (i as usize) < w && (j as usize) < h && (k as usize) < n
    };

    let fill_row = |k: usize, j: usize, mut row: ArrayViewMut2<T>| {
        for i in 0..w {
            let center = input[[k, j, i, 0]];
            if center == background {
                continue;
            }
            let boundary = offsets.iter().any(|&[di, dj, dk]| {
                let (ni, nj, nk) = (i as isize + di, j as isize + dj, k as isize + dk);
                in_bounds(ni, nj, nk)
                    && input[[nk as usize, nj as usize, ni as usize, 0]] != center
            });
            if boundary {
                row[[i, 0]] = center;
            }
        }
    };

    let parallel = w * h * n >= PARALLEL_PIXEL_THRESHOLD;
    for (k, mut slab) in out.axis_iter_mut(Axis(0)).enumerate() {
        if parallel {
            slab.axis_iter_mut(Axis(0))
                .into_par_iter()
                .enumerate()
                .for_each(|(j, row)| fill_row(k, j, row));
        } else {
            for (j, row) in slab.axis_iter_mut(Axis(0)).enumerate() {
                fill_row(k, j, row);
            }
        }
    }
    out
}
