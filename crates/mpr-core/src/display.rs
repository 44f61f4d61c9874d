use ndarray::{Array3, Array4, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use crate::consts::RGBA_CHANNELS;
use crate::image_data::{dispatch_image, ImageData, Voxel};
use crate::volume::VolumeKind;

/// Per-volume display settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayParams {
    /// Linear interpolation when true, nearest-neighbour otherwise.
    #[serde(default = "default_interpolate")]
    pub interpolate: bool,
    #[serde(default = "default_window")]
    pub window: f64,
    #[serde(default = "default_level")]
    pub level: f64,
}

fn default_interpolate() -> bool {
    true
}

fn default_window() -> f64 {
    255.0
}

fn default_level() -> f64 {
    127.5
}

impl Default for DisplayParams {
    fn default() -> Self {
        Self {
            interpolate: default_interpolate(),
            window: default_window(),
            level: default_level(),
        }
    }
}

impl DisplayParams {
    /// Window/level spanning the image's full scalar range.
    pub fn auto_for(image: &ImageData) -> Self {
        match image.scalar_range() {
            Some((lo, hi)) if hi > lo => Self {
                window: hi - lo,
                level: 0.5 * (hi + lo),
                ..Self::default()
            },
            Some((lo, _)) => Self {
                window: 1.0,
                level: lo,
                ..Self::default()
            },
            None => Self::default(),
        }
    }

    /// Map a scalar to 0..=255 through the window.
    #[inline]
    pub fn apply(&self, v: f64) -> u8 {
        let window = self.window.max(f64::EPSILON);
        let lower = self.level - 0.5 * window;
        let t = ((v - lower) / window).clamp(0.0, 1.0);
        (t * 255.0).round() as u8
    }
}

/// 8-bit RGBA raster of shape `(slices, rows, columns, 4)`.
#[derive(Clone, Debug, PartialEq)]
pub struct RgbaImage {
    pub data: Array4<u8>,
}

impl RgbaImage {
    pub fn new(data: Array4<u8>) -> Self {
        Self { data }
    }

    /// Transparent black image with dimensions `[w, h, n]`.
    pub fn transparent(dims: [usize; 3]) -> Self {
        Self {
            data: Array4::zeros((dims[2], dims[1], dims[0], RGBA_CHANNELS)),
        }
    }

    /// Opaque image filled with one gray level.
    pub fn filled(dims: [usize; 3], gray: u8) -> Self {
        let mut data = Array4::from_elem((dims[2], dims[1], dims[0], RGBA_CHANNELS), gray);
        data.index_axis_mut(Axis(3), 3).fill(255);
        Self { data }
    }

    pub fn width(&self) -> usize {
        self.data.shape()[2]
    }

    pub fn height(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn slices(&self) -> usize {
        self.data.shape()[0]
    }

    /// `[w, h, n]`
    pub fn dimensions(&self) -> [usize; 3] {
        [self.width(), self.height(), self.slices()]
    }

    pub fn pixel(&self, x: usize, y: usize, k: usize) -> [u8; 4] {
        [0, 1, 2, 3].map(|c| self.data[[k, y, x, c]])
    }

    /// One stack slice as `(rows, columns, 4)`.
    pub fn slice(&self, k: usize) -> ArrayView3<'_, u8> {
        self.data.index_axis(Axis(0), k)
    }
}

/// Colours assigned to label values. Label 0 is always transparent.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelColorTable {
    palette: Vec<[u8; 3]>,
}

impl Default for LabelColorTable {
    fn default() -> Self {
        Self {
            palette: vec![
                [128, 174, 128],
                [241, 214, 145],
                [177, 122, 101],
                [111, 184, 210],
                [216, 101, 79],
                [221, 130, 101],
                [144, 238, 144],
                [192, 104, 88],
                [220, 245, 20],
                [78, 63, 0],
            ],
        }
    }
}

impl LabelColorTable {
    pub fn new(palette: Vec<[u8; 3]>) -> Self {
        Self { palette }
    }

    pub fn color(&self, label: i64) -> [u8; 4] {
        if label == 0 || self.palette.is_empty() {
            return [0, 0, 0, 0];
        }
        let idx = (label - 1).rem_euclid(self.palette.len() as i64) as usize;
        let [r, g, b] = self.palette[idx];
        [r, g, b, 255]
    }
}

/// Convert a resliced layer image to RGBA for blending.
///
/// `mask` marks samples that fell inside the volume; outside samples get
/// zero alpha. Without a mask everything is opaque.
pub fn map_to_rgba(
    image: &ImageData,
    mask: Option<&Array3<bool>>,
    kind: VolumeKind,
    params: &DisplayParams,
    colors: &LabelColorTable,
) -> RgbaImage {
    let components = image.components();
    let mut out = dispatch_image!(image, a => map_typed(a, kind, components, params, colors));

    if let Some(mask) = mask {
        if mask.dim() == (out.slices(), out.height(), out.width()) {
            for ((k, y, x), &inside) in mask.indexed_iter() {
                if !inside {
                    out.data[[k, y, x, 3]] = 0;
                }
            }
        }
    }
    out
}

fn map_typed<T: Voxel>(
    data: &Array4<T>,
    kind: VolumeKind,
    components: usize,
    params: &DisplayParams,
    colors: &LabelColorTable,
) -> RgbaImage {
    let (n, h, w, _) = data.dim();
    let mut out = Array4::<u8>::zeros((n, h, w, RGBA_CHANNELS));

    for k in 0..n {
        for y in 0..h {
            for x in 0..w {
                let rgba = match kind {
                    VolumeKind::LabelMap => {
                        colors.color(data[[k, y, x, 0]].as_f64().round() as i64)
                    }
                    _ if components >= 3 => {
                        let r = params.apply(data[[k, y, x, 0]].as_f64());
                        let g = params.apply(data[[k, y, x, 1]].as_f64());
                        let b = params.apply(data[[k, y, x, 2]].as_f64());
                        [r, g, b, 255]
                    }
                    _ => {
                        let v = params.apply(data[[k, y, x, 0]].as_f64());
                        [v, v, v, 255]
                    }
                };
                for (c, v) in rgba.into_iter().enumerate() {
                    out[[k, y, x, c]] = v;
                }
            }
        }
    }
    RgbaImage::new(out)
}
