use ndarray::Array4;

use crate::image_data::Voxel;

/// Sampling kernel used by the reslice sampler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    #[default]
    Linear,
    /// Catmull-Rom cubic with border-clamped taps.
    Cubic,
}

impl std::fmt::Display for Interpolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nearest => write!(f, "nearest"),
            Self::Linear => write!(f, "linear"),
            Self::Cubic => write!(f, "cubic"),
        }
    }
}

/// True if `p` (i, j, k) lies within the voxel extent, allowing `tol` of slack.
#[inline]
pub(crate) fn inside(p: [f64; 3], dims: [usize; 3], tol: f64) -> bool {
    (0..3).all(|a| {
        let hi = dims[a] as f64 - 1.0;
        dims[a] > 0 && p[a] >= -tol && p[a] <= hi + tol
    })
}

/// Sample every component at `p` into `out`.
#[inline]
pub(crate) fn sample<T: Voxel>(
    input: &Array4<T>,
    p: [f64; 3],
    interpolation: Interpolation,
    out: &mut [f64],
) {
    match interpolation {
        Interpolation::Nearest => nearest(input, p, out),
        Interpolation::Linear => linear(input, p, out),
        Interpolation::Cubic => cubic(input, p, out),
    }
}

/// Input extent in (i, j, k) order.
#[inline]
fn extent<T>(input: &Array4<T>) -> [usize; 3] {
    let (n, h, w, _) = input.dim();
    [w, h, n]
}

fn nearest<T: Voxel>(input: &Array4<T>, p: [f64; 3], out: &mut [f64]) {
    let dims = extent(input);
    let idx: [usize; 3] =
        [0, 1, 2].map(|a| ((p[a] + 0.5).floor().max(0.0) as usize).min(dims[a] - 1));
    for (c, o) in out.iter_mut().enumerate() {
        *o = input[[idx[2], idx[1], idx[0], c]].as_f64();
    }
}

/// Lower tap index and fractional weight along one axis.
#[inline]
fn linear_taps(x: f64, dim: usize) -> (usize, usize, f64) {
    if dim < 2 {
        return (0, 0, 0.0);
    }
    let i0 = (x.floor().max(0.0) as usize).min(dim - 2);
    let f = (x - i0 as f64).clamp(0.0, 1.0);
    (i0, i0 + 1, f)
}

fn linear<T: Voxel>(input: &Array4<T>, p: [f64; 3], out: &mut [f64]) {
    let dims = extent(input);
    let (i0, i1, fi) = linear_taps(p[0], dims[0]);
    let (j0, j1, fj) = linear_taps(p[1], dims[1]);
    let (k0, k1, fk) = linear_taps(p[2], dims[2]);

    for (c, o) in out.iter_mut().enumerate() {
        let v = |i: usize, j: usize, k: usize| input[[k, j, i, c]].as_f64();
        let c00 = v(i0, j0, k0) * (1.0 - fi) + v(i1, j0, k0) * fi;
        let c10 = v(i0, j1, k0) * (1.0 - fi) + v(i1, j1, k0) * fi;
        let c01 = v(i0, j0, k1) * (1.0 - fi) + v(i1, j0, k1) * fi;
        let c11 = v(i0, j1, k1) * (1.0 - fi) + v(i1, j1, k1) * fi;
        let c0 = c00 * (1.0 - fj) + c10 * fj;
        let c1 = c01 * (1.0 - fj) + c11 * fj;
        *o = c0 * (1.0 - fk) + c1 * fk;
    }
}

/// Catmull-Rom weights for taps at -1, 0, +1, +2 relative to `floor(x)`.
#[inline]
fn catmull_rom(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        0.5 * (-t3 + 2.0 * t2 - t),
        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
        0.5 * (t3 - t2),
    ]
}

/// Tap indices (border-clamped) and weights along one axis.
#[inline]
fn cubic_taps(x: f64, dim: usize) -> ([usize; 4], [f64; 4]) {
    if dim < 2 {
        return ([0; 4], [0.0, 1.0, 0.0, 0.0]);
    }
    let base = x.floor();
    let t = x - base;
    let last = dim as isize - 1;
    let idx = [-1isize, 0, 1, 2].map(|d| (base as isize + d).clamp(0, last) as usize);
    (idx, catmull_rom(t))
}

fn cubic<T: Voxel>(input: &Array4<T>, p: [f64; 3], out: &mut [f64]) {
    let dims = extent(input);
    let (ii, wi) = cubic_taps(p[0], dims[0]);
    let (jj, wj) = cubic_taps(p[1], dims[1]);
    let (kk, wk) = cubic_taps(p[2], dims[2]);

    for (c, o) in out.iter_mut().enumerate() {
        let mut acc = 0.0;
        for (&k, &wkv) in kk.iter().zip(wk.iter()) {
            if wkv == 0.0 {
                continue;
            }
            for (&j, &wjv) in jj.iter().zip(wj.iter()) {
                if wjv == 0.0 {
                    continue;
                }
                let mut row = 0.0;
                for (&i, &wiv) in ii.iter().zip(wi.iter()) {
                    row += input[[k, j, i, c]].as_f64() * wiv;
                }
                acc += row * wjv * wkv;
            }
        }
        *o = acc;
    }
}
