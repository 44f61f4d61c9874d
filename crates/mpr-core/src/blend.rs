use std::borrow::Cow;
use std::fmt;

use ndarray::{Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::display::RgbaImage;

/// How the background and foreground layers are combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Foreground over background at the foreground opacity.
    #[default]
    Alpha,
    /// Background over foreground at the foreground opacity.
    ReverseAlpha,
    Add,
    /// Background minus foreground.
    Subtract,
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alpha => write!(f, "Alpha"),
            Self::ReverseAlpha => write!(f, "Reverse alpha"),
            Self::Add => write!(f, "Add"),
            Self::Subtract => write!(f, "Subtract"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
}

/// One entry in the blend stack.
#[derive(Clone, Debug)]
pub struct BlendInput<'a> {
    pub image: Cow<'a, RgbaImage>,
    pub opacity: f64,
}

impl<'a> BlendInput<'a> {
    pub fn borrowed(image: &'a RgbaImage, opacity: f64) -> Self {
        Self {
            image: Cow::Borrowed(image),
            opacity,
        }
    }

    pub fn owned(image: RgbaImage, opacity: f64) -> Self {
        Self {
            image: Cow::Owned(image),
            opacity,
        }
    }
}

/// Blend stack for one frame, plus the mode that was actually applied.
pub struct BlendPlan<'a> {
    pub effective_mode: BlendMode,
    pub inputs: Vec<BlendInput<'a>>,
}

/// Order the layer images for blending under `mode`.
///
/// Add and Subtract need both background and foreground and fall back to
/// Alpha when either is missing. Their result is one full-weight layer, so
/// `foreground_opacity` has no effect in those modes. ReverseAlpha draws the
/// background at `foreground_opacity` only over a foreground. The label
/// layer always goes on top.
pub fn plan_layers<'a>(
    mode: BlendMode,
    background: Option<&'a RgbaImage>,
    foreground: Option<&'a RgbaImage>,
    label: Option<&'a RgbaImage>,
    foreground_opacity: f64,
    label_opacity: f64,
) -> BlendPlan<'a> {
    let effective_mode = match mode {
        BlendMode::Add | BlendMode::Subtract if background.is_none() || foreground.is_none() => {
            BlendMode::Alpha
        }
        other => other,
    };

    let mut inputs = Vec::with_capacity(3);
    match (effective_mode, background, foreground) {
        (BlendMode::Add, Some(bg), Some(fg)) => {
            inputs.push(BlendInput::owned(add_subtract(bg, fg, ArithmeticOp::Add), 1.0));
        }
        (BlendMode::Subtract, Some(bg), Some(fg)) => {
            inputs.push(BlendInput::owned(
                add_subtract(bg, fg, ArithmeticOp::Subtract),
                1.0,
            ));
        }
        (BlendMode::ReverseAlpha, bg, fg) => {
            if let Some(fg) = fg {
                inputs.push(BlendInput::borrowed(fg, 1.0));
            }
            if let Some(bg) = bg {
                let opacity = if inputs.is_empty() { 1.0 } else { foreground_opacity };
                inputs.push(BlendInput::borrowed(bg, opacity));
            }
        }
        (_, bg, fg) => {
            if let Some(bg) = bg {
                inputs.push(BlendInput::borrowed(bg, 1.0));
            }
            if let Some(fg) = fg {
                inputs.push(BlendInput::borrowed(fg, foreground_opacity));
            }
        }
    }

    if let Some(label) = label {
        inputs.push(BlendInput::borrowed(label, label_opacity));
    }

    BlendPlan {
        effective_mode,
        inputs,
    }
}

/// Blend a stack bottom to top.
///
/// The first input seeds the result, its alpha scaled by its opacity.
/// Each later input is composited with weight `opacity * alpha / 255`.
/// Inputs whose shape differs from the first are skipped.
pub fn blend_layers(inputs: &[BlendInput<'_>], sink: &dyn DiagnosticSink) -> Option<RgbaImage> {
    let (first, rest) = inputs.split_first()?;
    let mut out = first.image.as_ref().clone();
    if first.opacity < 1.0 {
        let opacity = first.opacity.clamp(0.0, 1.0);
        out.data
            .index_axis_mut(Axis(3), 3)
            .mapv_inplace(|a| (a as f64 * opacity).round() as u8);
    }

    for input in rest {
        if input.image.data.shape() != out.data.shape() {
            sink.report(Diagnostic::warning(
                DiagnosticKind::ShapeMismatch,
                "blend",
                format!(
                    "layer image {:?} does not match {:?}; skipped",
                    input.image.dimensions(),
                    out.dimensions()
                ),
            ));
            continue;
        }
        composite_over(&mut out, &input.image, input.opacity.clamp(0.0, 1.0));
    }
    Some(out)
}

fn composite_over(out: &mut RgbaImage, input: &RgbaImage, opacity: f64) {
    let pixels = out.width() * out.height() * out.slices();
    let zip = Zip::from(out.data.lanes_mut(Axis(3))).and(input.data.lanes(Axis(3)));
    let apply = |mut dst: ndarray::ArrayViewMut1<u8>, src: ndarray::ArrayView1<u8>| {
        let a = opacity * src[3] as f64 / 255.0;
        if a <= 0.0 {
            return;
        }
        for c in 0..3 {
            let v = dst[c] as f64 * (1.0 - a) + src[c] as f64 * a;
            dst[c] = v.round().clamp(0.0, 255.0) as u8;
        }
        let alpha = dst[3] as f64 + a * (255.0 - dst[3] as f64);
        dst[3] = alpha.round().clamp(0.0, 255.0) as u8;
    };
    if pixels >= PARALLEL_PIXEL_THRESHOLD {
        zip.par_for_each(apply);
    } else {
        zip.for_each(apply);
    }
}

/// Per-channel sum or difference of two RGBA images.
///
/// Evaluated in `i32` and saturated to `0..=255`; alpha is the larger of
/// the two input alphas. On a shape mismatch the background is returned
/// unchanged.
pub fn add_subtract(background: &RgbaImage, foreground: &RgbaImage, op: ArithmeticOp) -> RgbaImage {
    let mut out = background.clone();
    if background.data.shape() != foreground.data.shape() {
        return out;
    }
    let pixels = out.width() * out.height() * out.slices();
    let zip = Zip::from(out.data.lanes_mut(Axis(3))).and(foreground.data.lanes(Axis(3)));
    let apply = |mut dst: ndarray::ArrayViewMut1<u8>, src: ndarray::ArrayView1<u8>| {
        for c in 0..3 {
            let b = dst[c] as i32;
            let f = src[c] as i32;
            let v = match op {
                ArithmeticOp::Add => b + f,
                ArithmeticOp::Subtract => b - f,
            };
            dst[c] = v.clamp(0, 255) as u8;
        }
        dst[3] = dst[3].max(src[3]);
    };
    if pixels >= PARALLEL_PIXEL_THRESHOLD {
        zip.par_for_each(apply);
    } else {
        zip.for_each(apply);
    }
    out
}
