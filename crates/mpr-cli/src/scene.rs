use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use mpr_core::blend::BlendMode;
use mpr_core::config::ViewConfig;
use mpr_core::diagnostics::{DiagnosticSink, TracingSink};
use mpr_core::logic::SliceLogic;
use mpr_core::plane::Orientation;
use tracing::info;

#[derive(Clone, Copy, ValueEnum)]
pub enum OrientationArg {
    Axial,
    Sagittal,
    Coronal,
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Axial => Orientation::Axial,
            OrientationArg::Sagittal => Orientation::Sagittal,
            OrientationArg::Coronal => Orientation::Coronal,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum BlendModeArg {
    Alpha,
    ReverseAlpha,
    Add,
    Subtract,
}

impl From<BlendModeArg> for BlendMode {
    fn from(arg: BlendModeArg) -> Self {
        match arg {
            BlendModeArg::Alpha => BlendMode::Alpha,
            BlendModeArg::ReverseAlpha => BlendMode::ReverseAlpha,
            BlendModeArg::Add => BlendMode::Add,
            BlendModeArg::Subtract => BlendMode::Subtract,
        }
    }
}

/// View options shared by every command that builds a slice view.
#[derive(Args)]
pub struct ViewArgs {
    /// View config file (TOML); defaults to the built-in phantom scene
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Viewport width in pixels
    #[arg(long)]
    pub width: Option<usize>,

    /// Viewport height in pixels
    #[arg(long)]
    pub height: Option<usize>,

    /// Slice orientation
    #[arg(long, value_enum)]
    pub orientation: Option<OrientationArg>,

    /// Slice offset along the plane normal (mm)
    #[arg(long, allow_hyphen_values = true)]
    pub offset: Option<f64>,

    /// Blend mode for background and foreground
    #[arg(long, value_enum)]
    pub blend: Option<BlendModeArg>,

    /// Foreground opacity (0-1)
    #[arg(long)]
    pub foreground_opacity: Option<f64>,

    /// Label opacity (0-1)
    #[arg(long)]
    pub label_opacity: Option<f64>,

    /// Draw label maps as outlines
    #[arg(long)]
    pub outline: bool,

    /// Keep the configured field of view instead of fitting the volume
    #[arg(long)]
    pub no_fit: bool,
}

impl ViewArgs {
    /// Config file (or default) with command-line overrides applied.
    pub fn load_config(&self) -> Result<ViewConfig> {
        let mut config = if let Some(ref config_path) = self.config {
            let contents = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config {}", config_path.display()))?;
            toml::from_str(&contents).context("Invalid view config")?
        } else {
            ViewConfig::default()
        };

        if let Some(width) = self.width {
            config.viewport.width = width;
        }
        if let Some(height) = self.height {
            config.viewport.height = height;
        }
        if let Some(orientation) = self.orientation {
            config.orientation = orientation.into();
        }
        if self.offset.is_some() {
            config.offset = self.offset;
        }
        if let Some(blend) = self.blend {
            config.composite.blend_mode = blend.into();
        }
        if let Some(opacity) = self.foreground_opacity {
            config.composite.foreground_opacity = opacity;
        }
        if let Some(opacity) = self.label_opacity {
            config.composite.label_opacity = opacity;
        }
        if self.outline {
            config.use_label_outline = true;
        }
        if self.no_fit {
            config.fit = false;
        }

        config.validate().context("Invalid view config")?;
        Ok(config)
    }
}

/// Build a slice view from a config, the way a scene adapter would: push
/// volumes, composite state and plane in through the input-changed calls.
pub fn build_view(config: &ViewConfig) -> Result<SliceLogic> {
    let volumes = config.build_volumes().context("Failed to build volumes")?;
    if config.composite.background.is_none()
        && config.composite.foreground.is_none()
        && config.composite.label.is_none()
    {
        bail!("View config assigns no volume to any layer");
    }

    let sink: Arc<dyn DiagnosticSink> = Arc::new(TracingSink::deduplicated());
    let mut logic = SliceLogic::new("main", sink);
    logic.set_label_outline(config.outline.to_filter());
    for volume in volumes {
        logic.on_volume_changed(volume);
    }
    logic.on_composite_changed(config.composite.clone());
    logic.on_plane_changed(config.initial_plane());

    if config.fit {
        if let Some(fitted) =
            logic.fit_slice_to_first_volume(config.viewport.width, config.viewport.height)
        {
            logic.on_plane_changed(fitted);
        }
    }
    if let Some(offset) = config.offset {
        if let Some(mut plane) = logic.plane().cloned() {
            plane.set_slice_offset(offset);
            logic.on_plane_changed(plane);
        }
    }

    info!(
        width = config.viewport.width,
        height = config.viewport.height,
        orientation = %config.orientation,
        "View ready"
    );
    Ok(logic)
}
