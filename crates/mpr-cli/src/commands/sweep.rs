use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use mpr_core::io::image_io::save_rgba_png;
use mpr_core::layer::LayerRole;

use crate::scene::{build_view, ViewArgs};

#[derive(Args)]
pub struct SweepArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    /// Number of slices to render; defaults to every voxel slab
    #[arg(long)]
    pub count: Option<usize>,

    /// Worker threads for reslicing (0 = all cores)
    #[arg(long, default_value = "0")]
    pub threads: usize,

    /// Output directory for the PNG series
    #[arg(short, long, default_value = "sweep")]
    pub output: PathBuf,
}

pub fn run(args: &SweepArgs) -> Result<()> {
    if args.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    let config = args.view.load_config()?;
    let mut logic = build_view(&config)?;
    let Some(mut plane) = logic.plane().cloned() else {
        bail!("View has no slice plane");
    };

    let ([lo, hi], resolution) = logic.slice_offset_range_resolution();
    let steps = args
        .count
        .unwrap_or_else(|| ((hi - lo) / resolution).round() as usize + 1)
        .max(1);
    let step = if steps > 1 { (hi - lo) / (steps - 1) as f64 } else { 0.0 };

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    println!("Sweep");
    println!("  Range:    {:.2} .. {:.2} mm", lo, hi);
    println!("  Slices:   {}", steps);
    println!("  Output:   {}", args.output.display());
    println!();

    let pb = ProgressBar::new(steps as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:20} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );

    let mut written = 0;
    for n in 0..steps {
        let offset = lo + step * n as f64;
        plane.set_slice_offset(offset);
        logic.on_plane_changed(plane.clone());

        let index = logic.slice_index_from_offset(offset, LayerRole::Background);
        pb.set_message(format!("slice {}", index.code()));

        if let Some(image) = logic.image() {
            let path = args.output.join(format!("slice_{n:04}.png"));
            save_rgba_png(image, plane.active_slice, &path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            written += 1;
        }
        pb.inc(1);
    }

    pb.finish_with_message("Done");
    println!("\n{} slice(s) saved to {}", written, args.output.display());
    Ok(())
}
