use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use mpr_core::io::image_io::{save_layer_png, save_rgba_png};
use mpr_core::layer::LayerRole;

use crate::scene::{build_view, ViewArgs};
use crate::summary::print_view_summary;

#[derive(Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    /// Light-box slice to write
    #[arg(long, default_value = "0")]
    pub slice: usize,

    /// Also write each layer's raw resliced image into this directory
    #[arg(long)]
    pub dump_layers: Option<PathBuf>,

    /// Output PNG path
    #[arg(short, long, default_value = "slice.png")]
    pub output: PathBuf,
}

pub fn run(args: &RenderArgs) -> Result<()> {
    let config = args.view.load_config()?;
    let logic = build_view(&config)?;
    print_view_summary(&config, &logic);

    let Some(image) = logic.image() else {
        bail!("No layer produced an image; check the composite volume ids");
    };
    save_rgba_png(image, args.slice, &args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    if let Some(ref dir) = args.dump_layers {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        for role in LayerRole::ALL {
            let layer = logic.layer(role);
            if let Some(image) = layer.image() {
                let path = dir.join(format!("{}.png", role.to_string().to_lowercase()));
                save_layer_png(image, args.slice, &path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("  Layer {:<11} {}", role, path.display());
            }
        }
    }

    println!("\nOutput saved to {}", args.output.display());
    Ok(())
}
