use anyhow::Result;
use clap::Args;
use mpr_core::geometry::{volume_ras_bounds, volume_slice_spacing};
use mpr_core::layer::LayerRole;

use crate::scene::{build_view, ViewArgs};
use crate::summary::print_view_summary;

#[derive(Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pub view: ViewArgs,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let config = args.view.load_config()?;
    let logic = build_view(&config)?;
    print_view_summary(&config, &logic);

    for role in LayerRole::ALL {
        let Some(volume) = logic.layer(role).volume() else {
            continue;
        };
        let dims = volume.dimensions();
        let spacing = volume.spacing();
        let bounds = volume_ras_bounds(volume, false);

        println!("{} layer: {}", role, volume.id);
        println!("  Kind:        {:?}", volume.kind);
        println!("  Scalar:      {} x{}", volume.image.scalar_type(), volume.image.components());
        println!("  Dimensions:  {}x{}x{}", dims[0], dims[1], dims[2]);
        println!(
            "  Spacing:     {:.3} {:.3} {:.3}",
            spacing[0], spacing[1], spacing[2]
        );
        println!(
            "  RAS bounds:  [{:.1}, {:.1}] [{:.1}, {:.1}] [{:.1}, {:.1}]",
            bounds.min[0], bounds.max[0], bounds.min[1], bounds.max[1], bounds.min[2], bounds.max[2]
        );
        if let Some(plane) = logic.plane() {
            let s = volume_slice_spacing(plane, volume);
            println!("  Slice step:  {:.3} {:.3} {:.3}", s[0], s[1], s[2]);
        }
        if volume.parent_transform.is_some() {
            println!("  Transform:   parent");
        }
        println!();
    }

    let bounds = logic.slice_bounds();
    let ([lo, hi], resolution) = logic.slice_offset_range_resolution();
    println!(
        "Slice bounds:  [{:.1}, {:.1}] [{:.1}, {:.1}] [{:.1}, {:.1}]",
        bounds.min[0], bounds.max[0], bounds.min[1], bounds.max[1], bounds.min[2], bounds.max[2]
    );
    println!("Offset range:  {:.2} .. {:.2} mm (step {:.3})", lo, hi, resolution);

    if let Some(plane) = logic.plane() {
        let offset = plane.slice_offset();
        let fov = plane.field_of_view;
        println!("Offset:        {:.2} mm", offset);
        println!("Field of view: {:.1} x {:.1} mm", fov[0], fov[1]);
        for role in LayerRole::ALL {
            if logic.layer(role).volume().is_some() {
                let index = logic.slice_index_from_offset(offset, role);
                println!("Slice index:   {} ({})", index.code(), role);
            }
        }
    }
    println!("Blend mode:    {}", logic.effective_blend_mode());

    Ok(())
}
