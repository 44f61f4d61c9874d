use console::Style;
use mpr_core::config::ViewConfig;
use mpr_core::layer::LayerRole;
use mpr_core::logic::SliceLogic;

struct Styles {
    title: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
        }
    }
}

pub fn print_view_summary(config: &ViewConfig, logic: &SliceLogic) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Slice View"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(10)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Viewport"),
        s.value.apply_to(format!(
            "{}x{} ({} slice{})",
            config.viewport.width,
            config.viewport.height,
            config.viewport.slices,
            if config.viewport.slices == 1 { "" } else { "s" }
        ))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Orientation"),
        s.method.apply_to(config.orientation)
    );
    if let Some(plane) = logic.plane() {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Offset"),
            s.value.apply_to(format!("{:.2} mm", plane.slice_offset()))
        );
    }

    for role in LayerRole::ALL {
        let label = s.label.apply_to(role.to_string());
        match logic.layer(role).volume() {
            Some(volume) => {
                let interp = logic.layer(role).interpolation();
                println!(
                    "  {:<14}{} {}",
                    label,
                    s.value.apply_to(&volume.id),
                    s.label.apply_to(format!("({interp})"))
                );
            }
            None => println!("  {:<14}{}", label, s.disabled.apply_to("none")),
        }
    }

    let composite = logic.composite();
    let mode = logic.effective_blend_mode();
    if mode == composite.blend_mode {
        println!("  {:<14}{}", s.label.apply_to("Blend"), s.method.apply_to(mode));
    } else {
        println!(
            "  {:<14}{} {}",
            s.label.apply_to("Blend"),
            s.method.apply_to(mode),
            s.disabled.apply_to(format!("(requested {})", composite.blend_mode))
        );
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Opacity"),
        s.value.apply_to(format!(
            "foreground {:.2}, label {:.2}",
            composite.foreground_opacity, composite.label_opacity
        ))
    );
    if config.use_label_outline {
        println!("  {:<14}{}", s.label.apply_to("Labels"), s.method.apply_to("outline"));
    }
    println!();
}
