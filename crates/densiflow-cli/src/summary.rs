use std::path::Path;
use std::time::Duration;

use console::Style;
use densiflow_core::field::DenseFlowField;
use densiflow_core::preprocess::PyramidLevel;

struct Styles {
    title: Style,
    label: Style,
    value: Style,
    warn: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            warn: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

fn rule(s: &Styles, width: usize) -> String {
    s.title.apply_to("\u{2550}".repeat(width)).to_string()
}

pub fn print_flow_summary(field: &DenseFlowField, total: usize, valid: usize, elapsed: Duration) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Dense Flow"));
    println!("  {}", rule(&s, 10));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Size"),
        s.value.apply_to(format!("{}x{}", field.width(), field.height()))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Patches"),
        s.value.apply_to(format!("{valid} valid / {total}"))
    );

    let coverage = field.coverage();
    let coverage_text = format!("{:.1}%", coverage * 100.0);
    if coverage < 1.0 {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Coverage"),
            s.warn.apply_to(coverage_text)
        );
    } else {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Coverage"),
            s.value.apply_to(coverage_text)
        );
    }

    println!(
        "  {:<14}{}",
        s.label.apply_to("Mean motion"),
        s.value.apply_to(format!("{:.4} px", field.mean_magnitude()))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Max weight"),
        s.value.apply_to(format!("{:.4e}", field.max_weight()))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Elapsed"),
        s.value.apply_to(format!("{:.1} ms", elapsed.as_secs_f64() * 1e3))
    );
    println!();
}

pub fn print_pyramid_summary(input: &Path, levels: &[PyramidLevel]) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Gradient Pyramid"));
    println!("  {}", rule(&s, 16));
    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(input.display())
    );
    println!();

    for level in levels {
        println!(
            "  {:<14}{}",
            s.label.apply_to(format!("Level {}", level.level)),
            s.value.apply_to(format!(
                "{}x{}  scale {:.3}  |grad| {:.4}",
                level.data.width(),
                level.data.height(),
                level.scale,
                level.data.mean_gradient_magnitude()
            ))
        );
    }
    println!();
}
