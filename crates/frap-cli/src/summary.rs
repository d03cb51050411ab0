use console::Style;
use frap_core::pipeline::config::PipelineConfig;
use frap_core::pipeline::RunOutput;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

fn rule(len: usize) -> String {
    "\u{2550}".repeat(len)
}

fn or_dash(v: Option<f64>, precision: usize) -> String {
    v.map(|v| format!("{v:.precision$}"))
        .unwrap_or_else(|| "-".into())
}

pub fn print_run_summary(config: &PipelineConfig) {
    let s = Styles::new();
    let a = &config.analysis;

    println!();
    println!("  {}", s.title.apply_to("FRAP Analysis"));
    println!("  {}", s.title.apply_to(rule(13)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(config.input.display())
    );
    match &a.results_dir {
        Some(dir) => println!(
            "  {:<14}{}",
            s.label.apply_to("Results"),
            s.path.apply_to(dir.display())
        ),
        None => println!(
            "  {:<14}{}",
            s.label.apply_to("Results"),
            s.disabled.apply_to("not written")
        ),
    }
    if let Some(path) = &config.label_mask_output {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Label mask"),
            s.path.apply_to(path.display())
        );
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Drift"),
        if config.align {
            s.method.apply_to("phase correlation")
        } else {
            s.disabled.apply_to("disabled")
        }
    );
    println!();

    println!("  {}", s.header.apply_to("Detection"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Detector"),
        s.method.apply_to(a.detector)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Threshold"),
        s.value.apply_to(a.score_threshold)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Projection"),
        s.method.apply_to(a.projection)
    );
    println!();

    println!("  {}", s.header.apply_to("Regions"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Mode"),
        s.method
            .apply_to(if a.circular_region_mode { "circular" } else { "morphological" })
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Min size"),
        s.value.apply_to(format!("{} px", a.min_region_size))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Border"),
        s.value.apply_to(format!("{} px", a.bleached_border()))
    );
    println!();

    println!("  {}", s.header.apply_to("Fitting"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Nested"),
        if a.nested_models {
            s.method.apply_to("F-test")
        } else {
            s.disabled.apply_to("disabled")
        }
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("D guess"),
        s.value.apply_to(a.assumed_diffusion_coefficient)
    );
    println!();
}

pub fn print_results(output: &RunOutput) {
    let s = Styles::new();
    let analysis = &output.analysis;
    let cal = &analysis.calibration;
    let kinetics = &analysis.kinetics;

    println!();
    println!("  {}", s.title.apply_to("Results"));
    println!("  {}", s.title.apply_to(rule(7)));
    println!();

    let max_drift = output
        .offsets
        .iter()
        .map(|o| o.dx.abs().max(o.dy.abs()))
        .max()
        .unwrap_or(0);
    println!(
        "  {:<18}{}",
        s.label.apply_to("Max drift"),
        s.value.apply_to(format!("{max_drift} px"))
    );
    println!(
        "  {:<18}{}",
        s.label.apply_to("Foreground"),
        s.value
            .apply_to(format!("{} px", analysis.foreground.pixel_count()))
    );
    println!(
        "  {:<18}{}",
        s.label.apply_to("Bleach events"),
        s.value.apply_to(analysis.event_count)
    );
    println!(
        "  {:<18}{}",
        s.label.apply_to("Bleaching t\u{bd}"),
        s.value.apply_to(format!(
            "{} {}",
            or_dash(kinetics.global_half_life, 3),
            cal.time_unit
        ))
    );
    println!();

    if kinetics.regions.is_empty() {
        println!("  {}", s.disabled.apply_to("No bleached regions found"));
        println!();
    } else {
        println!(
            "  {}",
            s.header.apply_to(format!(
                "{:>4} {:>6} {:>7}  {:<18} {:>10} {:>12}",
                "id",
                "frame",
                "pixels",
                "model",
                format!("t\u{bd} ({})", cal.time_unit),
                format!("D ({}\u{b2}/{})", cal.distance_unit, cal.time_unit)
            ))
        );
        for k in &kinetics.regions {
            let model = k
                .selected
                .as_ref()
                .map(|f| f.kind.to_string())
                .unwrap_or_else(|| "no fit".into());
            println!(
                "  {:>4} {:>6} {:>7}  {:<18} {:>10} {:>12}",
                s.value.apply_to(k.region_id),
                k.bleach_frame,
                k.area_px,
                s.method.apply_to(model),
                or_dash(k.half_life, 3),
                or_dash(k.diffusion_coefficient, 4)
            );
        }
        println!();
    }

    if !output.written.is_empty() {
        println!("  {}", s.header.apply_to("Written"));
        for path in &output.written {
            println!("    {}", s.path.apply_to(path.display()));
        }
        println!();
    }
}
