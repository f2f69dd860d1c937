use std::path::Path;

use console::Style;
use xtcav_core::filter::Rejection;
use xtcav_core::pipeline::config::ResolvedConfig;
use xtcav_core::pipeline::RunOutput;
use xtcav_core::reference::LasingOffReference;

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

fn print_title(s: &Styles, title: &str) {
    println!();
    println!("  {}", s.title.apply_to(title));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(title.chars().count())));
    println!();
}

fn print_processing(s: &Styles, config: &ResolvedConfig) {
    let p = &config.processing;
    println!("  {}", s.header.apply_to("Processing"));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Max shots"),
        s.value.apply_to(p.max_shots)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Bunches"),
        s.value.apply_to(p.num_bunches)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Group size"),
        s.value.apply_to(p.group_size)
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Denoise"),
        s.value.apply_to(format!("median {} px, SNR {}", p.median_filter, p.snr_filter))
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("ROI"),
        s.value.apply_to(format!(
            "waist {} x{}",
            p.roi_waist_threshold, p.roi_expand
        ))
    );
    if p.num_bunches > 1 {
        println!(
            "    {:<14}{} ({}, {})",
            s.label.apply_to("Island split"),
            s.method.apply_to(p.island_split_method),
            p.island_split_par1,
            p.island_split_par2
        );
    }
    println!();
}

pub fn print_generate_summary(config: &ResolvedConfig, input: &Path, workers: usize, has_dark: bool) {
    let s = Styles::new();
    print_title(&s, "XTCAV Lasing-Off Reference");

    println!(
        "  {:<16}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(input.display())
    );
    println!(
        "  {:<16}{} run {}",
        s.label.apply_to("Experiment"),
        s.value.apply_to(&config.experiment),
        s.value.apply_to(&config.runs)
    );
    println!(
        "  {:<16}{}",
        s.label.apply_to("Validity"),
        s.value.apply_to(&config.validity_range)
    );
    println!(
        "  {:<16}{}",
        s.label.apply_to("Workers"),
        s.value.apply_to(workers)
    );
    match (&config.dark_reference_path, has_dark) {
        (Some(path), true) => println!(
            "  {:<16}{}",
            s.label.apply_to("Dark"),
            s.path.apply_to(path.display())
        ),
        _ => println!(
            "  {:<16}{}",
            s.label.apply_to("Dark"),
            s.disabled.apply_to("none")
        ),
    }
    println!();

    print_processing(&s, config);
}

pub fn print_run_summary(output: &RunOutput, path: &Path) {
    let s = Styles::new();
    let summary = &output.summary;

    println!();
    println!("  {}", s.header.apply_to("Shots"));
    println!(
        "    {:<22}{}",
        s.label.apply_to("Events visited"),
        s.value.apply_to(format!("{} / {}", summary.visited, summary.events))
    );
    println!(
        "    {:<22}{}",
        s.label.apply_to("Accepted"),
        s.value.apply_to(summary.accepted)
    );
    println!(
        "    {:<22}{}",
        s.label.apply_to("Kept"),
        s.value.apply_to(summary.kept)
    );
    for reason in Rejection::ALL {
        println!(
            "    {:<22}{}",
            s.label.apply_to(format!("Rejected ({reason})")),
            s.value.apply_to(summary.rejections.get(reason))
        );
    }
    println!();
    println!(
        "  {:<16}{}",
        s.label.apply_to("Profiles"),
        s.value.apply_to(output.reference.averaged_profiles.len())
    );
    println!(
        "  {:<16}{}",
        s.label.apply_to("Saved to"),
        s.path.apply_to(path.display())
    );
}

pub fn print_reference_info(reference: &LasingOffReference, path: &Path) {
    let s = Styles::new();
    let config = &reference.parameters;
    print_title(&s, "Lasing-Off Reference");

    println!(
        "  {:<16}{}",
        s.label.apply_to("File"),
        s.path.apply_to(path.display())
    );
    println!(
        "  {:<16}{} run {}",
        s.label.apply_to("Experiment"),
        s.value.apply_to(&config.experiment),
        s.value.apply_to(&config.runs)
    );
    println!(
        "  {:<16}{}",
        s.label.apply_to("Validity"),
        s.value.apply_to(&reference.validity_range)
    );
    println!(
        "  {:<16}{}",
        s.label.apply_to("Shots"),
        s.value.apply_to(reference.n)
    );
    println!(
        "  {:<16}{}",
        s.label.apply_to("Version"),
        s.value.apply_to(config.version)
    );
    println!();

    print_processing(&s, config);

    println!("  {}", s.header.apply_to("Profiles"));
    for (i, profile) in reference.averaged_profiles.iter().enumerate() {
        let (t_min, t_max) = match (profile.t.first(), profile.t.last()) {
            (Some(&lo), Some(&hi)) => (lo, hi),
            _ => (0.0, 0.0),
        };
        let peak = profile
            .bunches
            .iter()
            .flat_map(|b| b.current.iter().copied())
            .fold(0.0_f64, f64::max);
        println!(
            "    {:<6}{}",
            s.label.apply_to(format!("#{i}")),
            s.value.apply_to(format!(
                "{} shots, {} samples, t {:.1}..{:.1} fs, peak {:.2} kA",
                profile.shots,
                profile.t.len(),
                t_min,
                t_max,
                peak
            ))
        );
    }
}
