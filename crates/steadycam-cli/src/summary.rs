use console::Style;
use steadycam_core::metrics::PerformanceMetrics;
use steadycam_core::motion::classifier::MotionType;
use steadycam_core::params::StabilizationParameters;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    good: Style,
    disabled: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            good: Style::new().green(),
            disabled: Style::new().dim().yellow(),
        }
    }
}

/// What a finished session looked like.
pub struct SessionReport<'a> {
    pub title: &'a str,
    pub resolution: (usize, usize),
    pub params: &'a StabilizationParameters,
    pub adaptive: bool,
    pub metrics: &'a PerformanceMetrics,
    pub motion: Option<MotionType>,
    pub history_len: usize,
    pub last_error: Option<String>,
}

pub fn print_session_summary(report: &SessionReport<'_>) {
    let s = Styles::new();
    let m = report.metrics;

    println!();
    println!("  {}", s.title.apply_to(report.title));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(report.title.chars().count())));
    println!();

    println!(
        "  {:<16}{}",
        s.label.apply_to("Resolution"),
        s.value
            .apply_to(format!("{}x{}", report.resolution.0, report.resolution.1))
    );
    println!(
        "  {:<16}{}",
        s.label.apply_to("Edge mode"),
        s.value.apply_to(report.params.edge_mode)
    );
    println!(
        "  {:<16}{}",
        s.label.apply_to("Smoothing"),
        s.value
            .apply_to(format!("{} frames", report.params.smoothing_radius))
    );
    if report.adaptive {
        println!("  {:<16}{}", s.label.apply_to("Adaptive"), s.good.apply_to("on"));
    } else {
        println!(
            "  {:<16}{}",
            s.label.apply_to("Adaptive"),
            s.disabled.apply_to("off")
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Performance"));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Frames"),
        s.value
            .apply_to(format!("{} ({} stabilized)", m.frame_count, m.stabilized_frames))
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Avg time"),
        s.value.apply_to(format!("{:.2} ms", m.avg_processing_time_ms))
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Throughput"),
        s.good.apply_to(format!("{:.1} fps", m.throughput_fps()))
    );
    println!(
        "    {:<14}{}",
        s.label.apply_to("Features"),
        s.value.apply_to(m.tracked_features)
    );
    println!();

    println!("  {}", s.header.apply_to("Motion"));
    if let Some(motion) = report.motion {
        println!(
            "    {:<14}{}",
            s.label.apply_to("Type"),
            s.value.apply_to(motion)
        );
    }
    println!(
        "    {:<14}{}",
        s.label.apply_to("History"),
        s.value.apply_to(format!("{} transforms", report.history_len))
    );
    if let Some(ref err) = report.last_error {
        println!(
            "    {:<14}{}",
            s.label.apply_to("Last error"),
            s.disabled.apply_to(err)
        );
    }
    println!();
}
