use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use super::{EdgeArg, PresetArg};
use crate::session::SessionConfig;
use crate::summary::{print_session_summary, SessionReport};
use crate::synthetic::{bgr_frame, MotionPattern};

#[derive(Args)]
pub struct BenchArgs {
    /// Frame width in pixels
    #[arg(long, default_value = "640")]
    pub width: usize,

    /// Frame height in pixels
    #[arg(long, default_value = "360")]
    pub height: usize,

    /// Number of frames to process
    #[arg(long, default_value = "120")]
    pub frames: usize,

    /// Synthetic camera motion
    #[arg(long, value_enum, default_value = "shake")]
    pub motion: MotionPattern,

    /// Parameter preset
    #[arg(long, value_enum, default_value = "streaming")]
    pub preset: PresetArg,

    /// Session config file (TOML), overrides --preset
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Edge handling
    #[arg(long, value_enum)]
    pub edge: Option<EdgeArg>,

    /// Enable the adaptive controller
    #[arg(long)]
    pub adaptive: bool,
}

pub fn run(args: &BenchArgs) -> Result<()> {
    let mut config = match args.config {
        Some(ref path) => SessionConfig::load(path)?,
        None => SessionConfig::from_preset(args.preset.into()),
    };
    if let Some(edge) = args.edge {
        config.stabilization.edge_mode = edge.into();
    }
    config.adaptive.enabled |= args.adaptive;

    let wrapper = config.build(args.width, args.height)?;

    let pb = ProgressBar::new(args.frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    pb.set_message(format!("Stabilizing ({:?})", args.motion));

    for i in 0..args.frames {
        let (dx, dy) = args.motion.offset(i);
        let frame = bgr_frame(args.width, args.height, dx, dy)?;
        wrapper.process_frame(&frame);
        pb.set_position(i as u64 + 1);
    }
    pb.finish_with_message("Done");

    let params = wrapper.current_parameters();
    let metrics = wrapper.performance_metrics();
    print_session_summary(&SessionReport {
        title: "Steadycam Bench",
        resolution: (args.width, args.height),
        params: &params,
        adaptive: config.adaptive.enabled,
        metrics: &metrics,
        motion: wrapper.inspect(|s| s.current_motion_type()),
        history_len: wrapper.transform_history().len(),
        last_error: wrapper.last_error(),
    });

    Ok(())
}
