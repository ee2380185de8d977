use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use image::RgbImage;
use indicatif::{ProgressBar, ProgressStyle};
use steadycam_core::frame::ImageBuffer;
use tracing::{debug, warn};

use super::{EdgeArg, PresetArg};
use crate::session::SessionConfig;
use crate::summary::{print_session_summary, SessionReport};

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

#[derive(Args)]
pub struct RunArgs {
    /// Directory of input frames, processed in file name order
    pub input_dir: PathBuf,

    /// Directory for the stabilized PNG frames
    pub output_dir: PathBuf,

    /// Session config file (TOML), overrides --preset
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Parameter preset
    #[arg(long, value_enum, default_value = "streaming")]
    pub preset: PresetArg,

    /// Edge handling
    #[arg(long, value_enum)]
    pub edge: Option<EdgeArg>,

    /// Enable the adaptive controller
    #[arg(long)]
    pub adaptive: bool,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let mut config = match args.config {
        Some(ref path) => SessionConfig::load(path)?,
        None => SessionConfig::from_preset(args.preset.into()),
    };
    if let Some(edge) = args.edge {
        config.stabilization.edge_mode = edge.into();
    }
    config.adaptive.enabled |= args.adaptive;

    let inputs = list_frames(&args.input_dir)?;
    let Some(first) = inputs.first() else {
        bail!("No image frames found in {}", args.input_dir.display());
    };
    let (width, height) = image::image_dimensions(first)
        .with_context(|| format!("Failed to read {}", first.display()))?;
    let (width, height) = (width as usize, height as usize);

    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!("Failed to create output directory {}", args.output_dir.display())
    })?;

    let wrapper = config.build(width, height)?;

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    pb.set_message("Stabilizing");

    for (i, path) in inputs.iter().enumerate() {
        let frame = load_bgr(path)?;
        let stabilized = wrapper.process_frame(&frame);
        let out_path = args.output_dir.join(format!("frame_{i:05}.png"));
        save_png(&stabilized, &out_path)?;
        debug!(input = %path.display(), output = %out_path.display(), "frame written");
        pb.set_position(i as u64 + 1);
    }
    pb.finish_with_message("Done");

    let params = wrapper.current_parameters();
    let metrics = wrapper.performance_metrics();
    print_session_summary(&SessionReport {
        title: "Steadycam Run",
        resolution: (width, height),
        params: &params,
        adaptive: config.adaptive.enabled,
        metrics: &metrics,
        motion: wrapper.inspect(|s| s.current_motion_type()),
        history_len: wrapper.transform_history().len(),
        last_error: wrapper.last_error(),
    });
    println!("Output saved to {}", args.output_dir.display());

    Ok(())
}

/// Image files directly inside `dir`, sorted by name.
fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;
    let mut frames = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if path.is_file() && is_image {
            frames.push(path);
        } else {
            debug!(path = %path.display(), "skipping non-image entry");
        }
    }
    frames.sort();
    Ok(frames)
}

fn load_bgr(path: &Path) -> Result<ImageBuffer> {
    let rgb = image::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .to_rgb8();
    let (w, h) = rgb.dimensions();
    let mut data = rgb.into_raw();
    for px in data.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    ImageBuffer::new(w as usize, h as usize, 3, data)
        .with_context(|| format!("Unsupported frame {}", path.display()))
}

fn save_png(frame: &ImageBuffer, path: &Path) -> Result<()> {
    let (w, h) = (frame.width(), frame.height());
    let channels = frame.channels();
    let mut data = Vec::with_capacity(w * h * 3);
    for r in 0..h {
        for px in frame.row(r).chunks_exact(channels) {
            match channels {
                1 => data.extend_from_slice(&[px[0], px[0], px[0]]),
                _ => data.extend_from_slice(&[px[2], px[1], px[0]]),
            }
        }
    }
    let Some(img) = RgbImage::from_raw(w as u32, h as u32, data) else {
        warn!(path = %path.display(), "frame buffer size mismatch");
        bail!("Frame buffer does not match {w}x{h}");
    };
    img.save(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}
