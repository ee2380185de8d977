pub mod bench;
pub mod config;
pub mod run;

use clap::ValueEnum;
use steadycam_core::params::{EdgeMode, Preset};

#[derive(Clone, Copy, ValueEnum)]
pub enum PresetArg {
    Gaming,
    Streaming,
    Recording,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Gaming => Preset::Gaming,
            PresetArg::Streaming => Preset::Streaming,
            PresetArg::Recording => Preset::Recording,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum EdgeArg {
    Padding,
    Crop,
    Scale,
}

impl From<EdgeArg> for EdgeMode {
    fn from(arg: EdgeArg) -> Self {
        match arg {
            EdgeArg::Padding => EdgeMode::Padding,
            EdgeArg::Crop => EdgeMode::Crop,
            EdgeArg::Scale => EdgeMode::Scale,
        }
    }
}
