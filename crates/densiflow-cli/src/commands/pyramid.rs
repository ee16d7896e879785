use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use densiflow_core::io::image_io::load_rgb;
use densiflow_core::preprocess::build_pyramid;

use crate::summary::print_pyramid_summary;

#[derive(Args)]
pub struct PyramidArgs {
    /// Input image (PNG, TIFF, JPEG)
    pub file: PathBuf,

    /// TOML config file (see `densiflow config`)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the number of levels
    #[arg(long)]
    pub levels: Option<usize>,

    /// Override the per-level scale factor
    #[arg(long)]
    pub scale_factor: Option<f64>,
}

pub fn run(args: &PyramidArgs) -> Result<()> {
    let mut pyramid = super::load_config(args.config.as_deref())?.pyramid;
    if let Some(levels) = args.levels {
        pyramid.levels = levels;
    }
    if let Some(scale_factor) = args.scale_factor {
        pyramid.scale_factor = scale_factor;
    }

    let src = load_rgb(&args.file)?;
    let levels = build_pyramid(&src, &pyramid)?;
    print_pyramid_summary(&args.file, &levels);
    Ok(())
}
