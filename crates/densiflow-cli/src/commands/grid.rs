use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::patch_set::{PatchRecord, PatchSet};

#[derive(Args)]
pub struct GridArgs {
    /// Output patch set JSON file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Image width in pixels
    #[arg(long, default_value = "64")]
    pub width: usize,

    /// Image height in pixels
    #[arg(long, default_value = "48")]
    pub height: usize,

    /// Patch edge length in pixels
    #[arg(long, default_value = "8")]
    pub patch_size: usize,

    /// Distance between neighbouring patch centres
    #[arg(long, default_value = "4")]
    pub stride: usize,

    /// Horizontal motion of every patch
    #[arg(long, default_value = "1.0", allow_hyphen_values = true)]
    pub flow_x: f32,

    /// Vertical motion of every patch
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    pub flow_y: f32,

    /// Uniform cost difference of every patch pixel
    #[arg(long, default_value = "0.0")]
    pub cost: f32,
}

/// Patch centres every `stride` pixels, keeping each footprint inside the image.
fn grid_centres(dim: usize, patch_size: usize, stride: usize) -> Vec<usize> {
    let half = patch_size / 2;
    let mut centres = Vec::new();
    let mut c = half;
    while c + (patch_size - half) <= dim {
        centres.push(c);
        c += stride;
    }
    centres
}

pub fn run(args: &GridArgs) -> Result<()> {
    anyhow::ensure!(args.patch_size > 0, "patch size must be positive");
    anyhow::ensure!(args.stride > 0, "stride must be positive");

    let xs = grid_centres(args.width, args.patch_size, args.stride);
    let ys = grid_centres(args.height, args.patch_size, args.stride);

    let cost = vec![args.cost; args.patch_size * args.patch_size];
    let patches = ys
        .iter()
        .flat_map(|&y| xs.iter().map(move |&x| (x, y)))
        .map(|(x, y)| PatchRecord {
            midpoint: [x as f32, y as f32],
            flow: [args.flow_x, args.flow_y],
            cost: cost.clone(),
            valid: true,
        })
        .collect::<Vec<_>>();

    let set = PatchSet {
        width: args.width,
        height: args.height,
        patch_size: Some(args.patch_size),
        patches,
    };
    set.save(&args.output)?;
    println!(
        "Wrote {} patches ({}x{} grid) to {}",
        set.patches.len(),
        xs.len(),
        ys.len(),
        args.output.display()
    );
    Ok(())
}
