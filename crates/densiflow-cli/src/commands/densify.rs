use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use densiflow_core::densify::{densify_with, CancelFlag, PassStage, ProgressReporter};
use densiflow_core::field::DenseFlowField;
use densiflow_core::params::{ScatterStrategy, WeightRule};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::patch_set::PatchSet;
use crate::summary::print_flow_summary;

#[derive(Clone, ValueEnum)]
pub enum WeightRuleArg {
    Additive,
    Floor,
}

#[derive(Clone, ValueEnum)]
pub enum StrategyArg {
    Atomic,
    Reduce,
}

#[derive(Args)]
pub struct DensifyArgs {
    /// Patch set JSON file
    pub file: PathBuf,

    /// TOML config file (see `densiflow config`)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the dense field as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the error floor of the weighting rule
    #[arg(long)]
    pub min_err_val: Option<f32>,

    /// Override the weighting rule
    #[arg(long, value_enum)]
    pub weight_rule: Option<WeightRuleArg>,

    /// Override the scatter strategy
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,
}

/// Progress bar driven by the densification stages.
struct BarReporter {
    pb: ProgressBar,
}

impl BarReporter {
    fn new() -> Result<Self> {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg:24} [{bar:40}] {pos}/{len}")?
                .progress_chars("=> "),
        );
        Ok(Self { pb })
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PassStage, total_items: Option<usize>) {
        self.pb.reset();
        self.pb.set_length(total_items.unwrap_or(0) as u64);
        self.pb.set_message(stage.to_string());
    }

    fn advance(&self, items_done: usize) {
        // Workers finish out of order; never move the bar backwards.
        if items_done as u64 > self.pb.position() {
            self.pb.set_position(items_done as u64);
        }
    }

    fn finish_stage(&self) {
        if let Some(len) = self.pb.length() {
            self.pb.set_position(len);
        }
    }
}

#[derive(Serialize)]
struct FlowFieldRecord<'a> {
    width: usize,
    height: usize,
    flow_x: &'a [f32],
    flow_y: &'a [f32],
    weights: &'a [f32],
}

pub fn run(args: &DensifyArgs) -> Result<()> {
    let config = super::load_config(args.config.as_deref())?;
    let mut opt = config.densify;
    if let Some(min_err_val) = args.min_err_val {
        opt.min_err_val = min_err_val;
    }
    if let Some(ref rule) = args.weight_rule {
        opt.weight_rule = match rule {
            WeightRuleArg::Additive => WeightRule::Additive,
            WeightRuleArg::Floor => WeightRule::Floor,
        };
    }
    if let Some(ref strategy) = args.strategy {
        opt.scatter_strategy = match strategy {
            StrategyArg::Atomic => ScatterStrategy::Atomic,
            StrategyArg::Reduce => ScatterStrategy::Reduce,
        };
    }

    let set = PatchSet::load(&args.file)?;
    if let Some(patch_size) = set.patch_size {
        opt.patch_size = patch_size;
    }
    let img = set.image_params();
    let patches = set.to_estimates(opt.patch_size)?;

    println!(
        "Densifying {} patches onto {}x{} (patch_size={}, rule={}, strategy={})",
        patches.len(),
        img.width,
        img.height,
        opt.patch_size,
        opt.weight_rule,
        opt.scatter_strategy
    );

    let reporter = BarReporter::new()?;
    let start = Instant::now();
    let field = densify_with(&patches, &img, &opt, &reporter, &CancelFlag::new());
    reporter.pb.finish_and_clear();
    let field = field?;
    let elapsed = start.elapsed();

    let valid = patches.iter().filter(|p| p.valid).count();
    print_flow_summary(&field, patches.len(), valid, elapsed);

    if let Some(ref path) = args.output {
        save_field(&field, path)?;
        println!("Saved to {}", path.display());
    }
    Ok(())
}

fn save_field(field: &DenseFlowField, path: &std::path::Path) -> Result<()> {
    let flow_x = field.flow_x.as_standard_layout();
    let flow_y = field.flow_y.as_standard_layout();
    let weights = field.weights.as_standard_layout();
    let record = FlowFieldRecord {
        width: field.width(),
        height: field.height(),
        flow_x: flow_x.as_slice().context("flow_x is not contiguous")?,
        flow_y: flow_y.as_slice().context("flow_y is not contiguous")?,
        weights: weights.as_slice().context("weights are not contiguous")?,
    };
    let json = serde_json::to_string(&record)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write flow field to {}", path.display()))
}
