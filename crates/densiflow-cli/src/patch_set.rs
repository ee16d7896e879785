use std::path::Path;

use anyhow::{bail, Context, Result};
use densiflow_core::params::ImageParams;
use densiflow_core::patch::PatchEstimate;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// On-disk patch set produced by a matching stage (JSON).
#[derive(Serialize, Deserialize)]
pub struct PatchSet {
    pub width: usize,
    pub height: usize,
    /// Overrides the configured patch size when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_size: Option<usize>,
    pub patches: Vec<PatchRecord>,
}

#[derive(Serialize, Deserialize)]
pub struct PatchRecord {
    pub midpoint: [f32; 2],
    pub flow: [f32; 2],
    /// Row-major `patch_size * patch_size` cost differences.
    pub cost: Vec<f32>,
    #[serde(default = "default_true")]
    pub valid: bool,
}

fn default_true() -> bool {
    true
}

impl PatchSet {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read patch set {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid patch set {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write patch set {}", path.display()))
    }

    pub fn image_params(&self) -> ImageParams {
        ImageParams::new(self.width, self.height)
    }

    /// Convert records into estimates with `patch_size x patch_size` cost maps.
    ///
    /// Records marked invalid are passed through with an empty cost map, since
    /// the densification pass never reads them.
    pub fn to_estimates(&self, patch_size: usize) -> Result<Vec<PatchEstimate>> {
        let expected = patch_size
            .checked_mul(patch_size)
            .with_context(|| format!("patch size {patch_size} is too large"))?;
        self.patches
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let midpoint = (record.midpoint[0], record.midpoint[1]);
                let flow = (record.flow[0], record.flow[1]);
                if !record.valid {
                    return Ok(PatchEstimate::new(midpoint, flow, Array2::zeros((0, 0))).invalidated());
                }
                if record.cost.len() != expected {
                    bail!(
                        "patch {i}: cost map has {} values, expected {expected}",
                        record.cost.len()
                    );
                }
                let cost = Array2::from_shape_vec((patch_size, patch_size), record.cost.clone())
                    .with_context(|| format!("patch {i}: malformed cost map"))?;
                Ok(PatchEstimate::new(midpoint, flow, cost))
            })
            .collect()
    }
}
