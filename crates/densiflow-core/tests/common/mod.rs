use std::sync::Mutex;

use densiflow_core::densify::{CancelFlag, PassStage, ProgressReporter};
use densiflow_core::params::{ImageParams, OptParams};
use densiflow_core::patch::PatchEstimate;
use ndarray::Array2;

pub fn image(width: usize, height: usize) -> ImageParams {
    ImageParams::new(width, height)
}

pub fn opt(patch_size: usize, min_err_val: f32) -> OptParams {
    OptParams {
        patch_size,
        min_err_val,
        ..Default::default()
    }
}

/// Patch whose cost map is `base + row * patch_size + col`, so every pixel
/// of the footprint reads a distinct cost.
pub fn ramp_patch(
    midpoint: (f32, f32),
    flow: (f32, f32),
    patch_size: usize,
    base: f32,
) -> PatchEstimate {
    let cost = Array2::from_shape_fn((patch_size, patch_size), |(r, c)| {
        base + (r * patch_size + c) as f32
    });
    PatchEstimate::new(midpoint, flow, cost)
}

/// Deterministic pseudo-random patch set (LCG), midpoints spread over the
/// whole image including its borders.
pub fn scattered_patches(
    count: usize,
    img: &ImageParams,
    patch_size: usize,
    seed: u64,
) -> Vec<PatchEstimate> {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((state >> 33) as f64 / (1u64 << 31) as f64) as f32
    };

    (0..count)
        .map(|i| {
            let mx = (next() * img.width as f32).min(img.width as f32 - 1.0);
            let my = (next() * img.height as f32).min(img.height as f32 - 1.0);
            let flow = (next() * 8.0 - 4.0, next() * 8.0 - 4.0);
            let cost = Array2::from_shape_fn((patch_size, patch_size), |_| next() * 0.2);
            let patch = PatchEstimate::new((mx, my), flow, cost);
            if i % 7 == 3 {
                patch.invalidated()
            } else {
                patch
            }
        })
        .collect()
}

/// Records every stage it is told about; optionally cancels the pass on the
/// first scatter progress event.
#[derive(Default)]
pub struct RecordingReporter {
    pub stages: Mutex<Vec<PassStage>>,
    pub advances: Mutex<Vec<(PassStage, usize)>>,
    pub cancel_on_scatter: Option<CancelFlag>,
}

impl ProgressReporter for RecordingReporter {
    fn begin_stage(&self, stage: PassStage, _total_items: Option<usize>) {
        self.stages.lock().unwrap().push(stage);
    }

    fn advance(&self, items_done: usize) {
        let stage = *self.stages.lock().unwrap().last().unwrap();
        self.advances.lock().unwrap().push((stage, items_done));
        if stage == PassStage::Scattering {
            if let Some(flag) = &self.cancel_on_scatter {
                flag.cancel();
            }
        }
    }
}
