use std::time::Instant;

use ndarray::{Array2, Zip};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::accumulator::FlowAccumulator;
use crate::consts::{FLOW_COMPONENTS, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{FlowError, Result};
use crate::field::DenseFlowField;

use super::types::{CancelFlag, NoOpReporter, PassStage, ProgressReporter};

/// Turn accumulated weighted flow into a dense flow field.
///
/// Each pixel with positive weight gets `sum(w * flow) / sum(w)`; pixels no
/// patch covered keep flow `(0, 0)` and weight 0. The accumulator is only
/// read, so normalizing twice gives the same field.
pub fn normalize(acc: &FlowAccumulator) -> Result<DenseFlowField> {
    normalize_with(acc, &NoOpReporter, &CancelFlag::new())
}

/// [`normalize`] with progress reporting and cancellation.
pub fn normalize_with(
    acc: &FlowAccumulator,
    reporter: &dyn ProgressReporter,
    cancel: &CancelFlag,
) -> Result<DenseFlowField> {
    let (h, w) = (acc.height(), acc.width());
    let flow = acc.flow_cells();
    let weights = acc.weight_cells();
    if weights.len() != h * w || flow.len() != weights.len() * FLOW_COMPONENTS {
        return Err(FlowError::BufferMismatch {
            flow: flow.len(),
            weights: weights.len(),
            expected: h * w * FLOW_COMPONENTS,
        });
    }
    cancel.check()?;

    let start = Instant::now();
    reporter.begin_stage(PassStage::Normalizing, Some(h * w));

    let mut flow_x = Array2::<f32>::zeros((h, w));
    let mut flow_y = Array2::<f32>::zeros((h, w));
    let mut weight_out = Array2::<f32>::zeros((h, w));

    let pixel = |(row, col): (usize, usize), fx: &mut f32, fy: &mut f32, wt: &mut f32| {
        let idx = row * w + col;
        let weight = weights[idx].load();
        *wt = weight;
        if weight > 0.0 {
            *fx = flow[idx * FLOW_COMPONENTS].load() / weight;
            *fy = flow[idx * FLOW_COMPONENTS + 1].load() / weight;
        }
    };

    let zip = Zip::indexed(&mut flow_x)
        .and(&mut flow_y)
        .and(&mut weight_out);
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        zip.par_for_each(pixel);
    } else {
        zip.for_each(pixel);
    }

    // A cancellation that raced the sweep discards the partial output.
    cancel.check()?;
    reporter.advance(h * w);
    reporter.finish_stage();

    let uncovered = weight_out.iter().filter(|&&wt| wt == 0.0).count();
    if uncovered == h * w {
        warn!("No pixel received a patch vote; flow field is all zero");
    } else if uncovered > 0 {
        debug!(uncovered, "Pixels without patch coverage kept zero flow");
    }
    debug!(
        elapsed_ms = start.elapsed().as_secs_f64() * 1e3,
        "Flow normalized"
    );

    Ok(DenseFlowField {
        flow_x,
        flow_y,
        weights: weight_out,
    })
}

/// Normalize raw interleaved flow sums in place.
///
/// `flow` holds `[x, y]` per pixel and must be exactly twice as long as
/// `weights`. Pixels with zero weight are left untouched.
pub fn normalize_in_place(flow: &mut [f32], weights: &[f32]) -> Result<()> {
    if flow.len() != weights.len() * FLOW_COMPONENTS {
        return Err(FlowError::BufferMismatch {
            flow: flow.len(),
            weights: weights.len(),
            expected: weights.len() * FLOW_COMPONENTS,
        });
    }

    let divide = |(v, &weight): (&mut [f32], &f32)| {
        if weight > 0.0 {
            v[0] /= weight;
            v[1] /= weight;
        }
    };

    if weights.len() >= PARALLEL_PIXEL_THRESHOLD {
        flow.par_chunks_exact_mut(FLOW_COMPONENTS)
            .zip(weights.par_iter())
            .for_each(divide);
    } else {
        flow.chunks_exact_mut(FLOW_COMPONENTS)
            .zip(weights.iter())
            .for_each(divide);
    }
    Ok(())
}
