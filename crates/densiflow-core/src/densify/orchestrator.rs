use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::accumulator::{FlowAccumulator, LocalAccumulator};
use crate::consts::PARALLEL_PATCH_THRESHOLD;
use crate::error::Result;
use crate::field::DenseFlowField;
use crate::params::{ImageParams, OptParams, ScatterStrategy};
use crate::patch::PatchEstimate;

use super::normalize::normalize_with;
use super::scatter::{for_each_vote, scatter_into_local};
use super::types::{CancelFlag, NoOpReporter, PassStage, ProgressReporter};

/// Run a full densification pass: accumulate every patch, then normalize.
pub fn densify(
    patches: &[PatchEstimate],
    img: &ImageParams,
    opt: &OptParams,
) -> Result<DenseFlowField> {
    densify_with(patches, img, opt, &NoOpReporter, &CancelFlag::new())
}

/// [`densify`] with progress reporting and cancellation.
///
/// Normalization only starts after every scatter unit has completed. A
/// cancellation at any point returns `FlowError::Cancelled` and no field.
pub fn densify_with(
    patches: &[PatchEstimate],
    img: &ImageParams,
    opt: &OptParams,
    reporter: &dyn ProgressReporter,
    cancel: &CancelFlag,
) -> Result<DenseFlowField> {
    let acc = accumulate_patches_with(patches, img, opt, reporter, cancel)?;
    normalize_with(&acc, reporter, cancel)
}

/// Accumulate the weighted votes of all patches into a fresh accumulator.
pub fn accumulate_patches(
    patches: &[PatchEstimate],
    img: &ImageParams,
    opt: &OptParams,
) -> Result<FlowAccumulator> {
    accumulate_patches_with(patches, img, opt, &NoOpReporter, &CancelFlag::new())
}

/// [`accumulate_patches`] with progress reporting and cancellation.
///
/// Every patch is validated before the accumulator is allocated; the first
/// violation (lowest patch index) aborts the pass. The returned accumulator
/// is only handed out once all scatter units have joined.
pub fn accumulate_patches_with(
    patches: &[PatchEstimate],
    img: &ImageParams,
    opt: &OptParams,
    reporter: &dyn ProgressReporter,
    cancel: &CancelFlag,
) -> Result<FlowAccumulator> {
    img.validate()?;
    opt.validate()?;

    let start = Instant::now();
    reporter.begin_stage(PassStage::Validating, Some(patches.len()));
    validate_patches(patches, img, opt)?;
    reporter.advance(patches.len());
    reporter.finish_stage();

    let valid = patches.iter().filter(|p| p.valid).count();
    debug!(
        total = patches.len(),
        valid,
        skipped = patches.len() - valid,
        elapsed_ms = start.elapsed().as_secs_f64() * 1e3,
        "Patches validated"
    );
    cancel.check()?;

    let acc = FlowAccumulator::new(img)?;

    let scatter_start = Instant::now();
    reporter.begin_stage(PassStage::Scattering, Some(patches.len()));
    match opt.scatter_strategy {
        ScatterStrategy::Atomic => scatter_atomic(patches, img, opt, &acc, reporter, cancel)?,
        ScatterStrategy::Reduce => scatter_reduce(patches, img, opt, &acc, reporter, cancel)?,
    }
    reporter.finish_stage();

    info!(
        patches = valid,
        width = img.width,
        height = img.height,
        strategy = %opt.scatter_strategy,
        elapsed_ms = scatter_start.elapsed().as_secs_f64() * 1e3,
        "Patch votes accumulated"
    );
    Ok(acc)
}

/// Validate all valid patches, reporting the lowest failing index.
fn validate_patches(patches: &[PatchEstimate], img: &ImageParams, opt: &OptParams) -> Result<()> {
    let check = |(index, patch): (usize, &PatchEstimate)| {
        if !patch.valid {
            return None;
        }
        patch.validate(img, opt).err().map(|e| (index, e))
    };

    let first = if patches.len() >= PARALLEL_PATCH_THRESHOLD {
        patches
            .par_iter()
            .enumerate()
            .filter_map(check)
            .min_by_key(|(index, _)| *index)
    } else {
        patches.iter().enumerate().find_map(check)
    };

    match first {
        Some((index, err)) => Err(err.at_patch(index)),
        None => Ok(()),
    }
}

/// One scatter unit per patch, all adding atomically into `acc`.
fn scatter_atomic(
    patches: &[PatchEstimate],
    img: &ImageParams,
    opt: &OptParams,
    acc: &FlowAccumulator,
    reporter: &dyn ProgressReporter,
    cancel: &CancelFlag,
) -> Result<()> {
    let done = AtomicUsize::new(0);
    let unit = |patch: &PatchEstimate| -> Result<()> {
        cancel.check()?;
        if patch.valid {
            for_each_vote(patch, img, opt, |idx, weight| acc.add_vote(idx, patch.flow, weight));
        }
        let completed = done.fetch_add(1, Ordering::Relaxed) + 1;
        reporter.advance(completed);
        Ok(())
    };

    if patches.len() >= PARALLEL_PATCH_THRESHOLD {
        patches.par_iter().try_for_each(&unit)
    } else {
        patches.iter().try_for_each(&unit)
    }
}

/// Scatter into one private buffer per worker thread, then merge them into `acc`.
///
/// Patches are split into at most `current_num_threads()` contiguous
/// chunks, so peak memory is bounded by one full-image buffer per thread.
fn scatter_reduce(
    patches: &[PatchEstimate],
    img: &ImageParams,
    opt: &OptParams,
    acc: &FlowAccumulator,
    reporter: &dyn ProgressReporter,
    cancel: &CancelFlag,
) -> Result<()> {
    let done = AtomicUsize::new(0);
    let chunk_len = reduce_chunk_len(patches.len(), rayon::current_num_threads());
    let locals = patches
        .par_chunks(chunk_len)
        .map(|chunk| -> Result<LocalAccumulator> {
            let mut local = LocalAccumulator::new(img)?;
            for patch in chunk {
                cancel.check()?;
                scatter_into_local(patch, img, opt, &mut local);
                let completed = done.fetch_add(1, Ordering::Relaxed) + 1;
                reporter.advance(completed);
            }
            Ok(local)
        })
        .collect::<Result<Vec<_>>>()?;

    cancel.check()?;
    debug!(buffers = locals.len(), "Merging per-worker buffers");
    for local in &locals {
        acc.merge(local)?;
    }
    Ok(())
}

/// Chunk length that splits `patches` into at most `workers` chunks.
fn reduce_chunk_len(patches: usize, workers: usize) -> usize {
    patches.div_ceil(workers.max(1)).max(1)
}

#[cfg(test)]
mod tests {
    use super::reduce_chunk_len;

    #[test]
    fn reduce_chunks_never_exceed_worker_count() {
        for workers in [1, 2, 3, 8, 64] {
            for patches in [0, 1, 7, 64, 1000, 1001] {
                let len = reduce_chunk_len(patches, workers);
                assert!(len >= 1);
                assert!(patches.div_ceil(len) <= workers, "{patches} patches / {workers} workers");
            }
        }
    }

    #[test]
    fn zero_workers_treated_as_one() {
        assert_eq!(reduce_chunk_len(10, 0), 10);
    }
}
