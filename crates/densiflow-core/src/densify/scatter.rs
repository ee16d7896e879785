use crate::accumulator::{FlowAccumulator, LocalAccumulator};
use crate::error::Result;
use crate::params::{ImageParams, OptParams};
use crate::patch::PatchEstimate;

/// Confidence weight of a pixel whose local cost difference is `cost`.
///
/// Inversely proportional to the cost and bounded by `1 / min_err_val`.
pub fn patch_weight(cost: f32, opt: &OptParams) -> f32 {
    opt.weight(cost)
}

/// Add one patch's weighted vote to every pixel of its clipped footprint.
///
/// Invalid patches are skipped without being inspected. Everything else is
/// validated before the first write, so an `Err` leaves `acc` untouched.
pub fn scatter_patch(
    patch: &PatchEstimate,
    img: &ImageParams,
    opt: &OptParams,
    acc: &FlowAccumulator,
) -> Result<()> {
    if !patch.valid {
        return Ok(());
    }
    opt.validate()?;
    acc.check_dims(img)?;
    patch.validate(img, opt)?;

    for_each_vote(patch, img, opt, |idx, weight| acc.add_vote(idx, patch.flow, weight));
    Ok(())
}

/// Scatter a pre-validated patch into a private buffer.
pub(crate) fn scatter_into_local(
    patch: &PatchEstimate,
    img: &ImageParams,
    opt: &OptParams,
    local: &mut LocalAccumulator,
) {
    if patch.valid {
        for_each_vote(patch, img, opt, |idx, weight| local.add_vote(idx, patch.flow, weight));
    }
}

/// Visit `(pixel_index, weight)` for every covered pixel of a pre-validated
/// patch.
pub(crate) fn for_each_vote<F>(patch: &PatchEstimate, img: &ImageParams, opt: &OptParams, mut emit: F)
where
    F: FnMut(usize, f32),
{
    let footprint = patch.footprint(img, opt.patch_size);
    for y in footprint.y_start..footprint.y_end {
        let row_base = y * img.width;
        for x in footprint.x_start..footprint.x_end {
            let cost = patch.cost[footprint.patch_offset(x, y)];
            emit(row_base + x, opt.weight(cost));
        }
    }
}
