use ndarray::Array2;

use crate::error::{FlowError, Result};
use crate::params::{ImageParams, OptParams};

/// Motion estimate proposed by one image patch.
///
/// Produced by the patch-matching stage; the densification engine only
/// reads it.
#[derive(Clone, Debug)]
pub struct PatchEstimate {
    /// Patch centre in image coordinates `(x, y)`.
    pub midpoint: (f32, f32),
    /// Proposed motion `(flow_x, flow_y)`.
    pub flow: (f32, f32),
    /// Per-pixel cost difference, shape `(patch_size, patch_size)`, indexed
    /// `[[row, col]]` relative to the patch's top-left corner.
    pub cost: Array2<f32>,
    /// Whether the matching stage accepted this patch.
    pub valid: bool,
}

impl PatchEstimate {
    pub fn new(midpoint: (f32, f32), flow: (f32, f32), cost: Array2<f32>) -> Self {
        Self {
            midpoint,
            flow,
            cost,
            valid: true,
        }
    }

    /// Patch with the same cost at every pixel.
    pub fn uniform(midpoint: (f32, f32), flow: (f32, f32), patch_size: usize, cost: f32) -> Self {
        Self::new(midpoint, flow, Array2::from_elem((patch_size, patch_size), cost))
    }

    pub fn invalidated(mut self) -> Self {
        self.valid = false;
        self
    }

    /// Check everything a scatter relies on, without touching any buffer.
    pub fn validate(&self, img: &ImageParams, opt: &OptParams) -> Result<()> {
        if opt.patch_size == 0 {
            return Err(FlowError::InvalidPatchSize(opt.patch_size));
        }

        let (mx, my) = self.midpoint;
        let in_range = |m: f32, dim: usize| m.is_finite() && m >= 0.0 && (m.floor() as usize) < dim;
        if !in_range(mx, img.width) || !in_range(my, img.height) {
            return Err(FlowError::MidpointOutOfRange {
                x: mx,
                y: my,
                width: img.width,
                height: img.height,
            });
        }

        let (fx, fy) = self.flow;
        if !fx.is_finite() || !fy.is_finite() {
            return Err(FlowError::NonFiniteFlow { x: fx, y: fy });
        }

        let (rows, cols) = self.cost.dim();
        if rows != opt.patch_size || cols != opt.patch_size {
            return Err(FlowError::CostMapShape {
                rows,
                cols,
                expected: opt.patch_size,
            });
        }

        if let Some(((row, col), _)) = self.cost.indexed_iter().find(|(_, c)| !c.is_finite()) {
            return Err(FlowError::NonFiniteCost { row, col });
        }

        let degenerate = |c: f32| {
            let w = opt.weight(c);
            !(w.is_finite() && w > 0.0)
        };
        if let Some(((row, col), &cost)) = self.cost.indexed_iter().find(|(_, c)| degenerate(**c)) {
            return Err(FlowError::CostOutOfRange { row, col, cost });
        }

        Ok(())
    }

    /// Footprint of this patch clipped to the image.
    ///
    /// Assumes the patch already passed [`PatchEstimate::validate`].
    pub fn footprint(&self, img: &ImageParams, patch_size: usize) -> Footprint {
        Footprint::around(self.midpoint, img, patch_size)
    }
}

/// Pixels covered by a patch, clipped to the image bounds.
///
/// `x0`/`y0` are the unclipped top-left corner so cost map offsets can be
/// recovered for every covered pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Footprint {
    pub x0: i64,
    pub y0: i64,
    pub x_start: usize,
    pub x_end: usize,
    pub y_start: usize,
    pub y_end: usize,
}

impl Footprint {
    /// `[m - size/2, m - size/2 + size)` on each axis, `m = floor(midpoint)`.
    pub fn around(midpoint: (f32, f32), img: &ImageParams, patch_size: usize) -> Self {
        let half = (patch_size / 2) as i64;
        let x0 = midpoint.0.floor() as i64 - half;
        let y0 = midpoint.1.floor() as i64 - half;
        let clip = |lo: i64, dim: usize| -> (usize, usize) {
            let hi = lo + patch_size as i64;
            let start = lo.clamp(0, dim as i64) as usize;
            let end = hi.clamp(0, dim as i64) as usize;
            (start, end.max(start))
        };
        let (x_start, x_end) = clip(x0, img.width);
        let (y_start, y_end) = clip(y0, img.height);
        Self {
            x0,
            y0,
            x_start,
            x_end,
            y_start,
            y_end,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x_start == self.x_end || self.y_start == self.y_end
    }

    pub fn pixel_count(&self) -> usize {
        (self.x_end - self.x_start) * (self.y_end - self.y_start)
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        (self.x_start..self.x_end).contains(&x) && (self.y_start..self.y_end).contains(&y)
    }

    /// Cost map index `[row, col]` of image pixel `(x, y)`.
    #[inline]
    pub fn patch_offset(&self, x: usize, y: usize) -> [usize; 2] {
        [(y as i64 - self.y0) as usize, (x as i64 - self.x0) as usize]
    }
}
