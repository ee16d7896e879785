//! Per-pixel accumulation buffers of a densification pass.
//!
//! [`FlowAccumulator`] is the shared target of the scatter phase: every
//! write is an atomic add, so any number of scatter units may overlap.
//! [`LocalAccumulator`] is the plain, single-owner counterpart used by the
//! per-worker reduce strategy and merged into the shared one at the end.

mod atomic;
mod local;

pub use atomic::AtomicF32;
pub use local::LocalAccumulator;

use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::{FLOW_COMPONENTS, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{FlowError, Result};
use crate::params::ImageParams;

/// Accumulated weighted flow and weight for every pixel of one pass.
///
/// Flow is stored interleaved (`[x0, y0, x1, y1, ...]`), weights one per
/// pixel, both row-major.
#[derive(Debug)]
pub struct FlowAccumulator {
    width: usize,
    height: usize,
    flow: Vec<AtomicF32>,
    weights: Vec<AtomicF32>,
}

impl FlowAccumulator {
    /// Allocate a zeroed accumulator for an image of the given size.
    pub fn new(img: &ImageParams) -> Result<Self> {
        img.validate()?;
        let pixels = img.pixel_count()?;
        Ok(Self {
            width: img.width,
            height: img.height,
            flow: zeroed_cells(flow_len(pixels)?)?,
            weights: zeroed_cells(pixels)?,
        })
    }

    /// Wrap externally produced buffers.
    ///
    /// `flow` must hold two interleaved components per pixel and `weights`
    /// one value per pixel.
    pub fn from_parts(
        width: usize,
        height: usize,
        flow: Vec<f32>,
        weights: Vec<f32>,
    ) -> Result<Self> {
        let img = ImageParams::new(width, height);
        img.validate()?;
        let pixels = img.pixel_count()?;
        let expected = flow_len(pixels)?;
        if weights.len() != pixels || flow.len() != expected {
            return Err(FlowError::BufferMismatch {
                flow: flow.len(),
                weights: weights.len(),
                expected,
            });
        }
        Ok(Self {
            width,
            height,
            flow: flow.into_iter().map(AtomicF32::new).collect(),
            weights: weights.into_iter().map(AtomicF32::new).collect(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn image_params(&self) -> ImageParams {
        ImageParams::new(self.width, self.height)
    }

    /// Fail if this accumulator was not sized for `img`.
    pub fn check_dims(&self, img: &ImageParams) -> Result<()> {
        if self.width != img.width || self.height != img.height {
            return Err(FlowError::DimensionMismatch {
                width: img.width,
                height: img.height,
                actual_width: self.width,
                actual_height: self.height,
            });
        }
        Ok(())
    }

    /// Atomically add one weighted vote at row-major pixel index `idx`.
    #[inline]
    pub fn add_vote(&self, idx: usize, flow: (f32, f32), weight: f32) {
        self.flow[idx * FLOW_COMPONENTS].fetch_add(weight * flow.0);
        self.flow[idx * FLOW_COMPONENTS + 1].fetch_add(weight * flow.1);
        self.weights[idx].fetch_add(weight);
    }

    /// Atomically add a whole private buffer.
    pub fn merge(&self, local: &LocalAccumulator) -> Result<()> {
        if local.flow().len() != self.flow.len() || local.weights().len() != self.weights.len() {
            return Err(FlowError::BufferMismatch {
                flow: local.flow().len(),
                weights: local.weights().len(),
                expected: self.flow.len(),
            });
        }
        let add = |cells: &[AtomicF32], values: &[f32]| {
            cells.par_iter().zip(values.par_iter()).for_each(|(cell, &v)| {
                if v != 0.0 {
                    cell.fetch_add(v);
                }
            });
        };
        add(&self.flow, local.flow());
        add(&self.weights, local.weights());
        Ok(())
    }

    pub fn weight_at(&self, x: usize, y: usize) -> f32 {
        self.weights[y * self.width + x].load()
    }

    /// Accumulated weighted flow `(sum w*fx, sum w*fy)` at `(x, y)`.
    pub fn flow_sum_at(&self, x: usize, y: usize) -> (f32, f32) {
        let idx = (y * self.width + x) * FLOW_COMPONENTS;
        (self.flow[idx].load(), self.flow[idx + 1].load())
    }

    /// Snapshot of the weight field, shape `(height, width)`.
    pub fn weights(&self) -> Array2<f32> {
        Array2::from_shape_fn((self.height, self.width), |(row, col)| {
            self.weights[row * self.width + col].load()
        })
    }

    /// Snapshot of the weighted flow sums as `(sum_x, sum_y)` arrays.
    pub fn flow_sums(&self) -> (Array2<f32>, Array2<f32>) {
        let component = |c: usize| {
            Array2::from_shape_fn((self.height, self.width), |(row, col)| {
                self.flow[(row * self.width + col) * FLOW_COMPONENTS + c].load()
            })
        };
        (component(0), component(1))
    }

    /// Zero both buffers so the accumulator can serve another pass.
    pub fn reset(&mut self) {
        let zero = |cells: &mut [AtomicF32]| {
            if cells.len() >= PARALLEL_PIXEL_THRESHOLD {
                cells.par_iter_mut().for_each(|c| c.store(0.0));
            } else {
                cells.iter_mut().for_each(|c| c.store(0.0));
            }
        };
        zero(&mut self.flow);
        zero(&mut self.weights);
    }

    /// Consume the accumulator into plain `(flow, weights)` buffers.
    pub fn into_parts(self) -> (Vec<f32>, Vec<f32>) {
        (
            self.flow.into_iter().map(AtomicF32::into_inner).collect(),
            self.weights.into_iter().map(AtomicF32::into_inner).collect(),
        )
    }

    pub(crate) fn flow_cells(&self) -> &[AtomicF32] {
        &self.flow
    }

    pub(crate) fn weight_cells(&self) -> &[AtomicF32] {
        &self.weights
    }
}

/// Length of the interleaved flow buffer for `pixels` pixels.
pub(crate) fn flow_len(pixels: usize) -> Result<usize> {
    pixels
        .checked_mul(FLOW_COMPONENTS)
        .ok_or(FlowError::Allocation { bytes: usize::MAX })
}

/// Allocate `len` zeroed cells, reporting allocation failure instead of
/// aborting.
fn zeroed_cells(len: usize) -> Result<Vec<AtomicF32>> {
    let mut cells = Vec::new();
    cells
        .try_reserve_exact(len)
        .map_err(|_| FlowError::Allocation {
            bytes: len.saturating_mul(std::mem::size_of::<AtomicF32>()),
        })?;
    cells.resize_with(len, AtomicF32::zero);
    Ok(cells)
}
