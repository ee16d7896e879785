use crate::consts::FLOW_COMPONENTS;
use crate::error::{FlowError, Result};
use crate::params::ImageParams;

/// Single-owner accumulation buffer with the same layout as
/// [`super::FlowAccumulator`].
#[derive(Clone, Debug)]
pub struct LocalAccumulator {
    flow: Vec<f32>,
    weights: Vec<f32>,
}

impl LocalAccumulator {
    pub fn new(img: &ImageParams) -> Result<Self> {
        let pixels = img.pixel_count()?;
        Ok(Self {
            flow: zeroed(super::flow_len(pixels)?)?,
            weights: zeroed(pixels)?,
        })
    }

    #[inline]
    pub fn add_vote(&mut self, idx: usize, flow: (f32, f32), weight: f32) {
        self.flow[idx * FLOW_COMPONENTS] += weight * flow.0;
        self.flow[idx * FLOW_COMPONENTS + 1] += weight * flow.1;
        self.weights[idx] += weight;
    }

    pub fn flow(&self) -> &[f32] {
        &self.flow
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }
}

fn zeroed(len: usize) -> Result<Vec<f32>> {
    let mut values = Vec::new();
    values
        .try_reserve_exact(len)
        .map_err(|_| FlowError::Allocation {
            bytes: len.saturating_mul(std::mem::size_of::<f32>()),
        })?;
    values.resize(len, 0.0);
    Ok(values)
}
