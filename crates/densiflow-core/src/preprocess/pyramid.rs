use rayon::prelude::*;
use tracing::info;

use ndarray::Array3;

use crate::error::Result;
use crate::params::PyramidConfig;

use super::resize::{resize_grad, ResizedGrad};

/// One level of the preprocessing pyramid.
#[derive(Clone, Debug)]
pub struct PyramidLevel {
    /// 0 is full resolution.
    pub level: usize,
    /// Scale relative to the full-resolution image.
    pub scale: f64,
    pub data: ResizedGrad,
}

/// Build `config.levels` resized/gradient levels, finest first.
///
/// Each level is resampled directly from `src`, so levels are independent
/// and built in parallel.
pub fn build_pyramid(src: &Array3<f32>, config: &PyramidConfig) -> Result<Vec<PyramidLevel>> {
    config.validate()?;

    let levels = (0..config.levels)
        .into_par_iter()
        .map(|level| {
            let scale = config.level_scale(level);
            let data = resize_grad(src, scale, scale)?;
            Ok(PyramidLevel { level, scale, data })
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        levels = levels.len(),
        coarsest_width = levels.last().map(|l| l.data.width()),
        coarsest_height = levels.last().map(|l| l.data.height()),
        "Pyramid built"
    );
    Ok(levels)
}
