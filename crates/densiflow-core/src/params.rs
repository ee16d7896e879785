use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_MIN_ERR_VAL, DEFAULT_PATCH_SIZE, DEFAULT_PYRAMID_LEVELS, DEFAULT_PYRAMID_SCALE_FACTOR,
};
use crate::error::{FlowError, Result};

/// Dimensions of the image a densification pass operates on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageParams {
    pub width: usize,
    pub height: usize,
}

impl ImageParams {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// `width * height`, or `InvalidDimensions` if the product overflows.
    pub fn pixel_count(&self) -> Result<usize> {
        self.width
            .checked_mul(self.height)
            .ok_or(FlowError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FlowError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        self.pixel_count()?;
        Ok(())
    }
}

/// How a patch's local matching cost becomes a confidence weight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightRule {
    /// `1 / (|c| + min_err_val)`.
    #[default]
    Additive,
    /// `1 / max(|c|, min_err_val)`.
    Floor,
}

impl WeightRule {
    /// Confidence of a single pixel vote with local cost `cost`.
    ///
    /// `min_err_val` must be positive; the result is then finite and
    /// bounded by `1 / min_err_val`.
    #[inline]
    pub fn weight(self, cost: f32, min_err_val: f32) -> f32 {
        let c = cost.abs();
        match self {
            WeightRule::Additive => 1.0 / (c + min_err_val),
            WeightRule::Floor => 1.0 / c.max(min_err_val),
        }
    }
}

impl std::fmt::Display for WeightRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeightRule::Additive => write!(f, "Additive"),
            WeightRule::Floor => write!(f, "Floor"),
        }
    }
}

/// How scatter units write into the shared accumulator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScatterStrategy {
    /// Every unit atomically adds into the shared accumulator.
    #[default]
    Atomic,
    /// Units fold into private per-worker buffers that are merged at the end.
    Reduce,
}

impl std::fmt::Display for ScatterStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScatterStrategy::Atomic => write!(f, "Atomic"),
            ScatterStrategy::Reduce => write!(f, "Per-worker Reduce"),
        }
    }
}

/// Tunables of a densification pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptParams {
    /// Edge length of the square patches, in pixels (default: 8).
    pub patch_size: usize,
    /// Error floor used to stabilize the weighting rule (default: 1e-4).
    pub min_err_val: f32,
    pub weight_rule: WeightRule,
    pub scatter_strategy: ScatterStrategy,
}

impl Default for OptParams {
    fn default() -> Self {
        Self {
            patch_size: DEFAULT_PATCH_SIZE,
            min_err_val: DEFAULT_MIN_ERR_VAL,
            weight_rule: WeightRule::default(),
            scatter_strategy: ScatterStrategy::default(),
        }
    }
}

impl OptParams {
    pub fn validate(&self) -> Result<()> {
        if self.patch_size == 0 {
            return Err(FlowError::InvalidPatchSize(self.patch_size));
        }
        // The weight bound 1 / min_err_val must itself be representable.
        if !self.min_err_val.is_finite()
            || self.min_err_val <= 0.0
            || !(1.0 / self.min_err_val).is_finite()
        {
            return Err(FlowError::InvalidMinErrVal(self.min_err_val));
        }
        Ok(())
    }

    /// Weight of a pixel vote under this configuration.
    #[inline]
    pub fn weight(&self, cost: f32) -> f32 {
        self.weight_rule.weight(cost, self.min_err_val)
    }
}

/// Multi-scale preprocessing pyramid layout.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PyramidConfig {
    /// Number of levels, including the full-resolution one (default: 3).
    pub levels: usize,
    /// Scale of each level relative to the previous one (default: 0.5).
    pub scale_factor: f64,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            levels: DEFAULT_PYRAMID_LEVELS,
            scale_factor: DEFAULT_PYRAMID_SCALE_FACTOR,
        }
    }
}

impl PyramidConfig {
    pub fn validate(&self) -> Result<()> {
        if self.levels == 0 {
            return Err(FlowError::InvalidPyramid("at least one level required".into()));
        }
        if !(self.scale_factor > 0.0 && self.scale_factor <= 1.0) {
            return Err(FlowError::InvalidPyramid(format!(
                "scale factor {} not in (0.0, 1.0]",
                self.scale_factor
            )));
        }
        Ok(())
    }

    /// Scale of `level` relative to the full-resolution image.
    pub fn level_scale(&self, level: usize) -> f64 {
        self.scale_factor.powi(level as i32)
    }
}

/// Complete on-disk configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    #[serde(default)]
    pub densify: OptParams,
    #[serde(default)]
    pub pyramid: PyramidConfig,
}
