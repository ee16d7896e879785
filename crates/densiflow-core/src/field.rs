use ndarray::{Array2, Zip};

/// Per-pixel motion field produced by a densification pass.
///
/// All arrays have shape `(height, width)` and are indexed `[[row, col]]`.
#[derive(Clone, Debug)]
pub struct DenseFlowField {
    /// Horizontal motion component.
    pub flow_x: Array2<f32>,
    /// Vertical motion component.
    pub flow_y: Array2<f32>,
    /// Total confidence accumulated at each pixel; 0 where no patch voted.
    pub weights: Array2<f32>,
}

impl DenseFlowField {
    pub fn width(&self) -> usize {
        self.flow_x.ncols()
    }

    pub fn height(&self) -> usize {
        self.flow_x.nrows()
    }

    pub fn flow_at(&self, x: usize, y: usize) -> (f32, f32) {
        (self.flow_x[[y, x]], self.flow_y[[y, x]])
    }

    pub fn weight_at(&self, x: usize, y: usize) -> f32 {
        self.weights[[y, x]]
    }

    pub fn is_covered(&self, x: usize, y: usize) -> bool {
        self.weights[[y, x]] > 0.0
    }

    /// Fraction of pixels that received at least one patch vote.
    pub fn coverage(&self) -> f64 {
        let total = self.weights.len();
        if total == 0 {
            return 0.0;
        }
        let covered = self.weights.iter().filter(|&&w| w > 0.0).count();
        covered as f64 / total as f64
    }

    /// Mean flow magnitude over covered pixels (0 if none).
    pub fn mean_magnitude(&self) -> f64 {
        let mut sum = 0.0f64;
        let mut count = 0usize;
        Zip::from(&self.flow_x)
            .and(&self.flow_y)
            .and(&self.weights)
            .for_each(|&fx, &fy, &w| {
                if w > 0.0 {
                    sum += (fx as f64).hypot(fy as f64);
                    count += 1;
                }
            });
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    pub fn max_weight(&self) -> f32 {
        self.weights.iter().copied().fold(0.0, f32::max)
    }
}
