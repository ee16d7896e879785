use std::time::Instant;

use ndarray::{Array3, Zip};
use tracing::debug;

use crate::consts::{COLOR_CHANNEL_COUNT, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{FlowError, Result};

/// A resized image together with its x and y gradients.
///
/// All arrays have shape `(height, width, channels)`.
#[derive(Clone, Debug)]
pub struct ResizedGrad {
    pub image: Array3<f32>,
    pub grad_x: Array3<f32>,
    pub grad_y: Array3<f32>,
}

impl ResizedGrad {
    pub fn width(&self) -> usize {
        self.image.dim().1
    }

    pub fn height(&self) -> usize {
        self.image.dim().0
    }

    /// Mean of `sqrt(gx^2 + gy^2)` over all pixels and channels.
    pub fn mean_gradient_magnitude(&self) -> f64 {
        let n = self.grad_x.len();
        if n == 0 {
            return 0.0;
        }
        let mut sum = 0.0f64;
        Zip::from(&self.grad_x)
            .and(&self.grad_y)
            .for_each(|&gx, &gy| sum += (gx as f64).hypot(gy as f64));
        sum / n as f64
    }
}

/// Resize a 3-channel float image by `(scale_x, scale_y)` and compute its
/// Sobel gradients.
///
/// Output size is `round(w * scale_x) x round(h * scale_y)` (at least 1x1).
/// Gradients replicate the border pixels.
pub fn resize_grad(src: &Array3<f32>, scale_x: f64, scale_y: f64) -> Result<ResizedGrad> {
    let (h, w, channels) = src.dim();
    if channels != COLOR_CHANNEL_COUNT {
        return Err(FlowError::InvalidChannels(channels));
    }
    if h == 0 || w == 0 {
        return Err(FlowError::InvalidDimensions {
            width: w,
            height: h,
        });
    }

    debug!(width = w, height = h, scale_x, scale_y, "resize_grad: start");

    let start = Instant::now();
    let image = resize_bilinear(src, scale_x, scale_y)?;
    let resize_ms = start.elapsed().as_secs_f64() * 1e3;

    let start = Instant::now();
    let (grad_x, grad_y) = sobel_gradients(&image);
    let gradient_ms = start.elapsed().as_secs_f64() * 1e3;

    debug!(
        out_width = image.dim().1,
        out_height = image.dim().0,
        resize_ms,
        gradient_ms,
        "resize_grad: done"
    );

    Ok(ResizedGrad {
        image,
        grad_x,
        grad_y,
    })
}

/// Bilinear resize with pixel-centre alignment and clamped borders.
pub fn resize_bilinear(src: &Array3<f32>, scale_x: f64, scale_y: f64) -> Result<Array3<f32>> {
    let valid = |s: f64| s.is_finite() && s > 0.0;
    if !valid(scale_x) || !valid(scale_y) {
        return Err(FlowError::InvalidScale { scale_x, scale_y });
    }

    let (h, w, channels) = src.dim();
    if h == 0 || w == 0 {
        return Err(FlowError::InvalidDimensions {
            width: w,
            height: h,
        });
    }
    let out_h = ((h as f64 * scale_y).round() as usize).max(1);
    let out_w = ((w as f64 * scale_x).round() as usize).max(1);
    let mut dst = Array3::<f32>::zeros((out_h, out_w, channels));

    let sample = |(row, col, ch): (usize, usize, usize), v: &mut f32| {
        let sy = ((row as f64 + 0.5) / scale_y - 0.5).clamp(0.0, (h - 1) as f64);
        let sx = ((col as f64 + 0.5) / scale_x - 0.5).clamp(0.0, (w - 1) as f64);
        let (y0, x0) = (sy.floor() as usize, sx.floor() as usize);
        let (y1, x1) = ((y0 + 1).min(h - 1), (x0 + 1).min(w - 1));
        let (fy, fx) = (sy - y0 as f64, sx - x0 as f64);

        let top = src[[y0, x0, ch]] as f64 * (1.0 - fx) + src[[y0, x1, ch]] as f64 * fx;
        let bottom = src[[y1, x0, ch]] as f64 * (1.0 - fx) + src[[y1, x1, ch]] as f64 * fx;
        *v = (top * (1.0 - fy) + bottom * fy) as f32;
    };

    let zip = Zip::indexed(&mut dst);
    if out_h * out_w >= PARALLEL_PIXEL_THRESHOLD {
        zip.par_for_each(sample);
    } else {
        zip.for_each(sample);
    }
    Ok(dst)
}

/// Per-channel Sobel gradients with replicated borders.
///
/// Kernels:
///   Gx = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]]
///   Gy = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]]
pub fn sobel_gradients(src: &Array3<f32>) -> (Array3<f32>, Array3<f32>) {
    let (h, w, _) = src.dim();
    let mut grad_x = Array3::<f32>::zeros(src.raw_dim());
    let mut grad_y = Array3::<f32>::zeros(src.raw_dim());
    if h == 0 || w == 0 {
        return (grad_x, grad_y);
    }

    let at = |row: isize, col: isize, ch: usize| -> f64 {
        let r = row.clamp(0, h as isize - 1) as usize;
        let c = col.clamp(0, w as isize - 1) as usize;
        src[[r, c, ch]] as f64
    };

    let kernel = |(row, col, ch): (usize, usize, usize), gx: &mut f32, gy: &mut f32| {
        let (r, c) = (row as isize, col as isize);
        let x = -at(r - 1, c - 1, ch) + at(r - 1, c + 1, ch) - 2.0 * at(r, c - 1, ch)
            + 2.0 * at(r, c + 1, ch)
            - at(r + 1, c - 1, ch)
            + at(r + 1, c + 1, ch);
        let y = -at(r - 1, c - 1, ch) - 2.0 * at(r - 1, c, ch) - at(r - 1, c + 1, ch)
            + at(r + 1, c - 1, ch)
            + 2.0 * at(r + 1, c, ch)
            + at(r + 1, c + 1, ch);
        *gx = x as f32;
        *gy = y as f32;
    };

    let zip = Zip::indexed(&mut grad_x).and(&mut grad_y);
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        zip.par_for_each(kernel);
    } else {
        zip.for_each(kernel);
    }
    (grad_x, grad_y)
}
