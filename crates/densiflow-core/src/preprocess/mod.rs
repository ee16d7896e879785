//! Image preprocessing for multi-scale patch search: resizing plus
//! horizontal/vertical gradient extraction at every pyramid level.
//!
//! The densification engine does not depend on this module; it only needs
//! correctly sized buffers at the scale of the current pass.

mod pyramid;
mod resize;

pub use pyramid::{build_pyramid, PyramidLevel};
pub use resize::{resize_bilinear, resize_grad, sobel_gradients, ResizedGrad};
