use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Invalid patch size: {0} (must be positive)")]
    InvalidPatchSize(usize),

    #[error("Invalid minimum error value: {0} (must be positive with a finite reciprocal)")]
    InvalidMinErrVal(f32),

    #[error("Patch midpoint ({x}, {y}) outside {width}x{height} image")]
    MidpointOutOfRange {
        x: f32,
        y: f32,
        width: usize,
        height: usize,
    },

    #[error("Cost map is {rows}x{cols}, expected {expected}x{expected}")]
    CostMapShape {
        rows: usize,
        cols: usize,
        expected: usize,
    },

    #[error("Non-finite cost value at patch offset ({row}, {col})")]
    NonFiniteCost { row: usize, col: usize },

    #[error("Cost {cost} at patch offset ({row}, {col}) gives no finite positive weight")]
    CostOutOfRange { row: usize, col: usize, cost: f32 },

    #[error("Non-finite patch flow ({x}, {y})")]
    NonFiniteFlow { x: f32, y: f32 },

    #[error("Accumulator is {actual_width}x{actual_height}, pass expects {width}x{height}")]
    DimensionMismatch {
        width: usize,
        height: usize,
        actual_width: usize,
        actual_height: usize,
    },

    #[error("Flow buffer holds {flow} values, weight buffer holds {weights} (expected {expected} flow values)")]
    BufferMismatch {
        flow: usize,
        weights: usize,
        expected: usize,
    },

    #[error("Failed to allocate {bytes} bytes for the flow accumulator")]
    Allocation { bytes: usize },

    #[error("Patch {index}: {source}")]
    Patch {
        index: usize,
        #[source]
        source: Box<FlowError>,
    },

    #[error("Expected a 3-channel float image, got {0} channels")]
    InvalidChannels(usize),

    #[error("Invalid resize scale: {scale_x}x{scale_y}")]
    InvalidScale { scale_x: f64, scale_y: f64 },

    #[error("Invalid pyramid: {0}")]
    InvalidPyramid(String),

    #[error("Densification pass cancelled")]
    Cancelled,
}

impl FlowError {
    /// Attach the index of the offending patch.
    pub fn at_patch(self, index: usize) -> Self {
        FlowError::Patch {
            index,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
