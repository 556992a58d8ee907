//! Atmosphere setup error types.

use crate::lut::LutId;

/// Errors surfaced to the host while setting up or feeding the LUT pipeline.
///
/// Geometric edge cases (missed spheres, sun below the horizon) are not errors;
/// they are represented by sentinel values inside the integrators.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AtmosphereError {
    /// An [`AtmosphereParams`](crate::AtmosphereParams) invariant does not hold.
    #[error("invalid atmosphere parameters: {0}")]
    InvalidParams(String),

    /// A [`ViewParams`](crate::ViewParams) invariant does not hold.
    #[error("invalid view parameters: {0}")]
    InvalidView(String),

    /// A packed parameter buffer has the wrong size for its layout.
    #[error("parameter buffer layout mismatch: expected {expected} bytes, got {actual}")]
    LayoutMismatch { expected: usize, actual: usize },

    /// A LUT was configured with a zero-sized axis.
    #[error("{lut} LUT has an empty resolution")]
    EmptyLut { lut: LutId },

    /// A stage was scheduled before one of the LUTs it reads was written.
    #[error("{stage} stage scheduled before its input {input} was written")]
    MissingInput { stage: LutId, input: LutId },

    /// The stage graph contains a dependency cycle.
    #[error("atmosphere stage graph contains a dependency cycle")]
    CyclicGraph,
}
