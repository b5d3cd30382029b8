use std::fmt::Debug;
use thiserror::Error;

/// Enum with all errors in this crate.
#[derive(Error, Debug)]
pub enum PkdError {
    /// The particle set has no positions.
    #[error("Particle set is empty.")]
    EmptyParticleSet,

    /// The particle set is larger than an implicit tree can address.
    #[error("Too many particles: {count} (at most {} supported).", u32::MAX)]
    TooManyParticles { count: usize },

    /// A position has a NaN or infinite coordinate.
    #[error("Particle {index} has a non-finite position.")]
    NonFinitePosition { index: usize },

    /// Attribute or type arrays do not match the number of positions.
    #[error("Array '{name}' has {len} values but there are {expected} positions; cull() the set first.")]
    MisalignedArrays {
        name: String,
        len: usize,
        expected: usize,
    },

    /// No positive render radius was given.
    #[error("No radius specified.")]
    MissingRadius,

    /// The k-d property did not hold after selecting a node's split value.
    #[error(
        "Not a valid kd-tree: node {node} (axis {axis}, subtrees {left_size}/{right_size}) \
         is out of order with particle {index}."
    )]
    InvariantViolation {
        node: usize,
        axis: usize,
        left_size: usize,
        right_size: usize,
        index: usize,
    },

    /// A point source name that is not understood.
    #[error("Unknown point source '{0}'.")]
    UnknownSource(String),

    /// Writing the header or payload failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Rendering the JSON header failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PkdError>;
