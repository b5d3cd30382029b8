//! An implicit balanced k-d tree over a [`ParticleSet`][crate::ParticleSet], built in place.

pub mod axis;
mod builder;
mod columns;
mod cursor;
pub mod node;
mod tree;

pub use builder::{AxisPolicy, BuildOptions, PkdBuilder, DEFAULT_PARALLEL_LEVELS};
pub use cursor::SubtreeCursor;
pub use tree::PkdTree;
