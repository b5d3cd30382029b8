#![doc = include_str!("../README.md")]

mod error;
pub mod geometry;
pub mod io;
pub mod particles;
pub mod pkd;
pub mod synthetic;

pub use error::{PkdError, Result};
pub use geometry::{Axis, Box3, Point3};
pub use io::{PkdWriter, WriteOptions};
pub use particles::{Attribute, ParticleSet};
pub use pkd::{AxisPolicy, BuildOptions, PkdBuilder, PkdTree};
