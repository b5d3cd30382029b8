//! Generated particle sets, for testing and benchmarking without an importer.

use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::PkdError;
use crate::geometry::Point3;
use crate::particles::ParticleSet;

/// A generated point source, named like a file: `<count>.random` or `<count>.regular`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointSource {
    /// Uniformly random points in the unit cube, with a smooth "random" attribute.
    Random(usize),
    /// An `n * n * n` lattice of integer points.
    Regular(usize),
}

impl FromStr for PointSource {
    type Err = PkdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || PkdError::UnknownSource(s.to_string());
        let (count, kind) = s.rsplit_once('.').ok_or_else(unknown)?;
        let count: usize = count.parse().map_err(|_| unknown())?;
        match kind.to_ascii_lowercase().as_str() {
            "random" => Ok(PointSource::Random(count)),
            "regular" => Ok(PointSource::Regular(count)),
            _ => Err(unknown()),
        }
    }
}

impl PointSource {
    /// Append this source's particles to `particles`.
    pub fn load_into(&self, particles: &mut ParticleSet, seed: u64) {
        match *self {
            PointSource::Random(count) => {
                log::info!("generating model of {} random particles", count);
                random(particles, count, &mut StdRng::seed_from_u64(seed));
            }
            PointSource::Regular(n) => {
                log::info!("generating model of {}^3 regular particles", n);
                regular(particles, n);
            }
        }
    }
}

/// Append `count` random points in the unit cube, each with a "random" attribute that varies
/// smoothly over space.
pub fn random(particles: &mut ParticleSet, count: usize, rng: &mut impl Rng) {
    for _ in 0..count {
        let p = Point3::new(rng.gen(), rng.gen(), rng.gen());
        particles.push(p);
        let value = (11. * p.x + 5. * p.y + 7. * p.z).cos()
            + (5. * p.y + 7. * p.z).cos()
            + (13. * p.x * p.y + 11. * p.x).sin() * (11. * p.z).cos();
        particles.add_attribute("random", value);
    }
}

/// Append the lattice points `(x, y, z)` for `x, y, z` in `0..n`.
pub fn regular(particles: &mut ParticleSet, n: usize) {
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                particles.push(Point3::new(x as f32, y as f32, z as f32));
            }
        }
    }
}
