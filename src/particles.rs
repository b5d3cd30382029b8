//! The parallel-array particle model that the tree builder permutes in place.

use std::collections::HashMap;

use geo_traits::CoordTrait;

use crate::error::{PkdError, Result};
use crate::geometry::{Box3, Point3};

/// A named set of values, one float per particle, with its running value range.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    name: String,
    pub(crate) values: Vec<f32>,
    min: f32,
    max: f32,
}

impl Attribute {
    /// An empty attribute. Its range starts out as `[+inf, -inf]`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![],
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Smallest value pushed so far.
    pub fn min(&self) -> f32 {
        self.min
    }

    /// Largest value pushed so far.
    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn push(&mut self, value: f32) {
        self.values.push(value);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn truncate(&mut self, len: usize) {
        self.values.truncate(len);
        self.min = self.values.iter().copied().fold(f32::INFINITY, f32::min);
        self.max = self.values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    }
}

/// A set of particles stored as index-aligned arrays.
///
/// `positions[i]`, `types[i]` (when there are types) and the `i`-th value of every attribute
/// all describe the same particle. Building a tree reorders all of them together.
#[derive(Debug, Clone, Default)]
pub struct ParticleSet {
    /// Particle positions.
    pub positions: Vec<Point3>,
    /// Category ID of each particle, or empty if the particles are untyped.
    pub types: Vec<i32>,
    /// Render radius shared by all particles; `0` if unknown.
    pub radius: f32,
    pub(crate) attributes: Vec<Attribute>,
    type_names: Vec<String>,
    type_ids: HashMap<String, i32>,
}

impl ParticleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an untyped, attribute-free set from positions.
    pub fn from_positions(positions: Vec<Point3>) -> Self {
        Self {
            positions,
            ..Default::default()
        }
    }

    /// The number of particles.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Append a position.
    ///
    /// This returns the insertion index.
    #[inline]
    pub fn push(&mut self, position: Point3) -> usize {
        self.positions.push(position);
        self.positions.len() - 1
    }

    /// Append a position from any coordinate type.
    pub fn push_coord(&mut self, coord: &impl CoordTrait<T = f32>) -> usize {
        self.push(Point3::from_coord(coord))
    }

    /// Append `value` to the attribute called `name`, creating the attribute if needed.
    pub fn add_attribute(&mut self, name: &str, value: f32) {
        let index = match self.attributes.iter().position(|a| a.name == name) {
            Some(index) => index,
            None => {
                self.attributes.push(Attribute::new(name));
                self.attributes.len() - 1
            }
        };
        self.attributes[index].push(value);
    }

    /// All attributes, in the order they were first added.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// The stable category ID for `name`. New names get the next free ID.
    pub fn type_id(&mut self, name: &str) -> i32 {
        if let Some(&id) = self.type_ids.get(name) {
            return id;
        }
        if name != "Default" {
            log::debug!("New particle type '{}'", name);
        }
        let id = self.type_names.len() as i32;
        self.type_ids.insert(name.to_string(), id);
        self.type_names.push(name.to_string());
        id
    }

    /// Category names, indexed by category ID.
    pub fn type_names(&self) -> &[String] {
        &self.type_names
    }

    /// Bounding box of all positions. Empty if there are no particles.
    pub fn bounds(&self) -> Box3 {
        self.positions.iter().collect()
    }

    /// Truncate every array to the length of the shortest one.
    ///
    /// This is the recovery step after a partially failed import. Returns the number of positions
    /// that were discarded.
    pub fn cull(&mut self) -> usize {
        let mut complete = self.positions.len();
        if !self.types.is_empty() {
            complete = complete.min(self.types.len());
        }
        for attribute in self.attributes.iter() {
            complete = complete.min(attribute.len());
        }

        let discarded = self.positions.len() - complete;
        if discarded > 0 {
            log::warn!(
                "{} particle(s) with missing attribute(s): discarding",
                discarded
            );
            self.positions.truncate(complete);
        }
        if self.types.len() > complete {
            log::warn!(
                "{} type value(s) without particle: discarding",
                self.types.len() - complete
            );
            self.types.truncate(complete);
        }
        for attribute in self.attributes.iter_mut() {
            if attribute.len() > complete {
                log::warn!(
                    "{} value(s) of attribute '{}' without particle: discarding",
                    attribute.len() - complete,
                    attribute.name
                );
                attribute.truncate(complete);
            }
        }
        discarded
    }

    /// Check that this set can be built into a tree.
    pub fn validate(&self) -> Result<()> {
        let expected = self.positions.len();
        if expected == 0 {
            return Err(PkdError::EmptyParticleSet);
        }
        if expected > u32::MAX as usize {
            return Err(PkdError::TooManyParticles { count: expected });
        }
        if !self.types.is_empty() && self.types.len() != expected {
            return Err(PkdError::MisalignedArrays {
                name: "type".to_string(),
                len: self.types.len(),
                expected,
            });
        }
        for attribute in self.attributes.iter() {
            if attribute.len() != expected {
                return Err(PkdError::MisalignedArrays {
                    name: attribute.name.clone(),
                    len: attribute.len(),
                    expected,
                });
            }
        }
        if let Some(index) = self.positions.iter().position(|p| !p.is_finite()) {
            return Err(PkdError::NonFinitePosition { index });
        }
        Ok(())
    }
}
