//! The feasible region and the two representations it moves through.

use geo::{Contains, MultiPolygon, Point};

use crate::{
    error::{GeometryError, RepresentationMismatch},
    geometry,
    question::QuestionKey,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Representation {
    /// The polygons are the feasible set.
    Direct,
    /// The polygons are the world rectangle minus the feasible set.
    Complement,
}

/// Whether a constraint narrows the region by intersection or removes a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintClass {
    Retain,
    Exclude,
}

impl ConstraintClass {
    pub fn required_representation(&self) -> Representation {
        match self {
            ConstraintClass::Retain => Representation::Direct,
            ConstraintClass::Exclude => Representation::Complement,
        }
    }
}

/// One question reduced to a shape and what to do with it.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub key: QuestionKey,
    pub class: ConstraintClass,
    pub shape: MultiPolygon,
}

impl Constraint {
    pub fn retain(key: QuestionKey, shape: MultiPolygon) -> Self {
        Constraint {
            key,
            class: ConstraintClass::Retain,
            shape,
        }
    }

    pub fn exclude(key: QuestionKey, shape: MultiPolygon) -> Self {
        Constraint {
            key,
            class: ConstraintClass::Exclude,
            shape,
        }
    }

    /// `retain` when `keep` is true, `exclude` otherwise.
    pub fn polarised(key: QuestionKey, keep: bool, shape: MultiPolygon) -> Self {
        if keep {
            Constraint::retain(key, shape)
        } else {
            Constraint::exclude(key, shape)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeasibleRegion {
    Direct(MultiPolygon),
    Complement(MultiPolygon),
}

impl FeasibleRegion {
    pub fn representation(&self) -> Representation {
        match self {
            FeasibleRegion::Direct(_) => Representation::Direct,
            FeasibleRegion::Complement(_) => Representation::Complement,
        }
    }

    /// The polygons as stored, whichever representation they are in.
    pub fn polygons(&self) -> &MultiPolygon {
        match self {
            FeasibleRegion::Direct(mp) | FeasibleRegion::Complement(mp) => mp,
        }
    }

    fn mismatch(&self, expected: Representation) -> RepresentationMismatch {
        RepresentationMismatch {
            expected,
            found: self.representation(),
        }
    }

    /// `region ∩ shape`. Requires the direct representation.
    pub fn intersect_retained(
        &self,
        shape: &MultiPolygon,
    ) -> Result<Result<FeasibleRegion, GeometryError>, RepresentationMismatch> {
        match self {
            FeasibleRegion::Direct(mp) => Ok(geometry::intersection(mp, shape)
                .and_then(geometry::normalize)
                .map(FeasibleRegion::Direct)),
            FeasibleRegion::Complement(_) => Err(self.mismatch(Representation::Direct)),
        }
    }

    /// `¬region ∪ shape`. Requires the complement representation.
    pub fn union_excluded(
        &self,
        shape: &MultiPolygon,
    ) -> Result<Result<FeasibleRegion, GeometryError>, RepresentationMismatch> {
        match self {
            FeasibleRegion::Complement(mp) => Ok(geometry::union(mp, shape)
                .and_then(geometry::normalize)
                .map(FeasibleRegion::Complement)),
            FeasibleRegion::Direct(_) => Err(self.mismatch(Representation::Complement)),
        }
    }

    /// Fold one constraint into the region, checking the representation first.
    pub fn apply(&self, constraint: &Constraint) -> crate::error::Result<FeasibleRegion> {
        let next = match constraint.class {
            ConstraintClass::Retain => self.intersect_retained(&constraint.shape)?,
            ConstraintClass::Exclude => self.union_excluded(&constraint.shape)?,
        };
        Ok(next?)
    }

    pub fn into_complement(self) -> Result<FeasibleRegion, GeometryError> {
        match self {
            FeasibleRegion::Direct(mp) => Ok(FeasibleRegion::Complement(geometry::complement(&mp)?)),
            complement => Ok(complement),
        }
    }

    pub fn into_direct(self) -> Result<FeasibleRegion, GeometryError> {
        match self {
            FeasibleRegion::Complement(mp) => Ok(FeasibleRegion::Direct(geometry::complement(&mp)?)),
            direct => Ok(direct),
        }
    }

    /// The feasible set as polygons, converting out of the complement if needed.
    pub fn direct_polygons(&self) -> Result<MultiPolygon, GeometryError> {
        match self {
            FeasibleRegion::Direct(mp) => Ok(mp.clone()),
            FeasibleRegion::Complement(mp) => geometry::complement(mp),
        }
    }

    pub fn contains_point(&self, point: &Point) -> bool {
        match self {
            FeasibleRegion::Direct(mp) => mp.contains(point),
            FeasibleRegion::Complement(mp) => !mp.contains(point),
        }
    }

    /// No feasible point remains: the direct set has no area, or the mask
    /// covers the whole world.
    pub fn is_empty(&self) -> bool {
        match self {
            FeasibleRegion::Direct(mp) => geometry::is_negligible(mp),
            FeasibleRegion::Complement(mp) => {
                geometry::covers_world(mp)
                    || geometry::complement(mp).is_ok_and(|direct| geometry::is_negligible(&direct))
            }
        }
    }
}
