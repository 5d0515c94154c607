use geo::Point;
use serde::{Deserialize, Serialize};

use crate::{
    geometry::{self, Circle},
    question::{Marker, QuestionKey},
    region::Constraint,
    units::{Distance, DistanceUnit},
};

/// "Are you within {radius} of me?"
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RadiusQuestion {
    pub lat: f64,
    pub lng: f64,
    pub radius: f64,
    #[serde(default)]
    pub unit: DistanceUnit,
    pub within: bool,
    #[serde(flatten)]
    pub marker: Marker,
}

impl RadiusQuestion {
    pub fn center(&self) -> Point {
        geometry::point(self.lat, self.lng)
    }

    pub fn distance(&self) -> Distance {
        Distance::new(self.radius, self.unit)
    }

    pub fn circle(&self) -> Circle {
        Circle::new(self.center(), self.distance().meters())
    }

    /// A zero radius gives an empty shape: retaining it empties the region,
    /// excluding it changes nothing.
    pub fn to_constraint(&self, key: QuestionKey, steps: usize) -> Constraint {
        Constraint::polarised(key, self.within, self.circle().to_multi_polygon(steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::ConstraintClass;

    fn question(radius: f64, within: bool) -> RadiusQuestion {
        RadiusQuestion {
            lat: 40.0,
            lng: -74.0,
            radius,
            unit: DistanceUnit::Miles,
            within,
            marker: Marker::default(),
        }
    }

    #[test]
    fn polarity_picks_the_class() {
        let key = QuestionKey(1.0);
        assert_eq!(question(1.0, true).to_constraint(key, 64).class, ConstraintClass::Retain);
        assert_eq!(question(1.0, false).to_constraint(key, 64).class, ConstraintClass::Exclude);
    }

    #[test]
    fn zero_radius_is_an_empty_shape() {
        let constraint = question(0.0, true).to_constraint(QuestionKey(1.0), 64);
        assert!(constraint.shape.0.is_empty());
    }
}
