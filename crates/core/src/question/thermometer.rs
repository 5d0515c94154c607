use geo::{MultiPolygon, Point};
use serde::{Deserialize, Serialize};

use crate::{
    error::GeometryError,
    geometry,
    question::{Marker, QuestionKey},
    region::Constraint,
};

/// "I've just travelled from A to B. Am I warmer or colder?"
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermometerQuestion {
    pub lat_a: f64,
    pub lng_a: f64,
    pub lat_b: f64,
    pub lng_b: f64,
    /// True when the hider is nearer B than A.
    pub warmer: bool,
    #[serde(flatten)]
    pub marker: Marker,
}

impl ThermometerQuestion {
    pub fn start(&self) -> Point {
        geometry::point(self.lat_a, self.lng_a)
    }

    pub fn end(&self) -> Point {
        geometry::point(self.lat_b, self.lng_b)
    }

    /// Half of the world on the hider's side of the A–B bisector.
    pub fn shape(&self) -> Result<MultiPolygon, GeometryError> {
        let (target, other) = if self.warmer {
            (self.end(), self.start())
        } else {
            (self.start(), self.end())
        };

        let half = geometry::nearer_half_plane(target, other, geometry::world_rect())?;
        if half.0.is_empty() {
            return Err(GeometryError::Unsupported("thermometer half-plane is empty".into()));
        }
        Ok(half)
    }

    /// Always retaining: either answer is a half-plane to intersect with.
    pub fn to_constraint(&self, key: QuestionKey) -> Result<Constraint, GeometryError> {
        Ok(Constraint::retain(key, self.shape()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Contains;

    fn question(warmer: bool) -> ThermometerQuestion {
        ThermometerQuestion {
            lat_a: 51.50,
            lng_a: -0.20,
            lat_b: 51.50,
            lng_b: -0.10,
            warmer,
            marker: Marker::default(),
        }
    }

    #[test]
    fn warmer_keeps_the_side_of_b() {
        let shape = question(true).shape().unwrap();
        assert!(shape.contains(&Point::new(-0.05, 51.5)));
        assert!(!shape.contains(&Point::new(-0.25, 51.5)));
    }

    #[test]
    fn swapping_ends_and_polarity_is_the_same_half() {
        let original = question(true);
        let swapped = ThermometerQuestion {
            lat_a: original.lat_b,
            lng_a: original.lng_b,
            lat_b: original.lat_a,
            lng_b: original.lng_a,
            warmer: false,
            marker: Marker::default(),
        };

        assert_eq!(original.shape().unwrap(), swapped.shape().unwrap());
    }
}
