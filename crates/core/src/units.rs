use serde::{Deserialize, Serialize};

pub const METERS_PER_MILE: f64 = 1609.344;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Miles,
    Kilometers,
    Meters,
}

impl DistanceUnit {
    pub fn meters_per_unit(&self) -> f64 {
        match self {
            DistanceUnit::Miles => METERS_PER_MILE,
            DistanceUnit::Kilometers => 1000.0,
            DistanceUnit::Meters => 1.0,
        }
    }
}

/// A length in meters. Every geometry routine in the crate takes this.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Meters(pub f64);

impl Meters {
    pub fn from_miles(miles: f64) -> Self {
        Meters(miles * METERS_PER_MILE)
    }

    pub fn from_kilometers(km: f64) -> Self {
        Meters(km * 1000.0)
    }

    pub fn as_miles(&self) -> f64 {
        self.0 / METERS_PER_MILE
    }

    pub fn as_kilometers(&self) -> f64 {
        self.0 / 1000.0
    }

    pub fn get(&self) -> f64 {
        self.0
    }
}

impl std::ops::Add for Meters {
    type Output = Meters;

    fn add(self, rhs: Self) -> Self::Output {
        Meters(self.0 + rhs.0)
    }
}

impl std::ops::Mul<f64> for Meters {
    type Output = Meters;

    fn mul(self, rhs: f64) -> Self::Output {
        Meters(self.0 * rhs)
    }
}

/// A user-entered distance with its unit, as stored on questions and in config.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Distance {
    pub value: f64,
    #[serde(default)]
    pub unit: DistanceUnit,
}

impl Distance {
    pub fn new(value: f64, unit: DistanceUnit) -> Self {
        Distance { value, unit }
    }

    pub fn miles(value: f64) -> Self {
        Distance::new(value, DistanceUnit::Miles)
    }

    pub fn meters(&self) -> Meters {
        Meters(self.value * self.unit.meters_per_unit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::str::FromStr;

    #[test]
    fn converts_to_meters() {
        assert_relative_eq!(Distance::miles(0.5).meters().get(), 804.672);
        assert_relative_eq!(
            Distance::new(2.0, DistanceUnit::Kilometers).meters().get(),
            2000.0
        );
        assert_relative_eq!(Meters::from_miles(10.0).as_miles(), 10.0);
    }

    #[test]
    fn unit_names_round_trip_through_strings() {
        assert_eq!(DistanceUnit::from_str("kilometers").unwrap(), DistanceUnit::Kilometers);
        assert_eq!(DistanceUnit::Meters.to_string(), "meters");

        let d: Distance = serde_json::from_str(r#"{"value": 3}"#).unwrap();
        assert_eq!(d.unit, DistanceUnit::Miles);
    }
}
