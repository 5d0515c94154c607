//! Landmark categories and the OSM tags they are looked up by.

use serde::{Deserialize, Serialize};

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum LandmarkCategory {
    #[serde(rename = "airport")]
    #[strum(serialize = "airport")]
    Airport,
    #[serde(rename = "major-city")]
    #[strum(serialize = "major-city")]
    MajorCity,
    #[serde(rename = "aquarium")]
    #[strum(serialize = "aquarium")]
    Aquarium,
    #[serde(rename = "zoo")]
    #[strum(serialize = "zoo")]
    Zoo,
    #[serde(rename = "theme_park")]
    #[strum(serialize = "theme_park")]
    ThemePark,
    #[serde(rename = "museum")]
    #[strum(serialize = "museum")]
    Museum,
    #[serde(rename = "hospital")]
    #[strum(serialize = "hospital")]
    Hospital,
    #[serde(rename = "cinema")]
    #[strum(serialize = "cinema")]
    Cinema,
    #[serde(rename = "library")]
    #[strum(serialize = "library")]
    Library,
    #[serde(rename = "golf_course")]
    #[strum(serialize = "golf_course")]
    GolfCourse,
    #[serde(rename = "consulate")]
    #[strum(serialize = "consulate")]
    Consulate,
    #[serde(rename = "park")]
    #[strum(serialize = "park")]
    Park,
    #[serde(rename = "peak")]
    #[strum(serialize = "peak")]
    Peak,
}

impl LandmarkCategory {
    /// The `(key, value)` OSM tag that selects instances of this category.
    pub fn osm_tag(&self) -> (&'static str, &'static str) {
        match self {
            LandmarkCategory::Airport => ("aeroway", "aerodrome"),
            LandmarkCategory::MajorCity => ("place", "city"),
            LandmarkCategory::Aquarium => ("tourism", "aquarium"),
            LandmarkCategory::Zoo => ("tourism", "zoo"),
            LandmarkCategory::ThemePark => ("tourism", "theme_park"),
            LandmarkCategory::Museum => ("tourism", "museum"),
            LandmarkCategory::Hospital => ("amenity", "hospital"),
            LandmarkCategory::Cinema => ("amenity", "cinema"),
            LandmarkCategory::Library => ("amenity", "library"),
            LandmarkCategory::GolfCourse => ("leisure", "golf_course"),
            LandmarkCategory::Consulate => ("diplomatic", "consulate"),
            LandmarkCategory::Park => ("leisure", "park"),
            LandmarkCategory::Peak => ("natural", "peak"),
        }
    }

    /// Extra tag filters appended to the primary one.
    pub fn refinements(&self) -> &'static [&'static str] {
        match self {
            // Only airports with scheduled service carry an IATA code.
            LandmarkCategory::Airport => &["[\"iata\"]"],
            LandmarkCategory::Peak => &["[\"name\"]"],
            _ => &[],
        }
    }
}

/// A category name as it appears in question types, with the optional
/// `-full` suffix marking questions that take part in per-station refinement.
pub(crate) fn split_full(tag: &str) -> (&str, bool) {
    match tag.strip_suffix("-full") {
        Some(base) => (base, true),
        None => (tag, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn names_match_the_wire_format() {
        for category in LandmarkCategory::iter() {
            let json = serde_json::to_value(category).unwrap();
            assert_eq!(json.as_str().unwrap(), category.to_string());
            assert_eq!(LandmarkCategory::from_str(&category.to_string()).unwrap(), category);
        }
    }

    #[test]
    fn full_suffix_is_split_off() {
        assert_eq!(split_full("museum-full"), ("museum", true));
        assert_eq!(split_full("major-city"), ("major-city", false));
    }

    #[test]
    fn tag_table() {
        assert_eq!(LandmarkCategory::Airport.osm_tag(), ("aeroway", "aerodrome"));
        assert_eq!(LandmarkCategory::GolfCourse.osm_tag(), ("leisure", "golf_course"));
    }
}
