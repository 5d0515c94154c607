//! Type-safe identifiers for stations and lines.
//!
//! Identifiers wrap `Arc<str>` so cloning them into candidate lists and
//! spatial index nodes is cheap.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

macro_rules! impl_identifier {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new(s: impl AsRef<str>) -> Self {
                Self(s.as_ref().into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.hash(state);
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }
    };
}

// OSM-derived ids look like "node/123" or "relation/456".
impl_identifier!(StationIdentifier);
impl_identifier!(LineIdentifier);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn clones_share_storage() {
        let a = StationIdentifier::new("node/42");
        let b = a.clone();

        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&a.0, &b.0));
    }

    #[test]
    fn line_ids_dedupe_in_sets() {
        let set: HashSet<LineIdentifier> = ["relation/1", "relation/2", "relation/1"]
            .into_iter()
            .map(LineIdentifier::from)
            .collect();

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn ordering_is_lexicographic() {
        let mut ids = vec![
            StationIdentifier::new("node/9"),
            StationIdentifier::new("node/10"),
        ];
        ids.sort();
        assert_eq!(ids[0].as_str(), "node/10");
        assert_eq!(format!("{}", ids[1]), "node/9");
    }
}
