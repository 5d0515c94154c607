//! # zone-transit
//!
//! Station and line data for hiding-zone play.
//!
//! ## Features
//!
//! - **Spatial queries**: R-tree backed nearest-station and radius lookups
//! - **Line membership**: stations know which lines stop at them
//! - **Pluggable providers**: anything implementing [`TransitProvider`]
//!
//! ## Example
//!
//! ```
//! use zone_transit::prelude::*;
//! use geo::Point;
//!
//! let station = StationImpl {
//!     id: StationIdentifier::new("node/1"),
//!     name: "Penn Station".into(),
//!     location: Point::new(-73.9935, 40.7505),
//!     line_ids: vec![LineIdentifier::new("relation/7")],
//! };
//!
//! let provider = StaticTransitProvider::from_data(vec![station], vec![]);
//!
//! let point = Point::new(-73.99, 40.75);
//! let nearby = provider.stations_near(point, 5000.0);
//! assert_eq!(nearby.len(), 1);
//! ```

pub mod identifiers;
pub mod models;
pub mod provider;
pub mod spatial;

pub mod prelude {
    pub use crate::identifiers::*;
    pub use crate::models::traits::*;
    pub use crate::provider::{LineImpl, StaticTransitProvider, StationImpl};
}

pub use prelude::*;
