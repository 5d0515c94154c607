//! Transit data models and traits.

pub mod traits;

pub use traits::{TransitProvider, TransitStation};
