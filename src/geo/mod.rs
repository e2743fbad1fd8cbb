//! Station geography.
//!
//! Maidenhead grid geometry for computing spot distances and call sign
//! prefix resolution for attributing spots to countries.

pub mod country;
pub mod grid;

pub use country::CountryLookup;
pub use grid::grid_distance_km;
