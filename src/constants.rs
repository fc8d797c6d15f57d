//! Physical constants shared by the eclipse geometry and the drivers.
//!
//! Positions handed to [`crate::eclipse`] are expected in AU; these radii are
//! expressed in the same unit so apparent angular radii come out of a single
//! `atan`.

/// Solar photospheric radius, in AU.
pub const SUN_RADIUS_AU: f64 = 0.004_650_47;

/// Earth equatorial radius, in AU.
pub const EARTH_RADIUS_AU: f64 = 4.263_54e-5;

/// One astronomical unit, in kilometers. Used by callers converting
/// propagator output (km) into the AU frame the eclipse calculator expects.
pub const AU_KM: f64 = 1.495_978_707e8;
