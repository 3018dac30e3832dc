//! Boat-velocity processing core for the Rust river-discharge platform.
//!
//! The modules mirror the legacy moving-boat ADCP pipeline while providing
//! safe abstractions, named validity layers, and well-defined processing
//! stages: layered filtering, gap interpolation, coordinate transformation,
//! and composite-track fusion with per-sample provenance.

pub mod acquisition;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod series;
pub mod telemetry;

pub use prelude::{CoordFrame, ProcessError, ProcessResult, Provenance, VelocitySource};
