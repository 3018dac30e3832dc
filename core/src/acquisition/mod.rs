pub mod context;
pub mod instrument;
pub mod payload;
pub mod sensors;

pub use context::TransectContext;
pub use instrument::{InstrumentInfo, InstrumentModel};
pub use payload::{BeamPolicy, GpsAncillary, RawNavInput};
pub use sensors::{AttitudeData, EnsembleClock};
