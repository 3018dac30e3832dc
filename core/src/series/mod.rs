pub mod bundle;
pub mod validity;
pub mod velocity;

pub use bundle::{BoatTrack, BoatVelocityBundle};
pub use validity::{ValidityLayer, ValidityLayers};
pub use velocity::VelocitySeries;
