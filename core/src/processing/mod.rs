pub mod filter;
pub mod fusion;
pub mod interpolate;
pub mod transform;

pub use filter::FilterEngine;
pub use fusion::{CompositeResult, SourceFusion};
pub use interpolate::InterpolationEngine;
pub use transform::CoordinateTransformer;
