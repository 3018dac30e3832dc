pub mod lowess;
pub mod rotation;
pub mod stats;

pub use lowess::lowess;
pub use rotation::hpr_matrix;
pub use stats::{nan_cumsum, nan_mean, nan_std, run_std_trim};
