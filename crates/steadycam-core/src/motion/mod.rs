pub mod classifier;
pub mod estimate;
pub mod smoothing;
