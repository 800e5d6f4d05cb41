pub mod bilateral_smoother;
pub mod edge_estimator;
pub mod frame;
pub mod grid;
pub mod parameters;
pub mod pixel;
pub mod sharpener;
pub mod skin_classifier;
pub mod tone_adjuster;
pub mod utils;
