pub mod consts;
pub mod error;
pub mod frame;
pub mod transform;
pub mod params;
pub mod features;
pub mod motion;
pub mod history;
pub mod warp;
pub mod edge;
pub mod metrics;
pub mod engine;
pub mod stabilize;
pub mod adaptive;
pub mod wrapper;
