pub mod calibration;
pub mod capture;
pub mod error;
pub mod interleave;
pub mod render;
pub mod screenshot;
pub mod tiling;
pub mod viewer;
pub mod watch;
