pub mod camera;
pub mod controller;
pub mod frame;
pub mod loop_worker;

pub use camera::{FrameSource, SnapshotFileSource};
pub use controller::PollingController;
pub use frame::Frame;
