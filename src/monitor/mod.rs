pub mod controller;
pub mod events;
pub mod state;

pub use controller::{MonitorController, MonitorDeps, StartOutcome};
pub use events::MonitorEvent;
pub use state::{ActivityLog, LogEntry, MonitorSnapshot, PollingSession};
