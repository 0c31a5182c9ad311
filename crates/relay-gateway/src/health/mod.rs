//! Connection liveness monitoring

mod monitor;

pub use monitor::HealthMonitor;
