/// Arrow IPC export of scored results
pub mod builder;

pub use builder::build_anomaly_result;
