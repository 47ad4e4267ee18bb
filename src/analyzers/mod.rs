pub mod compliance;
pub mod describe;

pub use compliance::ComplianceEvaluator;
pub use describe::{describe_raw, describe_readings, ValueSummary};
