pub mod averages;
pub mod cleaning;
pub mod mda8;
pub mod pipeline;
pub mod quality_checker;
pub mod time_aggregator;

pub use averages::{AggregateCalculator, Aggregates, DailyStats};
pub use cleaning::{Cleaner, CleaningReport};
pub use mda8::Mda8Engine;
pub use pipeline::{DailyRecord, Pipeline, PipelineOutput};
pub use quality_checker::{QualityChecker, QualityOutcome};
pub use time_aggregator::TimeAggregator;
