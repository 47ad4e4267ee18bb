pub mod measurements;

pub use measurements::MeasurementReader;
