pub mod compliance;
pub mod pollutant;
pub mod quality;
pub mod reading;
pub mod season;

pub use compliance::{ComplianceRecord, StationExceedance, Verdict, NOT_APPLICABLE, NOT_REGULATED};
pub use pollutant::Pollutant;
pub use quality::{CityQuality, QualityFlag, SensorQuality};
pub use reading::{weekday_name, CleanReading, EnrichedReading, RawReading, Reading};
pub use season::Season;
