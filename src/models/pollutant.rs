use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProcessingError;

/// The four pollutants the pipeline is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Pollutant {
    Pm25,
    Pm10,
    No2,
    O3,
}

impl Pollutant {
    pub fn code(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "pm25",
            Pollutant::Pm10 => "pm10",
            Pollutant::No2 => "no2",
            Pollutant::O3 => "o3",
        }
    }

    /// O3 is regulated through the daily maximum 8-hour mean rather than
    /// an annual mean.
    pub fn uses_mda8(&self) -> bool {
        matches!(self, Pollutant::O3)
    }
}

impl FromStr for Pollutant {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // OpenAQ labels carry the unit suffix ("pm25 µg/m³"); accept both
        // the bare code and the labelled form.
        let code = s.split_whitespace().next().unwrap_or(s);
        match code.to_ascii_lowercase().as_str() {
            "pm25" | "pm2.5" => Ok(Pollutant::Pm25),
            "pm10" => Ok(Pollutant::Pm10),
            "no2" => Ok(Pollutant::No2),
            "o3" => Ok(Pollutant::O3),
            _ => Err(ProcessingError::UnknownPollutant(s.to_string())),
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl TryFrom<String> for Pollutant {
    type Error = ProcessingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pollutant> for String {
    fn from(value: Pollutant) -> Self {
        value.code().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_and_labelled_codes() {
        assert_eq!("pm25".parse::<Pollutant>().unwrap(), Pollutant::Pm25);
        assert_eq!("pm25 µg/m³".parse::<Pollutant>().unwrap(), Pollutant::Pm25);
        assert_eq!("o3 µg/m³".parse::<Pollutant>().unwrap(), Pollutant::O3);
        assert!("so2".parse::<Pollutant>().is_err());
    }

    #[test]
    fn test_only_ozone_uses_mda8() {
        assert!(Pollutant::O3.uses_mda8());
        assert!(!Pollutant::Pm10.uses_mda8());
        assert!(!Pollutant::Pm25.uses_mda8());
        assert!(!Pollutant::No2.uses_mda8());
    }
}
