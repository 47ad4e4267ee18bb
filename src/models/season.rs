use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Fixed meteorological-style seasons with month/day boundaries. The
/// boundaries do not track solar events; two dates with the same month and
/// day always fall in the same season regardless of year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    /// Spring is [Mar 20, Jun 20], summer [Jun 21, Sep 21], fall
    /// [Sep 22, Dec 20]; winter wraps the year end.
    pub fn from_month_day(month: u32, day: u32) -> Season {
        let md = (month, day);
        if ((3, 20)..=(6, 20)).contains(&md) {
            Season::Spring
        } else if ((6, 21)..=(9, 21)).contains(&md) {
            Season::Summer
        } else if ((9, 22)..=(12, 20)).contains(&md) {
            Season::Fall
        } else {
            Season::Winter
        }
    }

    pub fn from_date(date: NaiveDate) -> Season {
        Season::from_month_day(date.month(), date.day())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
