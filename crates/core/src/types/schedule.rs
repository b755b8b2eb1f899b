//! Training schedule values.

use core::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Error returned for a day number outside `1..=7`.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("training day must be between 1 (Monday) and 7 (Sunday), got {0}")]
pub struct TrainingDayError(pub i32);

/// Day of the week a training takes place, numbered 1 (Monday) to 7 (Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct TrainingDay(u8);

impl TrainingDay {
    /// Create a training day from its number.
    ///
    /// # Errors
    ///
    /// Returns `TrainingDayError` outside `1..=7`.
    pub fn new(day: i32) -> Result<Self, TrainingDayError> {
        u8::try_from(day)
            .ok()
            .filter(|d| (1..=7).contains(d))
            .map(Self)
            .ok_or(TrainingDayError(day))
    }

    /// The day a dated training falls on.
    #[must_use]
    pub fn of_date(date: NaiveDate) -> Self {
        Self::from(date.weekday())
    }

    #[must_use]
    pub const fn number(self) -> u8 {
        self.0
    }

    /// French day name, as shown on the trainings page.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self.0 {
            1 => "Lundi",
            2 => "Mardi",
            3 => "Mercredi",
            4 => "Jeudi",
            5 => "Vendredi",
            6 => "Samedi",
            _ => "Dimanche",
        }
    }
}

impl From<Weekday> for TrainingDay {
    fn from(weekday: Weekday) -> Self {
        // number_from_monday is always 1..=7
        #[allow(clippy::cast_possible_truncation)]
        Self(weekday.number_from_monday() as u8)
    }
}

impl TryFrom<i32> for TrainingDay {
    type Error = TrainingDayError;

    fn try_from(day: i32) -> Result<Self, Self::Error> {
        Self::new(day)
    }
}

impl From<TrainingDay> for i32 {
    fn from(day: TrainingDay) -> Self {
        Self::from(day.0)
    }
}

impl fmt::Display for TrainingDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert!(TrainingDay::new(0).is_err());
        assert!(TrainingDay::new(8).is_err());
        assert_eq!(TrainingDay::new(1).unwrap().label(), "Lundi");
        assert_eq!(TrainingDay::new(7).unwrap().label(), "Dimanche");
    }

    #[test]
    fn test_of_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(TrainingDay::of_date(date).label(), "Vendredi");
    }
}
