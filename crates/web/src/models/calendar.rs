//! Calendar domain types: venues, events and trainings.

use chrono::{NaiveDate, NaiveTime};

use teamspirit_core::{Address, EventId, LocationId, PersonalId, TrainingDay, TrainingId};

/// A named venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub address: Address,
}

/// A one-off association event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub location: Location,
}

/// A training session, either dated or recurring weekly on `day`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Training {
    pub id: TrainingId,
    pub is_weekly: bool,
    pub date: Option<NaiveDate>,
    pub day: Option<TrainingDay>,
    pub time: NaiveTime,
    pub trainer_id: PersonalId,
    pub trainer_name: String,
    pub location: Location,
    pub content: String,
    pub note: String,
}

impl Training {
    /// Day label: the configured day, or the weekday of the date.
    #[must_use]
    pub fn day_label(&self) -> &'static str {
        self.day
            .or_else(|| self.date.map(TrainingDay::of_date))
            .map_or("", TrainingDay::label)
    }
}

/// Data for creating an event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub location_id: LocationId,
}

/// Data for creating a training.
#[derive(Debug, Clone)]
pub struct NewTraining {
    pub is_weekly: bool,
    pub date: Option<NaiveDate>,
    pub day: Option<TrainingDay>,
    pub time: NaiveTime,
    pub trainer_id: PersonalId,
    pub location_id: LocationId,
    pub content: String,
    pub note: String,
}
