//! Calendar repository: locations, events and trainings.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::PgPool;

use teamspirit_core::{
    Address, EventId, LocationId, PersonalId, TrainingDay, TrainingId,
};

use super::{CalendarRepository, RepositoryError, map_unique_violation};
use crate::models::{Event, Location, NewEvent, NewTraining, Training};

const LOCATION_COLUMNS: &str = r"
    loc.id AS location_id, loc.name AS location_name,
    a.label_first, a.label_second, a.postal_code, a.city, a.country
";

#[derive(sqlx::FromRow)]
struct LocationRow {
    location_id: i32,
    location_name: String,
    label_first: String,
    label_second: String,
    postal_code: String,
    city: String,
    country: String,
}

impl From<LocationRow> for Location {
    fn from(row: LocationRow) -> Self {
        Self {
            id: LocationId::new(row.location_id),
            name: row.location_name,
            address: Address {
                label_first: row.label_first,
                label_second: row.label_second,
                postal_code: row.postal_code,
                city: row.city,
                country: row.country,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: i32,
    title: String,
    date: NaiveDate,
    time: NaiveTime,
    #[sqlx(flatten)]
    location: LocationRow,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            id: EventId::new(row.id),
            title: row.title,
            date: row.date,
            time: row.time,
            location: row.location.into(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct TrainingRow {
    id: i32,
    is_weekly: bool,
    date: Option<NaiveDate>,
    day: Option<i16>,
    time: NaiveTime,
    trainer_id: i32,
    trainer_name: String,
    content: String,
    note: String,
    #[sqlx(flatten)]
    location: LocationRow,
}

impl TryFrom<TrainingRow> for Training {
    type Error = RepositoryError;

    fn try_from(row: TrainingRow) -> Result<Self, Self::Error> {
        let day = row
            .day
            .map(|d| TrainingDay::new(i32::from(d)))
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid training day: {e}")))?;

        Ok(Self {
            id: TrainingId::new(row.id),
            is_weekly: row.is_weekly,
            date: row.date,
            day,
            time: row.time,
            trainer_id: PersonalId::new(row.trainer_id),
            trainer_name: row.trainer_name,
            location: row.location.into(),
            content: row.content,
            note: row.note,
        })
    }
}

/// `PostgreSQL` calendar repository.
pub struct PgCalendarRepository {
    pool: PgPool,
}

impl PgCalendarRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, RepositoryError> {
        let sql = format!(
            r"
            SELECT e.id, e.title, e.date, e.time, {LOCATION_COLUMNS}
            FROM teamspirit.event e
            JOIN teamspirit.location loc ON loc.id = e.location_id
            JOIN teamspirit.address a ON a.id = loc.address_id
            WHERE e.id = $1
            "
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Event::from))
    }

    async fn get_training(&self, id: TrainingId) -> Result<Option<Training>, RepositoryError> {
        let sql = format!("{} WHERE t.id = $1", training_select());
        sqlx::query_as::<_, TrainingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Training::try_from)
            .transpose()
    }
}

fn training_select() -> String {
    format!(
        r"
        SELECT t.id, t.is_weekly, t.date, t.day, t.time, t.trainer_id,
               u.first_name || ' ' || u.last_name AS trainer_name,
               t.content, t.note, {LOCATION_COLUMNS}
        FROM teamspirit.training t
        JOIN teamspirit.user u ON u.personal_id = t.trainer_id
        JOIN teamspirit.location loc ON loc.id = t.location_id
        JOIN teamspirit.address a ON a.id = loc.address_id
        "
    )
}

fn foreign_key_to_not_found(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
            RepositoryError::NotFound
        }
        other => map_unique_violation(other, "title already exists"),
    }
}

#[async_trait]
impl CalendarRepository for PgCalendarRepository {
    async fn list_events(&self) -> Result<Vec<Event>, RepositoryError> {
        let sql = format!(
            r"
            SELECT e.id, e.title, e.date, e.time, {LOCATION_COLUMNS}
            FROM teamspirit.event e
            JOIN teamspirit.location loc ON loc.id = e.location_id
            JOIN teamspirit.address a ON a.id = loc.address_id
            ORDER BY e.date, e.time, e.id
            "
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn list_trainings(&self) -> Result<Vec<Training>, RepositoryError> {
        let sql = format!(
            "{} ORDER BY t.date NULLS LAST, t.day, t.time, t.id",
            training_select()
        );
        sqlx::query_as::<_, TrainingRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Training::try_from)
            .collect()
    }

    async fn create_location(
        &self,
        name: &str,
        address: &Address,
    ) -> Result<Location, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let address_id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO teamspirit.address
                (label_first, label_second, postal_code, city, country)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(&address.label_first)
        .bind(&address.label_second)
        .bind(&address.postal_code)
        .bind(&address.city)
        .bind(&address.country)
        .fetch_one(&mut *tx)
        .await?;

        let id: i32 = sqlx::query_scalar(
            "INSERT INTO teamspirit.location (name, address_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(name)
        .bind(address_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "location name already exists"))?;

        tx.commit().await?;
        Ok(Location {
            id: LocationId::new(id),
            name: name.to_owned(),
            address: address.clone(),
        })
    }

    async fn create_event(&self, new_event: &NewEvent) -> Result<Event, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO teamspirit.event (title, date, time, location_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(&new_event.title)
        .bind(new_event.date)
        .bind(new_event.time)
        .bind(new_event.location_id)
        .fetch_one(&self.pool)
        .await
        .map_err(foreign_key_to_not_found)?;

        self.get_event(EventId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn create_training(
        &self,
        new_training: &NewTraining,
    ) -> Result<Training, RepositoryError> {
        let day = new_training.day.map(|d| i16::from(d.number()));
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO teamspirit.training
                (is_weekly, date, day, time, trainer_id, location_id, content, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            ",
        )
        .bind(new_training.is_weekly)
        .bind(new_training.date)
        .bind(day)
        .bind(new_training.time)
        .bind(new_training.trainer_id)
        .bind(new_training.location_id)
        .bind(&new_training.content)
        .bind(&new_training.note)
        .fetch_one(&self.pool)
        .await
        .map_err(foreign_key_to_not_found)?;

        self.get_training(TrainingId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_location(&self, id: LocationId) -> Result<Option<Location>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {LOCATION_COLUMNS}
            FROM teamspirit.location loc
            JOIN teamspirit.address a ON a.id = loc.address_id
            WHERE loc.id = $1
            "
        );
        let row = sqlx::query_as::<_, LocationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Location::from))
    }
}
