//! Demo data for a fresh database.
//!
//! Creates one catalog with a few products, a venue, an upcoming event and,
//! when a trainer is given, a weekly training. Running it twice creates the
//! data twice.

use chrono::{NaiveTime, TimeDelta, Utc};
use teamspirit_core::{Address, Email, Price, TrainingDay};
use teamspirit_web::db::Repositories;
use teamspirit_web::models::{NewEvent, NewProduct, NewTraining};

use super::{CliError, connect};

/// Product name, image file, price in euros (`None` for free items).
const PRODUCTS: [(&str, Option<&str>, Option<i32>); 3] = [
    ("Maillot club", Some("maillot.png"), Some(35)),
    ("Coupe-vent", Some("coupe-vent.png"), Some(50)),
    ("Bonnet", None, None),
];

fn time(hour: u32, minute: u32) -> Result<NaiveTime, CliError> {
    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| CliError::InvalidValue(format!("{hour}:{minute}")))
}

/// Load the demo data.
pub async fn demo(trainer: Option<&str>) -> Result<(), CliError> {
    let pool = connect().await?;
    let repos = Repositories::postgres(&pool);

    let catalog = repos.catalogs.create_catalog("Tenues du club").await?;
    for (name, image, price) in PRODUCTS {
        let price = price
            .map(Price::new)
            .transpose()
            .map_err(|e| CliError::InvalidValue(e.to_string()))?;
        let product = repos
            .catalogs
            .create_product(&NewProduct {
                catalog_id: catalog.id,
                name: name.to_owned(),
                image: image.map(str::to_owned),
                is_available: true,
                is_free: price.is_none(),
                price,
            })
            .await?;
        tracing::info!("Product created: {} ({})", product.name, product.price_label());
    }

    let stadium = repos
        .calendar
        .create_location(
            "Stade municipal",
            &Address {
                label_first: "1 allée du Stade".to_owned(),
                label_second: String::new(),
                postal_code: "69007".to_owned(),
                city: "Lyon".to_owned(),
                country: "France".to_owned(),
            },
        )
        .await?;
    tracing::info!("Location created: {}", stadium.name);

    let event = repos
        .calendar
        .create_event(&NewEvent {
            title: "Foulées d'automne".to_owned(),
            date: Utc::now().date_naive() + TimeDelta::days(21),
            time: time(9, 30)?,
            location_id: stadium.id,
        })
        .await?;
    tracing::info!("Event created: {} on {}", event.title, event.date);

    let Some(trainer) = trainer else {
        tracing::info!("No trainer given, skipping the weekly training");
        return Ok(());
    };

    let email = Email::parse(trainer).map_err(|_| CliError::UnknownMember(trainer.to_owned()))?;
    let coach = repos
        .users
        .get_by_email(&email)
        .await?
        .ok_or_else(|| CliError::UnknownMember(trainer.to_owned()))?;

    let training = repos
        .calendar
        .create_training(&NewTraining {
            is_weekly: true,
            date: None,
            day: Some(TrainingDay::new(2).map_err(|e| CliError::InvalidValue(e.to_string()))?),
            time: time(19, 0)?,
            trainer_id: coach.personal_id,
            location_id: stadium.id,
            content: "Fractionné sur piste".to_owned(),
            note: "Prévoir des pointes".to_owned(),
        })
        .await?;
    tracing::info!(
        "Weekly training created: {} with {}",
        training.day_label(),
        training.trainer_name
    );

    Ok(())
}
