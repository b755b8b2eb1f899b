//! Events and trainings.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{Event, Training};
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "events/event_list.html")]
pub struct EventListTemplate {
    pub events: Vec<Event>,
}

#[derive(Template, WebTemplate)]
#[template(path = "trainings/training_list.html")]
pub struct TrainingListTemplate {
    pub trainings: Vec<Training>,
}

pub async fn event_list(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
) -> Result<impl IntoResponse> {
    let events = state.repos().calendar.list_events().await?;
    Ok(EventListTemplate { events })
}

/// Trainings by date; weekly trainings without a date come last.
pub async fn training_list(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
) -> Result<impl IntoResponse> {
    let trainings = state.repos().calendar.list_trainings().await?;
    Ok(TrainingListTemplate { trainings })
}
