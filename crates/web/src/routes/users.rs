//! Login, logout, account update and member pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use teamspirit_core::ValidationErrors;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::auth::safe_next;
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, session_keys};
use crate::services::auth::{AuthError, AuthService};
use crate::services::profile::{AccountInput, MemberDetail, ProfileError, ProfileService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "users/login.html")]
pub struct LoginTemplate {
    pub email: String,
    pub next: String,
    pub error: Option<&'static str>,
}

#[derive(Template, WebTemplate)]
#[template(path = "users/update.html")]
pub struct UpdateTemplate {
    pub form: AccountInput,
    pub errors: ValidationErrors,
}

#[derive(Template, WebTemplate)]
#[template(path = "users/detail.html")]
pub struct DetailTemplate {
    pub member: MemberDetail,
    pub is_self: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the login page.
pub async fn login_page(Query(query): Query<NextQuery>) -> impl IntoResponse {
    LoginTemplate {
        email: String::new(),
        next: safe_next(query.next.as_deref()).to_string(),
        error: None,
    }
}

/// Handle the login form.
///
/// Unknown emails, wrong passwords and inactive accounts get the same answer.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = safe_next(form.next.as_deref()).to_string();

    match AuthService::new(state.repos())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            let current = CurrentUser::from(&user);
            set_current_user(&session, &current)
                .await
                .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
            set_sentry_user(&user.id, Some(user.email.as_str()));
            tracing::info!(user_id = %user.id, "member logged in");
            Ok(Redirect::to(&next).into_response())
        }
        Err(AuthError::InvalidCredentials | AuthError::InactiveUser) => {
            tracing::info!("login failed");
            Ok((
                StatusCode::UNAUTHORIZED,
                LoginTemplate {
                    email: form.email,
                    next,
                    error: Some("Adresse email ou mot de passe incorrect."),
                },
            )
                .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Log out and go back to the home page.
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    clear_sentry_user();
    Ok(Redirect::to("/"))
}

/// Post-login landing: the home page.
pub async fn redirect(RequireAuth(_user): RequireAuth) -> Redirect {
    Redirect::to("/")
}

/// Display the account form (email and names).
pub async fn update_page(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    UpdateTemplate {
        form: AccountInput {
            email: user.email.to_string(),
            first_name: user.first_name,
            last_name: user.last_name,
        },
        errors: ValidationErrors::new(),
    }
}

/// Save email and names.
///
/// The session copy of the member is refreshed so the new email is used for
/// later ownership checks.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AccountInput>,
) -> Result<Response> {
    let service = ProfileService::new(state.repos(), state.documents());
    match service.update_account(user.id, &form).await {
        Ok(updated) => {
            session
                .insert(session_keys::CURRENT_USER, CurrentUser::from(&updated))
                .await
                .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
            Ok(Redirect::to("/profile/").into_response())
        }
        Err(ProfileError::Validation(errors)) => {
            Ok((StatusCode::BAD_REQUEST, UpdateTemplate { form, errors }).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Another member's page.
pub async fn detail(
    State(state): State<AppState>,
    RequireAuth(viewer): RequireAuth,
    Path(email): Path<String>,
) -> Result<impl IntoResponse> {
    let service = ProfileService::new(state.repos(), state.documents());
    let member = service.member_detail(&viewer, &email).await?;
    let is_self = member.user.id == viewer.id;
    Ok(DetailTemplate { member, is_self })
}
