//! Own profile: personal info, contact details, documents and passwords.
//!
//! Password reset pages are public; everything else needs a logged-in
//! member.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use teamspirit_core::{
    AddressInput, ContactInput, DocumentKind, PersonalInfoInput, UserId, ValidationErrors,
};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, session_keys};
use crate::services::auth::{AuthError, AuthService, MIN_PASSWORD_LENGTH};
use crate::services::profile::{ProfileError, ProfileOverview, ProfileService, Upload};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ChangePasswordForm {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password1: String,
    #[serde(default)]
    pub new_password2: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequestForm {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordForm {
    #[serde(default)]
    pub new_password1: String,
    #[serde(default)]
    pub new_password2: String,
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "profiles/profile.html")]
pub struct ProfileTemplate {
    pub overview: ProfileOverview,
}

#[derive(Template, WebTemplate)]
#[template(path = "profiles/change_password.html")]
pub struct ChangePasswordTemplate {
    pub errors: ValidationErrors,
    pub min_length: usize,
}

#[derive(Template, WebTemplate)]
#[template(path = "profiles/change_password_done.html")]
pub struct ChangePasswordDoneTemplate;

#[derive(Template, WebTemplate)]
#[template(path = "profiles/reset_password.html")]
pub struct ResetPasswordTemplate;

#[derive(Template, WebTemplate)]
#[template(path = "profiles/reset_password_done.html")]
pub struct ResetPasswordDoneTemplate;

#[derive(Template, WebTemplate)]
#[template(path = "profiles/reset_password_confirm.html")]
pub struct ResetPasswordConfirmTemplate {
    /// `false` renders the "link expired" message instead of the form.
    pub valid_link: bool,
    pub errors: ValidationErrors,
    pub min_length: usize,
}

#[derive(Template, WebTemplate)]
#[template(path = "profiles/reset_password_complete.html")]
pub struct ResetPasswordCompleteTemplate;

#[derive(Template, WebTemplate)]
#[template(path = "profiles/update_personal_info.html")]
pub struct PersonalInfoTemplate {
    pub form: PersonalInfoInput,
    pub errors: ValidationErrors,
}

#[derive(Template, WebTemplate)]
#[template(path = "profiles/update_phone_address.html")]
pub struct ContactTemplate {
    pub form: ContactInput,
    pub errors: ValidationErrors,
}

#[derive(Template, WebTemplate)]
#[template(path = "profiles/add_file.html")]
pub struct AddFileTemplate {
    pub kind: DocumentKind,
    pub action: &'static str,
    pub errors: ValidationErrors,
}

#[derive(Template, WebTemplate)]
#[template(path = "profiles/drop_file_confirm.html")]
pub struct DropFileConfirmTemplate {
    pub kind: DocumentKind,
    pub action: &'static str,
    pub file: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "profiles/drop_file.html")]
pub struct DropFileTemplate {
    pub overview: ProfileOverview,
}

const fn add_path(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Medical => "/profile/add_medical_file/",
        DocumentKind::Identity => "/profile/add_id_file/",
    }
}

const fn drop_path(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Medical => "/profile/drop_medical_file/",
        DocumentKind::Identity => "/profile/drop_id_file/",
    }
}

fn session_error(e: &tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {e}"))
}

// =============================================================================
// Profile
// =============================================================================

pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let overview = ProfileService::new(state.repos(), state.documents())
        .overview(user.id)
        .await?;
    Ok(ProfileTemplate { overview })
}

pub async fn update_personal_info_page(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    PersonalInfoTemplate {
        form: PersonalInfoInput {
            last_name: user.last_name,
            first_name: user.first_name,
        },
        errors: ValidationErrors::new(),
    }
}

#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn update_personal_info(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<PersonalInfoInput>,
) -> Result<Response> {
    let service = ProfileService::new(state.repos(), state.documents());
    match service.update_personal_info(user.id, &form).await {
        Ok(updated) => {
            session
                .insert(session_keys::CURRENT_USER, CurrentUser::from(&updated))
                .await
                .map_err(|e| session_error(&e))?;
            Ok(Redirect::to("/profile/").into_response())
        }
        Err(ProfileError::Validation(errors)) => {
            Ok((StatusCode::BAD_REQUEST, PersonalInfoTemplate { form, errors }).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn update_phone_address_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let personal = ProfileService::new(state.repos(), state.documents())
        .overview(user.id)
        .await?
        .personal;
    let address = personal.address;
    Ok(ContactTemplate {
        form: ContactInput {
            phone_number: personal.phone_number,
            address: AddressInput {
                label_first: address.label_first,
                label_second: address.label_second,
                postal_code: address.postal_code,
                city: address.city,
                country: address.country,
            },
            has_private_profile: personal.has_private_profile.then(|| "on".to_string()),
        },
        errors: ValidationErrors::new(),
    })
}

/// Phone, address and privacy flag are saved together or not at all.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn update_phone_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ContactInput>,
) -> Result<Response> {
    let service = ProfileService::new(state.repos(), state.documents());
    match service.update_contact(user.id, &form).await {
        Ok(()) => Ok(Redirect::to("/profile/").into_response()),
        Err(ProfileError::Validation(errors)) => {
            Ok((StatusCode::BAD_REQUEST, ContactTemplate { form, errors }).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Documents
// =============================================================================

pub async fn add_medical_file_page(RequireAuth(_user): RequireAuth) -> impl IntoResponse {
    add_file_page(DocumentKind::Medical)
}

pub async fn add_id_file_page(RequireAuth(_user): RequireAuth) -> impl IntoResponse {
    add_file_page(DocumentKind::Identity)
}

fn add_file_page(kind: DocumentKind) -> AddFileTemplate {
    AddFileTemplate {
        kind,
        action: add_path(kind),
        errors: ValidationErrors::new(),
    }
}

pub async fn add_medical_file(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Response> {
    add_file(&state, &user, DocumentKind::Medical, multipart).await
}

pub async fn add_id_file(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Response> {
    add_file(&state, &user, DocumentKind::Identity, multipart).await
}

async fn add_file(
    state: &AppState,
    user: &CurrentUser,
    kind: DocumentKind,
    multipart: Multipart,
) -> Result<Response> {
    let upload = read_upload(multipart).await?;
    let service = ProfileService::new(state.repos(), state.documents());
    match service.upload_document(user.id, kind, &upload).await {
        Ok(_) => Ok(Redirect::to("/profile/").into_response()),
        Err(ProfileError::Validation(errors)) => Ok((
            StatusCode::BAD_REQUEST,
            AddFileTemplate {
                kind,
                action: add_path(kind),
                errors,
            },
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}

/// Read the `file` part of an upload form. A missing part gives an empty
/// upload, which the service rejects as a form error.
async fn read_upload(mut multipart: Multipart) -> Result<Upload> {
    let mut upload = Upload {
        file_name: String::new(),
        content_type: None,
        bytes: Vec::new(),
    };
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        upload.file_name = field.file_name().unwrap_or_default().to_string();
        upload.content_type = field.content_type().map(str::to_string);
        upload.bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
            .to_vec();
    }
    Ok(upload)
}

/// Choose which document to remove.
pub async fn drop_file_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let overview = ProfileService::new(state.repos(), state.documents())
        .overview(user.id)
        .await?;
    Ok(DropFileTemplate { overview })
}

pub async fn drop_medical_file_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    drop_file_confirm(&state, user.id, DocumentKind::Medical).await
}

pub async fn drop_id_file_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    drop_file_confirm(&state, user.id, DocumentKind::Identity).await
}

async fn drop_file_confirm(
    state: &AppState,
    user_id: UserId,
    kind: DocumentKind,
) -> Result<DropFileConfirmTemplate> {
    let overview = ProfileService::new(state.repos(), state.documents())
        .overview(user_id)
        .await?;
    Ok(DropFileConfirmTemplate {
        kind,
        action: drop_path(kind),
        file: overview.personal.document(kind).map(str::to_string),
    })
}

pub async fn drop_medical_file(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Redirect> {
    ProfileService::new(state.repos(), state.documents())
        .drop_document(user.id, DocumentKind::Medical)
        .await?;
    Ok(Redirect::to("/profile/"))
}

pub async fn drop_id_file(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Redirect> {
    ProfileService::new(state.repos(), state.documents())
        .drop_document(user.id, DocumentKind::Identity)
        .await?;
    Ok(Redirect::to("/profile/"))
}

// =============================================================================
// Passwords
// =============================================================================

/// Map password form failures onto form fields.
fn password_errors(err: AuthError) -> std::result::Result<ValidationErrors, AppError> {
    match err {
        AuthError::PasswordMismatch => Ok(ValidationErrors::single(
            "new_password2",
            "Les deux mots de passe ne correspondent pas.",
        )),
        AuthError::WeakPassword(_) => Ok(ValidationErrors::single(
            "new_password1",
            format!("Le mot de passe doit contenir au moins {MIN_PASSWORD_LENGTH} caractères."),
        )),
        AuthError::InvalidCredentials => Ok(ValidationErrors::single(
            "old_password",
            "L'ancien mot de passe est incorrect.",
        )),
        other => Err(other.into()),
    }
}

pub async fn change_password_page(RequireAuth(_user): RequireAuth) -> impl IntoResponse {
    ChangePasswordTemplate {
        errors: ValidationErrors::new(),
        min_length: MIN_PASSWORD_LENGTH,
    }
}

#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ChangePasswordForm>,
) -> Result<Response> {
    let result = AuthService::new(state.repos())
        .change_password(
            &user.email,
            &form.old_password,
            &form.new_password1,
            &form.new_password2,
        )
        .await;
    match result {
        Ok(()) => Ok(Redirect::to("/profile/change_password/done/").into_response()),
        Err(e) => {
            let errors = password_errors(e)?;
            Ok((
                StatusCode::BAD_REQUEST,
                ChangePasswordTemplate {
                    errors,
                    min_length: MIN_PASSWORD_LENGTH,
                },
            )
                .into_response())
        }
    }
}

pub async fn change_password_done(RequireAuth(_user): RequireAuth) -> impl IntoResponse {
    ChangePasswordDoneTemplate
}

pub async fn reset_password_page() -> impl IntoResponse {
    ResetPasswordTemplate
}

/// Email a reset link if the address belongs to an active member.
///
/// The answer is the same whether or not a link was sent.
#[instrument(skip(state, form))]
pub async fn reset_password(
    State(state): State<AppState>,
    Form(form): Form<ResetRequestForm>,
) -> Result<Redirect> {
    let issued = AuthService::new(state.repos())
        .request_password_reset(&form.email)
        .await?;

    if let Some(issued) = issued {
        let link = state.config().absolute_url(&issued.confirm_path());
        if let Err(e) = state
            .mailer()
            .send_password_reset(&issued.user.email, &issued.user.display_name(), &link)
            .await
        {
            let event_id = sentry::capture_error(&e);
            tracing::error!(error = %e, sentry_event_id = %event_id, "password reset email failed");
        }
    }

    Ok(Redirect::to("/profile/reset_password/done/"))
}

pub async fn reset_password_done() -> impl IntoResponse {
    ResetPasswordDoneTemplate
}

pub async fn reset_password_confirm_page(
    State(state): State<AppState>,
    Path((uid, token)): Path<(i32, String)>,
) -> Result<impl IntoResponse> {
    let valid_link = AuthService::new(state.repos())
        .reset_token_is_valid(UserId::new(uid), &token)
        .await?;
    Ok(ResetPasswordConfirmTemplate {
        valid_link,
        errors: ValidationErrors::new(),
        min_length: MIN_PASSWORD_LENGTH,
    })
}

#[instrument(skip(state, token, form))]
pub async fn reset_password_confirm(
    State(state): State<AppState>,
    Path((uid, token)): Path<(i32, String)>,
    Form(form): Form<SetPasswordForm>,
) -> Result<Response> {
    let result = AuthService::new(state.repos())
        .confirm_password_reset(
            UserId::new(uid),
            &token,
            &form.new_password1,
            &form.new_password2,
        )
        .await;

    let template = match result {
        Ok(()) => return Ok(Redirect::to("/profile/reset_password_complete/").into_response()),
        Err(AuthError::InvalidResetToken) => ResetPasswordConfirmTemplate {
            valid_link: false,
            errors: ValidationErrors::new(),
            min_length: MIN_PASSWORD_LENGTH,
        },
        Err(e) => ResetPasswordConfirmTemplate {
            valid_link: true,
            errors: password_errors(e)?,
            min_length: MIN_PASSWORD_LENGTH,
        },
    };
    Ok((StatusCode::BAD_REQUEST, template).into_response())
}

pub async fn reset_password_complete() -> impl IntoResponse {
    ResetPasswordCompleteTemplate
}
