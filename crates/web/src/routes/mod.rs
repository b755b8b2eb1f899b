//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//! GET  /contact/  /legal/      - Static pages
//! GET  /health  /health/ready  - Liveness / readiness
//! GET  /media/produits/...     - Product images
//!
//! # Users
//! GET|POST /users/login/       - Login (POST rate limited)
//! POST /users/logout/          - Logout
//! GET  /users/~redirect/       - Post-login landing
//! GET|POST /users/~update/     - Email and names
//! GET  /users/{email}/         - Member page
//!
//! # Catalog, calendar, cart (requires auth)
//! GET  /catalog/  /events/  /trainings/
//! GET  /shopping_cart/
//! GET|POST /shopping_cart/add_product/{productId}/
//! GET|POST /shopping_cart/drop_product/{lineId}/
//!
//! # Profile (requires auth, except password reset)
//! GET  /profile/
//! GET|POST /profile/change_password/       GET /profile/change_password/done/
//! GET|POST /profile/reset_password/        GET /profile/reset_password/done/
//! GET|POST /profile/reset_password_confirm/{uid}/{token}/
//! GET  /profile/reset_password_complete/
//! GET|POST /profile/update_personal_info/  GET|POST /profile/update_phone_address/
//! GET|POST /profile/add_medical_file/      GET|POST /profile/add_id_file/
//! GET|POST /profile/drop_medical_file/     GET|POST /profile/drop_id_file/
//! GET  /profile/drop_file/
//! ```

pub mod calendar;
pub mod catalog;
pub mod pages;
pub mod preorders;
pub mod profile;
pub mod users;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::middleware::{auth_rate_limiter, request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Largest accepted document upload.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users/login/",
            get(users::login_page).merge(post(users::login).layer(auth_rate_limiter())),
        )
        .route("/users/logout/", post(users::logout))
        .route("/users/~redirect/", get(users::redirect))
        .route("/users/~update/", get(users::update_page).post(users::update))
        .route("/users/{email}/", get(users::detail))
}

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/shopping_cart/", get(preorders::cart))
        .route(
            "/shopping_cart/add_product/{product_id}/",
            get(preorders::add_product_page).post(preorders::add_product),
        )
        .route(
            "/shopping_cart/drop_product/{line_id}/",
            get(preorders::drop_product_page).post(preorders::drop_product),
        )
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile/", get(profile::index))
        .route(
            "/profile/change_password/",
            get(profile::change_password_page).post(profile::change_password),
        )
        .route("/profile/change_password/done/", get(profile::change_password_done))
        .route(
            "/profile/reset_password/",
            get(profile::reset_password_page)
                .merge(post(profile::reset_password).layer(auth_rate_limiter())),
        )
        .route("/profile/reset_password/done/", get(profile::reset_password_done))
        .route(
            "/profile/reset_password_confirm/{uid}/{token}/",
            get(profile::reset_password_confirm_page).post(profile::reset_password_confirm),
        )
        .route(
            "/profile/reset_password_complete/",
            get(profile::reset_password_complete),
        )
        .route(
            "/profile/update_personal_info/",
            get(profile::update_personal_info_page).post(profile::update_personal_info),
        )
        .route(
            "/profile/update_phone_address/",
            get(profile::update_phone_address_page).post(profile::update_phone_address),
        )
        .route(
            "/profile/add_medical_file/",
            get(profile::add_medical_file_page)
                .post(profile::add_medical_file)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/profile/add_id_file/",
            get(profile::add_id_file_page)
                .post(profile::add_id_file)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/profile/drop_medical_file/",
            get(profile::drop_medical_file_page).post(profile::drop_medical_file),
        )
        .route(
            "/profile/drop_id_file/",
            get(profile::drop_id_file_page).post(profile::drop_id_file),
        )
        .route("/profile/drop_file/", get(profile::drop_file_page))
}

/// All page routes, without middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::home))
        .route("/contact/", get(pages::contact))
        .route("/legal/", get(pages::legal))
        .route("/catalog/", get(catalog::product_list))
        .route("/events/", get(calendar::event_list))
        .route("/trainings/", get(calendar::training_list))
        .merge(user_routes())
        .merge(cart_routes())
        .merge(profile_routes())
}

/// The complete application: routes, product images, health checks and the
/// middleware stack.
///
/// The session store is a parameter so tests can run on an in-memory store.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    let images = ServeDir::new(state.config().media_root.join("produits"));

    Router::new()
        .route("/health", get(pages::health))
        .route("/health/ready", get(pages::readiness))
        .merge(routes())
        .nest_service("/media/produits", images)
        .layer(from_fn(security_headers_middleware))
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
                user_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
