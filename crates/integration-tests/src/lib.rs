//! Integration tests for TeamSpirit.
//!
//! The tests drive the full router (sessions, rate limiting, security
//! headers) over in-memory repositories, so no database or running server is
//! needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p teamspirit-integration-tests
//! ```

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use teamspirit_core::Price;
use teamspirit_web::config::WebConfig;
use teamspirit_web::db::Repositories;
use teamspirit_web::db::memory::InMemoryDatabase;
use teamspirit_web::middleware::create_session_layer;
use teamspirit_web::models::{NewProduct, Product, User};
use teamspirit_web::routes;
use teamspirit_web::services::auth::AuthService;
use teamspirit_web::services::documents::MemoryDocumentStore;
use teamspirit_web::services::email::RecordingMailer;
use teamspirit_web::state::AppState;

/// Password given to every member created by [`TestApp::create_member`].
pub const PASSWORD: &str = "course-a-pied-42";

/// Address the rate limiter keys on.
const CLIENT_IP: &str = "203.0.113.7";

/// The application wired to in-memory storage.
pub struct TestApp {
    pub state: AppState,
    pub db: InMemoryDatabase,
    pub mailer: Arc<RecordingMailer>,
    pub documents: Arc<MemoryDocumentStore>,
    router: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let config = WebConfig::for_tests();
        let db = InMemoryDatabase::new();
        let mailer = Arc::new(RecordingMailer::new());
        let documents = Arc::new(MemoryDocumentStore::new());
        let session_layer = create_session_layer(MemoryStore::default(), &config);

        let state = AppState::new(
            config,
            None,
            Repositories::in_memory(&db),
            documents.clone(),
            mailer.clone(),
        );
        let router = routes::app(state.clone(), session_layer);

        Self {
            state,
            db,
            mailer,
            documents,
            router,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response<Body> {
        let mut request = Request::get(path).header("x-forwarded-for", CLIENT_IP);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::empty()).expect("valid request"))
            .await
    }

    pub async fn post_form(&self, path: &str, form: &str, cookie: Option<&str>) -> Response<Body> {
        let mut request = Request::post(path)
            .header("x-forwarded-for", CLIENT_IP)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::from(form.to_owned())).expect("valid request"))
            .await
    }

    /// Register a member with [`PASSWORD`].
    pub async fn create_member(&self, email: &str, first_name: &str, last_name: &str) -> User {
        AuthService::new(self.state.repos())
            .create_member(email, first_name, last_name, PASSWORD, false)
            .await
            .expect("member created")
    }

    /// Log in through the form and return the session cookie.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let form = format!("email={email}&password={password}");
        let response = self.post_form("/users/login/", &form, None).await;
        assert!(
            response.status().is_redirection(),
            "login failed with {}",
            response.status()
        );
        session_cookie(&response).expect("session cookie set on login")
    }

    /// Add a product to a fresh catalog. `None` makes it free.
    pub async fn create_product(&self, name: &str, price: Option<i32>, is_available: bool) -> Product {
        let catalogs = &self.state.repos().catalogs;
        let catalog = catalogs
            .create_catalog("Tenues")
            .await
            .expect("catalog created");
        catalogs
            .create_product(&NewProduct {
                catalog_id: catalog.id,
                name: name.to_owned(),
                image: None,
                is_available,
                is_free: price.is_none(),
                price: price.map(|p| Price::new(p).expect("valid price")),
            })
            .await
            .expect("product created")
    }
}

/// The `name=value` part of the session cookie, if the response set one.
#[must_use]
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("teamspirit_session="))
        .and_then(|value| value.split(';').next())
        .map(str::to_owned)
}

/// The redirect target of a response.
#[must_use]
pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    String::from_utf8_lossy(&bytes).into_owned()
}
