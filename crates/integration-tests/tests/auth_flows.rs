//! Login, logout and password reset through the HTTP surface.

use axum::http::StatusCode;
use teamspirit_integration_tests::{PASSWORD, TestApp, body_text, location, session_cookie};

const BASE_URL: &str = "http://localhost:8000";

// ============================================================================
// Login & Logout
// ============================================================================

#[tokio::test]
async fn test_login_sets_session_and_redirects() {
    let app = TestApp::new();
    app.create_member("lucie.martin@example.org", "Lucie", "Martin")
        .await;

    let response = app
        .post_form(
            "/users/login/",
            &format!("email=lucie.martin@example.org&password={PASSWORD}&next=/catalog/"),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/catalog/"));
    assert!(session_cookie(&response).is_some());
}

#[tokio::test]
async fn test_login_rejects_offsite_next() {
    let app = TestApp::new();
    app.create_member("lucie.martin@example.org", "Lucie", "Martin")
        .await;

    let response = app
        .post_form(
            "/users/login/",
            &format!("email=lucie.martin@example.org&password={PASSWORD}&next=//evil.example/"),
            None,
        )
        .await;

    assert_eq!(location(&response), Some("/"));
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_look_the_same() {
    let app = TestApp::new();
    app.create_member("lucie.martin@example.org", "Lucie", "Martin")
        .await;

    let wrong_password = app
        .post_form(
            "/users/login/",
            "email=lucie.martin@example.org&password=pas-le-bon",
            None,
        )
        .await;
    let unknown_email = app
        .post_form(
            "/users/login/",
            &format!("email=personne@example.org&password={PASSWORD}"),
            None,
        )
        .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    let first = body_text(wrong_password).await;
    let second = body_text(unknown_email).await;
    assert!(first.contains("Adresse email ou mot de passe incorrect."));
    assert!(second.contains("Adresse email ou mot de passe incorrect."));
}

#[tokio::test]
async fn test_protected_page_redirects_to_login() {
    let app = TestApp::new();

    let response = app.get("/shopping_cart/", None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response).unwrap_or_default();
    assert!(target.starts_with("/users/login/?next="), "got {target}");
    assert!(target.contains("shopping_cart"));
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::new();
    app.create_member("lucie.martin@example.org", "Lucie", "Martin")
        .await;
    let cookie = app.login("lucie.martin@example.org", PASSWORD).await;

    assert_eq!(
        app.get("/profile/", Some(&cookie)).await.status(),
        StatusCode::OK
    );

    let response = app.post_form("/users/logout/", "", Some(&cookie)).await;
    assert_eq!(location(&response), Some("/"));

    let after = app.get("/profile/", Some(&cookie)).await;
    assert_eq!(after.status(), StatusCode::SEE_OTHER);
}

// ============================================================================
// Password Reset
// ============================================================================

async fn request_reset_link(app: &TestApp, email: &str) -> String {
    let response = app
        .post_form("/profile/reset_password/", &format!("email={email}"), None)
        .await;
    assert_eq!(location(&response), Some("/profile/reset_password/done/"));

    let sent = app.mailer.sent().await;
    let link = sent.last().map(|mail| mail.link.clone()).unwrap_or_default();
    assert!(link.starts_with(BASE_URL), "got {link}");
    link.trim_start_matches(BASE_URL).to_owned()
}

#[tokio::test]
async fn test_password_reset_full_flow() {
    let app = TestApp::new();
    app.create_member("lucie.martin@example.org", "Lucie", "Martin")
        .await;

    let path = request_reset_link(&app, "lucie.martin@example.org").await;
    assert!(path.starts_with("/profile/reset_password_confirm/"));

    let form_page = app.get(&path, None).await;
    assert_eq!(form_page.status(), StatusCode::OK);
    assert!(body_text(form_page).await.contains("new_password1"));

    let response = app
        .post_form(
            &path,
            "new_password1=nouveau-secret-7&new_password2=nouveau-secret-7",
            None,
        )
        .await;
    assert_eq!(location(&response), Some("/profile/reset_password_complete/"));

    app.login("lucie.martin@example.org", "nouveau-secret-7").await;

    let old = app
        .post_form(
            "/users/login/",
            &format!("email=lucie.martin@example.org&password={PASSWORD}"),
            None,
        )
        .await;
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reset_link_works_once() {
    let app = TestApp::new();
    app.create_member("lucie.martin@example.org", "Lucie", "Martin")
        .await;
    let path = request_reset_link(&app, "lucie.martin@example.org").await;

    app.post_form(
        &path,
        "new_password1=nouveau-secret-7&new_password2=nouveau-secret-7",
        None,
    )
    .await;

    let again = app.get(&path, None).await;
    assert!(body_text(again).await.contains("Lien invalide"));

    let reuse = app
        .post_form(
            &path,
            "new_password1=encore-autre-8&new_password2=encore-autre-8",
            None,
        )
        .await;
    assert_eq!(reuse.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_with_mismatched_passwords_keeps_link() {
    let app = TestApp::new();
    app.create_member("lucie.martin@example.org", "Lucie", "Martin")
        .await;
    let path = request_reset_link(&app, "lucie.martin@example.org").await;

    let response = app
        .post_form(
            &path,
            "new_password1=nouveau-secret-7&new_password2=autre-chose-9",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let page = app.get(&path, None).await;
    assert!(!body_text(page).await.contains("Lien invalide"));
}

#[tokio::test]
async fn test_reset_for_unknown_email_reports_success_without_mail() {
    let app = TestApp::new();

    let response = app
        .post_form("/profile/reset_password/", "email=personne@example.org", None)
        .await;

    assert_eq!(location(&response), Some("/profile/reset_password/done/"));
    assert!(app.mailer.sent().await.is_empty());
}

#[tokio::test]
async fn test_change_password_requires_old_password() {
    let app = TestApp::new();
    app.create_member("lucie.martin@example.org", "Lucie", "Martin")
        .await;
    let cookie = app.login("lucie.martin@example.org", PASSWORD).await;

    let wrong = app
        .post_form(
            "/profile/change_password/",
            "old_password=pas-le-bon&new_password1=nouveau-secret-7&new_password2=nouveau-secret-7",
            Some(&cookie),
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::BAD_REQUEST);

    let right = app
        .post_form(
            "/profile/change_password/",
            &format!(
                "old_password={PASSWORD}&new_password1=nouveau-secret-7&new_password2=nouveau-secret-7"
            ),
            Some(&cookie),
        )
        .await;
    assert_eq!(location(&right), Some("/profile/change_password/done/"));
}
