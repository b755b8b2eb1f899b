//! Profile pages, member pages and document uploads.

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use teamspirit_integration_tests::{PASSWORD, TestApp, body_text, location};

const CONTACT_FORM: &str = "phone_number=06+12+34+56+78&label_first=3+rue+des+Lilas\
    &label_second=&postal_code=69007&city=Lyon&country=France";

#[tokio::test]
async fn test_profile_page_shows_member() {
    let app = TestApp::new();
    app.create_member("lucie.martin@example.org", "lucie", "martin")
        .await;
    let cookie = app.login("lucie.martin@example.org", PASSWORD).await;

    let response = app.get("/profile/", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Lucie MARTIN"));
    assert!(body.contains("Membre"));
}

#[tokio::test]
async fn test_public_contact_is_visible_to_members() {
    let app = TestApp::new();
    app.create_member("lucie.martin@example.org", "Lucie", "Martin")
        .await;
    app.create_member("paul.bernard@example.org", "Paul", "Bernard")
        .await;

    let lucie = app.login("lucie.martin@example.org", PASSWORD).await;
    let saved = app
        .post_form("/profile/update_phone_address/", CONTACT_FORM, Some(&lucie))
        .await;
    assert_eq!(location(&saved), Some("/profile/"));

    let paul = app.login("paul.bernard@example.org", PASSWORD).await;
    let page = app
        .get("/users/lucie.martin@example.org/", Some(&paul))
        .await;
    assert_eq!(page.status(), StatusCode::OK);
    assert!(body_text(page).await.contains("06 12 34 56 78"));
}

#[tokio::test]
async fn test_private_contact_is_hidden_from_others() {
    let app = TestApp::new();
    app.create_member("lucie.martin@example.org", "Lucie", "Martin")
        .await;
    app.create_member("paul.bernard@example.org", "Paul", "Bernard")
        .await;

    let lucie = app.login("lucie.martin@example.org", PASSWORD).await;
    app.post_form(
        "/profile/update_phone_address/",
        &format!("{CONTACT_FORM}&has_private_profile=on"),
        Some(&lucie),
    )
    .await;

    let paul = app.login("paul.bernard@example.org", PASSWORD).await;
    let for_paul = body_text(
        app.get("/users/lucie.martin@example.org/", Some(&paul))
            .await,
    )
    .await;
    assert!(!for_paul.contains("06 12 34 56 78"));

    let for_lucie = body_text(
        app.get("/users/lucie.martin@example.org/", Some(&lucie))
            .await,
    )
    .await;
    assert!(for_lucie.contains("06 12 34 56 78"));
}

#[tokio::test]
async fn test_invalid_contact_is_not_saved() {
    let app = TestApp::new();
    app.create_member("lucie.martin@example.org", "Lucie", "Martin")
        .await;
    let cookie = app.login("lucie.martin@example.org", PASSWORD).await;

    let response = app
        .post_form(
            "/profile/update_phone_address/",
            "phone_number=abc&label_first=&postal_code=690070&city=Lyon&country=France",
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let profile = body_text(app.get("/profile/", Some(&cookie)).await).await;
    assert!(profile.contains("Aucune coordonnée renseignée."));
}

#[tokio::test]
async fn test_unknown_member_page_is_not_found() {
    let app = TestApp::new();
    app.create_member("lucie.martin@example.org", "Lucie", "Martin")
        .await;
    let cookie = app.login("lucie.martin@example.org", PASSWORD).await;

    let response = app.get("/users/personne@example.org/", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_account_email_must_be_unique() {
    let app = TestApp::new();
    app.create_member("lucie.martin@example.org", "Lucie", "Martin")
        .await;
    app.create_member("paul.bernard@example.org", "Paul", "Bernard")
        .await;
    let cookie = app.login("lucie.martin@example.org", PASSWORD).await;

    let response = app
        .post_form(
            "/users/~update/",
            "email=paul.bernard@example.org&first_name=Lucie&last_name=Martin",
            Some(&cookie),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_account_update_refreshes_session() {
    let app = TestApp::new();
    app.create_member("lucie.martin@example.org", "Lucie", "Martin")
        .await;
    let cookie = app.login("lucie.martin@example.org", PASSWORD).await;

    let response = app
        .post_form(
            "/users/~update/",
            "email=lucie.durand@example.org&first_name=lucienne&last_name=Durand",
            Some(&cookie),
        )
        .await;
    assert_eq!(location(&response), Some("/profile/"));

    let home = body_text(app.get("/", Some(&cookie)).await).await;
    assert!(home.contains("Bonjour Lucienne"));
}

fn upload_request(path: &str, cookie: &str, file_name: &str, content_type: &str) -> Request<Body> {
    let boundary = "teamspirit-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: {content_type}\r\n\r\n\
         %PDF-1.4 certificat\r\n\
         --{boundary}--\r\n"
    );
    Request::post(path)
        .header("x-forwarded-for", "203.0.113.7")
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("valid request")
}

#[tokio::test]
async fn test_upload_and_drop_medical_file() {
    let app = TestApp::new();
    app.create_member("lucie.martin@example.org", "Lucie", "Martin")
        .await;
    let cookie = app.login("lucie.martin@example.org", PASSWORD).await;

    let response = app
        .send(upload_request(
            "/profile/add_medical_file/",
            &cookie,
            "certif.pdf",
            "application/pdf",
        ))
        .await;
    assert_eq!(location(&response), Some("/profile/"));
    assert_eq!(
        app.documents.keys().await,
        vec!["lic/MARTIN_Lucie/certif.pdf".to_string()]
    );

    let confirm = app.get("/profile/drop_medical_file/", Some(&cookie)).await;
    assert!(body_text(confirm).await.contains("certif.pdf"));

    let dropped = app
        .post_form("/profile/drop_medical_file/", "", Some(&cookie))
        .await;
    assert_eq!(location(&dropped), Some("/profile/"));
    assert!(app.documents.keys().await.is_empty());
}

#[tokio::test]
async fn test_upload_rejects_other_file_types() {
    let app = TestApp::new();
    app.create_member("lucie.martin@example.org", "Lucie", "Martin")
        .await;
    let cookie = app.login("lucie.martin@example.org", PASSWORD).await;

    let response = app
        .send(upload_request(
            "/profile/add_id_file/",
            &cookie,
            "script.exe",
            "application/octet-stream",
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.documents.keys().await.is_empty());
}
