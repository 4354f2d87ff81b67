mod common;

use apprentice_portal::{
    models::user::{Identity, Role},
    routes,
};
use axum::http::{header, StatusCode};
use serde_json::Value as JsonValue;
use tower::ServiceExt;
use uuid::Uuid;

use common::{body_bytes, get, location, offline_state, post_form, session_cookie};

#[tokio::test]
async fn unauthenticated_requests_redirect_to_login() {
    let dir = tempfile::tempdir().unwrap();
    let app = routes::app(offline_state(dir.path(), 20));

    let uris = [
        "/dashboard".to_string(),
        "/admin/students".to_string(),
        "/admin/exports/enrollees.csv".to_string(),
        format!("/files/{}", Uuid::new_v4()),
        format!("/documents/students/{}", Uuid::new_v4()),
    ];
    for uri in &uris {
        let resp = app.clone().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&resp), "/login", "{}", uri);
    }
}

#[tokio::test]
async fn tampered_session_is_cleared_and_redirected() {
    let dir = tempfile::tempdir().unwrap();
    let app = routes::app(offline_state(dir.path(), 20));

    let resp = app
        .oneshot(get("/dashboard", Some("portal_session=not-a-token")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
    let cleared = resp.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.starts_with("portal_session="), "{}", cleared);
}

#[tokio::test]
async fn student_and_employer_are_forbidden_from_admin_area() {
    let dir = tempfile::tempdir().unwrap();
    let state = offline_state(dir.path(), 20);
    let app = routes::app(state.clone());

    for role in [Role::Student, Role::Employer] {
        let cookie = session_cookie(&state, Identity::new(Uuid::new_v4(), role));
        for uri in [
            "/admin/students",
            "/admin/employers",
            "/admin/access-requests",
            "/admin/exports/exiters.csv",
        ] {
            let resp = app.clone().oneshot(get(uri, Some(&cookie))).await.unwrap();
            assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{} {}", role, uri);
        }

        let resp = app
            .clone()
            .oneshot(post_form(
                &format!("/admin/students/{}/status", Uuid::new_v4()),
                Some(&cookie),
                "status=Active",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn bearer_token_is_accepted_in_place_of_cookie() {
    let dir = tempfile::tempdir().unwrap();
    let state = offline_state(dir.path(), 20);
    let app = routes::app(state.clone());
    let token = state
        .auth_service
        .tokens()
        .issue(Identity::new(Uuid::new_v4(), Role::Student))
        .unwrap();

    let req = axum::http::Request::builder()
        .uri("/admin/students")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(axum::body::Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_page_echoes_flash_message() {
    let dir = tempfile::tempdir().unwrap();
    let app = routes::app(offline_state(dir.path(), 20));

    let resp = app
        .oneshot(get("/login?error=Invalid+email+or+password", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: JsonValue = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body["error"], "Invalid email or password");
    assert_eq!(body["data"]["login"], "/login");
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let dir = tempfile::tempdir().unwrap();
    let state = offline_state(dir.path(), 20);
    let app = routes::app(state.clone());
    let cookie = session_cookie(&state, Identity::new(Uuid::new_v4(), Role::Student));

    let resp = app
        .clone()
        .oneshot(post_form("/logout", Some(&cookie), ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login?notice=Signed+out");
    let cleared = resp.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.starts_with("portal_session="), "{}", cleared);
    assert!(cleared.contains("Max-Age=0"), "{}", cleared);

    let resp = app.oneshot(post_form("/logout", None, "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login?notice=Signed+out");
}

#[tokio::test]
async fn invalid_intake_form_redirects_with_error_before_touching_storage() {
    let dir = tempfile::tempdir().unwrap();
    let app = routes::app(offline_state(dir.path(), 20));

    let resp = app
        .oneshot(post_form(
            "/access-requests/register",
            None,
            "email=not-an-email&requested_role=student&note=",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("/login?error="));
}

#[tokio::test]
async fn public_forms_missing_fields_redirect_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = routes::app(offline_state(dir.path(), 20));

    for uri in ["/access-requests/reset-password", "/access-requests/register", "/login"] {
        let resp = app.clone().oneshot(post_form(uri, None, "")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{}", uri);
        let to = location(&resp);
        assert!(to.starts_with("/login?error="), "{} -> {}", uri, to);
    }
}

#[tokio::test]
async fn admin_forms_missing_fields_redirect_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let state = offline_state(dir.path(), 20);
    let app = routes::app(state.clone());
    let admin = session_cookie(&state, Identity::new(Uuid::new_v4(), Role::Admin));
    let student_id = Uuid::new_v4();

    let resp = app
        .clone()
        .oneshot(post_form(
            &format!("/admin/students/{}/status", student_id),
            Some(&admin),
            "state=Active",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let to = location(&resp);
    assert!(
        to.starts_with(&format!("/admin/students/{}?error=", student_id)),
        "{}",
        to
    );
    assert!(to.contains("status"), "{}", to);

    let resp = app
        .clone()
        .oneshot(post_form(
            "/admin/students",
            Some(&admin),
            "email=new%40portal.test&first_name=Ada&last_name=Lovelace",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("/admin/students?error="));

    let resp = app
        .oneshot(post_form(
            &format!("/admin/users/{}/password", Uuid::new_v4()),
            Some(&admin),
            "",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("/admin/access-requests?error="));
}

#[tokio::test]
async fn intake_is_rate_limited() {
    let dir = tempfile::tempdir().unwrap();
    let app = routes::app(offline_state(dir.path(), 2));

    for _ in 0..2 {
        let resp = app
            .clone()
            .oneshot(post_form("/access-requests/reset-password", None, "email=bad"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    }
    let resp = app
        .oneshot(post_form("/access-requests/reset-password", None, "email=bad"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn health_reports_unreachable_database() {
    let dir = tempfile::tempdir().unwrap();
    let app = routes::app(offline_state(dir.path(), 20));

    let resp = app.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: JsonValue = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body["database"], "unreachable");
}
