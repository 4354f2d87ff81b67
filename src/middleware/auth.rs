use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::error::Error;
use crate::models::user::Identity;
use crate::AppState;

pub const SESSION_COOKIE: &str = "portal_session";

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Resolves the caller from the session cookie, or from a bearer token for
/// non-browser clients, and stores the `Identity` as a request extension.
/// Anything else is sent to the login page with the stale cookie cleared.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| bearer_token(&req));

    let Some(token) = token else {
        return Redirect::to("/login").into_response();
    };

    match state.auth_service.tokens().verify(&token) {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(error = %e, path = %req.uri().path(), "Rejected session token");
            (jar.remove(expired_session_cookie()), Redirect::to("/login")).into_response()
        }
    }
}

/// Must run inside `require_session`.
pub async fn require_admin(req: Request, next: Next) -> Response {
    let identity = req.extensions().get::<Identity>().copied();
    match identity {
        Some(identity) if identity.is_admin() => next.run(req).await,
        Some(identity) => {
            tracing::warn!(user_id = %identity.user_id, role = %identity.role, path = %req.uri().path(), "Admin area refused");
            Error::Forbidden.into_response()
        }
        None => Error::Unauthenticated.into_response(),
    }
}

fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}
