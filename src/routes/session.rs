use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{json, Value as JsonValue};

use crate::dto::auth_dto::LoginForm;
use crate::error::{flash_redirect, Result};
use crate::middleware::auth::{expired_session_cookie, session_cookie};
use crate::routes::{form_input, Flash, FormInput, Page};
use crate::AppState;

pub async fn login_page(Query(flash): Query<Flash>) -> Json<Page<JsonValue>> {
    Json(Page::new(
        flash,
        json!({
            "login": "/login",
            "register": "/access-requests/register",
            "reset_password": "/access-requests/reset-password",
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    form: FormInput<LoginForm>,
) -> Result<Response> {
    let form = match form_input(form) {
        Ok(form) => form,
        Err(e) => return Ok(flash_redirect("/login", Err(e))?.into_response()),
    };
    match state.auth_service.login(&form.email, &form.password).await {
        Ok((_, token)) => {
            let jar = jar.add(session_cookie(token, state.config.secure_cookies));
            Ok((jar, Redirect::to("/dashboard")).into_response())
        }
        Err(e) => Ok(flash_redirect("/login", Err(e))?.into_response()),
    }
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(expired_session_cookie()),
        Redirect::to("/login?notice=Signed+out"),
    )
}
