//! Login, logout, and the bucket index page.
//!
//! The two HTML views here are deliberately minimal; the proxy's job is
//! credential custody and object transfer, not UI.

use axum::Form;
use axum::extract::State;
use axum::http::{HeaderValue, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::handlers::session::{MaybeAuth, clear_session_cookie, session_cookie};
use crate::models::bucket::BucketSummary;
use crate::services::storage_service::StorageService;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
}

/// GET /login — render the login form.
pub async fn login_page() -> Html<String> {
    Html(render_login(None))
}

/// POST /login — probe the supplied credentials and bind them to a fresh
/// session on success.
///
/// Rejection re-renders the form with one generic message; the user is
/// deliberately not told whether the endpoint, the keys, or the network
/// was at fault.
pub async fn login(
    State(service): State<StorageService>,
    Form(form): Form<LoginForm>,
) -> Response {
    match service
        .login(&form.endpoint, &form.access_key, &form.secret_key)
        .await
    {
        Ok(token) => {
            info!("login succeeded for endpoint {}", form.endpoint.trim());
            let mut response = Redirect::to("/").into_response();
            if let Ok(value) = HeaderValue::from_str(&session_cookie(&token)) {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
            response
        }
        Err(err @ AppError::InvalidCredentials) => {
            info!("login rejected for endpoint {}", form.endpoint.trim());
            Html(render_login(Some(&err.to_string()))).into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// GET /logout — drop the session and return to the login page.
pub async fn logout(
    State(service): State<StorageService>,
    MaybeAuth(auth): MaybeAuth,
) -> Response {
    if let Some(auth) = auth {
        service.logout(&auth.session_id).await;
    }
    let mut response = Redirect::to("/login").into_response();
    if let Ok(value) = HeaderValue::from_str(&clear_session_cookie()) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

/// GET / — buckets visible to the session's identity; unauthenticated
/// visitors land on the login page.
pub async fn index(State(service): State<StorageService>, MaybeAuth(auth): MaybeAuth) -> Response {
    let Some(auth) = auth else {
        return Redirect::to("/login").into_response();
    };
    match service.list_buckets(&auth.credential).await {
        Ok(buckets) => Html(render_index(&buckets)).into_response(),
        Err(err) => err.into_response(),
    }
}

fn render_login(error: Option<&str>) -> String {
    let notice = error
        .map(|msg| format!("<p class=\"error\">{}</p>", escape_html(msg)))
        .unwrap_or_default();
    format!(
        concat!(
            "<!doctype html><html><head><title>s3-console — login</title></head><body>",
            "<h1>s3-console</h1>{}",
            "<form method=\"post\" action=\"/login\">",
            "<label>Endpoint <input name=\"endpoint\" placeholder=\"https://rgw.example.net:7480\"></label><br>",
            "<label>Access key <input name=\"access_key\"></label><br>",
            "<label>Secret key <input name=\"secret_key\" type=\"password\"></label><br>",
            "<button type=\"submit\">Sign in</button>",
            "</form></body></html>"
        ),
        notice
    )
}

fn render_index(buckets: &[BucketSummary]) -> String {
    let items: String = buckets
        .iter()
        .map(|bucket| format!("<li>{}</li>", escape_html(&bucket.name)))
        .collect();
    format!(
        concat!(
            "<!doctype html><html><head><title>s3-console — buckets</title></head><body>",
            "<h1>Buckets</h1><ul>{}</ul>",
            "<p><a href=\"/logout\">Log out</a></p>",
            "</body></html>"
        ),
        items
    )
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_names_are_escaped_in_the_index() {
        let buckets = vec![BucketSummary {
            name: "<script>".into(),
            creation_date: None,
        }];
        let html = render_index(&buckets);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn login_error_notice_only_renders_on_failure() {
        assert!(!render_login(None).contains("class=\"error\""));
        assert!(render_login(Some("nope")).contains("class=\"error\""));
    }
}
